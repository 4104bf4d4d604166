use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use rs_markov_core::io::normalize_folder;
use rs_markov_core::{Config, Generator, StartWord, Trainer, TransitionStore};

/// Train a word-level Markov chain on text corpora and generate from it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file; flags below override its values.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Transition store file.
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
    /// Directory, `.txt` file or `.zip` archive to train on.
    #[arg(long, value_name = "PATH")]
    corpus: Option<String>,
    /// Inline text to train on (one increment per pair).
    #[arg(long)]
    text: Option<String>,
    /// Pairs per storage batch.
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,
    /// Maximum number of words to generate.
    #[arg(long, value_name = "N")]
    length: Option<usize>,
    /// Seed of the random walk.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
    /// First word of the walk.
    #[arg(long)]
    start: Option<String>,
    /// Delete every stored transition and exit.
    #[arg(long = "clear-db")]
    clear_db: bool,
}

impl Args {
    /// Merges the configuration file (if any) with command line overrides.
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(corpus) = &self.corpus {
            config.corpus = Some(normalize_folder(corpus));
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(length) = self.length {
            config.length = length;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.start.is_some() {
            config.start = self.start.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.config()?;

    let mut store = TransitionStore::open(&config.database)
        .with_context(|| format!("opening {}", config.database.display()))?;

    if args.clear_db {
        println!("Clearing database...");
        store.clear().context("clearing the transition store")?;
        println!("Database cleared.");
        return Ok(());
    }

    // Training is optional: an already trained store can be sampled directly
    {
        let mut trainer = Trainer::with_batch_size(&mut store, config.batch_size)?;

        if let Some(text) = &args.text {
            let pairs = trainer.train_text(text).context("training on inline text")?;
            info!("Trained {} pairs from inline text", pairs);
        }

        if let Some(corpus) = &config.corpus {
            let report = trainer
                .train_path(corpus)
                .with_context(|| format!("training on {}", corpus.display()))?;
            for failure in &report.failures {
                warn!("Skipped: {}", failure);
            }
            println!(
                "Training complete! {} sources, {} word pairs saved ({} skipped).\n",
                report.sources,
                report.pairs,
                report.failures.len()
            );
        }
    }

    let stats = store.stats()?;
    info!(
        "Store holds {} words, {} transitions, {} observations",
        stats.currents, stats.transitions, stats.observations
    );

    // Seeded runs are reproducible, unseeded ones draw from the OS
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let start = match &config.start {
        Some(word) => StartWord::Custom(word.clone()),
        None => StartWord::Random,
    };

    let text = Generator::new(&store, rng)
        .generate_text(config.length, &start)
        .context("generating text (train on a corpus first)")?;

    println!("Generated text:\n");
    println!("{}", text);

    Ok(())
}
