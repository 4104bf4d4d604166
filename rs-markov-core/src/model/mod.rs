//! Word-level Markov chain model.
//!
//! This module contains:
//! - The in-memory transition table (`BigramModel`) every backend keeps
//! - Training from token streams, readers and corpus directories (`Trainer`)
//! - Weighted random walks over a store (`Generator`)

/// First-order transition table.
///
/// Maps each `current` word to its followers and their counts.
pub mod bigram_model;

/// Internal per-word follower set.
///
/// This module is not exposed publicly.
mod state;

/// Converts tokens and corpus sources into store increments.
pub mod trainer;

/// Weighted random walk generation.
pub mod generator;
