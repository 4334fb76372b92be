//! marktrack: production mark execution tracking.
//!
//! Marks move through ordered work areas. A fill records completed
//! quantities for several areas at once, gated by the state of the areas
//! before them (see [`engine::chain`]).

pub mod engine;
pub mod logging;
