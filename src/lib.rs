//! linctl: aliases and name resolution for issue-tracker entities
//!
//! Maps short, human-friendly names to canonical entity IDs, with global and
//! per-project alias files, a two-tier entity cache and ordered resolvers.

pub mod cli;
pub mod core;
