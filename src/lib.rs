//! Bulk Git repository updater library.
//!
//! This crate brings every repository under a directory up to date by:
//! - Making sure an ssh-agent is running and holds the configured key
//! - Discovering repository working trees
//! - Detecting each repository's default branch
//! - Checking that branch out and pulling it, several repositories at a time
//! - Partitioning the outcomes into succeeded and failed lists

pub mod agent;
pub mod batch;
pub mod branch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod git;
pub mod locate;
pub mod output;
pub mod repo;
