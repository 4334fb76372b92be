//! Core engine modules for marktrack.

pub mod catalog;
pub mod chain;
pub mod config;
pub mod count;
pub mod db;
pub mod error;
pub mod repo;
pub mod report;
pub mod resolver;
pub mod session;
pub mod store;
pub mod submission;
pub mod types;
