//! Shared types, configuration, and database plumbing for Courier.

pub mod config;
pub mod db;
pub mod error;
pub mod types;
