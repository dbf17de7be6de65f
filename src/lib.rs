//! Brokersky Library
//!
//! Accounts, funds movements, trade processing and admin statistics behind a
//! JSON HTTP API backed by SQLite.

pub mod application;
pub mod config;
pub mod domain;
pub mod persistence;
pub mod rate_limit;
