//! dayfeed service library
//!
//! This library exposes modules for integration testing.
//! The main binary is in main.rs.

pub mod classify;
pub mod config;
pub mod day;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod protocol;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod stream;
pub mod transactions;
