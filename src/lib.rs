//! job-bench - time equivalent queries against PostgreSQL and Cassandra.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod cli;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod query;
pub mod report;
