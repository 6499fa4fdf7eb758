//! Shortspan - multi-tenant URL shortener data plane
//!
//! This library provides the core functionality for the Shortspan service:
//! the redirect edge, per-workspace usage counters, the asynchronous click
//! pipeline, rollup aggregation, and the analytics read API.
//!
//! # Architecture
//! - `storage`: SeaORM storage backend (catalog, click log, counters, rollups)
//! - `services`: resolution and plan lookup on the redirect path
//! - `counter`: per-workspace serialized usage counters (Free cap / Pro period)
//! - `analytics`: click enrichment, pipeline, log writer, aggregation, retention
//! - `billing`: usage reporting and reconciliation jobs
//! - `api`: HTTP services and middleware
//! - `scheduler`: UTC cron-slot background jobs
//! - `config`: configuration management
//! - `runtime`: application lifecycle
//! - `system`: logging and platform utilities

pub mod analytics;
pub mod api;
pub mod billing;
pub mod config;
pub mod counter;
pub mod errors;
pub mod runtime;
pub mod scheduler;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
