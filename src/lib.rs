// airsync - Incremental air quality data sync
// Copyright (c) 2025 airsync Contributors
// Licensed under the MIT License

//! # airsync - incremental air quality data sync
//!
//! airsync pulls monitoring locations and measurements from the OpenAQ API
//! and writes them into a relational store. Each run resumes from the latest
//! stored observation, so it can be scheduled from cron and re-run at any
//! time without duplicating data.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Normalization, watermarks, sync orchestration and alerts
//! - [`adapters`] - External integrations (OpenAQ API, PostgreSQL, in-memory store)
//! - [`domain`] - Natural-key identifiers, records and errors
//! - [`config`] - Configuration loading and validation
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use airsync::adapters::database::create_store;
//! use airsync::adapters::openaq::OpenAqClient;
//! use airsync::config::load_config;
//! use airsync::core::sync::{SyncCoordinator, SyncOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("airsync.toml")?;
//!     let store = create_store(&config)?;
//!     store.test_connection().await?;
//!     store.ensure_schema().await?;
//!
//!     let source = Arc::new(OpenAqClient::new(&config.source)?);
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let options = SyncOptions::from_config(&config);
//!     let summary = SyncCoordinator::new(source, store, options, shutdown_rx)
//!         .run()
//!         .await;
//!
//!     println!("{}", summary.summary_line());
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental Sync
//!
//! No cursor is persisted. The watermark is the latest `observed_at` stored
//! for the stream, and the next run requests measurements from that instant
//! on. Records at the watermark itself come back as duplicates and are
//! ignored by the store's unique key.
//!
//! ## Error Handling
//!
//! Library functions return [`domain::Result`], built on
//! [`domain::AirSyncError`]. Fetch failures are classified as transient
//! (retried) or fatal (the run fails); the CLI maps outcomes to exit codes.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
