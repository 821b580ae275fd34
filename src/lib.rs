//! # fred-sync
//!
//! A resumable, rate-limited synchronizer for FRED economic time series.
//!
//! Each run walks the series catalog from a persisted offset, asks the
//! provider only for observations newer than what is already stored,
//! upserts them into SQLite, and advances the checkpoint after every
//! series. A run that is killed part-way resumes at the next series.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌───────────────────┐
//! │ FRED API     │──▶│  SyncJob   │──▶│  SQLite           │
//! │ (FredClient) │   │ delay+ckpt │   │ catalog/data/ckpt │
//! └──────────────┘   └─────┬──────┘   └─────────┬─────────┘
//!                          │                    │
//!            ┌─────────────┼──────────┐         │
//!            ▼             ▼          ▼         ▼
//!      ┌──────────┐ ┌───────────┐ ┌───────────────┐
//!      │   CLI    │ │ scheduler │ │   HTTP API    │
//!      │(fredsync)│ │ (interval)│ │ sync / series │
//!      └──────────┘ └───────────┘ └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fredsync init                     # create database
//! fredsync series add UNRATE        # track a series
//! fredsync sync                     # one pass over the catalog
//! fredsync schedule                 # run every [schedule].interval_secs
//! fredsync serve                    # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | Store traits over SQLite |
//! | [`provider`] | FRED HTTP client with retry |
//! | [`sync`] | The resumable sync job |
//! | [`scheduler`] | Periodic trigger |
//! | [`series`] | Catalog administration and observation lookup |
//! | [`server`] | HTTP API |
//! | [`stats`] | Status overview |
//!
//! Models, value parsing, segmentation, and the store traits live in the
//! runtime-agnostic [`fred_sync_core`] crate, re-exported here as [`core`].

pub use fred_sync_core as core;

pub mod config;
pub mod db;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod provider;
pub mod scheduler;
pub mod series;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod sync;
