//! # fred-sync core
//!
//! Runtime-agnostic logic for fred-sync: data models, provider value
//! parsing, fetch-window arithmetic, null-run segmentation, and the
//! collaborator traits the sync job is written against.
//!
//! This crate contains no tokio, sqlx, reqwest, or filesystem I/O. The
//! SQLite store, the HTTP provider client, and the job loop itself live in
//! the `fred-sync` package.

pub mod models;
pub mod observation;
pub mod provider;
pub mod segment;
pub mod store;
