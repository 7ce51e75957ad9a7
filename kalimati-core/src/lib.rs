//! Kalimati Core: daily price file acquisition, date normalization, and combination.
//!
//! This crate contains everything behind the `kalimati` CLI:
//! - Sync configuration (remote base URL, local data root, date span)
//! - A `DayFileSource` trait with a raw-GitHub HTTP implementation
//! - The date-partitioned local store (`<root>/<YYYY>/<MM>/<DD>.csv`)
//! - Batch download with overwrite / missing-only modes
//! - Ambiguous date string normalization
//! - Combination of all local day files into one date-sorted CSV

pub mod config;
pub mod data;

pub use config::SyncConfig;
