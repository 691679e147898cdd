#![forbid(unsafe_code)]

//! Prescription registry kept on a key/value ledger.
//!
//! This crate provides:
//! - Domain types (prescriptions, the registry)
//! - Ledger abstraction with in-memory and file backends
//! - Lifecycle engine (create, fill, double-fill guard)
//! - Operation dispatch with per-operation transactions
//! - CSV export, configuration, logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod ledger;
pub mod store;
pub mod engine;
pub mod dispatch;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use ledger::{Ledger, MemoryLedger, Transaction};
pub use store::FileLedger;
pub use engine::PrescriptionEngine;
pub use dispatch::{invoke, Operation};
pub use export::export_csv;
