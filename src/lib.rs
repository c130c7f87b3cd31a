//! # emberkv
//!
//! An embedded, file-backed key-value store with:
//! - Checksummed binary on-disk format (magic + CRC-32 + payload)
//! - Atomic write-then-rename persistence, eager or on explicit commit
//! - TTL-based ephemeral keys, excluded from persistence and lazily evicted
//! - Thread-safe access through a single internal lock
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                                │
//! │        (in-memory map, sweeps, operation surface)            │
//! └──────────┬────────────────────────────┬─────────────────────┘
//!            │                            │
//!            ▼                            ▼
//!     ┌─────────────┐             ┌───────────────┐
//!     │  TTL Cache  │             │ Dump Scheduler│
//!     │ (lazy expiry)│            │ (serialized,  │
//!     └─────────────┘             │  atomic write)│
//!                                 └───────┬───────┘
//!                                         │
//!                                         ▼
//!                                  ┌─────────────┐
//!                                  │    Codec    │
//!                                  │ (magic+CRC) │
//!                                  └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use emberkv::{load, Value};
//! use std::time::Duration;
//!
//! # fn main() -> emberkv::Result<()> {
//! let db = load("~/app.db", true)?;
//!
//! db.set("greeting", "hello")?;
//! db.set_expiring("session", "token", Duration::from_secs(60))?;
//!
//! assert_eq!(db.get("greeting"), Some(Value::from("hello")));
//! db.commit()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod value;
pub mod codec;
pub mod cache;
pub mod dump;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use value::{Kind, Scalar, Value};
pub use store::{load, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
