//! # Persist Testkit
//!
//! Test utilities for persist.
//!
//! This crate provides:
//! - Temporary stores and engines for every store medium
//! - Property-based test generators using proptest
//! - A model-checking harness that mirrors engine writes in a map
//! - Multi-threaded lock stress runs
//!
//! ## Usage
//!
//! ```rust
//! use persist_testkit::prelude::*;
//!
//! for kind in ALL_KINDS {
//!     with_phone_book(kind, |engine| {
//!         scenarios::flintstones(engine);
//!         assert_eq!(engine.restore_where("lastname = 'Rubble'", "").unwrap(), 2);
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Output goes
/// through the test harness's capture. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
