//! # Photo Curator
//!
//! Turns the raw output of a bulk photo scanner into clean, deduplicated,
//! versioned collections.
//!
//! ## Pipeline
//! 1. **Reorganize** - sort front, enhanced front and back scans into
//!    category directories, giving colliding basenames `_N` suffixes
//! 2. **Deduplicate** - cluster near-identical photos and keep one of each
//! 3. **Collect** - copy the result into `<name>/<version>/` and seed
//!    `.xmp` sidecars with tags
//!
//! Every stage writes only into output locations that are absent or
//! empty, and removes its partial output when it fails.
//!
//! ## Architecture
//! - `core` - The pipeline stages
//! - `events` - Event-driven progress reporting
//! - `config` - Optional TOML settings
//! - `error` - Error types with stable kind names

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CuratorError, Result};

/// Initialize tracing for the library
///
/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`). Calling it
/// twice is harmless.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
