//! # photo-curate CLI
//!
//! Command-line interface for the curation pipeline.
//!
//! ## Usage
//! ```bash
//! photo-curate reorganize --input ~/Scans --output ~/Photos/reorganized
//! photo-curate --output json dedup --input ~/Photos/reorganized \
//!     --output ~/Photos/unique --duplicates ~/Photos/dups --threshold 0
//! ```

mod cli;

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    photo_curator::init_tracing();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{} {}",
                style(format!("error[{}]:", e.kind())).red().bold(),
                e
            );
            ExitCode::FAILURE
        }
    }
}
