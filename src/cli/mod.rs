//! # CLI Module
//!
//! Command-line interface for the curation pipeline.
//!
//! ## Usage
//! ```bash
//! # Sort raw scans into fronts/, enhanced_fronts/ and backs/
//! photo-curate reorganize --input ~/Scans --output ~/Photos/reorganized
//!
//! # Split off near duplicates
//! photo-curate dedup --input ~/Photos/reorganized --output ~/Photos/unique \
//!     --duplicates ~/Photos/dups --threshold 5
//!
//! # Build the next version of a collection
//! photo-curate init-collection --input ~/Photos/unique --name family \
//!     --collections-root ~/Collections --tag event=reunion
//!
//! # JSON output; global options go before the subcommand
//! photo-curate --output json list-collections --collections-root ~/Collections
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_curator::config::Settings;
use photo_curator::core::collection::{list_collections, CollectionBuilder, InitOptions, Version};
use photo_curator::core::dedup::Deduplicator;
use photo_curator::core::hasher::FingerprintKind;
use photo_curator::core::output::LinkMode;
use photo_curator::core::reorganize::{OperationMode, ReorganizeOptions, Reorganizer};
use photo_curator::core::scanner::ScanIndexer;
use photo_curator::error::{CollectionError, Result};
use photo_curator::events::{
    CopyEvent, Event, EventChannel, EventSender, FingerprintEvent, ScanEvent, StageEvent,
};
use std::path::{Path, PathBuf};
use std::thread;

/// Photo Curator - from raw scans to versioned collections
#[derive(Parser, Debug)]
#[command(name = "photo-curate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sort raw scanner output into category directories
    Reorganize {
        /// Directory written by the scanner
        #[arg(long)]
        input: PathBuf,

        /// Directory to receive fronts/, enhanced_fronts/ and backs/
        #[arg(long)]
        output: PathBuf,

        /// Remove the originals once everything is copied
        #[arg(long = "move")]
        move_files: bool,
    },

    /// Split a reorganized tree into kept photos and duplicates
    Dedup {
        /// Reorganized directory
        #[arg(long)]
        input: PathBuf,

        /// Directory for kept photos
        #[arg(long)]
        output: PathBuf,

        /// Directory for duplicates
        #[arg(long)]
        duplicates: PathBuf,

        /// Maximum fingerprint distance of duplicates (0 = identical only)
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<i64>,

        /// Fingerprint algorithm
        #[arg(long)]
        algorithm: Option<Algorithm>,
    },

    /// Build a new version of a collection
    InitCollection {
        /// Directory with fronts/, enhanced_fronts/ and backs/
        #[arg(long)]
        input: PathBuf,

        /// Collection name
        #[arg(long)]
        name: String,

        /// Directory holding all collections
        #[arg(long)]
        collections_root: PathBuf,

        /// Tag seeded into every sidecar, as key=value (repeatable)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,

        /// Build this four-digit version instead of the next one
        #[arg(long, value_parser = parse_version)]
        version: Option<Version>,

        /// Hard-link images instead of copying them
        #[arg(long)]
        link: bool,
    },

    /// List finished collection versions
    ListCollections {
        /// Directory holding all collections
        #[arg(long)]
        collections_root: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Average Hash - matches rescans of the same print (default)
    Average,
    /// Difference Hash - brightness gradients
    Difference,
    /// Perceptual Hash - most robust to edits
    Perceptual,
    /// Byte-identical files only
    Exact,
}

impl From<Algorithm> for FingerprintKind {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Average => FingerprintKind::Average,
            Algorithm::Difference => FingerprintKind::Difference,
            Algorithm::Perceptual => FingerprintKind::Perceptual,
            Algorithm::Exact => FingerprintKind::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

fn parse_tag(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn parse_version(raw: &str) -> std::result::Result<Version, CollectionError> {
    raw.parse()
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let format = cli.output;

    match cli.command {
        Commands::Reorganize {
            input,
            output,
            move_files,
        } => run_reorganize(&settings, &input, &output, move_files, format),
        Commands::Dedup {
            input,
            output,
            duplicates,
            threshold,
            algorithm,
        } => run_dedup(
            &settings,
            &input,
            &output,
            &duplicates,
            threshold,
            algorithm,
            format,
        ),
        Commands::InitCollection {
            input,
            name,
            collections_root,
            tags,
            version,
            link,
        } => {
            let mut options = InitOptions {
                tags,
                version,
                ..InitOptions::default()
            }
            .filter(settings.scan_config().filter());
            if link {
                options = options.link_mode(LinkMode::HardLink);
            }
            run_init_collection(options, &input, &name, &collections_root, format)
        }
        Commands::ListCollections { collections_root } => {
            run_list_collections(&collections_root, format)
        }
    }
}

/// Drain events on a separate thread while `stage` runs.
fn with_progress<T>(format: OutputFormat, stage: impl FnOnce(&EventSender) -> Result<T>) -> Result<T> {
    let (sender, receiver) = EventChannel::new();

    let progress = if format == OutputFormat::Pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            for _ in receiver.iter() {}
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Stage(StageEvent::Started { stage }) => pb.set_message(stage.to_string()),
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_message(format!("Indexing {} files", p.files_found));
                }
                Event::Fingerprint(FingerprintEvent::Started { total }) => {
                    pb.set_length(total as u64);
                    pb.set_position(0);
                    pb.set_message("Fingerprinting");
                }
                Event::Fingerprint(FingerprintEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Copy(CopyEvent::Started { total }) => {
                    pb.set_length(total as u64);
                    pb.set_position(0);
                    pb.set_message("Copying");
                }
                Event::Copy(CopyEvent::Progress(p)) => pb.set_position(p.completed as u64),
                Event::Stage(StageEvent::Failed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let result = stage(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    result
}

fn run_reorganize(
    settings: &Settings,
    input: &Path,
    output: &Path,
    move_files: bool,
    format: OutputFormat,
) -> Result<()> {
    let options = ReorganizeOptions {
        operation: if move_files {
            OperationMode::Move
        } else {
            OperationMode::Copy
        },
    };

    let result = with_progress(format, |events| {
        let index = ScanIndexer::new(settings.scan_config()).index_with_events(input, events)?;
        Reorganizer::new(options).run(&index, output, events)
    })?;

    match format {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            print_header(&term, "Reorganize complete");
            term.write_line(&format!(
                "  {} photos, {} files written in {:.1}s",
                style(result.identities).cyan(),
                style(result.files_written).cyan(),
                result.duration_ms as f64 / 1000.0
            ))
            .ok();
            term.write_line(&format!(
                "  {} basenames disambiguated",
                style(result.renamed).yellow()
            ))
            .ok();
            term.write_line(&format!(
                "  {} {}",
                style("Manifest:").dim(),
                result.manifest_path.display()
            ))
            .ok();
            print_warnings(&term, &result.warnings);
        }
        OutputFormat::Json => println!(
            "{:#}",
            serde_json::json!({
                "run_id": result.run_id,
                "identities": result.identities,
                "renamed": result.renamed,
                "files_written": result.files_written,
                "manifest": result.manifest_path,
                "warnings": result.warnings,
                "duration_ms": result.duration_ms,
            })
        ),
    }
    Ok(())
}

fn run_dedup(
    settings: &Settings,
    input: &Path,
    output: &Path,
    duplicates: &Path,
    threshold: Option<i64>,
    algorithm: Option<Algorithm>,
    format: OutputFormat,
) -> Result<()> {
    let mut options = settings.dedup_options();
    if let Some(threshold) = threshold {
        options = options.threshold(threshold);
    }
    if let Some(algorithm) = algorithm {
        options = options.algorithm(algorithm.into());
    }
    let threshold = options.threshold;
    let algorithm = options.algorithm;

    let result = with_progress(format, |events| {
        Deduplicator::new(options).run(input, output, duplicates, events)
    })?;

    match format {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            print_header(&term, "Dedup complete");
            term.write_line(&format!(
                "  {} photos fingerprinted at threshold {}",
                style(result.identities).cyan(),
                threshold
            ))
            .ok();
            term.write_line(&format!("  {}", style(algorithm.description()).dim()))
                .ok();
            term.write_line(&format!(
                "  {} kept, {} duplicates",
                style(result.kept).green(),
                style(result.duplicates).yellow()
            ))
            .ok();
            for cluster in result.clusters.iter().filter(|c| !c.is_singleton()) {
                term.write_line(&format!(
                    "    {} {} {}",
                    style("★").green(),
                    cluster.canonical,
                    style(format!("({} duplicates, distance <= {})", cluster.duplicates.len(), cluster.max_distance)).dim()
                ))
                .ok();
                for duplicate in &cluster.duplicates {
                    term.write_line(&format!("      {} {}", style("○").dim(), duplicate))
                        .ok();
                }
            }
            term.write_line(&format!(
                "  {} {}",
                style("Report:").dim(),
                result.report_path.display()
            ))
            .ok();
            print_warnings(&term, &result.warnings);
        }
        OutputFormat::Json => println!(
            "{:#}",
            serde_json::json!({
                "run_id": result.run_id,
                "identities": result.identities,
                "kept": result.kept,
                "duplicates": result.duplicates,
                "clusters": result.clusters,
                "files_written": result.files_written,
                "report": result.report_path,
                "warnings": result.warnings,
                "duration_ms": result.duration_ms,
            })
        ),
    }
    Ok(())
}

fn run_init_collection(
    options: InitOptions,
    input: &Path,
    name: &str,
    collections_root: &Path,
    format: OutputFormat,
) -> Result<()> {
    let result = with_progress(format, |events| {
        CollectionBuilder::new(options).init(input, name, collections_root, events)
    })?;

    match format {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            print_header(&term, "Collection version written");
            term.write_line(&format!(
                "  {} {}",
                style(&result.collection).bold(),
                style(result.version).cyan()
            ))
            .ok();
            term.write_line(&format!(
                "  {} photos, {} sidecars created, {} updated",
                style(result.photos).cyan(),
                result.sidecars_created,
                result.sidecars_updated
            ))
            .ok();
            term.write_line(&format!("  {}", result.path.display())).ok();
            print_warnings(&term, &result.warnings);
        }
        OutputFormat::Json => println!(
            "{:#}",
            serde_json::json!({
                "collection": result.collection,
                "version": result.version,
                "path": result.path,
                "photos": result.photos,
                "files_written": result.files_written,
                "sidecars_created": result.sidecars_created,
                "sidecars_updated": result.sidecars_updated,
                "warnings": result.warnings,
                "duration_ms": result.duration_ms,
            })
        ),
    }
    Ok(())
}

fn run_list_collections(collections_root: &Path, format: OutputFormat) -> Result<()> {
    let collections = list_collections(collections_root)?;

    match format {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            if collections.is_empty() {
                term.write_line(&format!(
                    "{}",
                    style(format!("No collections under {}", collections_root.display())).dim()
                ))
                .ok();
            }
            for collection in &collections {
                term.write_line(&format!(
                    "{} {}  {} photos  {}",
                    style(&collection.name).bold(),
                    style(collection.version).cyan(),
                    collection.photos,
                    style(collection.path.display()).dim()
                ))
                .ok();
            }
        }
        OutputFormat::Json => println!("{:#}", serde_json::json!(collections)),
    }
    Ok(())
}

fn print_header(term: &Term, title: &str) {
    term.write_line(&format!("{} {}", style("✓").green().bold(), style(title).bold()))
        .ok();
}

fn print_warnings(term: &Term, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    term.write_line(&format!(
        "  {}",
        style(format!("{} warnings:", warnings.len())).yellow()
    ))
    .ok();
    for warning in warnings {
        term.write_line(&format!("    {} {}", style("!").yellow(), warning))
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_split_on_first_equals() {
        assert_eq!(
            parse_tag("dc:description=a=b").unwrap(),
            ("dc:description".to_string(), "a=b".to_string())
        );
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=x").is_err());
    }

    #[test]
    fn negative_threshold_parses() {
        let cli = Cli::try_parse_from([
            "photo-curate",
            "dedup",
            "--input",
            "a",
            "--output",
            "b",
            "--duplicates",
            "c",
            "--threshold",
            "-1",
        ])
        .unwrap();

        match cli.command {
            Commands::Dedup { threshold, .. } => assert_eq!(threshold, Some(-1)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_format_precedes_subcommand() {
        let cli = Cli::try_parse_from([
            "photo-curate",
            "--output",
            "json",
            "list-collections",
            "--collections-root",
            "/c",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn version_must_have_four_digits() {
        assert!(Cli::try_parse_from([
            "photo-curate",
            "init-collection",
            "--input",
            "a",
            "--name",
            "family",
            "--collections-root",
            "c",
            "--version",
            "12",
        ])
        .is_err());
    }
}
