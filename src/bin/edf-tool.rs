//! edf-tool
//!
//! Inspects an EDF+ file: header summary, calibrated signal windows,
//! annotations and bi-level projections.
//!
//! # Usage
//!
//! ```bash
//! # Header summary and signal labels
//! edf-tool --input recording.edf
//!
//! # Physical values of one signal between 2s and 4s
//! edf-tool --input recording.edf --signal "EEG Fp1" --from 2 --to 4
//!
//! # Bi-level levels of a trigger channel
//! edf-tool --input recording.edf --signal TTL --bilevel 0 5 --tolerance 0.5
//!
//! # Annotations ending within the first minute
//! edf-tool --input recording.edf --annotations --to 60
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use log::{debug, info};

use edfsignals::utils::seconds_to_duration;
use edfsignals::{BiLevelSignal, DataSignal, DecoderConfig, EdfFile, EdfReader, TalMode};

/// EDF+ inspection tool
#[derive(Parser, Debug)]
#[command(name = "edf-tool")]
#[command(author, version, about = "Decode and inspect EDF+ recordings", long_about = None)]
struct Cli {
    /// Path of the EDF+ file
    #[arg(short, long)]
    input: PathBuf,

    /// Label or index of the signal to print
    #[arg(short, long)]
    signal: Option<String>,

    /// Window start, seconds after the recording start
    #[arg(long)]
    from: Option<f64>,

    /// Window end, seconds after the recording start
    #[arg(long)]
    to: Option<f64>,

    /// Print every annotation of every annotation channel
    #[arg(short, long)]
    annotations: bool,

    /// Project the selected signal onto two levels: <LOW> <HIGH>
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"])]
    bilevel: Option<Vec<f64>>,

    /// Tolerance band around each level for --bilevel
    #[arg(long, requires = "bilevel")]
    tolerance: Option<f64>,

    /// Split annotation records the lenient legacy way
    #[arg(long)]
    legacy_tal: bool,

    /// Logging filter, takes priority over RUST_LOG (default: info)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logger(&cli).init();

    let tal_mode = if cli.legacy_tal {
        TalMode::Legacy
    } else {
        TalMode::Delimited
    };
    let reader = EdfReader::with_config(DecoderConfig::default().with_tal_mode(tal_mode));
    let edf = reader
        .open(&cli.input)
        .with_context(|| format!("decoding {}", cli.input.display()))?;

    print_summary(&edf);

    if let Some(selector) = &cli.signal {
        print_signal(&edf, selector, &cli)?;
    }

    if cli.annotations {
        print_annotations(&edf, &cli)?;
    }

    Ok(())
}

/// RUST_LOG (default `info`), overridden by an explicit `--log-level`.
fn logger(cli: &Cli) -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = &cli.log_level {
        builder.parse_filters(filter);
    }
    builder
}

fn print_summary(edf: &EdfFile) {
    let header = &edf.header;
    let patient = header.patient();

    println!("File kind:   {:?}", header.file_kind());
    println!("Patient:     {} ({})", patient.name, patient.code);
    println!("Start:       {}", header.start_datetime());
    println!("End:         {}", header.end_datetime());
    println!(
        "Records:     {} x {}s",
        header.num_data_records, header.duration_data_records
    );
    println!("Signals:");
    for (i, definition) in header.signals.iter().enumerate() {
        println!(
            "  {:>3}: {:<16} {:>6} samples/record  {}",
            i, definition.label, definition.samples_per_record, definition.physical_dimension
        );
    }
}

fn find_signal(edf: &EdfFile, selector: &str) -> Result<usize> {
    if let Ok(index) = selector.parse::<usize>() {
        return Ok(index);
    }
    edf.labels()
        .iter()
        .position(|label| *label == selector)
        .ok_or_else(|| anyhow!("no signal labelled {:?}", selector))
}

fn window(edf: &EdfFile, cli: &Cli) -> (NaiveDateTime, NaiveDateTime) {
    let origin = edf.header.start_datetime();
    let start = cli
        .from
        .map(|s| origin + seconds_to_duration(s))
        .unwrap_or(origin);
    let end = cli
        .to
        .map(|s| origin + seconds_to_duration(s))
        .unwrap_or_else(|| edf.header.end_datetime());
    (start, end)
}

fn print_signal(edf: &EdfFile, selector: &str, cli: &Cli) -> Result<()> {
    let index = find_signal(edf, selector)?;
    let signal = edf.numeric_signal(index)?;
    let (start, end) = window(edf, cli);
    debug!("Window {} .. {} on signal {}", start, end, index);

    match cli.bilevel.as_deref() {
        Some([low, high]) => {
            let bilevel = match cli.tolerance {
                Some(tolerance) => BiLevelSignal::with_tolerance(signal, *low, *high, tolerance),
                None => BiLevelSignal::new(signal, *low, *high),
            };
            let levels = bilevel.levels(start, end)?;
            info!("{}: {} samples", bilevel.label(), levels.len());
            for level in levels {
                println!("{:?}", level);
            }
        }
        Some(other) => bail!("--bilevel takes two values, got {}", other.len()),
        None => {
            let values = signal.recording(start, end)?;
            info!("{}: {} samples", signal.label(), values.len());
            for value in values {
                println!("{}", value);
            }
        }
    }

    Ok(())
}

/// One tab separated line per annotation selected by the window.
fn annotation_lines(edf: &EdfFile, cli: &Cli) -> Result<Vec<String>> {
    let (start, end) = window(edf, cli);
    let mut lines = Vec::new();
    for channel in edf.annotation_signals()? {
        debug!("Annotation channel {} ({})", channel.index(), channel.label());
        for annotation in channel.annotations(start, end)? {
            lines.push(format!(
                "{}\t{}\t{}",
                annotation.time(),
                annotation.duration(),
                annotation.annotations().join(" | ")
            ));
        }
    }
    Ok(lines)
}

fn print_annotations(edf: &EdfFile, cli: &Cli) -> Result<()> {
    let lines = annotation_lines(edf, cli)?;
    info!("{} annotations", lines.len());
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
