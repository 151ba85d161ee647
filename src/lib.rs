//! # EDF+ Signal Decoder for Rust
//!
//! A pure Rust decoder for EDF+ (European Data Format Plus) recordings.
//! A file is decoded once into memory; its signals are then exposed as
//! time-addressable views returning calibrated physical values, and its
//! `EDF Annotations` channels as lists of timestamped annotations.
//!
//! ## Quick Start
//!
//! ### Reading a numeric signal
//!
//! ```rust
//! use edfsignals::{DataSignal, EdfFile, Result};
//! # use std::fs;
//!
//! fn main() -> Result<()> {
//!     # let path = std::env::temp_dir().join("edfsignals_lib_doc.edf");
//!     # edfsignals::testing::create_simple_test_file(&path)?;
//!     // Decode the whole file
//!     let edf = EdfFile::open(&path)?;
//!
//!     let header = &edf.header;
//!     println!("Number of signals: {}", header.signals.len());
//!     println!("File duration: {:?}", header.recording_duration());
//!
//!     // Physical values of the first second of signal 0
//!     let signal = edf.numeric_signal(0)?;
//!     let start = signal.start_time();
//!     let values = signal.recording(start, start + chrono::Duration::seconds(1))?;
//!     println!("Read {} samples", values.len());
//!
//!     # fs::remove_file(&path).ok();
//!     Ok(())
//! }
//! ```
//!
//! ### Reading annotations
//!
//! Every TAL (time-stamped annotation list) found in an annotation channel
//! becomes a [`TimestampedAnnotation`]. Window queries select annotations
//! by their end time.
//!
//! ```rust
//! use edfsignals::EdfFile;
//! use std::io::Cursor;
//!
//! # let bytes = edfsignals::testing::annotated_test_bytes();
//! let edf = EdfFile::from_reader(Cursor::new(bytes))?;
//!
//! for channel in edf.annotation_signals()? {
//!     for annotation in channel.all() {
//!         println!("{} +{}s {:?}", annotation.time(), annotation.duration(), annotation.annotations());
//!     }
//! }
//! # Ok::<(), edfsignals::EdfError>(())
//! ```
//!
//! ## Physical vs Digital Values
//!
//! EDF+ stores 16-bit integers; each signal's header gives the physical
//! and digital ranges that map one onto the other linearly:
//!
//! ```rust
//! use edfsignals::Calibration;
//!
//! let calibration = Calibration::from_ranges(-100.0, 100.0, -32768.0, 32767.0).unwrap();
//!
//! let physical = calibration.to_physical(16384);
//! assert!((physical - 50.0).abs() < 0.1);
//!
//! let digital = calibration.to_digital(25.0);
//! assert!((digital - 8192.0).abs() <= 1.0);
//! ```
//!
//! ## Logging
//!
//! The library logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger; binaries pick one (the bundled `edf-tool` uses
//! `env_logger`).

pub mod annotation;
pub mod bilevel;
pub mod config;
pub mod error;
pub mod header;
pub mod reader;
pub mod record;
pub mod signal;
pub mod types;
pub mod utils;

#[doc(hidden)]
pub mod testing; // For internal tests and doctests

// Re-export main types for convenience
pub use annotation::{AnnotationSignal, TimestampedAnnotation};
pub use bilevel::{BiLevelSignal, Level};
pub use config::{DecoderConfig, TalMode};
pub use error::{EdfError, RangeSide, Result};
pub use reader::EdfReader;
pub use signal::{Calibration, DataSignal, NumericSignal, SamplePosition, Signal};
pub use types::{DataRecord, EdfFile, FileKind, Header, PatientInfo, RecordingInfo, SignalDefinition};

// Important constants
pub const EDF_ANNOTATION_LABEL: &str = "EDF Annotations";
pub const EDFLIB_MAXSIGNALS: usize = 4096;

/// Library version
///
/// Returns the current version of the edfsignals library.
///
/// # Examples
///
/// ```rust
/// let version = edfsignals::version();
/// assert!(!version.is_empty());
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
