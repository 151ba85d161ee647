use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;

use crate::config::DecoderConfig;
use crate::error::{EdfError, Result};
use crate::header::read_header;
use crate::record::read_records;
use crate::types::EdfFile;

/// EDF+ decoder turning a byte source into an in-memory [`EdfFile`]
///
/// The whole file is decoded in one sequential pass (header, then every
/// data record) before any query can be made. Decoding either succeeds
/// completely or fails with no partial result.
///
/// # Examples
///
/// ## Basic usage
///
/// ```rust
/// use edfsignals::EdfReader;
///
/// # // Generate test file (hidden from docs)
/// # let path = std::env::temp_dir().join("edfsignals_reader_doc.edf");
/// # edfsignals::testing::create_simple_test_file(&path)?;
/// #
/// let edf = EdfReader::new().open(&path)?;
///
/// let header = &edf.header;
/// println!("Start: {}", header.start_datetime());
/// println!("Signals: {}", header.signals.len());
///
/// for label in edf.labels() {
///     println!("  {}", label);
/// }
///
/// # // Cleanup (hidden from docs)
/// # std::fs::remove_file(&path).ok();
/// # Ok::<(), edfsignals::EdfError>(())
/// ```
///
/// ## Decoding from memory
///
/// ```rust
/// use std::io::Cursor;
/// use edfsignals::{DecoderConfig, EdfReader, TalMode};
///
/// # let bytes = edfsignals::testing::simple_test_bytes();
/// let reader = EdfReader::with_config(DecoderConfig::default().with_tal_mode(TalMode::Delimited));
/// let edf = reader.decode(Cursor::new(bytes))?;
/// assert_eq!(edf.records.len(), edf.header.num_data_records as usize);
/// # Ok::<(), edfsignals::EdfError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EdfReader {
    config: DecoderConfig,
}

impl EdfReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        EdfReader { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Opens and decodes the EDF+ file at `path`
    ///
    /// # Errors
    ///
    /// * `EdfError::FileNotFound` - File doesn't exist or can't be opened
    /// * `EdfError::TruncatedHeader` / `EdfError::MalformedHeaderField` - header is corrupt
    /// * `EdfError::TruncatedRecord` - data records are shorter than the header announces
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<EdfFile> {
        let file = File::open(&path)
            .map_err(|e| EdfError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;

        debug!("Decoding {}", path.as_ref().display());
        self.decode(BufReader::new(file))
    }

    /// Decodes an EDF+ stream positioned at its first header byte.
    pub fn decode<R: Read>(&self, mut input: R) -> Result<EdfFile> {
        let header = read_header(&mut input, &self.config)?;
        let records = read_records(&mut input, &header)?;

        Ok(EdfFile {
            header,
            records,
            annotation_label: self.config.annotation_label.clone(),
            tal_mode: self.config.tal_mode,
        })
    }
}

impl EdfFile {
    /// Decodes the file at `path` with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        EdfReader::new().open(path)
    }

    /// Decodes an in-memory or streamed source with the default configuration.
    pub fn from_reader<R: Read>(input: R) -> Result<Self> {
        EdfReader::new().decode(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EdfBuilder, TestSignalSpec};
    use std::io::Cursor;

    #[test]
    fn test_open_missing_file() {
        match EdfReader::new().open("definitely_missing_file.edf") {
            Err(EdfError::FileNotFound(msg)) => assert!(msg.contains("definitely_missing_file.edf")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_decode_keeps_config() {
        let bytes = EdfBuilder::new()
            .records(1, "1")
            .signal(TestSignalSpec::new("Marker", 4))
            .build();

        let config = DecoderConfig::default().with_annotation_label("Marker");
        let edf = EdfReader::with_config(config).decode(Cursor::new(bytes)).unwrap();
        assert_eq!(edf.annotation_label, "Marker");
        assert_eq!(edf.records.len(), 1);
    }

    #[test]
    fn test_truncated_records_yield_no_file() {
        let mut bytes = EdfBuilder::new()
            .records(3, "1")
            .signal(TestSignalSpec::new("EEG", 4))
            .build();
        bytes.truncate(bytes.len() - 8);

        let err = EdfFile::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            EdfError::TruncatedRecord {
                record_index: 2,
                signal_index: 0
            }
        ));
    }
}
