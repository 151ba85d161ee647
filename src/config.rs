//! Decoder configuration.

use crate::{EDF_ANNOTATION_LABEL, EDFLIB_MAXSIGNALS};

/// How the byte stream of an annotation channel is split into
/// Time-stamped Annotation Lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TalMode {
    /// Every TAL is terminated by `0x00`; inside a TAL the first `0x14`
    /// separated field is the `+onset[\x15duration]` timestamp.
    #[default]
    Delimited,
    /// Zero bytes are dropped, the record is split on `0x14` and a field at
    /// position 0 or 1 that parses as a timestamp becomes the timestamp of
    /// the single annotation produced for that record.
    Legacy,
}

/// Options controlling how an EDF+ byte stream is decoded.
///
/// # Examples
///
/// ```rust
/// use edfsignals::{DecoderConfig, TalMode};
///
/// let config = DecoderConfig::default()
///     .with_max_signals(64)
///     .with_tal_mode(TalMode::Legacy);
///
/// assert_eq!(config.max_signals, 64);
/// assert_eq!(config.annotation_label, "EDF Annotations");
/// assert!(!config.strict_header_size);
/// ```
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Upper bound accepted for the `num_signals` header field.
    pub max_signals: usize,
    /// Label that marks a signal as an annotation channel.
    pub annotation_label: String,
    pub tal_mode: TalMode,
    /// Reject headers whose declared byte size is not `256 * (num_signals + 1)`.
    pub strict_header_size: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            max_signals: EDFLIB_MAXSIGNALS,
            annotation_label: EDF_ANNOTATION_LABEL.to_string(),
            tal_mode: TalMode::default(),
            strict_header_size: false,
        }
    }
}

impl DecoderConfig {
    pub fn with_max_signals(mut self, max_signals: usize) -> Self {
        self.max_signals = max_signals;
        self
    }

    pub fn with_annotation_label(mut self, label: &str) -> Self {
        self.annotation_label = label.to_string();
        self
    }

    pub fn with_tal_mode(mut self, tal_mode: TalMode) -> Self {
        self.tal_mode = tal_mode;
        self
    }

    pub fn with_strict_header_size(mut self, strict: bool) -> Self {
        self.strict_header_size = strict;
        self
    }
}
