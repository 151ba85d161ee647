//! EDF+ annotation channel decoding.
//!
//! An annotation channel stores text, not samples: every 16-bit sample holds
//! two bytes (low byte first) of a stream of Time-stamped Annotation Lists.
//! Each TAL looks like
//!
//! ```text
//! +onset[\x15duration]\x14text\x14[text\x14...]\x00
//! ```
//!
//! and the remainder of the record is padded with `\x00`.

use chrono::NaiveDateTime;
use log::debug;

use crate::config::TalMode;
use crate::error::{EdfError, Result};
use crate::signal::check_window;
use crate::types::{EdfFile, SignalDefinition};
use crate::utils::{parse_decimal, seconds_to_duration};

/// Terminates a TAL
pub const TAL_END: u8 = 0x00;
/// Separates the timestamp and the annotation texts of a TAL
pub const TAL_FIELD_SEPARATOR: u8 = 0x14;
/// Separates onset from duration inside a timestamp
pub const TAL_DURATION_SEPARATOR: u8 = 0x15;

/// One or more annotation texts sharing an onset and duration.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedAnnotation {
    base: NaiveDateTime,
    onset: f64,
    duration: f64,
    annotations: Vec<String>,
}

impl TimestampedAnnotation {
    pub fn new(base: NaiveDateTime, onset: f64, duration: f64, annotations: Vec<String>) -> Self {
        TimestampedAnnotation {
            base,
            onset,
            duration,
            annotations,
        }
    }

    /// `base + onset`
    pub fn time(&self) -> NaiveDateTime {
        self.base + seconds_to_duration(self.onset)
    }

    /// `time() + duration`
    pub fn end(&self) -> NaiveDateTime {
        self.time() + seconds_to_duration(self.duration)
    }

    /// Seconds after the recording start.
    pub fn onset(&self) -> f64 {
        self.onset
    }

    /// Seconds, 0 when the TAL carries no duration.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }
}

/// What one data record of an annotation channel decodes to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordAnnotations {
    /// Onset of the record's first TAL (its time-keeping TAL).
    pub record_onset: Option<f64>,
    pub annotations: Vec<TimestampedAnnotation>,
}

/// Reassembles the byte stream carried by 16-bit samples.
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Parses `+onset` or `+onset\x15duration`.
///
/// Onset and duration must be non-negative plain decimals. With
/// `require_sign` the onset must carry its leading `+`/`-` as EDF+ mandates.
fn parse_timestamp(field: &[u8], require_sign: bool) -> Option<(f64, f64)> {
    let text = std::str::from_utf8(field).ok()?;
    let mut parts = text.splitn(2, TAL_DURATION_SEPARATOR as char);

    let onset_str = parts.next()?;
    if require_sign && !onset_str.starts_with(&['+', '-'][..]) {
        return None;
    }
    let onset = parse_decimal(onset_str).filter(|o| *o >= 0.0)?;

    let duration = match parts.next() {
        Some(d) => parse_decimal(d).filter(|d| *d >= 0.0)?,
        None => 0.0,
    };

    Some((onset, duration))
}

fn decode_text(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

/// Decodes one record by scanning the `0x00` / `0x14` / `0x15` delimiters.
///
/// TALs without any text (time-keeping markers) produce no annotation.
/// Empty text fields are dropped; a text field holding `0x15` is malformed.
pub fn decode_tal_record(
    bytes: &[u8],
    record_index: usize,
    base: NaiveDateTime,
) -> Result<RecordAnnotations> {
    let mut decoded = RecordAnnotations::default();

    for tal in bytes.split(|b| *b == TAL_END).filter(|t| !t.is_empty()) {
        let mut fields = tal.split(|b| *b == TAL_FIELD_SEPARATOR);
        let timestamp = fields.next().unwrap_or(&[]);
        let (onset, duration) = parse_timestamp(timestamp, true)
            .ok_or(EdfError::MalformedAnnotation { record_index })?;

        if decoded.record_onset.is_none() {
            decoded.record_onset = Some(onset);
        }

        let texts: Vec<&[u8]> = fields.filter(|f| !f.is_empty()).collect();
        if texts.iter().any(|t| t.contains(&TAL_DURATION_SEPARATOR)) {
            return Err(EdfError::MalformedAnnotation { record_index });
        }
        let texts: Vec<String> = texts.into_iter().map(decode_text).collect();
        if !texts.is_empty() {
            decoded
                .annotations
                .push(TimestampedAnnotation::new(base, onset, duration, texts));
        }
    }

    Ok(decoded)
}

/// Decodes one record the lenient way: zero bytes are ignored, the record is
/// split on `0x14`, and a field at position 0 or 1 that parses as a timestamp
/// dates the single annotation built from the remaining fields. Stray `0x15`
/// bytes are removed from the texts.
pub fn decode_legacy_record(bytes: &[u8], base: NaiveDateTime) -> RecordAnnotations {
    let stripped: Vec<u8> = bytes.iter().copied().filter(|b| *b != TAL_END).collect();
    let fields: Vec<&[u8]> = stripped
        .split(|b| *b == TAL_FIELD_SEPARATOR)
        .filter(|f| !f.is_empty())
        .collect();

    let mut timestamp = None;
    let mut texts = Vec::new();
    for (i, field) in fields.into_iter().enumerate() {
        // 实际文件中时间戳可能出现在第一个或第二个字段
        if i < 2 {
            if let Some(ts) = parse_timestamp(field, false) {
                timestamp = Some(ts);
                continue;
            }
        }
        let text: Vec<u8> = field
            .iter()
            .copied()
            .filter(|b| *b != TAL_DURATION_SEPARATOR)
            .collect();
        if !text.is_empty() {
            texts.push(decode_text(&text));
        }
    }

    let (onset, duration) = timestamp.unwrap_or((0.0, 0.0));
    let mut decoded = RecordAnnotations {
        record_onset: timestamp.map(|(onset, _)| onset),
        annotations: Vec::new(),
    };
    if !texts.is_empty() {
        decoded
            .annotations
            .push(TimestampedAnnotation::new(base, onset, duration, texts));
    }
    decoded
}

/// An annotation channel with its TALs decoded for every data record
///
/// # Examples
///
/// ```rust
/// use edfsignals::EdfFile;
/// use std::io::Cursor;
///
/// # let bytes = edfsignals::testing::annotated_test_bytes();
/// let edf = EdfFile::from_reader(Cursor::new(bytes))?;
///
/// for channel in edf.annotation_signals()? {
///     let all = channel.annotations(channel.start_time(), channel.end_time())?;
///     for annotation in all {
///         println!("{} {:?}", annotation.time(), annotation.annotations());
///     }
/// }
/// # Ok::<(), edfsignals::EdfError>(())
/// ```
#[derive(Debug, Clone)]
pub struct AnnotationSignal<'a> {
    file: &'a EdfFile,
    index: usize,
    annotations: Vec<TimestampedAnnotation>,
    record_onsets: Vec<Option<f64>>,
}

impl<'a> AnnotationSignal<'a> {
    /// Decodes every record of annotation channel `index`.
    ///
    /// # Errors
    ///
    /// * `EdfError::InvalidSignalIndex` - no such signal
    /// * `EdfError::UnsupportedSignalKind` - the signal is not an annotation channel
    /// * `EdfError::MalformedAnnotation` - a TAL timestamp is not a valid decimal
    pub fn new(file: &'a EdfFile, index: usize) -> Result<Self> {
        let definition = file
            .header
            .signals
            .get(index)
            .ok_or(EdfError::InvalidSignalIndex(index))?;
        if !file.is_annotation_label(&definition.label) {
            return Err(EdfError::UnsupportedSignalKind {
                label: definition.label.clone(),
                expected: "an annotation signal",
            });
        }

        let base = file.header.start_datetime();
        let mut annotations = Vec::new();
        let mut record_onsets = Vec::with_capacity(file.records.len());

        for (record_index, record) in file.records.iter().enumerate() {
            let bytes = samples_to_bytes(record.samples(index));
            let decoded = match file.tal_mode {
                TalMode::Delimited => decode_tal_record(&bytes, record_index, base)?,
                TalMode::Legacy => decode_legacy_record(&bytes, base),
            };
            record_onsets.push(decoded.record_onset);
            annotations.extend(decoded.annotations);
        }

        debug!(
            "Annotation channel {}: {} annotations in {} records",
            index,
            annotations.len(),
            record_onsets.len()
        );

        Ok(AnnotationSignal {
            file,
            index,
            annotations,
            record_onsets,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.definition().label
    }

    pub fn definition(&self) -> &'a SignalDefinition {
        &self.file.header.signals[self.index]
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.file.header.start_datetime()
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.file.header.end_datetime()
    }

    /// Every decoded annotation, in record order.
    pub fn all(&self) -> &[TimestampedAnnotation] {
        &self.annotations
    }

    /// Onset of each record's time-keeping TAL, `None` for records without TALs.
    pub fn record_onsets(&self) -> &[Option<f64>] {
        &self.record_onsets
    }

    /// Annotations whose `end()` lies in `[start, end]`, in original order.
    ///
    /// Selection is by end time, so an annotation that started inside the
    /// window but ends after it is not returned.
    ///
    /// # Errors
    ///
    /// * `EdfError::InvalidRange` - the window leaves the recording or `start > end`
    pub fn annotations(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<&TimestampedAnnotation>> {
        check_window(start, end, self.start_time(), self.end_time())
            .map_err(|_| EdfError::InvalidRange { start, end })?;

        Ok(self
            .annotations
            .iter()
            .filter(|a| {
                let at = a.end();
                at >= start && at <= end
            })
            .collect())
    }
}
