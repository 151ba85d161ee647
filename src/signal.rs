//! Time-addressable views over the signals of a decoded file.
//!
//! A view is just `(file, signal index)` plus values derived from the
//! header; it never copies samples until a window is requested.

use chrono::{Duration, NaiveDateTime};

use crate::annotation::AnnotationSignal;
use crate::error::{EdfError, RangeSide, Result};
use crate::types::{EdfFile, SignalDefinition};
use crate::utils::{duration_to_seconds, parse_decimal, seconds_to_duration};

/// Slack added before flooring a time-derived index, so that a time landing
/// exactly on a sample boundary is not pushed into the previous sample by
/// binary floating point (e.g. `0.3 / 0.1 == 2.9999999999999996`).
const INDEX_EPSILON: f64 = 1e-9;

/// Capability shared by every signal that yields physical samples over time:
/// raw numeric channels, derived views such as the bi-level projection, and
/// synthetic test signals.
pub trait DataSignal {
    fn label(&self) -> String;

    /// Date and time of the first sample.
    fn start_time(&self) -> NaiveDateTime;

    /// Date and time one sample period after the last sample.
    fn end_time(&self) -> NaiveDateTime;

    /// Header definition, `None` for derived or synthetic signals.
    fn definition(&self) -> Option<&SignalDefinition>;

    /// Time between two consecutive samples.
    fn sample_period(&self) -> Duration;

    /// Physical values of every sample in `[start, end)`, in chronological order.
    fn recording(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<f64>>;
}

/// Rejects windows that leave the recording or run backwards.
pub(crate) fn check_window(
    start: NaiveDateTime,
    end: NaiveDateTime,
    recording_start: NaiveDateTime,
    recording_end: NaiveDateTime,
) -> Result<()> {
    if start < recording_start {
        return Err(EdfError::OutOfRange {
            requested: start,
            bound: recording_start,
            side: RangeSide::BeforeRecording,
        });
    }
    if end > recording_end {
        return Err(EdfError::OutOfRange {
            requested: end,
            bound: recording_end,
            side: RangeSide::AfterRecording,
        });
    }
    if start > end {
        return Err(EdfError::InvalidRange { start, end });
    }
    Ok(())
}

/// Affine digital to physical transform: `physical = a * digital + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub a: f64,
    pub b: f64,
}

impl Calibration {
    /// Derives the transform from the min/max fields of a signal definition.
    ///
    /// # Errors
    ///
    /// * `EdfError::MalformedHeaderField` - a min/max field is not a decimal number
    /// * `EdfError::InvalidCalibration` - digital minimum equals digital maximum
    pub fn from_definition(definition: &SignalDefinition, signal_index: usize) -> Result<Self> {
        let field = |name: &'static str, value: &str| {
            parse_decimal(value).ok_or_else(|| EdfError::malformed(name, Some(signal_index), value))
        };

        let phys_min = field("physical_minimum", &definition.physical_minimum)?;
        let phys_max = field("physical_maximum", &definition.physical_maximum)?;
        let digi_min = field("digital_minimum", &definition.digital_minimum)?;
        let digi_max = field("digital_maximum", &definition.digital_maximum)?;

        Self::from_ranges(phys_min, phys_max, digi_min, digi_max)
            .ok_or(EdfError::InvalidCalibration { signal_index })
    }

    /// Returns `None` when the digital range is empty.
    pub fn from_ranges(phys_min: f64, phys_max: f64, digi_min: f64, digi_max: f64) -> Option<Self> {
        if digi_max == digi_min {
            return None;
        }
        let a = (phys_max - phys_min) / (digi_max - digi_min);
        let b = phys_min - a * digi_min;
        Some(Calibration { a, b })
    }

    pub fn to_physical(&self, digital: i16) -> f64 {
        self.a * digital as f64 + self.b
    }

    /// Inverse transform; the result is not rounded.
    pub fn to_digital(&self, physical: f64) -> f64 {
        (physical - self.b) / self.a
    }
}

/// A sample address inside the data record block.
///
/// `sample` may equal the signal's samples-per-record only for the
/// position one past the last sample of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SamplePosition {
    pub record: usize,
    pub sample: usize,
}

impl SamplePosition {
    /// Index of the sample counted from the start of the file.
    pub fn linear(&self, samples_per_record: usize) -> usize {
        self.record * samples_per_record + self.sample
    }
}

/// A numeric (non-annotation) signal with its calibration
///
/// # Examples
///
/// ```rust
/// use edfsignals::{DataSignal, EdfFile};
/// use std::io::Cursor;
///
/// # let bytes = edfsignals::testing::simple_test_bytes();
/// let edf = EdfFile::from_reader(Cursor::new(bytes))?;
/// let signal = edf.numeric_signal(0)?;
///
/// // Read the second half of the first data record
/// let half = signal.start_time() + chrono::Duration::milliseconds(500);
/// let one = signal.start_time() + chrono::Duration::seconds(1);
/// let values = signal.recording(half, one)?;
/// assert_eq!(values.len(), signal.samples_per_record() / 2);
/// # Ok::<(), edfsignals::EdfError>(())
/// ```
#[derive(Debug, Clone)]
pub struct NumericSignal<'a> {
    file: &'a EdfFile,
    index: usize,
    calibration: Calibration,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl<'a> NumericSignal<'a> {
    pub fn new(file: &'a EdfFile, index: usize) -> Result<Self> {
        let definition = file
            .header
            .signals
            .get(index)
            .ok_or(EdfError::InvalidSignalIndex(index))?;
        if file.is_annotation_label(&definition.label) {
            return Err(EdfError::UnsupportedSignalKind {
                label: definition.label.clone(),
                expected: "a numeric signal",
            });
        }

        let calibration = Calibration::from_definition(definition, index)?;

        Ok(NumericSignal {
            file,
            index,
            calibration,
            start: file.header.start_datetime(),
            end: file.header.end_datetime(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn file(&self) -> &'a EdfFile {
        self.file
    }

    pub fn label(&self) -> &str {
        &self.definition().label
    }

    pub fn definition(&self) -> &'a SignalDefinition {
        &self.file.header.signals[self.index]
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn samples_per_record(&self) -> usize {
        self.definition().samples_per_record as usize
    }

    /// Samples per second.
    pub fn sampling_frequency(&self) -> f64 {
        self.samples_per_record() as f64 / self.file.header.duration_data_records
    }

    fn sample_duration(&self) -> f64 {
        self.file.header.duration_data_records / self.samples_per_record() as f64
    }

    /// Seconds from the recording start.
    fn offset_of(&self, t: NaiveDateTime) -> f64 {
        duration_to_seconds(t - self.start)
    }

    /// Maps a time inside the recording onto the sample that covers it.
    ///
    /// The recording end maps to one past the last sample of the last record.
    pub fn sample_position(&self, t: NaiveDateTime) -> Result<SamplePosition> {
        check_window(t, t, self.start, self.end)?;
        Ok(self.locate(self.offset_of(t)))
    }

    fn locate(&self, offset: f64) -> SamplePosition {
        let record_duration = self.file.header.duration_data_records;
        let samples_per_record = self.samples_per_record();
        let num_records = self.file.records.len();

        if num_records == 0 || samples_per_record == 0 || record_duration <= 0.0 {
            return SamplePosition { record: 0, sample: 0 };
        }

        let mut record = (offset / record_duration + INDEX_EPSILON).floor().max(0.0) as usize;
        let within = offset - record as f64 * record_duration;
        let mut sample = (within / self.sample_duration() + INDEX_EPSILON).floor().max(0.0) as usize;

        if sample >= samples_per_record {
            record += 1;
            sample = 0;
        }
        // 结束时间正好等于记录末尾时，指向最后一个记录之后
        if record >= num_records {
            record = num_records - 1;
            sample = samples_per_record;
        }

        SamplePosition { record, sample }
    }

    /// Time of the sample at `position`.
    pub fn sample_time(&self, position: SamplePosition) -> NaiveDateTime {
        let seconds = position.record as f64 * self.file.header.duration_data_records
            + position.sample as f64 * self.sample_duration();
        self.start + seconds_to_duration(seconds)
    }

    /// Raw digital samples of `[start, end)`.
    ///
    /// # Errors
    ///
    /// * `EdfError::OutOfRange` - the window starts before or ends after the recording
    /// * `EdfError::InvalidRange` - `start` is after `end`
    pub fn digital_recording(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<i16>> {
        check_window(start, end, self.start, self.end)?;

        let samples_per_record = self.samples_per_record();
        if self.file.records.is_empty() || samples_per_record == 0 {
            return Ok(Vec::new());
        }

        let first = self.locate(self.offset_of(start));
        let last = self.locate(self.offset_of(end));
        let count = last
            .linear(samples_per_record)
            .saturating_sub(first.linear(samples_per_record));

        let mut result = Vec::with_capacity(count);
        for record in first.record..=last.record {
            let from = if record == first.record { first.sample } else { 0 };
            let to = if record == last.record { last.sample } else { samples_per_record };
            if from >= to {
                continue;
            }
            let samples = self.file.records[record].samples(self.index);
            if let Some(window) = samples.get(from..to) {
                result.extend_from_slice(window);
            }
        }

        Ok(result)
    }
}

impl DataSignal for NumericSignal<'_> {
    fn label(&self) -> String {
        self.definition().label.clone()
    }

    fn start_time(&self) -> NaiveDateTime {
        self.start
    }

    fn end_time(&self) -> NaiveDateTime {
        self.end
    }

    fn definition(&self) -> Option<&SignalDefinition> {
        Some(NumericSignal::definition(self))
    }

    fn sample_period(&self) -> Duration {
        if self.samples_per_record() == 0 {
            return Duration::zero();
        }
        seconds_to_duration(self.sample_duration())
    }

    fn recording(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<f64>> {
        let digital = self.digital_recording(start, end)?;
        Ok(digital
            .into_iter()
            .map(|d| self.calibration.to_physical(d))
            .collect())
    }
}

/// Every signal of a file is either numeric or an annotation channel.
#[derive(Debug, Clone)]
pub enum Signal<'a> {
    Numeric(NumericSignal<'a>),
    Annotation(AnnotationSignal<'a>),
}

impl<'a> Signal<'a> {
    pub fn label(&self) -> &str {
        &self.definition().label
    }

    pub fn index(&self) -> usize {
        match self {
            Signal::Numeric(s) => s.index(),
            Signal::Annotation(s) => s.index(),
        }
    }

    pub fn definition(&self) -> &'a SignalDefinition {
        match self {
            Signal::Numeric(s) => s.definition(),
            Signal::Annotation(s) => s.definition(),
        }
    }

    pub fn start_time(&self) -> NaiveDateTime {
        match self {
            Signal::Numeric(s) => s.start_time(),
            Signal::Annotation(s) => s.start_time(),
        }
    }

    pub fn end_time(&self) -> NaiveDateTime {
        match self {
            Signal::Numeric(s) => s.end_time(),
            Signal::Annotation(s) => s.end_time(),
        }
    }

    pub fn is_annotation(&self) -> bool {
        matches!(self, Signal::Annotation(_))
    }

    pub fn as_numeric(&self) -> Option<&NumericSignal<'a>> {
        match self {
            Signal::Numeric(s) => Some(s),
            Signal::Annotation(_) => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationSignal<'a>> {
        match self {
            Signal::Annotation(s) => Some(s),
            Signal::Numeric(_) => None,
        }
    }

    pub fn into_numeric(self) -> Result<NumericSignal<'a>> {
        match self {
            Signal::Numeric(s) => Ok(s),
            Signal::Annotation(s) => Err(EdfError::UnsupportedSignalKind {
                label: s.definition().label.clone(),
                expected: "a numeric signal",
            }),
        }
    }

    pub fn into_annotation(self) -> Result<AnnotationSignal<'a>> {
        match self {
            Signal::Annotation(s) => Ok(s),
            Signal::Numeric(s) => Err(EdfError::UnsupportedSignalKind {
                label: s.definition().label.clone(),
                expected: "an annotation signal",
            }),
        }
    }
}

impl EdfFile {
    pub(crate) fn is_annotation_label(&self, label: &str) -> bool {
        label == self.annotation_label
    }

    /// Labels of all signals, in header order.
    pub fn labels(&self) -> Vec<&str> {
        self.header.signals.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn is_annotation_channel(&self, index: usize) -> bool {
        self.header
            .signals
            .get(index)
            .map_or(false, |s| self.is_annotation_label(&s.label))
    }

    /// Builds the view for signal `index`, decoding annotations if it is an
    /// annotation channel.
    pub fn signal(&self, index: usize) -> Result<Signal<'_>> {
        if index >= self.header.signals.len() {
            return Err(EdfError::InvalidSignalIndex(index));
        }
        if self.is_annotation_channel(index) {
            Ok(Signal::Annotation(AnnotationSignal::new(self, index)?))
        } else {
            Ok(Signal::Numeric(NumericSignal::new(self, index)?))
        }
    }

    pub fn signals(&self) -> Result<Vec<Signal<'_>>> {
        (0..self.header.signals.len()).map(|i| self.signal(i)).collect()
    }

    /// First signal carrying `label`, if any.
    pub fn signal_by_label(&self, label: &str) -> Result<Option<Signal<'_>>> {
        match self.header.signals.iter().position(|s| s.label == label) {
            Some(index) => self.signal(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn numeric_signal(&self, index: usize) -> Result<NumericSignal<'_>> {
        NumericSignal::new(self, index)
    }

    /// Every annotation channel, each decoded independently.
    pub fn annotation_signals(&self) -> Result<Vec<AnnotationSignal<'_>>> {
        (0..self.header.signals.len())
            .filter(|&i| self.is_annotation_channel(i))
            .map(|i| AnnotationSignal::new(self, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EdfBuilder, TestSignalSpec};
    use std::io::Cursor;

    /// 2 records of 1s, one signal with 4 samples per record, full 16-bit range
    fn scenario_file() -> EdfFile {
        let bytes = EdfBuilder::new()
            .records(2, "1")
            .signal(
                TestSignalSpec::new("Scenario", 4)
                    .physical("-1", "1")
                    .digital("-32768", "32767"),
            )
            .record(vec![vec![0, 1, 2, 3]])
            .record(vec![vec![4, 5, 6, 7]])
            .build();
        EdfFile::from_reader(Cursor::new(bytes)).unwrap()
    }

    /// 3 records of 0.5s, 5 samples per record, digital value == linear index
    fn counting_file() -> EdfFile {
        let mut builder = EdfBuilder::new()
            .records(3, "0.5")
            .signal(TestSignalSpec::new("Count", 5).physical("0", "100").digital("0", "100"));
        for r in 0..3 {
            builder = builder.record(vec![(0..5).map(|s| (r * 5 + s) as i16).collect()]);
        }
        EdfFile::from_reader(Cursor::new(builder.build())).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    #[test]
    fn test_calibration_endpoints() {
        let cal = Calibration::from_ranges(-1.0, 1.0, -32768.0, 32767.0).unwrap();
        assert!((cal.to_physical(-32768) - -1.0).abs() < 1e-12);
        assert!((cal.to_physical(32767) - 1.0).abs() < 1e-12);
        assert!((cal.to_digital(1.0) - 32767.0).abs() < 1e-6);

        let cal = Calibration::from_ranges(-200.0, 200.0, -2048.0, 2047.0).unwrap();
        assert!((cal.to_physical(-2048) - -200.0).abs() < 1e-9);
        assert!((cal.to_physical(2047) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_calibration_rejects_empty_digital_range() {
        let definition = SignalDefinition {
            label: "Flat".to_string(),
            physical_minimum: "0".to_string(),
            physical_maximum: "1".to_string(),
            digital_minimum: "5".to_string(),
            digital_maximum: "5".to_string(),
            samples_per_record: 1,
            ..Default::default()
        };
        assert!(matches!(
            Calibration::from_definition(&definition, 3),
            Err(EdfError::InvalidCalibration { signal_index: 3 })
        ));

        let definition = SignalDefinition {
            physical_minimum: "low".to_string(),
            ..definition
        };
        assert!(matches!(
            Calibration::from_definition(&definition, 3),
            Err(EdfError::MalformedHeaderField {
                field: "physical_minimum",
                signal_index: Some(3),
                ..
            })
        ));
    }

    #[test]
    fn test_full_window_returns_every_sample() {
        let edf = scenario_file();
        let signal = edf.numeric_signal(0).unwrap();

        let digital = signal
            .digital_recording(signal.start_time(), signal.end_time())
            .unwrap();
        assert_eq!(digital, vec![0, 1, 2, 3, 4, 5, 6, 7]);

        let physical = signal.recording(signal.start_time(), signal.end_time()).unwrap();
        assert_eq!(physical.len(), 8);
    }

    #[test]
    fn test_half_record_window() {
        let edf = scenario_file();
        let signal = edf.numeric_signal(0).unwrap();
        let start = signal.start_time();

        let digital = signal
            .digital_recording(start + ms(500), start + ms(1000))
            .unwrap();
        assert_eq!(digital, vec![2, 3]);
    }

    #[test]
    fn test_window_across_records() {
        let edf = counting_file();
        let signal = edf.numeric_signal(0).unwrap();
        let start = signal.start_time();

        // 每个样本 0.1s：0.3s..1.2s 对应线性索引 3..12
        let digital = signal
            .digital_recording(start + ms(300), start + ms(1200))
            .unwrap();
        assert_eq!(digital, (3..12).collect::<Vec<i16>>());

        // 同一记录内不重复计数
        let digital = signal
            .digital_recording(start + ms(600), start + ms(800))
            .unwrap();
        assert_eq!(digital, vec![6, 7]);

        // 空窗口
        let digital = signal
            .digital_recording(start + ms(700), start + ms(700))
            .unwrap();
        assert!(digital.is_empty());
    }

    #[test]
    fn test_window_length_matches_duration() {
        let edf = counting_file();
        let signal = edf.numeric_signal(0).unwrap();
        let start = signal.start_time();
        let period = 0.1;

        for (s, e) in [(0, 1500), (50, 1450), (120, 990), (499, 501), (1000, 1500)] {
            let values = signal.recording(start + ms(s), start + ms(e)).unwrap();
            let expected = ((e - s) as f64 / 1000.0 / period).round() as i64;
            assert!(
                (values.len() as i64 - expected).abs() <= 1,
                "window {}..{}: {} samples, expected about {}",
                s,
                e,
                values.len(),
                expected
            );
        }
    }

    #[test]
    fn test_physical_values_are_calibrated() {
        let edf = counting_file();
        let signal = edf.numeric_signal(0).unwrap();
        let values = signal.recording(signal.start_time(), signal.end_time()).unwrap();
        assert_eq!(values.len(), 15);
        for (i, v) in values.iter().enumerate() {
            assert!((v - i as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_out_of_range_windows() {
        let edf = scenario_file();
        let signal = edf.numeric_signal(0).unwrap();
        let start = signal.start_time();
        let end = signal.end_time();

        let err = signal
            .recording(start, end + Duration::nanoseconds(1))
            .unwrap_err();
        assert!(matches!(
            err,
            EdfError::OutOfRange {
                side: RangeSide::AfterRecording,
                ..
            }
        ));

        let err = signal
            .recording(start - Duration::nanoseconds(1), end)
            .unwrap_err();
        assert!(matches!(
            err,
            EdfError::OutOfRange {
                side: RangeSide::BeforeRecording,
                ..
            }
        ));

        let err = signal.recording(start + ms(600), start + ms(200)).unwrap_err();
        assert!(matches!(err, EdfError::InvalidRange { .. }));

        // 查询错误不影响后续查询
        assert_eq!(signal.recording(start, end).unwrap().len(), 8);
    }

    #[test]
    fn test_sample_position_round_trip() {
        let edf = counting_file();
        let signal = edf.numeric_signal(0).unwrap();
        let period = signal.sample_period();
        assert_eq!(period, ms(100));

        for linear in 0..15 {
            let position = SamplePosition {
                record: linear / 5,
                sample: linear % 5,
            };
            let t = signal.sample_time(position);
            assert_eq!(signal.sample_position(t).unwrap(), position);
        }

        // 任意时间映射后回到同一采样周期内
        let start = signal.start_time();
        for offset in [0, 37, 250, 499, 501, 1234, 1499] {
            let t = start + ms(offset);
            let back = signal.sample_time(signal.sample_position(t).unwrap());
            assert!(back <= t && t - back < period);
        }

        let end = signal.sample_position(signal.end_time()).unwrap();
        assert_eq!(end, SamplePosition { record: 2, sample: 5 });
    }

    #[test]
    fn test_sampling_frequency() {
        let edf = counting_file();
        let signal = edf.numeric_signal(0).unwrap();
        assert_eq!(signal.sampling_frequency(), 10.0);
        assert_eq!(signal.end_time() - signal.start_time(), ms(1500));
    }

    #[test]
    fn test_signal_dispatch() {
        let bytes = EdfBuilder::new()
            .records(1, "1")
            .signal(TestSignalSpec::new("EEG", 4))
            .signal(TestSignalSpec::annotations(8))
            .build();
        let edf = EdfFile::from_reader(Cursor::new(bytes)).unwrap();

        assert_eq!(edf.labels(), vec!["EEG", "EDF Annotations"]);
        assert!(!edf.is_annotation_channel(0));
        assert!(edf.is_annotation_channel(1));

        let signals = edf.signals().unwrap();
        assert!(signals[0].as_numeric().is_some());
        assert!(signals[1].is_annotation());
        assert_eq!(signals[1].label(), "EDF Annotations");

        assert!(matches!(
            edf.numeric_signal(1),
            Err(EdfError::UnsupportedSignalKind { .. })
        ));
        assert!(matches!(edf.signal(2), Err(EdfError::InvalidSignalIndex(2))));
        assert!(edf.signal_by_label("EEG").unwrap().is_some());
        assert!(edf.signal_by_label("ECG").unwrap().is_none());
        assert_eq!(edf.annotation_signals().unwrap().len(), 1);

        let annotation = edf.signal(1).unwrap();
        assert!(matches!(
            annotation.into_numeric(),
            Err(EdfError::UnsupportedSignalKind { .. })
        ));
    }
}
