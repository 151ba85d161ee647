// Internal utilities for tests and documentation examples.
// Builds EDF+ byte images in memory and provides a synthetic signal.

use std::path::Path;

use chrono::{Duration, NaiveDateTime};

use crate::error::Result;
use crate::header::HEADER_BLOCK_SIZE;
use crate::signal::{check_window, DataSignal};
use crate::types::SignalDefinition;
use crate::utils::{duration_to_seconds, seconds_to_duration};
use crate::EDF_ANNOTATION_LABEL;

/// Left-aligns `value` in a space padded field of `width` bytes.
fn push_field(out: &mut Vec<u8>, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    out.extend_from_slice(&bytes[..len]);
    out.resize(out.len() + width - len, b' ');
}

/// Packs annotation bytes into 16-bit samples, zero padded to `samples_per_record`.
pub fn tal_samples(bytes: &[u8], samples_per_record: usize) -> Vec<i16> {
    let mut padded = bytes.to_vec();
    padded.resize(samples_per_record * 2, 0);
    padded
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Header values of one synthetic signal
#[derive(Debug, Clone)]
pub struct TestSignalSpec {
    pub label: String,
    pub transducer: String,
    pub unit: String,
    pub physical_min: String,
    pub physical_max: String,
    pub digital_min: String,
    pub digital_max: String,
    pub prefilter: String,
    pub samples_per_record: usize,
}

impl TestSignalSpec {
    pub fn new(label: &str, samples_per_record: usize) -> Self {
        TestSignalSpec {
            label: label.to_string(),
            transducer: "AgAgCl electrodes".to_string(),
            unit: "uV".to_string(),
            physical_min: "-100".to_string(),
            physical_max: "100".to_string(),
            digital_min: "-32768".to_string(),
            digital_max: "32767".to_string(),
            prefilter: "HP:0.1Hz LP:70Hz".to_string(),
            samples_per_record,
        }
    }

    /// An `EDF Annotations` channel carrying `samples_per_record * 2` bytes per record.
    pub fn annotations(samples_per_record: usize) -> Self {
        TestSignalSpec {
            transducer: String::new(),
            unit: String::new(),
            physical_min: "-1".to_string(),
            physical_max: "1".to_string(),
            prefilter: String::new(),
            ..Self::new(EDF_ANNOTATION_LABEL, samples_per_record)
        }
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn physical(mut self, min: &str, max: &str) -> Self {
        self.physical_min = min.to_string();
        self.physical_max = max.to_string();
        self
    }

    pub fn digital(mut self, min: &str, max: &str) -> Self {
        self.digital_min = min.to_string();
        self.digital_max = max.to_string();
        self
    }
}

/// Builds the bytes of an EDF+ file
///
/// Records without explicit samples are written as zeros; sample vectors are
/// padded or cut to each signal's samples per record.
#[derive(Debug, Clone)]
pub struct EdfBuilder {
    pub version: String,
    pub patient: String,
    pub recording: String,
    pub start_date: String,
    pub start_time: String,
    pub reserved: String,
    pub num_records: u32,
    pub record_duration: String,
    pub signals: Vec<TestSignalSpec>,
    pub records: Vec<Vec<Vec<i16>>>,
}

impl Default for EdfBuilder {
    fn default() -> Self {
        EdfBuilder {
            version: "0".to_string(),
            patient: "P001 M 01-JAN-1990 Test_Patient".to_string(),
            recording: "Startdate 01-JAN-2024 R001 Tech Amp01".to_string(),
            start_date: "01.01.24".to_string(),
            start_time: "08.00.00".to_string(),
            reserved: "EDF+C".to_string(),
            num_records: 1,
            record_duration: "1".to_string(),
            signals: Vec::new(),
            records: Vec::new(),
        }
    }
}

impl EdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, date: &str, time: &str) -> Self {
        self.start_date = date.to_string();
        self.start_time = time.to_string();
        self
    }

    pub fn patient(mut self, patient: &str) -> Self {
        self.patient = patient.to_string();
        self
    }

    pub fn recording(mut self, recording: &str) -> Self {
        self.recording = recording.to_string();
        self
    }

    pub fn reserved(mut self, reserved: &str) -> Self {
        self.reserved = reserved.to_string();
        self
    }

    /// Number of data records and the duration field, written verbatim.
    pub fn records(mut self, count: u32, duration: &str) -> Self {
        self.num_records = count;
        self.record_duration = duration.to_string();
        self
    }

    pub fn signal(mut self, spec: TestSignalSpec) -> Self {
        self.signals.push(spec);
        self
    }

    /// Samples of the next data record, one vector per signal.
    pub fn record(mut self, samples: Vec<Vec<i16>>) -> Self {
        self.records.push(samples);
        self
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        let n = self.signals.len();
        let mut out = Vec::with_capacity(HEADER_BLOCK_SIZE * (n + 1));

        push_field(&mut out, &self.version, 8);
        push_field(&mut out, &self.patient, 80);
        push_field(&mut out, &self.recording, 80);
        push_field(&mut out, &self.start_date, 8);
        push_field(&mut out, &self.start_time, 8);
        push_field(&mut out, &(HEADER_BLOCK_SIZE * (n + 1)).to_string(), 8);
        push_field(&mut out, &self.reserved, 44);
        push_field(&mut out, &self.num_records.to_string(), 8);
        push_field(&mut out, &self.record_duration, 8);
        push_field(&mut out, &n.to_string(), 4);

        let columns: [(usize, fn(&TestSignalSpec) -> String); 10] = [
            (16, |s| s.label.clone()),
            (80, |s| s.transducer.clone()),
            (8, |s| s.unit.clone()),
            (8, |s| s.physical_min.clone()),
            (8, |s| s.physical_max.clone()),
            (8, |s| s.digital_min.clone()),
            (8, |s| s.digital_max.clone()),
            (80, |s| s.prefilter.clone()),
            (8, |s| s.samples_per_record.to_string()),
            (32, |_| String::new()),
        ];
        for (width, value) in columns {
            for spec in &self.signals {
                push_field(&mut out, &value(spec), width);
            }
        }

        out
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header_bytes();

        for r in 0..self.num_records as usize {
            for (s, spec) in self.signals.iter().enumerate() {
                let mut samples = self
                    .records
                    .get(r)
                    .and_then(|record| record.get(s))
                    .cloned()
                    .unwrap_or_default();
                samples.resize(spec.samples_per_record, 0);
                for sample in samples {
                    out.extend_from_slice(&sample.to_le_bytes());
                }
            }
        }

        out
    }
}

/// `span` divided into `count` equal periods.
fn even_period(span: Duration, count: usize) -> Duration {
    seconds_to_duration(duration_to_seconds(span) / count as f64)
}

/// A signal over an in-memory vector, the samples spread evenly over `[start, end)`.
#[derive(Debug, Clone)]
pub struct TestingSignal {
    start: NaiveDateTime,
    end: NaiveDateTime,
    values: Vec<f64>,
}

impl TestingSignal {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, values: Vec<f64>) -> Self {
        TestingSignal { start, end, values }
    }

    fn index_of(&self, t: NaiveDateTime) -> usize {
        let period = duration_to_seconds(self.sample_period());
        if period <= 0.0 {
            return 0;
        }
        let index = (duration_to_seconds(t - self.start) / period + 1e-9).floor() as usize;
        index.min(self.values.len())
    }
}

impl DataSignal for TestingSignal {
    fn label(&self) -> String {
        "Testing signal".to_string()
    }

    fn start_time(&self) -> NaiveDateTime {
        self.start
    }

    fn end_time(&self) -> NaiveDateTime {
        self.end
    }

    fn definition(&self) -> Option<&SignalDefinition> {
        None
    }

    fn sample_period(&self) -> Duration {
        if self.values.is_empty() {
            return Duration::zero();
        }
        even_period(self.end - self.start, self.values.len())
    }

    fn recording(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<f64>> {
        check_window(start, end, self.start, self.end)?;
        let begin = self.index_of(start);
        let finish = self.index_of(end).max(begin);
        Ok(self.values[begin..finish].to_vec())
    }
}

/// One EEG signal, 2 records of 1s at 256 samples per record.
pub fn simple_test_bytes() -> Vec<u8> {
    let samples: Vec<i16> = (0..512)
        .map(|i| {
            let t = i as f64 / 256.0;
            (8000.0 * (2.0 * std::f64::consts::PI * 10.0 * t).sin()) as i16
        })
        .collect();

    EdfBuilder::new()
        .records(2, "1")
        .signal(TestSignalSpec::new("EEG Fp1", 256).physical("-200", "200"))
        .record(vec![samples[..256].to_vec()])
        .record(vec![samples[256..].to_vec()])
        .build()
}

/// One EEG signal plus an annotation channel, 3 records of 1s.
pub fn annotated_test_bytes() -> Vec<u8> {
    let tals: [&[u8]; 3] = [
        b"+0\x14\x14\x00+0.5\x14Recording start\x14\x00",
        b"+1\x14\x14\x00+1.2\x150.5\x14Spike\x14\x00",
        b"+2\x14\x14\x00",
    ];

    let mut builder = EdfBuilder::new()
        .records(3, "1")
        .signal(TestSignalSpec::new("EEG Fp1", 8))
        .signal(TestSignalSpec::annotations(30));
    for (r, tal) in tals.iter().enumerate() {
        let eeg = (0..8).map(|i| (r * 8 + i) as i16 * 100).collect();
        builder = builder.record(vec![eeg, tal_samples(tal, 30)]);
    }
    builder.build()
}

/// Writes [`simple_test_bytes`] to `path`.
pub fn create_simple_test_file<P: AsRef<Path>>(path: P) -> Result<()> {
    std::fs::write(path, simple_test_bytes())?;
    Ok(())
}
