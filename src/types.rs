use chrono::{Duration, NaiveDateTime};

use crate::config::TalMode;
use crate::utils::seconds_to_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Plain EDF, no `EDF+` marker in the reserved field.
    Edf,
    EdfPlusContinuous,
    EdfPlusDiscontinuous,
}

/// One entry of the per-signal definition table.
///
/// Calibration fields are kept as the decimal text found in the header;
/// they are parsed when a signal view is built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalDefinition {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_minimum: String,
    pub physical_maximum: String,
    pub digital_minimum: String,
    pub digital_maximum: String,
    pub prefiltering: String,
    pub samples_per_record: u32,
    pub reserved: String,
}

/// EDF+ patient identification subfields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatientInfo {
    pub code: String,
    pub sex: String,
    pub birthdate: String,
    pub name: String,
    pub additional: String,
}

/// EDF+ recording identification subfields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordingInfo {
    pub admin_code: String,
    pub technician: String,
    pub equipment: String,
    pub additional: String,
}

#[derive(Debug, Clone)]
pub struct Header {
    pub version: String,
    pub patient_id: String,
    pub recording_id: String,
    /// Raw `dd.mm.yy` field
    pub start_date: String,
    /// Raw `hh.mm.ss` field
    pub start_time: String,
    pub header_byte_size: u32,
    pub reserved: String,
    pub num_data_records: u32,
    /// Seconds spanned by one data record
    pub duration_data_records: f64,
    pub num_signals: u32,
    pub signals: Vec<SignalDefinition>,

    // start_date + start_time，解码时合并
    pub(crate) start: NaiveDateTime,
}

impl Header {
    /// Date and time of the first sample of the recording.
    pub fn start_datetime(&self) -> NaiveDateTime {
        self.start
    }

    /// Start plus `num_data_records * duration_data_records`.
    pub fn end_datetime(&self) -> NaiveDateTime {
        self.start + self.recording_duration()
    }

    pub fn record_duration(&self) -> Duration {
        seconds_to_duration(self.duration_data_records)
    }

    /// Total time covered by the data records.
    pub fn recording_duration(&self) -> Duration {
        seconds_to_duration(self.num_data_records as f64 * self.duration_data_records)
    }

    /// Classifies the file from the `EDF+C` / `EDF+D` marker of the reserved field.
    pub fn file_kind(&self) -> FileKind {
        if self.reserved.starts_with("EDF+C") {
            FileKind::EdfPlusContinuous
        } else if self.reserved.starts_with("EDF+D") {
            FileKind::EdfPlusDiscontinuous
        } else {
            FileKind::Edf
        }
    }

    /// Splits the patient identification into its EDF+ subfields.
    ///
    /// 格式: "patientcode sex birthdate patientname additional_info"
    pub fn patient(&self) -> PatientInfo {
        let parts: Vec<&str> = self.patient_id.split_whitespace().collect();
        let part = |i: usize| parts.get(i).copied().unwrap_or("").to_string();

        PatientInfo {
            code: part(0),
            sex: part(1),
            birthdate: part(2),
            name: part(3),
            additional: parts.get(4..).map(|s| s.join(" ")).unwrap_or_default(),
        }
    }

    /// Splits the recording identification into its EDF+ subfields.
    ///
    /// 格式: "Startdate dd-MMM-yyyy admincode technician equipment additional_info"
    pub fn recording(&self) -> RecordingInfo {
        let parts: Vec<&str> = self.recording_id.split_whitespace().collect();
        let part = |i: usize| parts.get(i).copied().unwrap_or("").to_string();

        RecordingInfo {
            admin_code: part(2),
            technician: part(3),
            equipment: part(4),
            additional: parts.get(5..).map(|s| s.join(" ")).unwrap_or_default(),
        }
    }
}

/// The samples of one data record, one vector per signal in definition order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataRecord {
    pub signals: Vec<Vec<i16>>,
}

impl DataRecord {
    pub fn samples(&self, signal_index: usize) -> &[i16] {
        self.signals
            .get(signal_index)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }
}

/// A fully decoded EDF+ file: header plus every data record.
///
/// Immutable once decoded; signal views borrow it read-only, so one file
/// can serve any number of concurrent queries.
#[derive(Debug, Clone)]
pub struct EdfFile {
    pub header: Header,
    pub records: Vec<DataRecord>,

    pub(crate) annotation_label: String,
    pub(crate) tal_mode: TalMode,
}
