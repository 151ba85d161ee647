//! Fixed-width ASCII header decoding.
//!
//! The header is a 256 byte preamble followed by `num_signals * 256` bytes
//! of per-signal definitions. The per-signal table is stored field by field:
//! all labels first, then all transducer types, and so on.

use std::io::{self, Read};

use log::{debug, warn};

use crate::config::DecoderConfig;
use crate::error::{EdfError, Result};
use crate::types::{Header, SignalDefinition};
use crate::utils::{parse_decimal, parse_start_datetime, parse_unsigned, trim_field};

/// Byte widths of the preamble fields, in stream order
const VERSION_WIDTH: usize = 8;
const PATIENT_ID_WIDTH: usize = 80;
const RECORDING_ID_WIDTH: usize = 80;
const START_DATE_WIDTH: usize = 8;
const START_TIME_WIDTH: usize = 8;
const HEADER_BYTES_WIDTH: usize = 8;
const RESERVED_WIDTH: usize = 44;
const NUM_RECORDS_WIDTH: usize = 8;
const RECORD_DURATION_WIDTH: usize = 8;
const NUM_SIGNALS_WIDTH: usize = 4;

/// Byte widths of the per-signal fields, in stream order
const LABEL_WIDTH: usize = 16;
const TRANSDUCER_WIDTH: usize = 80;
const DIMENSION_WIDTH: usize = 8;
const CALIBRATION_WIDTH: usize = 8;
const PREFILTER_WIDTH: usize = 80;
const SAMPLES_WIDTH: usize = 8;
const SIGNAL_RESERVED_WIDTH: usize = 32;

/// Size of the preamble and of each signal's share of the definition table.
pub const HEADER_BLOCK_SIZE: usize = 256;

/// Reads exactly `width` bytes for `field` and returns them trimmed.
fn read_field<R: Read>(input: &mut R, width: usize, field: &'static str) -> Result<String> {
    let mut buf = vec![0u8; width];
    input.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => EdfError::TruncatedHeader { field },
        _ => EdfError::Io(e),
    })?;
    Ok(trim_field(&buf))
}

/// Reads one field for every signal, in signal order.
fn read_signal_pass<R: Read>(
    input: &mut R,
    signals: &mut [SignalDefinition],
    width: usize,
    field: &'static str,
    mut assign: impl FnMut(&mut SignalDefinition, usize, String) -> Result<()>,
) -> Result<()> {
    for (index, signal) in signals.iter_mut().enumerate() {
        let value = read_field(input, width, field)?;
        assign(signal, index, value)?;
    }
    Ok(())
}

/// Decodes the header from a byte source positioned at offset 0.
///
/// Fields are consumed strictly in file order; nothing is read past the
/// end of the signal definition table. Any failure discards the partially
/// decoded header.
pub fn read_header<R: Read>(input: &mut R, config: &DecoderConfig) -> Result<Header> {
    let version = read_field(input, VERSION_WIDTH, "version")?;
    let patient_id = read_field(input, PATIENT_ID_WIDTH, "patient_id")?;
    let recording_id = read_field(input, RECORDING_ID_WIDTH, "recording_id")?;
    let start_date = read_field(input, START_DATE_WIDTH, "start_date")?;
    let start_time = read_field(input, START_TIME_WIDTH, "start_time")?;

    let raw = read_field(input, HEADER_BYTES_WIDTH, "header_byte_size")?;
    let header_byte_size =
        parse_unsigned(&raw).ok_or_else(|| EdfError::malformed("header_byte_size", None, &raw))?;

    let reserved = read_field(input, RESERVED_WIDTH, "reserved")?;

    let raw = read_field(input, NUM_RECORDS_WIDTH, "num_data_records")?;
    let num_data_records =
        parse_unsigned(&raw).ok_or_else(|| EdfError::malformed("num_data_records", None, &raw))?;

    let raw = read_field(input, RECORD_DURATION_WIDTH, "duration_data_records")?;
    let duration_data_records = parse_decimal(&raw)
        .filter(|d| *d >= 0.0)
        .ok_or_else(|| EdfError::malformed("duration_data_records", None, &raw))?;

    let raw = read_field(input, NUM_SIGNALS_WIDTH, "num_signals")?;
    let num_signals =
        parse_unsigned(&raw).ok_or_else(|| EdfError::malformed("num_signals", None, &raw))?;
    if num_signals == 0 || num_signals as usize > config.max_signals {
        return Err(EdfError::malformed("num_signals", None, &raw));
    }

    let start = parse_start_datetime(&start_date, &start_time)?;

    let expected_size = HEADER_BLOCK_SIZE * (num_signals as usize + 1);
    if header_byte_size as usize != expected_size {
        if config.strict_header_size {
            return Err(EdfError::malformed(
                "header_byte_size",
                None,
                &header_byte_size.to_string(),
            ));
        }
        warn!(
            "Header declares {} bytes but {} signals need {}",
            header_byte_size, num_signals, expected_size
        );
    }

    debug!(
        "Header preamble: version '{}', {} records of {}s, {} signals",
        version, num_data_records, duration_data_records, num_signals
    );

    let mut signals = vec![SignalDefinition::default(); num_signals as usize];
    let s = &mut signals;

    read_signal_pass(input, s, LABEL_WIDTH, "label", |sig, _, v| {
        sig.label = v;
        Ok(())
    })?;
    read_signal_pass(input, s, TRANSDUCER_WIDTH, "transducer_type", |sig, _, v| {
        sig.transducer_type = v;
        Ok(())
    })?;
    read_signal_pass(input, s, DIMENSION_WIDTH, "physical_dimension", |sig, _, v| {
        sig.physical_dimension = v;
        Ok(())
    })?;
    read_signal_pass(input, s, CALIBRATION_WIDTH, "physical_minimum", |sig, _, v| {
        sig.physical_minimum = v;
        Ok(())
    })?;
    read_signal_pass(input, s, CALIBRATION_WIDTH, "physical_maximum", |sig, _, v| {
        sig.physical_maximum = v;
        Ok(())
    })?;
    read_signal_pass(input, s, CALIBRATION_WIDTH, "digital_minimum", |sig, _, v| {
        sig.digital_minimum = v;
        Ok(())
    })?;
    read_signal_pass(input, s, CALIBRATION_WIDTH, "digital_maximum", |sig, _, v| {
        sig.digital_maximum = v;
        Ok(())
    })?;
    read_signal_pass(input, s, PREFILTER_WIDTH, "prefiltering", |sig, _, v| {
        sig.prefiltering = v;
        Ok(())
    })?;
    read_signal_pass(input, s, SAMPLES_WIDTH, "samples_per_record", |sig, i, v| {
        sig.samples_per_record = parse_unsigned(&v)
            .ok_or_else(|| EdfError::malformed("samples_per_record", Some(i), &v))?;
        Ok(())
    })?;
    read_signal_pass(input, s, SIGNAL_RESERVED_WIDTH, "signal_reserved", |sig, _, v| {
        sig.reserved = v;
        Ok(())
    })?;

    for (i, signal) in signals.iter().enumerate() {
        debug!(
            "Signal {}: '{}' ({} samples/record, {})",
            i, signal.label, signal.samples_per_record, signal.physical_dimension
        );
    }

    Ok(Header {
        version,
        patient_id,
        recording_id,
        start_date,
        start_time,
        header_byte_size,
        reserved,
        num_data_records,
        duration_data_records,
        num_signals,
        signals,
        start,
    })
}
