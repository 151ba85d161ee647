//! Binary data record decoding.

use std::io::{self, Read};

use log::debug;

use crate::error::{EdfError, Result};
use crate::types::{DataRecord, Header};

/// Bytes per stored sample (little-endian `i16`)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Size in bytes of one data record for the given header.
pub fn record_size(header: &Header) -> usize {
    header
        .signals
        .iter()
        .map(|s| s.samples_per_record as usize * BYTES_PER_SAMPLE)
        .sum()
}

/// Decodes exactly `header.num_data_records` records from a byte source
/// positioned immediately after the header.
///
/// A short read fails the whole decode; no prefix of records is returned.
pub fn read_records<R: Read>(input: &mut R, header: &Header) -> Result<Vec<DataRecord>> {
    let num_records = header.num_data_records as usize;
    // 记录数来自文件头，不据此预分配
    let mut records = Vec::new();
    let mut buf = Vec::new();

    for record_index in 0..num_records {
        let mut signals = Vec::with_capacity(header.signals.len());

        for (signal_index, definition) in header.signals.iter().enumerate() {
            let count = definition.samples_per_record as usize;
            buf.resize(count * BYTES_PER_SAMPLE, 0);

            input.read_exact(&mut buf).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => EdfError::TruncatedRecord {
                    record_index,
                    signal_index,
                },
                _ => EdfError::Io(e),
            })?;

            // 转换为有符号16位整数（小端序）
            let samples = buf
                .chunks_exact(BYTES_PER_SAMPLE)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            signals.push(samples);
        }

        records.push(DataRecord { signals });
    }

    debug!(
        "Decoded {} data records of {} bytes",
        records.len(),
        record_size(header)
    );

    Ok(records)
}
