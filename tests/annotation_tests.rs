use chrono::Duration;
use edfsignals::testing::{annotated_test_bytes, tal_samples, EdfBuilder, TestSignalSpec};
use edfsignals::{DecoderConfig, EdfError, EdfFile, EdfReader, TalMode};
use std::io::Cursor;

// 每个记录一段 TAL 字节，配一个简单的 EEG 信号
fn annotation_file(tals: &[&[u8]], config: DecoderConfig) -> EdfFile {
    let mut builder = EdfBuilder::new()
        .records(tals.len() as u32, "1")
        .signal(TestSignalSpec::new("EEG", 4))
        .signal(TestSignalSpec::annotations(30));
    for tal in tals {
        builder = builder.record(vec![vec![0; 4], tal_samples(tal, 30)]);
    }
    EdfReader::with_config(config)
        .decode(Cursor::new(builder.build()))
        .unwrap()
}

#[test]
fn test_single_annotation_record() {
    let edf = annotation_file(&[b"+0\x14\x14TEST\x14\x00"], DecoderConfig::default());
    let channels = edf.annotation_signals().unwrap();
    assert_eq!(channels.len(), 1);

    let all = channels[0].all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].annotations(), &["TEST".to_string()]);
    assert_eq!(all[0].onset(), 0.0);
    assert_eq!(all[0].duration(), 0.0);
    assert_eq!(all[0].time(), edf.header.start_datetime());
}

#[test]
fn test_annotated_file() {
    let edf = EdfFile::from_reader(Cursor::new(annotated_test_bytes())).unwrap();
    let channels = edf.annotation_signals().unwrap();
    let channel = &channels[0];

    assert_eq!(channel.index(), 1);
    assert_eq!(channel.label(), "EDF Annotations");
    assert_eq!(channel.record_onsets(), &[Some(0.0), Some(1.0), Some(2.0)]);

    let all = channel.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].annotations(), &["Recording start".to_string()]);
    assert_eq!(all[0].onset(), 0.5);
    assert_eq!(all[1].annotations(), &["Spike".to_string()]);
    assert_eq!(all[1].onset(), 1.2);
    assert_eq!(all[1].duration(), 0.5);

    let start = edf.header.start_datetime();
    assert_eq!(all[1].time(), start + Duration::milliseconds(1200));
    assert_eq!(all[1].end(), start + Duration::milliseconds(1700));

    let selected = channel
        .annotations(channel.start_time(), channel.end_time())
        .unwrap();
    assert_eq!(selected.len(), 2);
}

#[test]
fn test_window_selects_by_end_time() {
    let edf = EdfFile::from_reader(Cursor::new(annotated_test_bytes())).unwrap();
    let channels = edf.annotation_signals().unwrap();
    let channel = &channels[0];
    let start = channel.start_time();

    // Spike 在 1.2s 开始、1.7s 结束：窗口 [1.0, 1.5] 包含起点但不包含终点
    let selected = channel
        .annotations(start + Duration::seconds(1), start + Duration::milliseconds(1500))
        .unwrap();
    assert!(selected.is_empty());

    let selected = channel
        .annotations(start + Duration::seconds(1), start + Duration::seconds(2))
        .unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].annotations(), &["Spike".to_string()]);
}

#[test]
fn test_long_annotation_outlasting_recording_is_not_selected() {
    let edf = annotation_file(
        &[b"+0\x14\x14\x00+0.5\x1510\x14Sleep stage W\x14\x00", b"+1\x14\x14\x00"],
        DecoderConfig::default(),
    );
    let channels = edf.annotation_signals().unwrap();
    let channel = &channels[0];

    assert_eq!(channel.all().len(), 1);
    let selected = channel
        .annotations(channel.start_time(), channel.end_time())
        .unwrap();
    assert!(selected.is_empty());
}

#[test]
fn test_invalid_annotation_windows() {
    let edf = EdfFile::from_reader(Cursor::new(annotated_test_bytes())).unwrap();
    let channels = edf.annotation_signals().unwrap();
    let channel = &channels[0];
    let start = channel.start_time();
    let end = channel.end_time();

    assert!(matches!(
        channel.annotations(end, start),
        Err(EdfError::InvalidRange { .. })
    ));
    assert!(matches!(
        channel.annotations(start, end + Duration::seconds(1)),
        Err(EdfError::InvalidRange { .. })
    ));
    assert_eq!(channel.annotations(start, end).unwrap().len(), 2);
}

#[test]
fn test_malformed_timestamp() {
    let bytes = {
        let mut builder = EdfBuilder::new()
            .records(2, "1")
            .signal(TestSignalSpec::annotations(16));
        builder = builder.record(vec![tal_samples(b"+0\x14\x14\x00", 16)]);
        builder = builder.record(vec![tal_samples(b"+1x\x14Event\x14\x00", 16)]);
        builder.build()
    };
    let edf = EdfFile::from_reader(Cursor::new(bytes)).unwrap();

    assert!(matches!(
        edf.annotation_signals(),
        Err(EdfError::MalformedAnnotation { record_index: 1 })
    ));
}

#[test]
fn test_channels_are_independent() {
    let bytes = EdfBuilder::new()
        .records(1, "1")
        .signal(TestSignalSpec::annotations(16))
        .signal(TestSignalSpec::new("EEG", 4))
        .signal(TestSignalSpec::annotations(16))
        .record(vec![
            tal_samples(b"+0\x14\x14\x00+0.1\x14First\x14\x00", 16),
            vec![1, 2, 3, 4],
            tal_samples(b"+0.25\x14Second\x14\x00", 16),
        ])
        .build();
    let edf = EdfFile::from_reader(Cursor::new(bytes)).unwrap();

    let channels = edf.annotation_signals().unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].index(), 0);
    assert_eq!(channels[1].index(), 2);

    assert_eq!(channels[0].all().len(), 1);
    assert_eq!(channels[0].all()[0].annotations(), &["First".to_string()]);
    assert_eq!(channels[1].all().len(), 1);
    assert_eq!(channels[1].all()[0].annotations(), &["Second".to_string()]);
    assert_eq!(channels[1].record_onsets(), &[Some(0.25)]);

    let eeg = edf.numeric_signal(1).unwrap();
    assert_eq!(eeg.label(), "EEG");
}

#[test]
fn test_legacy_mode() {
    let tal: &[u8] = b"Marker\x14+1.5\x14\x00";

    let legacy = annotation_file(
        &[tal, b"+1\x14\x14\x00"],
        DecoderConfig::default().with_tal_mode(TalMode::Legacy),
    );
    let channels = legacy.annotation_signals().unwrap();
    let all = channels[0].all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].onset(), 1.5);
    assert_eq!(all[0].annotations(), &["Marker".to_string()]);
    assert_eq!(channels[0].record_onsets(), &[Some(1.5), Some(1.0)]);

    // 严格模式下首字段必须是带符号的时间戳
    let delimited = annotation_file(&[tal, b"+1\x14\x14\x00"], DecoderConfig::default());
    assert!(matches!(
        delimited.annotation_signals(),
        Err(EdfError::MalformedAnnotation { record_index: 0 })
    ));
}

#[test]
fn test_custom_annotation_label() {
    let bytes = EdfBuilder::new()
        .records(1, "1")
        .signal(TestSignalSpec::new("Events", 8).physical("-1", "1"))
        .record(vec![tal_samples(b"+0\x14\x14Go\x14\x00", 8)])
        .build();

    let default = EdfFile::from_reader(Cursor::new(bytes.clone())).unwrap();
    assert!(default.annotation_signals().unwrap().is_empty());
    assert!(default.numeric_signal(0).is_ok());

    let config = DecoderConfig::default().with_annotation_label("Events");
    let edf = EdfReader::with_config(config).decode(Cursor::new(bytes)).unwrap();
    let channels = edf.annotation_signals().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].all()[0].annotations(), &["Go".to_string()]);
    assert!(matches!(
        edf.numeric_signal(0),
        Err(EdfError::UnsupportedSignalKind { .. })
    ));
}
