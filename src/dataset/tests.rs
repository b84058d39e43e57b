//! Tests for the dataset format.
//!
//! These cover the loader against hand-built byte buffers, files on disk and
//! the writer's output.

use std::io::Write;

use super::format::*;
use super::reader::DatasetLoader;
use super::writer::DatasetWriter;
use crate::error::{LoadError, LoadWarning};

fn native_bytes(ranges: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut data = Vec::new();
    for &(start, end, kind) in ranges {
        data.extend_from_slice(&start.to_ne_bytes());
        data.extend_from_slice(&end.to_ne_bytes());
        data.extend_from_slice(&kind.to_ne_bytes());
    }
    data
}

// ============================================================================
// In-memory decoding
// ============================================================================

#[test]
fn test_empty_input_loads_no_ranges() {
    let dataset = DatasetLoader::new().load_bytes(&[]).unwrap();
    assert!(dataset.ranges.is_empty());
    assert!(dataset.warnings.is_empty());
    assert_eq!(dataset.info.records, 0);
}

#[test]
fn test_records_load_in_written_order() {
    let data = native_bytes(&[(10, 20, 1), (15, 25, 2), (0, u32::MAX, 3)]);
    let dataset = DatasetLoader::new().load_bytes(&data).unwrap();

    assert_eq!(
        dataset.ranges,
        vec![
            IpRange::new(10, 20, 1),
            IpRange::new(15, 25, 2),
            IpRange::new(0, u32::MAX, 3),
        ]
    );
    assert!(!dataset.is_truncated());
}

#[test]
fn test_truncated_tail_is_dropped_with_warning() {
    for trailing in 1..RECORD_SIZE {
        let mut data = native_bytes(&[(1, 2, 3), (4, 5, 6)]);
        data.extend(std::iter::repeat(0xAB).take(trailing));

        let dataset = DatasetLoader::new().load_bytes(&data).unwrap();
        assert_eq!(dataset.ranges.len(), 2);
        assert_eq!(
            dataset.warnings,
            vec![LoadWarning::TruncatedInput {
                trailing_bytes: trailing
            }]
        );
        assert_eq!(dataset.info.trailing_bytes, trailing);
    }
}

#[test]
fn test_shorter_than_one_record() {
    let dataset = DatasetLoader::new().load_bytes(&[1, 2, 3, 4, 5]).unwrap();
    assert!(dataset.ranges.is_empty());
    assert!(dataset.is_truncated());
}

#[test]
fn test_inverted_range_rejects_whole_dataset() {
    let data = native_bytes(&[(1, 2, 0), (3, 4, 0), (9, 5, 0), (6, 7, 0)]);
    let err = DatasetLoader::new().load_bytes(&data).unwrap_err();

    match err {
        LoadError::MalformedRange { index, start, end } => {
            assert_eq!(index, 2);
            assert_eq!(start, 9);
            assert_eq!(end, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_single_address_range_is_valid() {
    let data = native_bytes(&[(7, 7, 1)]);
    let dataset = DatasetLoader::new().load_bytes(&data).unwrap();
    assert_eq!(dataset.ranges, vec![IpRange::new(7, 7, 1)]);
}

#[test]
fn test_big_endian_loader() {
    let mut data = Vec::new();
    data.extend_from_slice(&0x0A000000u32.to_be_bytes());
    data.extend_from_slice(&0x0A0000FFu32.to_be_bytes());
    data.extend_from_slice(&9u32.to_be_bytes());

    let dataset = DatasetLoader::with_byte_order(ByteOrder::Big)
        .load_bytes(&data)
        .unwrap();
    assert_eq!(dataset.ranges, vec![IpRange::new(0x0A000000, 0x0A0000FF, 9)]);
}

#[test]
fn test_fingerprint_tracks_content() {
    let loader = DatasetLoader::new();
    let a = loader.load_bytes(&native_bytes(&[(1, 2, 3)])).unwrap();
    let b = loader.load_bytes(&native_bytes(&[(1, 2, 3)])).unwrap();
    let c = loader.load_bytes(&native_bytes(&[(1, 2, 4)])).unwrap();

    assert_eq!(a.info.fingerprint(), b.info.fingerprint());
    assert_ne!(a.info.fingerprint(), c.info.fingerprint());
    assert_eq!(a.info.fingerprint().len(), 64);
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn test_load_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&native_bytes(&[(100, 200, 4), (300, 400, 6)]))
        .unwrap();
    file.flush().unwrap();

    let dataset = DatasetLoader::new().load_path(file.path()).unwrap();
    assert_eq!(dataset.ranges.len(), 2);
    assert_eq!(dataset.ranges[1], IpRange::new(300, 400, 6));
    assert_eq!(dataset.info.source, file.path().display().to_string());
}

#[test]
fn test_load_path_empty_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let dataset = DatasetLoader::new().load_path(file.path()).unwrap();
    assert!(dataset.ranges.is_empty());
    assert!(dataset.warnings.is_empty());
}

#[test]
fn test_missing_file_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.bin");

    let err = DatasetLoader::new().load_path(&missing).unwrap_err();
    match err {
        LoadError::SourceUnavailable { source_name, cause } => {
            assert!(source_name.ends_with("nope.bin"));
            assert_eq!(cause.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_directory_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = DatasetLoader::new().load_path(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::SourceUnavailable { .. }));
}

#[test]
fn test_failing_reader_is_source_unavailable() {
    struct Broken;

    impl std::io::Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    let err = DatasetLoader::new().load_reader(Broken, "broken").unwrap_err();
    assert!(matches!(err, LoadError::SourceUnavailable { .. }));
}

#[test]
fn test_load_reader_slice() {
    let data = native_bytes(&[(1, 1, 1)]);
    let dataset = DatasetLoader::new()
        .load_reader(data.as_slice(), "memory")
        .unwrap();
    assert_eq!(dataset.info.source, "memory");
    assert_eq!(dataset.ranges.len(), 1);
}

#[test]
fn test_load_path_survives_in_place_rewrite() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const FULL_RECORDS: u32 = 100_000;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ranges.bin");
    let short = native_bytes(&[(5, 9, 1)]);
    let full: Vec<u8> = native_bytes(
        &(0..FULL_RECORDS)
            .map(|i| (i * 10, i * 10 + 5, 2))
            .collect::<Vec<_>>(),
    );
    std::fs::write(&path, &full).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let rewriter = {
        let stop = Arc::clone(&stop);
        let path = path.clone();
        std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let _ = std::fs::write(&path, &short);
                let _ = std::fs::write(&path, &full);
            }
        })
    };

    let loader = DatasetLoader::new();
    for _ in 0..300 {
        match loader.load_path(&path) {
            Ok(dataset) => {
                assert!(dataset.ranges.len() <= FULL_RECORDS as usize);
                assert!(dataset.ranges.iter().all(|r| r.is_well_formed()));
            }
            Err(LoadError::SourceUnavailable { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    stop.store(true, Ordering::Relaxed);
    rewriter.join().unwrap();
}

// ============================================================================
// Writer round trip
// ============================================================================

#[test]
fn test_writer_output_loads_back() {
    let ranges = vec![
        IpRange::new(167772160, 167772415, 9),
        IpRange::new(10, 20, 1),
        IpRange::new(15, 25, 2),
    ];

    for order in [ByteOrder::Native, ByteOrder::Little, ByteOrder::Big] {
        let data = DatasetWriter::with_byte_order(order).write(&ranges).unwrap();
        assert_eq!(data.len(), ranges.len() * RECORD_SIZE);

        let dataset = DatasetLoader::with_byte_order(order).load_bytes(&data).unwrap();
        assert_eq!(dataset.ranges, ranges);
    }
}

#[test]
fn test_native_writer_matches_packed_layout() {
    let data = DatasetWriter::new()
        .write(&[IpRange::new(10, 20, 1)])
        .unwrap();
    assert_eq!(data, native_bytes(&[(10, 20, 1)]));
}

#[test]
fn test_write_to_path_replaces_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ranges.bin");

    let mut writer = DatasetWriter::new();
    writer.write_to_path(&[IpRange::new(1, 2, 3)], &path).unwrap();
    let size = writer
        .write_to_path(&[IpRange::new(4, 5, 6), IpRange::new(7, 8, 9)], &path)
        .unwrap();
    assert_eq!(size, 2 * RECORD_SIZE);

    let dataset = DatasetLoader::new().load_path(&path).unwrap();
    assert_eq!(dataset.ranges, vec![IpRange::new(4, 5, 6), IpRange::new(7, 8, 9)]);
    assert!(!dir.path().join("ranges.bin.tmp").exists());
}
