//! End-to-end reads of synthetic ORC files through the public API.

use orc_metadata::format::compression::CompressionKind;
use orc_metadata::format::postscript::WriterVersion;
use orc_metadata::format::schema::TypeKind;
use orc_metadata::format::statistics::{BloomHash, TypedStatistics};
use orc_metadata::utils::test_data::{TestOrc, int_stats, string_stats, struct_stats};
use orc_metadata::{
    CodecSet, Error, ErrorCategory, ReadOptions, TailBytes, read_metadata, read_metadata_from_path,
};
use tempfile::TempDir;

#[test]
fn test_schema_reads_are_deterministic() {
    let file = TestOrc::multi_stripe();
    let options = ReadOptions::new().with_schema(true);
    let first = read_metadata(file.clone(), &options).unwrap();
    let second = read_metadata(file, &options).unwrap();
    assert_eq!(first.schema, second.schema);
    assert!(first.schema.is_some());
}

#[test]
fn test_sections_lie_within_file() {
    let file = TestOrc::multi_stripe();
    let metadata = read_metadata(file.clone(), &ReadOptions::all()).unwrap();
    let trailer = &metadata.trailer;

    let (footer_offset, footer_len) = trailer.footer_range();
    let (metadata_offset, metadata_len) = trailer.metadata_range();
    assert_eq!(trailer.file_length, file.len() as u64);
    assert!(footer_offset + footer_len < trailer.file_length);
    assert_eq!(metadata_offset + metadata_len, footer_offset);
    assert_eq!(
        footer_offset + footer_len + u64::from(trailer.postscript_length) + 1,
        trailer.file_length
    );
}

#[test]
fn test_one_statistics_entry_per_schema_node() {
    let metadata = read_metadata(TestOrc::multi_stripe(), &ReadOptions::all()).unwrap();
    let schema = metadata.schema.unwrap();
    let file_statistics = metadata.file_statistics.unwrap();
    assert_eq!(file_statistics.len(), schema.node_count());
    for (i, stats) in file_statistics.iter().enumerate() {
        assert_eq!(stats.column_id, i);
    }
    for stripe in metadata.stripe_statistics.unwrap() {
        assert_eq!(stripe.len(), schema.node_count());
    }
}

#[test]
fn test_stripes_are_ordered_and_disjoint() {
    let metadata = read_metadata(TestOrc::multi_stripe(), &ReadOptions::all()).unwrap();
    let stripes = metadata.stripes.unwrap();
    assert_eq!(stripes.len(), 3);
    for pair in stripes.windows(2) {
        assert!(pair[0].end() <= pair[1].offset);
    }
    for (i, stripe) in stripes.iter().enumerate() {
        assert_eq!(stripe.index, i);
        assert_eq!(stripe.number_of_rows, 100);
        let footer = stripe.footer.as_ref().unwrap();
        assert!(
            footer
                .streams
                .iter()
                .all(|s| s.start >= stripe.offset && s.end() <= stripe.footer_offset())
        );
        assert_eq!(footer.writer_timezone.as_deref(), Some("UTC"));
    }
}

#[test]
fn test_tail_only_source() {
    let file = TestOrc::multi_stripe();
    let tail = TestOrc::tail(&file, TestOrc::postscript_tail_length(&file));

    let metadata = read_metadata(tail.clone(), &ReadOptions::default()).unwrap();
    assert_eq!(metadata.trailer.file_length, file.len() as u64);
    assert!(metadata.schema.is_none());

    for options in [
        ReadOptions::new().with_schema(true),
        ReadOptions::new().with_file_statistics(true),
        ReadOptions::new().with_stripe_statistics(true),
    ] {
        let err = read_metadata(tail.clone(), &options).unwrap_err();
        assert!(matches!(err, Error::TruncatedFile { .. }), "{err}");
        assert_eq!(err.category(), ErrorCategory::Truncated);
    }
}

#[test]
fn test_tail_holding_footer_and_metadata() {
    let file = TestOrc::multi_stripe();
    let trailer = read_metadata(file.clone(), &ReadOptions::default())
        .unwrap()
        .trailer;
    #[allow(clippy::cast_possible_truncation)]
    let tail = TestOrc::tail(&file, trailer.tail_length() as usize);

    let options = ReadOptions::new()
        .with_schema(true)
        .with_file_statistics(true)
        .with_stripe_statistics(true);
    let metadata = read_metadata(tail.clone(), &options).unwrap();
    assert_eq!(metadata.number_of_rows, Some(300));

    // stripe footers live before the tail
    let err = read_metadata(tail, &ReadOptions::new().with_stripes(true)).unwrap_err();
    assert!(matches!(err, Error::TruncatedFile { .. }));
}

#[test]
fn test_tail_fetched_from_full_source() {
    let mut file = TestOrc::multi_stripe();
    let tail = TailBytes::fetch(&mut file, 4096).unwrap();
    let metadata = read_metadata(tail, &ReadOptions::all()).unwrap();
    assert_eq!(metadata.stripes.unwrap().len(), 3);
}

#[test]
fn test_unlinked_codec_only_matters_when_decompressing() {
    let file = TestOrc::single_row_builder()
        .compression(CompressionKind::Zstd)
        .build();
    let without_zstd = CodecSet::linked().without(CompressionKind::Zstd);

    let options = ReadOptions::new().with_codecs(without_zstd);
    let metadata = read_metadata(file.clone(), &options).unwrap();
    assert_eq!(metadata.trailer.compression, CompressionKind::Zstd);

    let err = read_metadata(file, &options.with_schema(true)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedCodec(CompressionKind::Zstd)));
    assert!(err.is_skippable());
}

#[test]
fn test_zero_stripes() {
    let options = ReadOptions::all();
    let metadata = read_metadata(TestOrc::empty(), &options).unwrap();
    assert_eq!(metadata.stripes, Some(Vec::new()));
    assert_eq!(metadata.stripe_statistics, Some(Vec::new()));
    assert_eq!(metadata.number_of_rows, Some(0));
    assert_eq!(metadata.file_statistics.unwrap().len(), 2);
}

#[test]
fn test_single_row_file() {
    let metadata = read_metadata(TestOrc::single_row(), &ReadOptions::all()).unwrap();

    let schema = metadata.schema.unwrap();
    assert_eq!(schema.node_count(), 2);
    assert_eq!(schema.root().children.len(), 1);
    assert_eq!(schema.kind(1), Some(TypeKind::Long));

    let file_statistics = metadata.file_statistics.unwrap();
    assert_eq!(file_statistics.len(), 2);
    for stats in &file_statistics {
        assert_eq!(stats.number_of_values, Some(1));
        assert_eq!(stats.has_null, Some(false));
    }
    assert_eq!(
        file_statistics[1].statistics,
        TypedStatistics::Integer {
            minimum: Some(42),
            maximum: Some(42),
            sum: Some(84),
        }
    );

    let stripes = metadata.stripes.unwrap();
    assert_eq!(stripes.len(), 1);
    assert_eq!(stripes[0].number_of_rows, 1);
    assert_eq!(metadata.stripe_statistics.unwrap(), vec![file_statistics]);
}

#[test]
fn test_supplementary_footer_fields() {
    let metadata = read_metadata(
        TestOrc::multi_stripe_builder()
            .compression(CompressionKind::None)
            .build(),
        &ReadOptions::new().with_schema(true),
    )
    .unwrap();
    assert_eq!(metadata.version, "0.12 with ORC-135");
    assert_eq!(metadata.software_version.as_deref(), Some("orc-metadata-tests"));
    assert_eq!(metadata.user_metadata.len(), 1);
    assert_eq!(metadata.user_metadata[0].name, "created_by");
    assert_eq!(
        metadata.schema.unwrap().to_string(),
        "struct<id:int,name:string,tags:array<string>,ts:timestamp>"
    );
}

#[test]
fn test_string_min_max_unknown_before_hive_8732() {
    let file = TestOrc::builder()
        .column("s", TypeKind::String)
        .stripe(2, vec![struct_stats(2), string_stats(2, "aa", "zz")])
        .writer_version(WriterVersion::ORIGINAL)
        .build();
    let metadata = read_metadata(file, &ReadOptions::new().with_file_statistics(true)).unwrap();
    let TypedStatistics::String {
        minimum,
        maximum,
        total_length,
        ..
    } = &metadata.file_statistics.unwrap()[1].statistics
    else {
        panic!("expected string statistics");
    };
    assert!(minimum.is_none());
    assert!(maximum.is_none());
    assert_eq!(*total_length, Some(4));
}

#[test]
fn test_bloom_filters_attach_to_stripe_statistics() {
    let file = TestOrc::single_row_builder()
        .bloom_filter(1, false, vec![vec![0b0001, 0], vec![0b0010, 0]])
        .bloom_filter(1, true, vec![vec![0b1000, 0], vec![0b0100, 0]])
        .build();

    let without = read_metadata(file.clone(), &ReadOptions::new().with_stripe_statistics(true))
        .unwrap();
    assert!(without.stripe_statistics.unwrap()[0][1].bloom_filter.is_none());

    let metadata = read_metadata(file, &ReadOptions::new().with_bloom_filters(true)).unwrap();
    let stripe_statistics = metadata.stripe_statistics.unwrap();
    assert!(stripe_statistics[0][0].bloom_filter.is_none());
    let filter = stripe_statistics[0][1].bloom_filter.as_ref().unwrap();
    assert_eq!(filter.hash, BloomHash::Utf8);
    assert_eq!(filter.bitset, vec![0b1100, 0]);
    assert_eq!(filter.set_bits(), 2);
}

#[test]
fn test_compressed_files_read_like_plain_ones() {
    let plain = read_metadata(TestOrc::multi_stripe(), &ReadOptions::all()).unwrap();
    for kind in CodecSet::linked().iter() {
        let file = TestOrc::multi_stripe_builder()
            .compression(kind)
            .block_size(64)
            .build();
        let metadata = read_metadata(file, &ReadOptions::all()).unwrap();
        assert_eq!(metadata.trailer.compression, kind);
        assert_eq!(metadata.schema, plain.schema);
        assert_eq!(metadata.file_statistics, plain.file_statistics);
        assert_eq!(metadata.stripe_statistics, plain.stripe_statistics);
        assert_eq!(metadata.user_metadata, plain.user_metadata);
    }
}

#[test]
fn test_strict_version() {
    let file = TestOrc::single_row_builder().version(&[0, 13]).build();
    let lenient = read_metadata(file.clone(), &ReadOptions::new().with_schema(true)).unwrap();
    assert_eq!(lenient.trailer.version.minor, 13);

    let err = read_metadata(file, &ReadOptions::new().with_strict_version(true)).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedFormatVersion { major: 0, minor: 13 }
    ));
}

#[test]
fn test_corrupt_stripe_statistics_count() {
    let file = TestOrc::builder()
        .column("x", TypeKind::Long)
        .stripe(1, vec![struct_stats(1), int_stats(1, 1, 1)])
        .stripe(1, vec![struct_stats(1), int_stats(1, 2, 2)])
        .metadata_stripes(1)
        .build();
    // only the file-level facets are fine
    read_metadata(file.clone(), &ReadOptions::new().with_file_statistics(true)).unwrap();

    let err = read_metadata(file, &ReadOptions::new().with_stripe_statistics(true)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Corrupt);
}

#[test]
fn test_read_from_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.orc");
    TestOrc::write(&path, &TestOrc::multi_stripe());

    let from_path = read_metadata_from_path(&path, &ReadOptions::all()).unwrap();
    let from_bytes = read_metadata(TestOrc::multi_stripe(), &ReadOptions::all()).unwrap();
    assert_eq!(from_path.schema, from_bytes.schema);
    assert_eq!(from_path.file_statistics, from_bytes.file_statistics);
    assert_eq!(from_path.number_of_rows, Some(300));
}

#[test]
fn test_missing_path_is_io_error() {
    let err = read_metadata_from_path("/nonexistent/file.orc", &ReadOptions::default())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Io);
}

#[test]
fn test_serializes_to_json() {
    let metadata = read_metadata(TestOrc::single_row(), &ReadOptions::all()).unwrap();
    let json = serde_json::to_value(&metadata).unwrap();
    assert_eq!(json["trailer"]["compression"], "NONE");
    assert_eq!(json["schema"]["children"][0]["type"], "bigint");
    assert_eq!(json["file_statistics"][1]["statistics"]["kind"], "integer");
}
