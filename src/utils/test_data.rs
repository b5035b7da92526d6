//! Test data factory for synthetic ORC files.
//!
//! Files produced here carry a real trailer, footer, metadata section and
//! stripe footers. Stripe data streams are filler bytes, which is enough for
//! anything that only reads metadata.
//!
//! # Usage
//!
//! ```rust
//! use orc_metadata::format::schema::TypeKind;
//! use orc_metadata::utils::test_data::{TestOrc, int_stats, struct_stats};
//!
//! let file = TestOrc::builder()
//!     .column("id", TypeKind::Long)
//!     .stripe(3, vec![struct_stats(3), int_stats(3, 1, 3)])
//!     .build();
//!
//! // or a preset: struct<x:bigint> with one row
//! let file = TestOrc::single_row();
//! ```

use std::path::Path;

use bytes::Bytes;
use prost::Message;

use crate::format::compression::{CompressionKind, DEFAULT_BLOCK_SIZE};
use crate::format::postscript::WriterVersion;
use crate::format::proto;
use crate::format::schema::TypeKind;
use crate::sources::TailBytes;

const HEADER: &[u8] = b"ORC";

struct TestStripe {
    rows: u64,
    statistics: Vec<proto::ColumnStatistics>,
    bloom_filters: Vec<(u32, proto::StreamKind, proto::BloomFilterIndex)>,
}

pub struct TestOrcBuilder {
    types: Vec<proto::Type>,
    stripes: Vec<TestStripe>,
    file_statistics: Option<Vec<proto::ColumnStatistics>>,
    metadata_stripes: Option<usize>,
    user_metadata: Vec<(String, Vec<u8>)>,
    compression: CompressionKind,
    block_size: u64,
    version: Vec<u32>,
    writer_version: WriterVersion,
    magic: Option<String>,
    row_index_stride: Option<u32>,
    data_length: usize,
}

impl Default for TestOrcBuilder {
    fn default() -> Self {
        Self {
            types: vec![proto::Type {
                kind: Some(TypeKind::Struct as i32),
                ..Default::default()
            }],
            stripes: Vec::new(),
            file_statistics: None,
            metadata_stripes: None,
            user_metadata: Vec::new(),
            compression: CompressionKind::None,
            block_size: DEFAULT_BLOCK_SIZE,
            version: vec![0, 12],
            writer_version: WriterVersion::ORC_135,
            magic: Some("ORC".to_string()),
            row_index_stride: Some(10_000),
            data_length: 16,
        }
    }
}

impl TestOrcBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primitive field to the root struct.
    pub fn column(mut self, name: &str, kind: TypeKind) -> Self {
        let id = self.types.len() as u32;
        self.types[0].subtypes.push(id);
        self.types[0].field_names.push(name.to_string());
        self.types.push(proto::Type {
            kind: Some(kind as i32),
            ..Default::default()
        });
        self
    }

    /// Add a field whose type is the pre-order list `types`, with child
    /// indices relative to the first entry.
    pub fn nested_column(mut self, name: &str, types: Vec<proto::Type>) -> Self {
        let base = self.types.len() as u32;
        self.types[0].subtypes.push(base);
        self.types[0].field_names.push(name.to_string());
        self.types.extend(types.into_iter().map(|mut ty| {
            for child in &mut ty.subtypes {
                *child += base;
            }
            ty
        }));
        self
    }

    /// Replace the whole type list.
    pub fn types(mut self, types: Vec<proto::Type>) -> Self {
        self.types = types;
        self
    }

    /// Add a stripe of `rows` rows with one statistics entry per column id.
    pub fn stripe(mut self, rows: u64, statistics: Vec<proto::ColumnStatistics>) -> Self {
        self.stripes.push(TestStripe {
            rows,
            statistics,
            bloom_filters: Vec::new(),
        });
        self
    }

    /// Attach a bloom filter index stream for `column` to the last stripe,
    /// one filter per row group.
    pub fn bloom_filter(mut self, column: u32, utf8: bool, row_groups: Vec<Vec<u64>>) -> Self {
        let (kind, bloom_filter) = if utf8 {
            (
                proto::StreamKind::BloomFilterUtf8,
                row_groups
                    .into_iter()
                    .map(|words| proto::BloomFilter {
                        num_hash_functions: Some(3),
                        bitset: Vec::new(),
                        utf8bitset: Some(words.iter().flat_map(|w| w.to_le_bytes()).collect()),
                    })
                    .collect(),
            )
        } else {
            (
                proto::StreamKind::BloomFilter,
                row_groups
                    .into_iter()
                    .map(|words| proto::BloomFilter {
                        num_hash_functions: Some(3),
                        bitset: words,
                        utf8bitset: None,
                    })
                    .collect(),
            )
        };
        if let Some(stripe) = self.stripes.last_mut() {
            stripe
                .bloom_filters
                .push((column, kind, proto::BloomFilterIndex { bloom_filter }));
        }
        self
    }

    /// File-level statistics; by default the first stripe's statistics with
    /// value counts summed over all stripes.
    pub fn file_statistics(mut self, statistics: Vec<proto::ColumnStatistics>) -> Self {
        self.file_statistics = Some(statistics);
        self
    }

    /// Write only the first `n` stripes' statistics to the metadata section.
    pub fn metadata_stripes(mut self, n: usize) -> Self {
        self.metadata_stripes = Some(n);
        self
    }

    pub fn user_metadata(mut self, name: &str, value: &[u8]) -> Self {
        self.user_metadata.push((name.to_string(), value.to_vec()));
        self
    }

    pub fn compression(mut self, kind: CompressionKind) -> Self {
        self.compression = kind;
        self
    }

    pub fn block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    /// An empty list writes no version, as pre-0.12 writers did.
    pub fn version(mut self, version: &[u32]) -> Self {
        self.version = version.to_vec();
        self
    }

    pub fn writer_version(mut self, writer_version: WriterVersion) -> Self {
        self.writer_version = writer_version;
        self
    }

    /// `None` leaves the magic out of the postscript.
    pub fn magic(mut self, magic: Option<&str>) -> Self {
        self.magic = magic.map(str::to_string);
        self
    }

    pub fn data_length(mut self, data_length: usize) -> Self {
        self.data_length = data_length;
        self
    }

    pub fn build(self) -> Bytes {
        let mut out = HEADER.to_vec();
        let node_count = self.types.len();

        let mut stripe_infos = Vec::with_capacity(self.stripes.len());
        for stripe in &self.stripes {
            let offset = out.len() as u64;
            let mut streams = Vec::new();

            for (column, kind, index) in &stripe.bloom_filters {
                let section = frame(self.compression, self.block_size, &index.encode_to_vec());
                streams.push(stream(*kind, *column, section.len()));
                out.extend_from_slice(&section);
            }
            let index_length = out.len() as u64 - offset;

            let data_column = u32::from(node_count > 1);
            streams.push(stream(proto::StreamKind::Data, data_column, self.data_length));
            out.extend(std::iter::repeat_n(0x5Au8, self.data_length));

            let footer = proto::StripeFooter {
                streams,
                columns: (0..node_count)
                    .map(|_| proto::ColumnEncoding {
                        kind: Some(proto::EncodingKind::DirectV2 as i32),
                        ..Default::default()
                    })
                    .collect(),
                writer_timezone: Some("UTC".to_string()),
            };
            let footer = frame(self.compression, self.block_size, &footer.encode_to_vec());
            out.extend_from_slice(&footer);

            stripe_infos.push(proto::StripeInformation {
                offset: Some(offset),
                index_length: Some(index_length),
                data_length: Some(self.data_length as u64),
                footer_length: Some(footer.len() as u64),
                number_of_rows: Some(stripe.rows),
            });
        }
        let content_length = out.len() as u64 - HEADER.len() as u64;

        let metadata_stripes = self.metadata_stripes.unwrap_or(self.stripes.len());
        let metadata = proto::Metadata {
            stripe_stats: self
                .stripes
                .iter()
                .take(metadata_stripes)
                .map(|s| proto::StripeStatistics {
                    col_stats: s.statistics.clone(),
                })
                .collect(),
        };
        let metadata = frame(self.compression, self.block_size, &metadata.encode_to_vec());
        out.extend_from_slice(&metadata);

        let footer = proto::Footer {
            header_length: Some(HEADER.len() as u64),
            content_length: Some(content_length),
            stripes: stripe_infos,
            types: self.types.clone(),
            metadata: self
                .user_metadata
                .iter()
                .map(|(name, value)| proto::UserMetadataItem {
                    name: Some(name.clone()),
                    value: Some(value.clone()),
                })
                .collect(),
            number_of_rows: Some(self.stripes.iter().map(|s| s.rows).sum()),
            statistics: self
                .file_statistics
                .clone()
                .unwrap_or_else(|| self.summed_statistics()),
            row_index_stride: self.row_index_stride,
            writer: Some(1),
            software_version: Some("orc-metadata-tests".to_string()),
        };
        let footer = frame(self.compression, self.block_size, &footer.encode_to_vec());
        out.extend_from_slice(&footer);

        let postscript = proto::PostScript {
            footer_length: Some(footer.len() as u64),
            compression: Some(self.compression as i32),
            compression_block_size: Some(self.block_size),
            version: self.version.clone(),
            metadata_length: Some(metadata.len() as u64),
            writer_version: Some(self.writer_version.0),
            stripe_statistics_length: None,
            magic: self.magic.clone(),
        }
        .encode_to_vec();
        out.extend_from_slice(&postscript);
        out.push(postscript.len() as u8);

        Bytes::from(out)
    }

    pub fn write(self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }

    fn summed_statistics(&self) -> Vec<proto::ColumnStatistics> {
        let Some(first) = self.stripes.first() else {
            return (0..self.types.len())
                .map(|_| proto::ColumnStatistics {
                    number_of_values: Some(0),
                    has_null: Some(false),
                    ..Default::default()
                })
                .collect();
        };
        let mut statistics = first.statistics.clone();
        for stripe in &self.stripes[1..] {
            for (total, stats) in statistics.iter_mut().zip(&stripe.statistics) {
                total.number_of_values = Some(
                    total.number_of_values.unwrap_or(0) + stats.number_of_values.unwrap_or(0),
                );
                total.has_null = Some(total.has_null.unwrap_or(false) || stats.has_null.unwrap_or(false));
            }
        }
        statistics
    }
}

fn stream(kind: proto::StreamKind, column: u32, length: usize) -> proto::Stream {
    proto::Stream {
        kind: Some(kind as i32),
        column: Some(column),
        length: Some(length as u64),
    }
}

/// Split `data` into chunks of `block_size` and frame each one, compressed
/// when the codec is compiled in and saves space.
pub fn frame(kind: CompressionKind, block_size: u64, data: &[u8]) -> Vec<u8> {
    if kind == CompressionKind::None {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(data.len() + 3);
    for chunk in data.chunks(block_size as usize) {
        match compress(kind, chunk) {
            Some(compressed) if compressed.len() < chunk.len() => {
                out.extend_from_slice(&chunk_header(compressed.len(), false));
                out.extend_from_slice(&compressed);
            }
            _ => {
                out.extend_from_slice(&chunk_header(chunk.len(), true));
                out.extend_from_slice(chunk);
            }
        }
    }
    out
}

pub fn chunk_header(len: usize, original: bool) -> [u8; 3] {
    let value = (len as u32) * 2 + u32::from(original);
    [value as u8, (value >> 8) as u8, (value >> 16) as u8]
}

#[allow(unused_variables)]
fn compress(kind: CompressionKind, chunk: &[u8]) -> Option<Vec<u8>> {
    match kind {
        #[cfg(feature = "zlib")]
        CompressionKind::Zlib => {
            use std::io::Write;
            let mut enc =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(chunk).ok()?;
            enc.finish().ok()
        }
        #[cfg(feature = "snappy")]
        CompressionKind::Snappy => snap::raw::Encoder::new().compress_vec(chunk).ok(),
        #[cfg(feature = "lz4")]
        CompressionKind::Lz4 => Some(lz4_flex::block::compress(chunk)),
        #[cfg(feature = "zstd")]
        CompressionKind::Zstd => zstd::bulk::compress(chunk, 3).ok(),
        _ => None,
    }
}

pub fn struct_stats(n: u64) -> proto::ColumnStatistics {
    proto::ColumnStatistics {
        number_of_values: Some(n),
        has_null: Some(false),
        ..Default::default()
    }
}

pub fn int_stats(n: u64, min: i64, max: i64) -> proto::ColumnStatistics {
    proto::ColumnStatistics {
        number_of_values: Some(n),
        has_null: Some(false),
        int_statistics: Some(proto::IntegerStatistics {
            minimum: Some(min),
            maximum: Some(max),
            sum: Some(min + max),
        }),
        ..Default::default()
    }
}

pub fn string_stats(n: u64, min: &str, max: &str) -> proto::ColumnStatistics {
    proto::ColumnStatistics {
        number_of_values: Some(n),
        has_null: Some(false),
        string_statistics: Some(proto::StringStatistics {
            minimum: Some(min.to_string()),
            maximum: Some(max.to_string()),
            sum: Some((min.len() + max.len()) as i64),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn timestamp_stats(n: u64, min_utc: i64, max_utc: i64) -> proto::ColumnStatistics {
    proto::ColumnStatistics {
        number_of_values: Some(n),
        has_null: Some(true),
        timestamp_statistics: Some(proto::TimestampStatistics {
            minimum_utc: Some(min_utc),
            maximum_utc: Some(max_utc),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn collection_stats(n: u64, total_children: u64) -> proto::ColumnStatistics {
    proto::ColumnStatistics {
        number_of_values: Some(n),
        has_null: Some(false),
        collection_statistics: Some(proto::CollectionStatistics {
            min_children: Some(0),
            max_children: Some(total_children),
            total_children: Some(total_children),
        }),
        ..Default::default()
    }
}

pub struct TestOrc;

impl TestOrc {
    pub fn builder() -> TestOrcBuilder {
        TestOrcBuilder::new()
    }

    /// struct<x:bigint>, one stripe holding the single value 42
    pub fn single_row() -> Bytes {
        Self::single_row_builder().build()
    }

    pub fn single_row_builder() -> TestOrcBuilder {
        Self::builder()
            .column("x", TypeKind::Long)
            .stripe(1, vec![struct_stats(1), int_stats(1, 42, 42)])
    }

    /// struct<x:bigint> with no stripes
    pub fn empty() -> Bytes {
        Self::builder().column("x", TypeKind::Long).build()
    }

    /// struct<id:int,name:string,tags:array<string>,ts:timestamp>, three
    /// stripes of 100 rows
    pub fn multi_stripe_builder() -> TestOrcBuilder {
        let stripe_stats = |base: i64| {
            vec![
                struct_stats(100),
                int_stats(100, base, base + 99),
                string_stats(100, "alpha", "omega"),
                collection_stats(100, 250),
                string_stats(250, "a", "z"),
                timestamp_stats(90, 1_700_000_000_000, 1_700_000_099_000),
            ]
        };
        Self::builder()
            .column("id", TypeKind::Int)
            .column("name", TypeKind::String)
            .nested_column(
                "tags",
                vec![
                    proto::Type {
                        kind: Some(TypeKind::List as i32),
                        subtypes: vec![1],
                        ..Default::default()
                    },
                    proto::Type {
                        kind: Some(TypeKind::String as i32),
                        ..Default::default()
                    },
                ],
            )
            .column("ts", TypeKind::Timestamp)
            .stripe(100, stripe_stats(0))
            .stripe(100, stripe_stats(100))
            .stripe(100, stripe_stats(200))
            .user_metadata("created_by", b"orc-metadata tests")
    }

    pub fn multi_stripe() -> Bytes {
        Self::multi_stripe_builder().build()
    }

    /// Length of postscript plus its length byte.
    pub fn postscript_tail_length(file: &Bytes) -> usize {
        file.last().map_or(0, |len| usize::from(*len) + 1)
    }

    /// A source holding only the final `n` bytes of `file`.
    pub fn tail(file: &Bytes, n: usize) -> TailBytes {
        let n = n.min(file.len());
        TailBytes::new(file.len() as u64, file.slice(file.len() - n..))
    }

    pub fn write(path: &Path, file: &Bytes) {
        std::fs::write(path, file).unwrap();
    }
}
