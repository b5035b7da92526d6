//! Column statistics normalized to one variant per schema kind.
//!
//! On disk a column statistics record is a bag of optional sub-messages, one
//! per type family. Which one is meaningful depends on the column's type,
//! and a few of them changed meaning across writer versions. [`normalize`]
//! resolves both so callers only ever see a [`TypedStatistics`] that matches
//! the schema.

use serde::Serialize;

use super::postscript::WriterVersion;
use super::proto;
use super::schema::{Schema, TypeKind};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub column_id: usize,
    pub number_of_values: Option<u64>,
    pub has_null: Option<bool>,
    pub bytes_on_disk: Option<u64>,
    pub statistics: TypedStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloom_filter: Option<BloomFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypedStatistics {
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
        sum: Option<i64>,
    },
    Double {
        minimum: Option<f64>,
        maximum: Option<f64>,
        sum: Option<f64>,
    },
    String {
        minimum: Option<String>,
        maximum: Option<String>,
        total_length: Option<i64>,
        lower_bound: Option<String>,
        upper_bound: Option<String>,
    },
    /// Boolean columns; `counts[0]` is the number of true values.
    Bucket { counts: Vec<u64> },
    /// Decimal values as written, e.g. `"12.50"`.
    Decimal {
        minimum: Option<String>,
        maximum: Option<String>,
        sum: Option<String>,
    },
    /// Days since the epoch.
    Date {
        minimum: Option<i32>,
        maximum: Option<i32>,
    },
    /// Milliseconds since the epoch plus the sub-millisecond nanoseconds.
    /// `utc` is false when only writer-local values were stored.
    Timestamp {
        minimum: Option<i64>,
        maximum: Option<i64>,
        minimum_nanos: Option<u32>,
        maximum_nanos: Option<u32>,
        utc: bool,
    },
    Binary { total_length: Option<i64> },
    Collection {
        min_children: Option<u64>,
        max_children: Option<u64>,
        total_children: Option<u64>,
    },
    /// Struct and union columns carry no value statistics.
    Structural,
}

impl TypedStatistics {
    pub fn name(&self) -> &'static str {
        match self {
            TypedStatistics::Integer { .. } => "integer",
            TypedStatistics::Double { .. } => "double",
            TypedStatistics::String { .. } => "string",
            TypedStatistics::Bucket { .. } => "bucket",
            TypedStatistics::Decimal { .. } => "decimal",
            TypedStatistics::Date { .. } => "date",
            TypedStatistics::Timestamp { .. } => "timestamp",
            TypedStatistics::Binary { .. } => "binary",
            TypedStatistics::Collection { .. } => "collection",
            TypedStatistics::Structural => "structural",
        }
    }
}

/// The on-disk payload family a schema kind is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Int,
    Double,
    String,
    Bucket,
    Decimal,
    Date,
    Binary,
    Timestamp,
    Collection,
}

impl Payload {
    fn for_kind(kind: TypeKind) -> Option<Self> {
        Some(match kind {
            TypeKind::Byte | TypeKind::Short | TypeKind::Int | TypeKind::Long => Payload::Int,
            TypeKind::Float | TypeKind::Double => Payload::Double,
            TypeKind::String | TypeKind::Varchar | TypeKind::Char => Payload::String,
            TypeKind::Boolean => Payload::Bucket,
            TypeKind::Decimal => Payload::Decimal,
            TypeKind::Date => Payload::Date,
            TypeKind::Binary => Payload::Binary,
            TypeKind::Timestamp | TypeKind::TimestampInstant => Payload::Timestamp,
            TypeKind::List | TypeKind::Map => Payload::Collection,
            TypeKind::Struct | TypeKind::Union => return None,
        })
    }

    fn populated(raw: &proto::ColumnStatistics) -> Vec<Payload> {
        [
            (Payload::Int, raw.int_statistics.is_some()),
            (Payload::Double, raw.double_statistics.is_some()),
            (Payload::String, raw.string_statistics.is_some()),
            (Payload::Bucket, raw.bucket_statistics.is_some()),
            (Payload::Decimal, raw.decimal_statistics.is_some()),
            (Payload::Date, raw.date_statistics.is_some()),
            (Payload::Binary, raw.binary_statistics.is_some()),
            (Payload::Timestamp, raw.timestamp_statistics.is_some()),
            (Payload::Collection, raw.collection_statistics.is_some()),
        ]
        .into_iter()
        .filter_map(|(payload, present)| present.then_some(payload))
        .collect()
    }
}

/// Turn one raw statistics record into the variant `kind` calls for.
///
/// A record whose payload belongs to another type family, or that has more
/// than one payload, is rejected. A record with no payload yields the right
/// variant with every value unknown.
pub fn normalize(
    column_id: usize,
    kind: TypeKind,
    raw: &proto::ColumnStatistics,
    writer_version: WriterVersion,
) -> Result<ColumnStatistics> {
    let expected = Payload::for_kind(kind);
    match Payload::populated(raw).as_slice() {
        [] => {}
        [found] if Some(*found) == expected => {}
        [found] => {
            return Err(Error::statistics(
                column_id,
                format!("{found:?} statistics on a {} column", kind.hive_name()),
            ));
        }
        many => {
            return Err(Error::statistics(
                column_id,
                format!("record carries {} statistics payloads: {many:?}", many.len()),
            ));
        }
    }

    let statistics = match expected {
        None => TypedStatistics::Structural,
        Some(Payload::Int) => {
            let s = raw.int_statistics.unwrap_or_default();
            TypedStatistics::Integer {
                minimum: s.minimum,
                maximum: s.maximum,
                sum: s.sum,
            }
        }
        Some(Payload::Double) => {
            let s = raw.double_statistics.unwrap_or_default();
            TypedStatistics::Double {
                minimum: s.minimum,
                maximum: s.maximum,
                sum: s.sum,
            }
        }
        Some(Payload::String) => {
            let s = raw.string_statistics.clone().unwrap_or_default();
            // older writers compared strings by UTF-16 code unit
            let trusted = writer_version.has_trusted_string_min_max();
            TypedStatistics::String {
                minimum: s.minimum.filter(|_| trusted),
                maximum: s.maximum.filter(|_| trusted),
                total_length: s.sum,
                lower_bound: s.lower_bound,
                upper_bound: s.upper_bound,
            }
        }
        Some(Payload::Bucket) => TypedStatistics::Bucket {
            counts: raw
                .bucket_statistics
                .as_ref()
                .map(|s| s.count.clone())
                .unwrap_or_default(),
        },
        Some(Payload::Decimal) => {
            let s = raw.decimal_statistics.clone().unwrap_or_default();
            TypedStatistics::Decimal {
                minimum: s.minimum,
                maximum: s.maximum,
                sum: s.sum,
            }
        }
        Some(Payload::Date) => {
            let s = raw.date_statistics.unwrap_or_default();
            TypedStatistics::Date {
                minimum: s.minimum,
                maximum: s.maximum,
            }
        }
        Some(Payload::Binary) => TypedStatistics::Binary {
            total_length: raw.binary_statistics.and_then(|s| s.sum),
        },
        Some(Payload::Timestamp) => timestamp(raw.timestamp_statistics.unwrap_or_default()),
        Some(Payload::Collection) => {
            let s = raw.collection_statistics.unwrap_or_default();
            TypedStatistics::Collection {
                min_children: s.min_children,
                max_children: s.max_children,
                total_children: s.total_children,
            }
        }
    };

    Ok(ColumnStatistics {
        column_id,
        number_of_values: raw.number_of_values,
        has_null: raw.has_null,
        bytes_on_disk: raw.bytes_on_disk,
        statistics,
        bloom_filter: None,
    })
}

/// Normalize a full statistics list, which must have one entry per schema
/// node in column id order.
pub fn normalize_columns(
    schema: &Schema,
    raw: &[proto::ColumnStatistics],
    writer_version: WriterVersion,
) -> Result<Vec<ColumnStatistics>> {
    let expected = schema.node_count();
    if raw.len() != expected {
        return Err(Error::statistics(
            raw.len().min(expected),
            format!("expected {expected} statistics entries, found {}", raw.len()),
        ));
    }
    schema
        .kinds()
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(column_id, (&kind, stats))| normalize(column_id, kind, stats, writer_version))
        .collect()
}

fn timestamp(s: proto::TimestampStatistics) -> TypedStatistics {
    // nanos are stored plus one; zero or missing means none
    let nanos = |raw: Option<i32>| raw.and_then(|n| u32::try_from(n).ok()?.checked_sub(1));
    let utc = s.minimum_utc.is_some() || s.maximum_utc.is_some();
    let (minimum, maximum) = if utc {
        (s.minimum_utc, s.maximum_utc)
    } else {
        (s.minimum, s.maximum)
    };
    TypedStatistics::Timestamp {
        minimum,
        maximum,
        minimum_nanos: nanos(s.minimum_nanos),
        maximum_nanos: nanos(s.maximum_nanos),
        utc,
    }
}

/// Hash function family a bloom filter was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BloomHash {
    /// Hashes strings as UTF-16; from `BLOOM_FILTER` streams.
    Original,
    /// Hashes strings as UTF-8; from `BLOOM_FILTER_UTF8` streams.
    Utf8,
}

/// A bloom filter kept as opaque 64-bit words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BloomFilter {
    pub hash: BloomHash,
    pub num_hash_functions: u32,
    pub bitset: Vec<u64>,
}

impl BloomFilter {
    pub fn from_proto(column_id: usize, hash: BloomHash, raw: &proto::BloomFilter) -> Result<Self> {
        let num_hash_functions = raw
            .num_hash_functions
            .ok_or_else(|| Error::statistics(column_id, "bloom filter has no hash count"))?;

        let bitset = match &raw.utf8bitset {
            Some(bytes) => {
                if bytes.len() % 8 != 0 {
                    return Err(Error::statistics(
                        column_id,
                        format!("bloom filter bitset of {} bytes is not whole words", bytes.len()),
                    ));
                }
                bytes
                    .chunks_exact(8)
                    .map(|word| {
                        let mut buf = [0u8; 8];
                        buf.copy_from_slice(word);
                        u64::from_le_bytes(buf)
                    })
                    .collect()
            }
            None => raw.bitset.clone(),
        };

        Ok(Self {
            hash,
            num_hash_functions,
            bitset,
        })
    }

    /// OR `other` into this filter. Both must have the same shape.
    pub fn merge(&mut self, column_id: usize, other: &BloomFilter) -> Result<()> {
        if self.hash != other.hash
            || self.num_hash_functions != other.num_hash_functions
            || self.bitset.len() != other.bitset.len()
        {
            return Err(Error::statistics(
                column_id,
                format!(
                    "cannot combine bloom filters of {} words/{} hashes and {} words/{} hashes",
                    self.bitset.len(),
                    self.num_hash_functions,
                    other.bitset.len(),
                    other.num_hash_functions
                ),
            ));
        }
        for (word, other) in self.bitset.iter_mut().zip(&other.bitset) {
            *word |= other;
        }
        Ok(())
    }

    pub fn bit_count(&self) -> usize {
        self.bitset.len() * 64
    }

    pub fn set_bits(&self) -> u32 {
        self.bitset.iter().map(|word| word.count_ones()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_stats(min: i64, max: i64) -> proto::ColumnStatistics {
        proto::ColumnStatistics {
            number_of_values: Some(10),
            has_null: Some(false),
            int_statistics: Some(proto::IntegerStatistics {
                minimum: Some(min),
                maximum: Some(max),
                sum: Some(min + max),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_integer_family() {
        for kind in [TypeKind::Byte, TypeKind::Short, TypeKind::Int, TypeKind::Long] {
            let stats = normalize(1, kind, &int_stats(-3, 7), WriterVersion::ORC_135).unwrap();
            assert_eq!(stats.column_id, 1);
            assert_eq!(stats.number_of_values, Some(10));
            assert_eq!(stats.has_null, Some(false));
            assert_eq!(
                stats.statistics,
                TypedStatistics::Integer {
                    minimum: Some(-3),
                    maximum: Some(7),
                    sum: Some(4)
                }
            );
        }
    }

    #[test]
    fn test_wrong_payload_is_rejected() {
        let err = normalize(2, TypeKind::String, &int_stats(0, 1), WriterVersion::ORC_135)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedStatistics { column: 2, .. }));
    }

    #[test]
    fn test_two_payloads_are_rejected() {
        let mut raw = int_stats(0, 1);
        raw.double_statistics = Some(proto::DoubleStatistics::default());
        let err = normalize(1, TypeKind::Int, &raw, WriterVersion::ORC_135).unwrap_err();
        assert!(err.to_string().contains("2 statistics payloads"), "{err}");
    }

    #[test]
    fn test_struct_has_no_payload() {
        let raw = proto::ColumnStatistics {
            number_of_values: Some(5),
            ..Default::default()
        };
        let stats = normalize(0, TypeKind::Struct, &raw, WriterVersion::ORC_135).unwrap();
        assert_eq!(stats.statistics, TypedStatistics::Structural);
        assert!(normalize(0, TypeKind::Union, &int_stats(0, 1), WriterVersion::ORC_135).is_err());
    }

    #[test]
    fn test_missing_payload_yields_empty_variant() {
        let raw = proto::ColumnStatistics {
            number_of_values: Some(0),
            has_null: Some(true),
            ..Default::default()
        };
        let stats = normalize(3, TypeKind::Double, &raw, WriterVersion::ORC_135).unwrap();
        assert_eq!(
            stats.statistics,
            TypedStatistics::Double {
                minimum: None,
                maximum: None,
                sum: None
            }
        );
        assert_eq!(stats.bytes_on_disk, None);
    }

    #[test]
    fn test_string_min_max_untrusted_before_hive_8732() {
        let raw = proto::ColumnStatistics {
            string_statistics: Some(proto::StringStatistics {
                minimum: Some("apple".to_string()),
                maximum: Some("pear".to_string()),
                sum: Some(9),
                ..Default::default()
            }),
            ..Default::default()
        };
        let old = normalize(1, TypeKind::Varchar, &raw, WriterVersion::ORIGINAL).unwrap();
        assert_eq!(
            old.statistics,
            TypedStatistics::String {
                minimum: None,
                maximum: None,
                total_length: Some(9),
                lower_bound: None,
                upper_bound: None,
            }
        );
        let new = normalize(1, TypeKind::Char, &raw, WriterVersion::HIVE_8732).unwrap();
        assert!(matches!(
            new.statistics,
            TypedStatistics::String { minimum: Some(ref m), .. } if m == "apple"
        ));
    }

    #[test]
    fn test_timestamp_prefers_utc() {
        let raw = proto::ColumnStatistics {
            timestamp_statistics: Some(proto::TimestampStatistics {
                minimum: Some(1_000),
                maximum: Some(2_000),
                minimum_utc: Some(4_600_000),
                maximum_utc: Some(4_601_000),
                minimum_nanos: Some(1),
                maximum_nanos: Some(500),
            }),
            ..Default::default()
        };
        let stats = normalize(1, TypeKind::Timestamp, &raw, WriterVersion::ORC_135).unwrap();
        assert_eq!(
            stats.statistics,
            TypedStatistics::Timestamp {
                minimum: Some(4_600_000),
                maximum: Some(4_601_000),
                minimum_nanos: Some(0),
                maximum_nanos: Some(499),
                utc: true,
            }
        );
    }

    #[test]
    fn test_timestamp_local_only() {
        let raw = proto::ColumnStatistics {
            timestamp_statistics: Some(proto::TimestampStatistics {
                minimum: Some(1_000),
                maximum: Some(2_000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let stats =
            normalize(1, TypeKind::TimestampInstant, &raw, WriterVersion::HIVE_4243).unwrap();
        assert!(matches!(
            stats.statistics,
            TypedStatistics::Timestamp {
                minimum: Some(1_000),
                utc: false,
                minimum_nanos: None,
                ..
            }
        ));
    }

    #[test]
    fn test_boolean_bucket_and_collection() {
        let raw = proto::ColumnStatistics {
            bucket_statistics: Some(proto::BucketStatistics { count: vec![4] }),
            ..Default::default()
        };
        let stats = normalize(1, TypeKind::Boolean, &raw, WriterVersion::ORC_135).unwrap();
        assert_eq!(stats.statistics, TypedStatistics::Bucket { counts: vec![4] });

        let raw = proto::ColumnStatistics {
            collection_statistics: Some(proto::CollectionStatistics {
                min_children: Some(0),
                max_children: Some(3),
                total_children: Some(7),
            }),
            ..Default::default()
        };
        let stats = normalize(2, TypeKind::Map, &raw, WriterVersion::ORC_135).unwrap();
        assert_eq!(stats.statistics.name(), "collection");
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let stats = normalize(1, TypeKind::Date, &proto::ColumnStatistics::default(), WriterVersion::ORC_135)
            .unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["statistics"]["kind"], "date");
        assert!(json.get("bloom_filter").is_none());
    }

    #[test]
    fn test_bloom_filter_from_utf8_bytes() {
        let mut bytes = 1u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x8000_0000_0000_0000u64.to_le_bytes());
        let raw = proto::BloomFilter {
            num_hash_functions: Some(4),
            bitset: vec![],
            utf8bitset: Some(bytes),
        };
        let bf = BloomFilter::from_proto(1, BloomHash::Utf8, &raw).unwrap();
        assert_eq!(bf.bitset, vec![1, 0x8000_0000_0000_0000]);
        assert_eq!(bf.bit_count(), 128);
        assert_eq!(bf.set_bits(), 2);
    }

    #[test]
    fn test_bloom_filter_partial_word() {
        let raw = proto::BloomFilter {
            num_hash_functions: Some(4),
            bitset: vec![],
            utf8bitset: Some(vec![0; 12]),
        };
        let err = BloomFilter::from_proto(5, BloomHash::Utf8, &raw).unwrap_err();
        assert!(matches!(err, Error::MalformedStatistics { column: 5, .. }));
    }

    #[test]
    fn test_bloom_filter_merge() {
        let raw = |words: Vec<u64>| proto::BloomFilter {
            num_hash_functions: Some(3),
            bitset: words,
            utf8bitset: None,
        };
        let mut a = BloomFilter::from_proto(1, BloomHash::Original, &raw(vec![0b0011, 0])).unwrap();
        let b = BloomFilter::from_proto(1, BloomHash::Original, &raw(vec![0b0110, 1])).unwrap();
        a.merge(1, &b).unwrap();
        assert_eq!(a.bitset, vec![0b0111, 1]);

        let short = BloomFilter::from_proto(1, BloomHash::Original, &raw(vec![1])).unwrap();
        assert!(a.merge(1, &short).is_err());
    }
}
