use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use super::compression::Decompressor;
use super::postscript::FileTrailer;
use super::proto::{self, EncodingKind, StreamKind, decode_message};
use super::statistics::{BloomFilter, BloomHash};
use crate::error::{Error, Result};
use crate::sources::ByteSource;

/// Placement of one stripe, as listed in the footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StripeInformation {
    pub index: usize,
    pub offset: u64,
    pub index_length: u64,
    pub data_length: u64,
    pub footer_length: u64,
    pub number_of_rows: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<StripeFooterDetail>,
}

impl StripeInformation {
    pub(crate) fn from_proto(index: usize, raw: &proto::StripeInformation) -> Self {
        Self {
            index,
            offset: raw.offset.unwrap_or(0),
            index_length: raw.index_length.unwrap_or(0),
            data_length: raw.data_length.unwrap_or(0),
            footer_length: raw.footer_length.unwrap_or(0),
            number_of_rows: raw.number_of_rows.unwrap_or(0),
            footer: None,
        }
    }

    pub fn data_offset(&self) -> u64 {
        self.offset + self.index_length
    }

    pub fn footer_offset(&self) -> u64 {
        self.data_offset() + self.data_length
    }

    /// First byte after the stripe footer.
    pub fn end(&self) -> u64 {
        self.footer_offset() + self.footer_length
    }

    pub fn total_length(&self) -> u64 {
        self.end() - self.offset
    }

    fn checked_end(&self) -> Option<u64> {
        self.offset
            .checked_add(self.index_length)?
            .checked_add(self.data_length)?
            .checked_add(self.footer_length)
    }
}

/// Check that stripes are ordered, disjoint and end before `limit`, the
/// start of the metadata section.
pub(crate) fn validate_layout(stripes: &[StripeInformation], limit: u64) -> Result<()> {
    let mut previous: Option<&StripeInformation> = None;
    for stripe in stripes {
        let end = stripe.checked_end().ok_or_else(|| {
            Error::MalformedFooter(format!("stripe {} lengths overflow", stripe.index))
        })?;
        if let Some(prev) = previous {
            if stripe.offset <= prev.offset {
                return Err(Error::MalformedFooter(format!(
                    "stripe {} starts at {}, not after stripe {} at {}",
                    stripe.index, stripe.offset, prev.index, prev.offset
                )));
            }
            if stripe.offset < prev.end() {
                return Err(Error::MalformedFooter(format!(
                    "stripe {} starts at {} inside stripe {} (ends at {})",
                    stripe.index,
                    stripe.offset,
                    prev.index,
                    prev.end()
                )));
            }
        }
        if end > limit {
            return Err(Error::MalformedFooter(format!(
                "stripe {} ends at {end}, past the metadata section at {limit}",
                stripe.index
            )));
        }
        previous = Some(stripe);
    }
    Ok(())
}

/// One stream of a stripe, with its absolute position in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamInfo {
    pub kind: StreamKind,
    pub column: u32,
    pub start: u64,
    pub length: u64,
}

impl StreamInfo {
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnEncodingInfo {
    pub column_id: usize,
    pub kind: EncodingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_size: Option<u32>,
}

impl fmt::Display for ColumnEncodingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        if self.kind.is_dictionary()
            && let Some(size) = self.dictionary_size
        {
            write!(f, "[{size}]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StripeFooterDetail {
    pub streams: Vec<StreamInfo>,
    pub encodings: Vec<ColumnEncodingInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_timezone: Option<String>,
}

/// Read and decode the footer at the end of `stripe`.
pub fn read_stripe_footer<S: ByteSource>(
    source: &mut S,
    stripe: &StripeInformation,
    decompressor: &Decompressor,
) -> Result<StripeFooterDetail> {
    let offset = stripe.footer_offset();
    debug!(
        stripe = stripe.index,
        offset,
        len = stripe.footer_length,
        "reading stripe footer"
    );
    let raw = source.read_at(offset, stripe.footer_length)?;
    let buf = decompressor.decompress(&raw)?;
    let footer: proto::StripeFooter = decode_message(&buf, |e| {
        Error::MalformedFooter(format!("stripe {} footer: {e}", stripe.index))
    })?;

    let region_end = stripe.footer_offset();
    let mut start = stripe.offset;
    let mut streams = Vec::with_capacity(footer.streams.len());
    for (i, stream) in footer.streams.iter().enumerate() {
        let raw_kind = stream.kind.unwrap_or(0);
        let kind = StreamKind::try_from(raw_kind).map_err(|_| {
            Error::MalformedFooter(format!(
                "stripe {} stream {i} has unknown kind {raw_kind}",
                stripe.index
            ))
        })?;
        let length = stream.length.unwrap_or(0);
        let info = StreamInfo {
            kind,
            column: stream.column.unwrap_or(0),
            start,
            length,
        };
        if start.checked_add(length).is_none_or(|end| end > region_end) {
            return Err(Error::MalformedFooter(format!(
                "stripe {} stream {i} ({} of column {}) overruns the stripe's index and data ({start}+{length} > {region_end})",
                stripe.index,
                kind.name(),
                info.column
            )));
        }
        trace!(stripe = stripe.index, kind = kind.name(), column = info.column, start, length, "stream");
        start += length;
        streams.push(info);
    }

    let encodings = footer
        .columns
        .iter()
        .enumerate()
        .map(|(column_id, encoding)| {
            let raw_kind = encoding.kind.unwrap_or(0);
            let kind = EncodingKind::try_from(raw_kind).map_err(|_| {
                Error::MalformedFooter(format!(
                    "stripe {} column {column_id} has unknown encoding {raw_kind}",
                    stripe.index
                ))
            })?;
            Ok(ColumnEncodingInfo {
                column_id,
                kind,
                dictionary_size: encoding.dictionary_size,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(StripeFooterDetail {
        streams,
        encodings,
        writer_timezone: footer.writer_timezone,
    })
}

/// Decode the metadata section into one raw statistics list per stripe.
pub fn read_stripe_statistics<S: ByteSource>(
    source: &mut S,
    trailer: &FileTrailer,
    decompressor: &Decompressor,
    stripe_count: usize,
) -> Result<Vec<Vec<proto::ColumnStatistics>>> {
    let (offset, len) = trailer.metadata_range();
    debug!(offset, len, "reading metadata section");
    let stripe_stats = if len == 0 {
        Vec::new()
    } else {
        let raw = source.read_at(offset, len)?;
        let buf = decompressor.decompress(&raw)?;
        let metadata: proto::Metadata = decode_message(&buf, |e| {
            Error::MalformedFooter(format!("metadata section: {e}"))
        })?;
        metadata.stripe_stats
    };

    if stripe_stats.len() != stripe_count {
        return Err(Error::StripeStatisticsCountMismatch {
            stripes: stripe_count,
            statistics: stripe_stats.len(),
        });
    }
    Ok(stripe_stats.into_iter().map(|s| s.col_stats).collect())
}

/// Read the bloom filter index streams of one stripe and combine the
/// row-group filters of each column into one filter for the stripe.
///
/// Only streams inside the stripe's index region are read. The result is
/// indexed by column id; columns without a filter are `None`.
pub fn read_bloom_filters<S: ByteSource>(
    source: &mut S,
    stripe: &StripeInformation,
    detail: &StripeFooterDetail,
    decompressor: &Decompressor,
    node_count: usize,
) -> Result<Vec<Option<BloomFilter>>> {
    let mut filters: Vec<Option<BloomFilter>> = vec![None; node_count];
    let index_end = stripe.data_offset();

    for stream in &detail.streams {
        let hash = match stream.kind {
            StreamKind::BloomFilter => BloomHash::Original,
            StreamKind::BloomFilterUtf8 => BloomHash::Utf8,
            _ => continue,
        };
        let column = stream.column as usize;
        let Some(slot) = filters.get_mut(column) else {
            return Err(Error::MalformedFooter(format!(
                "stripe {} has a bloom filter for column {column}, but the schema has {node_count} columns",
                stripe.index
            )));
        };
        if stream.end() > index_end {
            return Err(Error::MalformedFooter(format!(
                "stripe {} bloom filter for column {column} lies outside the index region",
                stripe.index
            )));
        }
        // the UTF-8 variant supersedes the original one when both exist
        if hash == BloomHash::Original
            && slot.as_ref().is_some_and(|f| f.hash == BloomHash::Utf8)
        {
            continue;
        }

        let raw = source.read_at(stream.start, stream.length)?;
        let buf = decompressor.decompress(&raw)?;
        let index: proto::BloomFilterIndex = decode_message(&buf, |e| {
            Error::statistics(column, format!("bloom filter index: {e}"))
        })?;

        let mut combined: Option<BloomFilter> = None;
        for row_group in &index.bloom_filter {
            let filter = BloomFilter::from_proto(column, hash, row_group)?;
            match combined.as_mut() {
                Some(acc) => acc.merge(column, &filter)?,
                None => combined = Some(filter),
            }
        }
        trace!(
            stripe = stripe.index,
            column,
            row_groups = index.bloom_filter.len(),
            "bloom filter"
        );
        if combined.is_some() {
            *slot = combined;
        }
    }
    Ok(filters)
}
