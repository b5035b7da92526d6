use serde::Serialize;
use tracing::debug;

use super::compression::Decompressor;
use super::postscript::{FileTrailer, WriterVersion};
use super::proto::{self, decode_message};
use super::schema::Schema;
use super::statistics::{ColumnStatistics, normalize_columns};
use super::stripe::{StripeInformation, validate_layout};
use crate::error::{Error, Result};
use crate::sources::ByteSource;

/// One entry of the footer's user key/value metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMetadata {
    pub name: String,
    pub value: Vec<u8>,
}

/// The decoded file footer.
///
/// Column statistics are kept raw here; [`FooterSection::file_statistics`]
/// normalizes them against the schema on request.
#[derive(Debug, Clone)]
pub struct FooterSection {
    pub schema: Schema,
    pub stripes: Vec<StripeInformation>,
    pub number_of_rows: u64,
    pub row_index_stride: Option<u32>,
    pub user_metadata: Vec<UserMetadata>,
    pub software_version: Option<String>,
    statistics: Vec<proto::ColumnStatistics>,
}

impl FooterSection {
    pub fn read<S: ByteSource>(
        source: &mut S,
        trailer: &FileTrailer,
        decompressor: &Decompressor,
    ) -> Result<Self> {
        let (offset, len) = trailer.footer_range();
        debug!(offset, len, compression = %trailer.compression, "reading footer");
        let raw = source.read_at(offset, len)?;
        let buf = decompressor.decompress(&raw)?;
        let footer: proto::Footer = decode_message(&buf, Error::MalformedFooter)?;
        Self::from_proto(footer, trailer)
    }

    fn from_proto(footer: proto::Footer, trailer: &FileTrailer) -> Result<Self> {
        let schema = Schema::from_types(&footer.types)?;

        let stripes: Vec<StripeInformation> = footer
            .stripes
            .iter()
            .enumerate()
            .map(|(i, s)| StripeInformation::from_proto(i, s))
            .collect();
        let (metadata_offset, _) = trailer.metadata_range();
        validate_layout(&stripes, metadata_offset)?;

        let user_metadata = footer
            .metadata
            .into_iter()
            .map(|item| UserMetadata {
                name: item.name.unwrap_or_default(),
                value: item.value.unwrap_or_default(),
            })
            .collect();

        debug!(
            columns = schema.node_count(),
            stripes = stripes.len(),
            rows = footer.number_of_rows,
            "decoded footer"
        );

        Ok(Self {
            schema,
            stripes,
            number_of_rows: footer.number_of_rows.unwrap_or(0),
            row_index_stride: footer.row_index_stride,
            user_metadata,
            software_version: footer.software_version,
            statistics: footer.statistics,
        })
    }

    /// File-level statistics, one per schema node in column id order.
    pub fn file_statistics(&self, writer_version: WriterVersion) -> Result<Vec<ColumnStatistics>> {
        normalize_columns(&self.schema, &self.statistics, writer_version)
    }
}
