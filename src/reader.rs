//! One-call metadata reads.
//!
//! [`read_metadata`] always decodes the file trailer. Everything else is a
//! facet requested through [`ReadOptions`], and only the sections a facet
//! needs are read; row data is never touched.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::format::compression::{CodecSet, Decompressor};
use crate::format::footer::{FooterSection, UserMetadata};
use crate::format::postscript::{FileTrailer, read_trailer};
use crate::format::schema::Schema;
use crate::format::statistics::{ColumnStatistics, normalize_columns};
use crate::format::stripe::{
    StripeInformation, read_bloom_filters, read_stripe_footer, read_stripe_statistics,
};
use crate::sources::{ByteSource, FileSource};

/// What to read, and with which codecs.
///
/// The defaults read no facets, decode stripe footers when stripes are
/// requested, skip bloom filters, accept newer format versions with a
/// warning, and use every codec compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub schema: bool,
    pub file_statistics: bool,
    pub stripe_statistics: bool,
    pub stripes: bool,
    /// Decode each stripe's footer into stream and encoding detail.
    pub stripe_footers: bool,
    /// Attach stripe-level bloom filters to stripe statistics. Implies
    /// stripe statistics.
    pub bloom_filters: bool,
    /// Fail on format versions newer than this crate knows.
    pub strict_version: bool,
    pub codecs: CodecSet,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            schema: false,
            file_statistics: false,
            stripe_statistics: false,
            stripes: false,
            stripe_footers: true,
            bloom_filters: false,
            strict_version: false,
            codecs: CodecSet::linked(),
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema, both statistics levels and stripes.
    pub fn all() -> Self {
        Self::default()
            .with_schema(true)
            .with_file_statistics(true)
            .with_stripe_statistics(true)
            .with_stripes(true)
    }

    pub fn with_schema(mut self, schema: bool) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_file_statistics(mut self, file_statistics: bool) -> Self {
        self.file_statistics = file_statistics;
        self
    }

    pub fn with_stripe_statistics(mut self, stripe_statistics: bool) -> Self {
        self.stripe_statistics = stripe_statistics;
        self
    }

    pub fn with_stripes(mut self, stripes: bool) -> Self {
        self.stripes = stripes;
        self
    }

    pub fn with_stripe_footers(mut self, stripe_footers: bool) -> Self {
        self.stripe_footers = stripe_footers;
        self
    }

    pub fn with_bloom_filters(mut self, bloom_filters: bool) -> Self {
        self.bloom_filters = bloom_filters;
        self
    }

    pub fn with_strict_version(mut self, strict_version: bool) -> Self {
        self.strict_version = strict_version;
        self
    }

    pub fn with_codecs(mut self, codecs: CodecSet) -> Self {
        self.codecs = codecs;
        self
    }

    /// Whether the footer has to be read at all.
    pub fn any_facet(&self) -> bool {
        self.schema
            || self.file_statistics
            || self.stripe_statistics
            || self.stripes
            || self.bloom_filters
    }
}

/// Everything read from one file.
///
/// Footer-derived fields are `None` when no facet was requested, since the
/// footer is not read in that case.
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    pub trailer: FileTrailer,
    /// `"0.12 with ORC-135"`
    pub version: String,
    pub number_of_rows: Option<u64>,
    pub row_index_stride: Option<u32>,
    pub software_version: Option<String>,
    pub user_metadata: Vec<UserMetadata>,
    pub schema: Option<Schema>,
    pub file_statistics: Option<Vec<ColumnStatistics>>,
    pub stripes: Option<Vec<StripeInformation>>,
    pub stripe_statistics: Option<Vec<Vec<ColumnStatistics>>>,
}

impl FileMetadata {
    fn trailer_only(trailer: FileTrailer) -> Self {
        Self {
            version: trailer.version_string(),
            trailer,
            number_of_rows: None,
            row_index_stride: None,
            software_version: None,
            user_metadata: Vec::new(),
            schema: None,
            file_statistics: None,
            stripes: None,
            stripe_statistics: None,
        }
    }
}

/// Read the metadata facets `options` asks for from `source`.
///
/// Nothing is returned on failure; the first error from any section ends the
/// read.
pub fn read_metadata<S: ByteSource>(mut source: S, options: &ReadOptions) -> Result<FileMetadata> {
    let trailer = read_trailer(&mut source)?;
    trailer.check_version(options.strict_version)?;
    debug!(
        file_length = trailer.file_length,
        compression = %trailer.compression,
        version = %trailer.version_string(),
        "read trailer"
    );
    if !options.any_facet() {
        return Ok(FileMetadata::trailer_only(trailer));
    }

    let decompressor = Decompressor::new(
        trailer.compression,
        trailer.compression_block_size,
        options.codecs,
    );
    let footer = FooterSection::read(&mut source, &trailer, &decompressor)?;
    let writer_version = trailer.writer_version;

    let file_statistics = if options.file_statistics {
        Some(footer.file_statistics(writer_version)?)
    } else {
        None
    };

    let mut stripes = footer.stripes.clone();
    if (options.stripes && options.stripe_footers) || options.bloom_filters {
        for stripe in &mut stripes {
            stripe.footer = Some(read_stripe_footer(&mut source, stripe, &decompressor)?);
        }
    }

    let stripe_statistics = if options.stripe_statistics || options.bloom_filters {
        let raw = read_stripe_statistics(&mut source, &trailer, &decompressor, stripes.len())?;
        let mut normalized = raw
            .iter()
            .map(|stats| normalize_columns(&footer.schema, stats, writer_version))
            .collect::<Result<Vec<_>>>()?;

        if options.bloom_filters {
            for (stripe, stats) in stripes.iter().zip(&mut normalized) {
                let Some(detail) = &stripe.footer else {
                    continue;
                };
                let filters = read_bloom_filters(
                    &mut source,
                    stripe,
                    detail,
                    &decompressor,
                    footer.schema.node_count(),
                )?;
                for (column, filter) in stats.iter_mut().zip(filters) {
                    column.bloom_filter = filter;
                }
            }
        }
        Some(normalized)
    } else {
        None
    };

    debug!(
        columns = footer.schema.node_count(),
        stripes = stripes.len(),
        rows = footer.number_of_rows,
        "read metadata"
    );

    let mut metadata = FileMetadata::trailer_only(trailer);
    metadata.number_of_rows = Some(footer.number_of_rows);
    metadata.row_index_stride = footer.row_index_stride;
    metadata.software_version = footer.software_version;
    metadata.user_metadata = footer.user_metadata;
    metadata.file_statistics = file_statistics;
    metadata.stripe_statistics = stripe_statistics;
    metadata.stripes = options.stripes.then_some(stripes);
    metadata.schema = options.schema.then_some(footer.schema);
    Ok(metadata)
}

/// [`read_metadata`] over a local file.
pub fn read_metadata_from_path(
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<FileMetadata> {
    read_metadata(FileSource::open(path)?, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::format::compression::CompressionKind;
    use crate::utils::test_data::{TestOrc, int_stats, struct_stats};

    #[test]
    fn test_default_options() {
        let options = ReadOptions::default();
        assert!(!options.any_facet());
        assert!(options.stripe_footers);
        assert!(!options.bloom_filters);
        assert_eq!(options.codecs, CodecSet::linked());
        assert!(ReadOptions::new().with_bloom_filters(true).any_facet());
    }

    #[test]
    fn test_no_facets_reads_only_trailer() {
        let file = TestOrc::single_row();
        let metadata = read_metadata(file, &ReadOptions::default()).unwrap();
        assert!(metadata.schema.is_none());
        assert!(metadata.number_of_rows.is_none());
        assert_eq!(metadata.trailer.magic, "ORC");
        assert_eq!(metadata.version, "0.12 with ORC-135");
    }

    #[test]
    fn test_all_facets() {
        let file = TestOrc::single_row();
        let metadata = read_metadata(file, &ReadOptions::all()).unwrap();
        assert_eq!(metadata.number_of_rows, Some(1));
        assert_eq!(metadata.schema.unwrap().to_string(), "struct<x:bigint>");
        assert_eq!(metadata.file_statistics.as_ref().unwrap().len(), 2);
        let stripes = metadata.stripes.unwrap();
        assert_eq!(stripes.len(), 1);
        assert!(stripes[0].footer.is_some());
        assert_eq!(
            metadata.stripe_statistics.unwrap()[0],
            metadata.file_statistics.unwrap()
        );
    }

    #[test]
    fn test_stripes_without_footers() {
        let file = TestOrc::single_row();
        let options = ReadOptions::new()
            .with_stripes(true)
            .with_stripe_footers(false);
        let metadata = read_metadata(file, &options).unwrap();
        assert!(metadata.stripes.unwrap()[0].footer.is_none());
        assert!(metadata.schema.is_none());
    }

    #[test]
    fn test_stripe_statistics_count_mismatch() {
        let file = TestOrc::builder()
            .column("x", crate::format::schema::TypeKind::Long)
            .stripe(1, vec![struct_stats(1), int_stats(1, 5, 5)])
            .stripe(1, vec![struct_stats(1), int_stats(1, 6, 6)])
            .metadata_stripes(1)
            .build();
        let options = ReadOptions::new().with_stripe_statistics(true);
        let err = read_metadata(file, &options).unwrap_err();
        assert!(matches!(
            err,
            Error::StripeStatisticsCountMismatch {
                stripes: 2,
                statistics: 1
            }
        ));
    }

    #[test]
    fn test_unlinked_codec_only_fails_when_decompressing() {
        let file = TestOrc::builder()
            .compression(CompressionKind::Lzo)
            .column("x", crate::format::schema::TypeKind::Long)
            .stripe(1, vec![struct_stats(1), int_stats(1, 5, 5)])
            .build();
        let trailer_only = read_metadata(file.clone(), &ReadOptions::default()).unwrap();
        assert_eq!(trailer_only.trailer.compression, CompressionKind::Lzo);

        let err = read_metadata(file, &ReadOptions::new().with_schema(true)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(CompressionKind::Lzo)));
    }
}
