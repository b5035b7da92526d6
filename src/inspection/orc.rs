//! ORC file inspection.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Value, json};
use tabled::Tabled;

use super::{
    render::{format_bytes, format_number, render_metadata_map, truncate_for_display},
    style::{dim, header, indented_table, label, rounded_table, value, warning},
};
use crate::format::compression::CompressionKind;
use crate::format::postscript::CURRENT_VERSION;
use crate::format::schema::{Schema, SchemaNode, TypeKind};
use crate::format::statistics::{ColumnStatistics, TypedStatistics};
use crate::format::stripe::StripeInformation;
use crate::reader::{FileMetadata, ReadOptions, read_metadata, read_metadata_from_path};
use crate::sources::ByteSource;

const MILLIS_PER_DAY: i64 = 86_400_000;

pub struct OrcInspector {
    file_path: PathBuf,
    metadata: FileMetadata,
    /// dotted column paths indexed by column id
    column_paths: Vec<String>,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    data_type: String,
    #[tabled(rename = "Column")]
    column_id: usize,
}

#[derive(Tabled)]
struct StreamRow {
    #[tabled(rename = "Column")]
    column: u32,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Start")]
    start: u64,
    #[tabled(rename = "Length")]
    length: String,
}

#[derive(Tabled)]
struct EncodingRow {
    #[tabled(rename = "Column")]
    column: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Encoding")]
    encoding: String,
}

#[derive(Tabled)]
struct StatisticsRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Values")]
    values: String,
    #[tabled(rename = "Nulls")]
    has_null: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
}

#[derive(Tabled)]
struct BloomFilterRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Hash")]
    hash: String,
    #[tabled(rename = "Functions")]
    num_hash_functions: u32,
    #[tabled(rename = "Bits set")]
    set_bits: String,
}

impl OrcInspector {
    pub fn open(path: &Path, options: &ReadOptions) -> Result<Self> {
        let metadata = read_metadata_from_path(path, options)
            .with_context(|| format!("Failed to read ORC metadata from {}", path.display()))?;
        Ok(Self::new(path, metadata))
    }

    /// Read from an arbitrary byte source; `path` is only used for display.
    pub fn from_source<S: ByteSource>(path: &Path, source: S, options: &ReadOptions) -> Result<Self> {
        let metadata = read_metadata(source, options)
            .with_context(|| format!("Failed to read ORC metadata from {}", path.display()))?;
        Ok(Self::new(path, metadata))
    }

    pub fn new(path: &Path, metadata: FileMetadata) -> Self {
        let column_paths = metadata
            .schema
            .as_ref()
            .map(column_paths)
            .unwrap_or_default();
        Self {
            file_path: path.to_path_buf(),
            metadata,
            column_paths,
        }
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    fn column_name(&self, column_id: usize) -> String {
        self.column_paths
            .get(column_id)
            .cloned()
            .unwrap_or_else(|| format!("column {column_id}"))
    }

    fn compression_summary(&self) -> String {
        let trailer = &self.metadata.trailer;
        if trailer.compression == CompressionKind::None {
            trailer.compression.to_string()
        } else {
            format!(
                "{} ({} blocks)",
                trailer.compression,
                format_bytes(trailer.compression_block_size)
            )
        }
    }

    pub fn render_default(&self, out: &mut dyn Write) -> Result<()> {
        let metadata = &self.metadata;
        writeln!(out, "{} {}", header(self.file_path.display()), dim("(ORC)"))?;
        writeln!(out)?;
        if let Some(rows) = metadata.number_of_rows {
            writeln!(out, "{:<14} {}", label("Rows:"), value(format_number(rows)))?;
        }
        if let Some(stripes) = &metadata.stripes {
            writeln!(out, "{:<14} {}", label("Stripes:"), value(stripes.len()))?;
        }
        writeln!(
            out,
            "{:<14} {}",
            label("File size:"),
            value(format_bytes(metadata.trailer.file_length))
        )?;
        writeln!(
            out,
            "{:<14} {}",
            label("Tail size:"),
            value(format_bytes(metadata.trailer.tail_length()))
        )?;
        writeln!(
            out,
            "{:<14} {}",
            label("Compression:"),
            value(self.compression_summary())
        )?;
        if metadata.trailer.version > CURRENT_VERSION {
            writeln!(
                out,
                "{:<14} {} {}",
                label("Version:"),
                value(&metadata.version),
                warning(format!("(newer than {CURRENT_VERSION})"))
            )?;
        } else {
            writeln!(out, "{:<14} {}", label("Version:"), value(&metadata.version))?;
        }
        if let Some(software) = &metadata.software_version {
            writeln!(out, "{:<14} {}", label("Software:"), value(software))?;
        }
        if let Some(stride) = metadata.row_index_stride {
            writeln!(
                out,
                "{:<14} {}",
                label("Index stride:"),
                value(format_number(u64::from(stride)))
            )?;
        }

        if let Some(schema) = &metadata.schema {
            let root = schema.root();
            writeln!(out)?;
            writeln!(out, "{} ({}):", header("Columns"), value(root.children.len()))?;
            let rows: Vec<FieldRow> = root
                .fields()
                .enumerate()
                .map(|(i, (name, child))| FieldRow {
                    name: name.map_or_else(|| format!("_{i}"), str::to_string),
                    data_type: child.to_string(),
                    column_id: child.column_id,
                })
                .collect();
            writeln!(out, "{}", rounded_table(rows))?;
        }

        Ok(())
    }

    pub fn render_schema(&self, out: &mut dyn Write) -> Result<()> {
        let Some(schema) = &self.metadata.schema else {
            return Ok(());
        };
        writeln!(
            out,
            "\n{} ({} columns):",
            header("Schema"),
            value(schema.node_count())
        )?;
        writeln!(out)?;
        writeln!(out, "  {}", dim(truncate_for_display(&schema.to_string())))?;
        writeln!(out)?;

        let mut stack: Vec<(&SchemaNode, Option<String>, usize)> = vec![(schema.root(), None, 0)];
        while let Some((node, name, depth)) = stack.pop() {
            let indent = "  ".repeat(depth + 1);
            let kind = type_label(node);
            match name {
                Some(name) => writeln!(
                    out,
                    "{indent}{}: {} {}",
                    header(name),
                    value(kind),
                    dim(format!("[{}]", node.column_id))
                )?,
                None => writeln!(
                    out,
                    "{indent}{} {}",
                    value(kind),
                    dim(format!("[{}]", node.column_id))
                )?,
            }
            for (key, attribute) in &node.attributes {
                writeln!(out, "{indent}  {}: {}", dim(key), attribute)?;
            }
            for (i, (field, child)) in node.fields().enumerate().rev() {
                let child_name = field
                    .map(str::to_string)
                    .unwrap_or_else(|| child_segment(node.kind, i));
                stack.push((child, Some(child_name), depth + 1));
            }
        }
        Ok(())
    }

    pub fn render_stats(&self, out: &mut dyn Write) -> Result<()> {
        let Some(statistics) = &self.metadata.file_statistics else {
            return Ok(());
        };
        writeln!(
            out,
            "\n{} {}:",
            header("Column Statistics"),
            dim("(file totals)")
        )?;
        writeln!(out)?;

        for stats in statistics {
            writeln!(
                out,
                "  {} {}",
                header(self.column_name(stats.column_id)),
                dim(format!("({})", stats.statistics.name()))
            )?;
            if let Some(n) = stats.number_of_values {
                writeln!(out, "    {}: {}", label("Values"), value(format_number(n)))?;
            }
            if let Some(has_null) = stats.has_null {
                writeln!(out, "    {}: {}", label("Has nulls"), value(yes_no(has_null)))?;
            }
            if let Some(bytes) = stats.bytes_on_disk {
                writeln!(out, "    {}: {}", label("On disk"), value(format_bytes(bytes)))?;
            }
            for (name, field) in statistics_fields(&stats.statistics) {
                writeln!(out, "    {}: {}", label(name), value(field))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn render_stripes(&self, out: &mut dyn Write) -> Result<()> {
        let Some(stripes) = &self.metadata.stripes else {
            return Ok(());
        };
        writeln!(out, "\n{} ({}):", header("Stripes"), value(stripes.len()))?;
        writeln!(out)?;

        for stripe in stripes {
            self.render_stripe(stripe, out)?;
        }
        Ok(())
    }

    fn render_stripe(&self, stripe: &StripeInformation, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "  {} {}", header("Stripe"), value(stripe.index))?;
        writeln!(out, "    {}: {}", label("Offset"), value(stripe.offset))?;
        writeln!(
            out,
            "    {}: {}",
            label("Rows"),
            value(format_number(stripe.number_of_rows))
        )?;
        writeln!(
            out,
            "    {}: {} {}",
            label("Length"),
            value(format_bytes(stripe.total_length())),
            dim(format!(
                "(index {}, data {}, footer {})",
                format_bytes(stripe.index_length),
                format_bytes(stripe.data_length),
                format_bytes(stripe.footer_length)
            ))
        )?;

        if let Some(footer) = &stripe.footer {
            if let Some(tz) = &footer.writer_timezone {
                writeln!(out, "    {}: {}", label("Timezone"), value(tz))?;
            }

            let encodings: Vec<EncodingRow> = footer
                .encodings
                .iter()
                .map(|encoding| EncodingRow {
                    column: encoding.column_id,
                    name: self.column_name(encoding.column_id),
                    encoding: encoding.to_string(),
                })
                .collect();
            writeln!(out, "    {} ({}):", label("Encodings"), value(encodings.len()))?;
            writeln!(out, "{}", indented_table(&rounded_table(encodings), 4))?;

            let streams: Vec<StreamRow> = footer
                .streams
                .iter()
                .map(|stream| StreamRow {
                    column: stream.column,
                    kind: stream.kind.name().to_string(),
                    start: stream.start,
                    length: format_bytes(stream.length),
                })
                .collect();
            writeln!(out, "    {} ({}):", label("Streams"), value(streams.len()))?;
            writeln!(out, "{}", indented_table(&rounded_table(streams), 4))?;
        }
        writeln!(out)?;
        Ok(())
    }

    pub fn render_stripe_stats(&self, out: &mut dyn Write) -> Result<()> {
        let Some(per_stripe) = &self.metadata.stripe_statistics else {
            return Ok(());
        };
        writeln!(
            out,
            "\n{} ({}):",
            header("Stripe Statistics"),
            value(per_stripe.len())
        )?;
        writeln!(out)?;

        for (index, statistics) in per_stripe.iter().enumerate() {
            writeln!(out, "  {} {}", header("Stripe"), value(index))?;
            let rows: Vec<StatisticsRow> = statistics
                .iter()
                .map(|stats| {
                    let (min, max) = min_max(&stats.statistics);
                    StatisticsRow {
                        column: self.column_name(stats.column_id),
                        values: stats
                            .number_of_values
                            .map(format_number)
                            .unwrap_or_default(),
                        has_null: stats.has_null.map(yes_no).unwrap_or_default().to_string(),
                        min,
                        max,
                    }
                })
                .collect();
            writeln!(out, "{}", indented_table(&rounded_table(rows), 2))?;
        }
        Ok(())
    }

    pub fn render_bloom_filters(&self, out: &mut dyn Write) -> Result<()> {
        let Some(per_stripe) = &self.metadata.stripe_statistics else {
            return Ok(());
        };
        writeln!(out, "\n{}:", header("Bloom Filters"))?;
        writeln!(out)?;

        for (index, statistics) in per_stripe.iter().enumerate() {
            writeln!(out, "  {} {}", header("Stripe"), value(index))?;
            let rows: Vec<BloomFilterRow> = statistics
                .iter()
                .filter_map(|stats| bloom_filter_row(self.column_name(stats.column_id), stats))
                .collect();
            if rows.is_empty() {
                writeln!(out, "    {}", dim("(none)"))?;
            } else {
                writeln!(out, "{}", indented_table(&rounded_table(rows), 2))?;
            }
        }
        Ok(())
    }

    pub fn render_metadata(&self, out: &mut dyn Write) -> Result<()> {
        render_metadata_map(out, "User Metadata", &self.metadata.user_metadata)
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut json = serde_json::to_value(&self.metadata)?;
        if let Value::Object(map) = &mut json {
            map.insert("format".to_string(), json!("orc"));
            map.insert(
                "file".to_string(),
                json!(self.file_path.display().to_string()),
            );
            if !self.column_paths.is_empty() {
                map.insert("columns".to_string(), json!(self.column_paths));
            }
        }
        Ok(json)
    }

    pub fn render_to_json(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "{}", serde_json::to_string(&self.to_json()?)?)?;
        Ok(())
    }
}

/// Dotted path of every column, indexed by column id.
///
/// Struct children use their field names; list, map and union children use
/// `_elem`, `_key`/`_value` and `_N`.
pub fn column_paths(schema: &Schema) -> Vec<String> {
    let mut paths = vec![String::new(); schema.node_count()];
    let mut stack = vec![(schema.root(), String::new())];
    while let Some((node, path)) = stack.pop() {
        for (i, (field, child)) in node.fields().enumerate() {
            let segment = field
                .map(str::to_string)
                .unwrap_or_else(|| child_segment(node.kind, i));
            let child_path = if path.is_empty() {
                segment
            } else {
                format!("{path}.{segment}")
            };
            stack.push((child, child_path));
        }
        if let Some(slot) = paths.get_mut(node.column_id) {
            *slot = if path.is_empty() {
                "(root)".to_string()
            } else {
                path
            };
        }
    }
    paths
}

fn child_segment(parent: TypeKind, index: usize) -> String {
    match (parent, index) {
        (TypeKind::List, _) => "_elem".to_string(),
        (TypeKind::Map, 0) => "_key".to_string(),
        (TypeKind::Map, _) => "_value".to_string(),
        _ => format!("_{index}"),
    }
}

/// Type of a node without its children spelled out.
fn type_label(node: &SchemaNode) -> String {
    if node.kind.is_compound() {
        node.kind.hive_name().to_string()
    } else {
        node.to_string()
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn format_date(days: i32) -> String {
    DateTime::from_timestamp_millis(i64::from(days) * MILLIS_PER_DAY)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| days.to_string())
}

fn format_timestamp(millis: i64, nanos: Option<u32>, utc: bool) -> String {
    let datetime: Option<DateTime<Utc>> = DateTime::from_timestamp_millis(millis).and_then(|dt| {
        dt.checked_add_signed(TimeDelta::nanoseconds(i64::from(nanos.unwrap_or(0))))
    });
    let zone = if utc { "UTC" } else { "writer local" };
    datetime
        .map(|dt| format!("{} {}", dt.format("%Y-%m-%d %H:%M:%S%.f"), dim(zone)))
        .unwrap_or_else(|| millis.to_string())
}

fn display<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn min_max(stats: &TypedStatistics) -> (String, String) {
    match stats {
        TypedStatistics::Integer { minimum, maximum, .. } => (display(minimum), display(maximum)),
        TypedStatistics::Double { minimum, maximum, .. } => (display(minimum), display(maximum)),
        TypedStatistics::String {
            minimum,
            maximum,
            lower_bound,
            upper_bound,
            ..
        } => (
            truncate_for_display(&display(&minimum.as_ref().or(lower_bound.as_ref()))),
            truncate_for_display(&display(&maximum.as_ref().or(upper_bound.as_ref()))),
        ),
        TypedStatistics::Decimal { minimum, maximum, .. } => (display(minimum), display(maximum)),
        TypedStatistics::Date { minimum, maximum } => (
            minimum.map(format_date).unwrap_or_default(),
            maximum.map(format_date).unwrap_or_default(),
        ),
        TypedStatistics::Timestamp {
            minimum,
            maximum,
            minimum_nanos,
            maximum_nanos,
            utc,
        } => (
            minimum
                .map(|ms| format_timestamp(ms, *minimum_nanos, *utc))
                .unwrap_or_default(),
            maximum
                .map(|ms| format_timestamp(ms, *maximum_nanos, *utc))
                .unwrap_or_default(),
        ),
        TypedStatistics::Collection {
            min_children,
            max_children,
            ..
        } => (display(min_children), display(max_children)),
        TypedStatistics::Bucket { .. }
        | TypedStatistics::Binary { .. }
        | TypedStatistics::Structural => (String::new(), String::new()),
    }
}

/// Label/value pairs for the typed part of a column's statistics.
fn statistics_fields(stats: &TypedStatistics) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    let (min, max) = min_max(stats);
    let (min_label, max_label) = match stats {
        TypedStatistics::String {
            minimum: None,
            lower_bound: Some(_),
            ..
        } => ("Lower bound", "Upper bound"),
        TypedStatistics::Collection { .. } => ("Min children", "Max children"),
        _ => ("Min", "Max"),
    };
    if !min.is_empty() {
        fields.push((min_label, min));
    }
    if !max.is_empty() {
        fields.push((max_label, max));
    }

    match stats {
        TypedStatistics::Integer { sum: Some(sum), .. } => fields.push(("Sum", sum.to_string())),
        TypedStatistics::Double { sum: Some(sum), .. } => fields.push(("Sum", sum.to_string())),
        TypedStatistics::Decimal { sum: Some(sum), .. } => fields.push(("Sum", sum.clone())),
        TypedStatistics::String {
            total_length: Some(len),
            ..
        }
        | TypedStatistics::Binary {
            total_length: Some(len),
        } => fields.push(("Total length", len.to_string())),
        TypedStatistics::Bucket { counts } => {
            if let Some(true_count) = counts.first() {
                fields.push(("True count", format_number(*true_count)));
            }
        }
        TypedStatistics::Collection {
            total_children: Some(total),
            ..
        } => fields.push(("Total children", format_number(*total))),
        _ => {}
    }
    fields
}

fn bloom_filter_row(column: String, stats: &ColumnStatistics) -> Option<BloomFilterRow> {
    let filter = stats.bloom_filter.as_ref()?;
    Some(BloomFilterRow {
        column,
        hash: format!("{:?}", filter.hash).to_lowercase(),
        num_hash_functions: filter.num_hash_functions,
        set_bits: format!(
            "{} / {}",
            format_number(u64::from(filter.set_bits())),
            format_number(filter.bit_count() as u64)
        ),
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::utils::test_data::TestOrc;

    fn inspector(file: Bytes, options: &ReadOptions) -> OrcInspector {
        OrcInspector::from_source(Path::new("test.orc"), file, options).unwrap()
    }

    fn rendered(f: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_column_paths() {
        let metadata = read_metadata(TestOrc::multi_stripe(), &ReadOptions::new().with_schema(true))
            .unwrap();
        let paths = column_paths(metadata.schema.as_ref().unwrap());
        assert_eq!(
            paths,
            vec!["(root)", "id", "name", "tags", "tags._elem", "ts"]
        );
    }

    #[test]
    fn test_render_default() {
        let inspector = inspector(
            TestOrc::multi_stripe(),
            &ReadOptions::new().with_schema(true).with_stripes(true),
        );
        let text = rendered(|out| inspector.render_default(out));
        assert!(text.contains("test.orc"));
        assert!(text.contains("300"));
        assert!(text.contains("array<string>"));
        assert!(text.contains("0.12 with ORC-135"));
    }

    #[test]
    fn test_render_sections() {
        let inspector = inspector(TestOrc::multi_stripe(), &ReadOptions::all());
        let stats = rendered(|out| inspector.render_stats(out));
        assert!(stats.contains("tags._elem"));
        assert!(stats.contains("alpha"));

        let stripes = rendered(|out| inspector.render_stripes(out));
        assert!(stripes.contains("Stripes"));
        assert!(stripes.contains("DATA"));

        let stripe_stats = rendered(|out| inspector.render_stripe_stats(out));
        assert!(stripe_stats.contains("299"));

        let metadata = rendered(|out| inspector.render_metadata(out));
        assert!(metadata.contains("created_by"));
    }

    #[test]
    fn test_render_schema_keeps_field_order() {
        let inspector = inspector(TestOrc::multi_stripe(), &ReadOptions::new().with_schema(true));
        let text = rendered(|out| inspector.render_schema(out));
        let tree = text.split("\n\n").last().unwrap();
        let position = |name: &str| {
            tree.find(name)
                .unwrap_or_else(|| panic!("{name} missing from:\n{tree}"))
        };
        assert!(position("id") < position("name"));
        assert!(position("name") < position("tags"));
        assert!(position("tags") < position("_elem"));
        assert!(position("_elem") < position("ts"));
    }

    #[test]
    fn test_sections_without_facets_render_nothing() {
        let inspector = inspector(TestOrc::single_row(), &ReadOptions::default());
        assert!(rendered(|out| inspector.render_schema(out)).is_empty());
        assert!(rendered(|out| inspector.render_stats(out)).is_empty());
        assert!(rendered(|out| inspector.render_stripes(out)).is_empty());
    }

    #[test]
    fn test_json_carries_format_and_file() {
        let inspector = inspector(TestOrc::single_row(), &ReadOptions::all());
        let json = inspector.to_json().unwrap();
        assert_eq!(json["format"], "orc");
        assert_eq!(json["file"], "test.orc");
        assert_eq!(json["number_of_rows"], 1);
        assert_eq!(json["schema"]["type"], "struct<x:bigint>");
        assert_eq!(json["columns"][1], "x");
    }

    #[test]
    fn test_format_date_and_timestamp() {
        assert_eq!(format_date(0), "1970-01-01");
        assert_eq!(format_date(19_723), "2024-01-01");
        assert!(format_timestamp(1_000, Some(500), true).starts_with("1970-01-01 00:00:01.0000005"));
    }
}
