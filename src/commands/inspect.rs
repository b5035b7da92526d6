//! Inspect, identify and codecs commands.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

use crate::{
    CodecsArgs, IdentifyArgs, InspectArgs,
    format::compression::{CodecSet, CompressionKind},
    inspection::{
        OrcInspector, detect_format,
        style::{dim, header, label, value},
    },
    sources::{FileSource, TailBytes},
};

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let options = args.read_options();
    let inspector = match args.tail_bytes {
        Some(tail_bytes) => {
            let mut source = FileSource::open(&args.file)
                .with_context(|| format!("Failed to open {}", args.file))?;
            let tail = TailBytes::fetch(&mut source, tail_bytes)
                .with_context(|| format!("Failed to read the tail of {}", args.file))?;
            debug!(start = tail.start(), "reading from file tail only");
            OrcInspector::from_source(args.file.as_std_path(), tail, &options)?
        }
        None => OrcInspector::open(args.file.as_std_path(), &options)?,
    };

    let mut out = io::stdout();

    if args.format.resolves_to_json() {
        inspector.render_to_json(&mut out)?;
        return Ok(());
    }

    inspector.render_default(&mut out)?;

    if args.schema {
        inspector.render_schema(&mut out)?;
    }

    if args.stats {
        inspector.render_stats(&mut out)?;
    }

    if args.stripes {
        inspector.render_stripes(&mut out)?;
    }

    if args.stripe_stats {
        inspector.render_stripe_stats(&mut out)?;
    }

    if args.bloom_filters {
        inspector.render_bloom_filters(&mut out)?;
    }

    if args.metadata {
        inspector.render_metadata(&mut out)?;
    }

    out.flush()?;
    Ok(())
}

pub fn run_identify(args: &IdentifyArgs) -> Result<()> {
    let format = detect_format(args.file.as_std_path())?;

    if args.format.resolves_to_json() {
        println!("{}", serde_json::to_string(&format.to_json())?);
    } else {
        println!("{}", format);
    }

    Ok(())
}

pub fn run_codecs(args: &CodecsArgs) -> Result<()> {
    let linked = CodecSet::linked();

    if args.format.resolves_to_json() {
        let codecs: Vec<_> = CompressionKind::ALL
            .iter()
            .map(|kind| json!({ "codec": kind, "linked": linked.contains(*kind) }))
            .collect();
        println!("{}", serde_json::to_string(&codecs)?);
        return Ok(());
    }

    let mut out = io::stdout();
    writeln!(out, "{}:", header("Compression codecs"))?;
    for kind in CompressionKind::ALL {
        let status = if linked.contains(kind) {
            value("linked")
        } else {
            dim("not linked")
        };
        writeln!(out, "  {:<8} {}", label(kind), status)?;
    }
    out.flush()?;
    Ok(())
}
