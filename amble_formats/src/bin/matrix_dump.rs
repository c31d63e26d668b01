use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use amble_formats::BoxMatrix;

/// Prints the compressed rows of an encoded walkbox routing table.
#[derive(Parser, Debug)]
#[command(about = "Inspect an encoded walkbox routing table", version)]
struct Args {
    /// Routing table byte file, one terminated triplet row per box
    table: PathBuf,

    /// Number of walkboxes the table was built for
    #[arg(long)]
    boxes: usize,

    /// Emit the decoded table as JSON instead of the column view
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bytes = fs::read(&args.table)
        .with_context(|| format!("reading routing table {}", args.table.display()))?;
    let matrix = BoxMatrix::decode(&bytes, args.boxes)
        .with_context(|| format!("decoding routing table {}", args.table.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&matrix)?);
        return Ok(());
    }

    println!(
        "{} rows in {} ({} bytes)",
        matrix.box_count(),
        args.table.display(),
        bytes.len()
    );
    for (from, row) in matrix.rows().iter().enumerate() {
        let spans: Vec<String> = row
            .iter()
            .map(|span| {
                if span.low == span.high {
                    format!("{} via {}", span.low, span.via)
                } else {
                    format!("{}-{} via {}", span.low, span.high, span.via)
                }
            })
            .collect();
        if spans.is_empty() {
            println!("{from:>4} (unreachable)");
        } else {
            println!("{from:>4} {spans}", spans = spans.join(", "));
        }
    }
    Ok(())
}
