use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::catalog::store::GenomeCatalog;
use crate::cli::OutputFormat;
use crate::codec::{CodecLayout, LongTable, OccurrenceCodec};
use crate::parsing::shard::read_shard_file;

#[derive(Args)]
pub struct DecodeArgs {
    /// Encoded values (decimal, or hex with a 0x prefix)
    pub values: Vec<String>,

    /// Path to genome catalog file
    #[arg(long, required = true)]
    pub catalog: PathBuf,

    /// Decode every value of a shard batch file, using its long table
    #[arg(long, conflicts_with = "long_table")]
    pub shard: Option<PathBuf>,

    /// Long table JSON for extended values (`{"<genome index>": [coordinates]}`)
    #[arg(long)]
    pub long_table: Option<PathBuf>,

    /// Coordinate width the values were encoded with
    #[arg(long, default_value = "22", value_parser = clap::value_parser!(u8).range(1..=48))]
    pub coordinate_bits: u8,
}

fn parse_value(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| anyhow::anyhow!("Invalid encoded value: '{s}'"))
}

/// Execute decode subcommand
///
/// # Errors
///
/// Returns an error if the catalog, shard, or long table cannot be read, or a
/// value is not a number. Values that fail to decode are reported, not fatal.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DecodeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let catalog = Arc::new(GenomeCatalog::load_from_file(&args.catalog)?);
    let codec = OccurrenceCodec::new(catalog, CodecLayout::new(args.coordinate_bits)?);

    let mut values = args
        .values
        .iter()
        .map(|v| parse_value(v))
        .collect::<anyhow::Result<Vec<u64>>>()?;

    let long_table = if let Some(path) = &args.shard {
        let batch = read_shard_file(path)?;
        if verbose {
            eprintln!(
                "Shard {}: {} values, {} long-table entries",
                batch.shard_id,
                batch.values.len(),
                batch.long_table.len()
            );
        }
        values.extend(batch.values);
        batch.long_table
    } else if let Some(path) = &args.long_table {
        serde_json::from_str(&std::fs::read_to_string(path)?)?
    } else {
        LongTable::new()
    };

    if values.is_empty() {
        anyhow::bail!("No values to decode: give values or --shard");
    }

    let decoded: Vec<_> = values
        .iter()
        .map(|&value| (value, codec.decode_any(value, &long_table)))
        .collect();

    match format {
        OutputFormat::Text => {
            for (value, result) in &decoded {
                match result {
                    Ok(occurrence) => println!("{value:#x}\t{occurrence}"),
                    Err(e) => println!("{value:#x}\tERROR: {e}"),
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = decoded
                .iter()
                .map(|(value, result)| match result {
                    Ok(occurrence) => serde_json::json!({
                        "value": value,
                        "occurrence": occurrence,
                    }),
                    Err(e) => serde_json::json!({
                        "value": value,
                        "error": e.to_string(),
                    }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("value\tgenome_id\tcoordinate\tstrand\terror");
            for (value, result) in &decoded {
                match result {
                    Ok(o) => println!("{value}\t{}\t{}\t{}\t", o.genome_id, o.coordinate, o.strand),
                    Err(e) => println!("{value}\t\t\t\t{e}"),
                }
            }
        }
    }

    Ok(())
}
