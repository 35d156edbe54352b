use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::catalog::builder::GenomeBuilder;
use crate::catalog::store::GenomeCatalog;
use crate::cli::OutputFormat;
use crate::core::types::GenomeId;

#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List all genomes in the catalog
    List {
        /// Path to catalog file
        #[arg(required = true)]
        catalog: PathBuf,

        /// Only list genomes of this taxon
        #[arg(long)]
        taxon: Option<String>,
    },

    /// Show details of a specific genome
    Show {
        /// Genome ID
        #[arg(required = true)]
        id: String,

        /// Path to catalog file
        #[arg(long, required = true)]
        catalog: PathBuf,

        /// Show all sequences
        #[arg(long)]
        all_sequences: bool,
    },

    /// Build a genome entry from FASTA or FASTA index files
    Build {
        /// Unique genome ID (e.g., "GCF_000217635.1")
        #[arg(long, required = true)]
        id: String,

        /// Taxon name used for inclusion/exclusion filters
        #[arg(long, required = true)]
        taxon: String,

        /// Organism name (defaults to the taxon)
        #[arg(long)]
        organism: Option<String>,

        /// Input file(s) - can be specified multiple times
        /// Supported formats: .fai, .fa/.fasta/.fna (optionally gzipped)
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output file (JSON). If not specified, prints to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append to existing catalog file
        #[arg(long)]
        append_to: Option<PathBuf>,

        /// Replace the genome if its ID already exists in the catalog
        #[arg(long)]
        force: bool,
    },
}

/// Execute catalog subcommand
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or written, or the genome
/// cannot be built from its inputs.
pub fn run(args: CatalogArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        CatalogCommands::List { catalog, taxon } => {
            run_list(&catalog, taxon.as_deref(), format, verbose)
        }
        CatalogCommands::Show {
            id,
            catalog,
            all_sequences,
        } => run_show(&id, &catalog, all_sequences, format),
        CatalogCommands::Build {
            id,
            taxon,
            organism,
            inputs,
            output,
            append_to,
            force,
        } => run_build(
            id, taxon, organism, inputs, output, append_to, force, format, verbose,
        ),
    }
}

fn run_list(
    catalog_path: &Path,
    taxon_filter: Option<&str>,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let catalog = GenomeCatalog::load_from_file(catalog_path)?;

    if verbose {
        eprintln!(
            "Loaded catalog with {} genomes and {} genes",
            catalog.len(),
            catalog.genes.len()
        );
    }

    let filtered: Vec<_> = catalog
        .genomes
        .iter()
        .enumerate()
        .filter(|(_, g)| taxon_filter.map_or(true, |t| g.taxon.eq_ignore_ascii_case(t)))
        .collect();

    match format {
        OutputFormat::Text => {
            let id_width = filtered
                .iter()
                .map(|(_, g)| g.id.as_str().len())
                .max()
                .unwrap_or(2)
                .max(2);
            let taxon_width = filtered
                .iter()
                .map(|(_, g)| g.taxon.len().min(35))
                .max()
                .unwrap_or(5)
                .max(5);

            println!("Genome Catalog ({} genomes)\n", filtered.len());
            println!(
                "{:>6} {:<id_w$} {:<tx_w$} {:>12}",
                "Index",
                "ID",
                "Taxon",
                "Size",
                id_w = id_width,
                tx_w = taxon_width
            );
            println!("{}", "-".repeat(id_width + taxon_width + 6 + 12 + 3));

            for (index, g) in &filtered {
                println!(
                    "{:>6} {:<id_w$} {:<tx_w$} {:>12}",
                    index,
                    g.id.as_str(),
                    truncate(&g.taxon, taxon_width),
                    g.size,
                    id_w = id_width,
                    tx_w = taxon_width
                );
                if verbose {
                    println!("       └─ {}", g.organism);
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = filtered
                .iter()
                .map(|(index, g)| {
                    serde_json::json!({
                        "index": index,
                        "id": g.id,
                        "taxon": g.taxon,
                        "organism": g.organism,
                        "size": g.size,
                        "sequences": g.sequences.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("index\tid\ttaxon\torganism\tsize\tsequences");
            for (index, g) in &filtered {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    index,
                    g.id,
                    g.taxon,
                    g.organism,
                    g.size,
                    g.sequences.len()
                );
            }
        }
    }

    Ok(())
}

fn run_show(
    id: &str,
    catalog_path: &Path,
    all_sequences: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let catalog = GenomeCatalog::load_from_file(catalog_path)?;

    let genome_id = GenomeId::new(id);
    let genome = catalog
        .get(&genome_id)
        .ok_or_else(|| anyhow::anyhow!("Genome '{}' not found", id))?;
    let index = catalog.index_of(&genome_id).unwrap_or_default();
    let genes: Vec<_> = catalog
        .genes
        .iter()
        .filter(|g| g.genome_id == genome_id)
        .collect();

    match format {
        OutputFormat::Text => {
            println!("Genome: {}\n", genome.id);
            println!("Index:     {index}");
            println!("Taxon:     {}", genome.taxon);
            println!("Organism:  {}", genome.organism);
            println!("Size:      {}", genome.size);
            println!("Sequences: {}", genome.sequences.len());
            println!("Genes:     {}", genes.len());

            if !genome.sequences.is_empty() {
                let to_show = if all_sequences {
                    &genome.sequences[..]
                } else {
                    &genome.sequences[..genome.sequences.len().min(25)]
                };

                println!("\nSequences:");
                println!("{:<25} {:>15} Header", "Name", "Length");
                println!("{}", "-".repeat(80));
                for sequence in to_show {
                    println!(
                        "{:<25} {:>15} {}",
                        sequence.name,
                        sequence.length,
                        sequence.header.as_deref().unwrap_or("-")
                    );
                }

                if !all_sequences && genome.sequences.len() > 25 {
                    println!(
                        "\n... and {} more sequences (use --all-sequences to show all)",
                        genome.sequences.len() - 25
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "index": index,
                "genome": genome,
                "genes": genes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("name\tlength\theader");
            for sequence in &genome.sequences {
                println!(
                    "{}\t{}\t{}",
                    sequence.name,
                    sequence.length,
                    sequence.header.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_build(
    id: String,
    taxon: String,
    organism: Option<String>,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    append_to: Option<PathBuf>,
    force: bool,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut builder = GenomeBuilder::new(&id).taxon(taxon);
    if let Some(organism) = organism {
        builder = builder.organism(organism);
    }

    for input_path in &inputs {
        if !input_path.exists() {
            anyhow::bail!("Input file not found: {}", input_path.display());
        }

        if verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        builder.add_input(input_path)?;
    }

    let genome = builder.build()?;

    if verbose {
        eprintln!(
            "Built genome '{}': {} sequences, {} bases",
            genome.id,
            genome.sequences.len(),
            genome.size
        );
    }

    if let Some(catalog_path) = append_to {
        let mut catalog = if catalog_path.exists() {
            GenomeCatalog::load_from_file(&catalog_path)?
        } else {
            GenomeCatalog::new()
        };

        let index = if catalog.contains(&genome.id) {
            if !force {
                anyhow::bail!(
                    "Genome '{}' already exists in catalog. Use --force to overwrite.",
                    id
                );
            }
            eprintln!("Warning: Overwriting existing genome '{id}'");
            catalog.replace_genome(genome)?
        } else {
            catalog.add_genome(genome)?
        };

        std::fs::write(&catalog_path, catalog.to_json()?)?;

        println!(
            "Added genome '{}' at index {} to {} ({} total genomes)",
            id,
            index,
            catalog_path.display(),
            catalog.len()
        );
    } else if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&genome)?;
        std::fs::write(&output_path, &json)?;
        println!("Wrote genome '{}' to {}", id, output_path.display());
    } else {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&genome)?);
            }
            OutputFormat::Text | OutputFormat::Tsv => {
                println!("Genome:    {}", genome.id);
                println!("Taxon:     {}", genome.taxon);
                println!("Organism:  {}", genome.organism);
                println!("Size:      {}", genome.size);
                println!("Sequences: {}", genome.sequences.len());
                println!();
                println!("Use --output <file> to save as JSON");
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
