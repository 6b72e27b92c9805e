//! Command-line tool for Pica+ plaintext dumps.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use pica_parse::framer::{BlockReader, TagMap};
use pica_parse::reader::{open_dump, read_lines};
use pica_parse::tsv::{frequency_rank, TsvWriter, DEFAULT_TAGS};
use pica_parse::{IndexedReader, OffsetIndex, PicaConfig};

#[derive(Parser, Debug)]
#[command(name = "pica", version, about = "Stream, index and export Pica+ plaintext dumps")]
struct Cli {
    /// Subfield separator character
    #[arg(long, global = true, default_value_t = pica_parse::config::DEFAULT_SEPARATOR)]
    separator: char,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a dump as tab-separated values on standard output
    Tsv {
        /// Dump file, plain or gzip-compressed
        file: PathBuf,

        /// Order columns by how many records contain each tag
        #[arg(short = 'f', long, alias = "freq-sort")]
        frequency: bool,

        /// Tags to export (defaults to a standard column list)
        #[arg(short = 'd', long = "tags", alias = "field-list", num_args = 1..)]
        tags: Vec<String>,

        /// Join repeated fields with this string instead of adding rows
        #[arg(short = 'j', long, alias = "join-multi")]
        join: Option<String>,
    },

    /// Build an offset index for a dump and write it to disk
    Index {
        /// Uncompressed dump file
        dump: PathBuf,

        /// Destination of the index table
        output: PathBuf,
    },

    /// Print records by key using a persisted index
    Show {
        /// Index table written by `pica index`
        index: PathBuf,

        /// Record keys to print
        #[arg(required = true)]
        keys: Vec<String>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count the records of a dump
    Count {
        /// Dump file, plain or gzip-compressed
        dump: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = PicaConfig::default().with_separator(cli.separator);

    match cli.command {
        Command::Tsv {
            file,
            frequency,
            tags,
            join,
        } => export_tsv(&file, frequency, tags, join, &config),
        Command::Index { dump, output } => {
            let index = OffsetIndex::build_with_config(&dump, &config)
                .with_context(|| format!("indexing {}", dump.display()))?;
            index
                .persist(&output)
                .with_context(|| format!("writing index to {}", output.display()))?;
            info!("Wrote {} keys to {}", index.len(), output.display());
            Ok(())
        },
        Command::Show { index, keys, json } => show(&index, &keys, json, config),
        Command::Count { dump } => {
            let source = open_dump(&dump).with_context(|| format!("opening {}", dump.display()))?;
            let mut count = 0usize;
            for block in read_lines(source) {
                block.with_context(|| format!("reading {}", dump.display()))?;
                count += 1;
            }
            println!("{count}");
            Ok(())
        },
    }
}

fn export_tsv(
    file: &Path,
    frequency: bool,
    tags: Vec<String>,
    join: Option<String>,
    config: &PicaConfig,
) -> Result<()> {
    let mut tags = if tags.is_empty() {
        DEFAULT_TAGS.iter().map(ToString::to_string).collect()
    } else {
        tags
    };
    if frequency {
        let source = open_dump(file).with_context(|| format!("opening {}", file.display()))?;
        tags = frequency_rank(source, tags.as_slice(), config).context("counting tag frequencies")?;
        info!("Exporting {} columns", tags.len());
    }

    let stdout = io::stdout();
    let mut writer = TsvWriter::new(BufWriter::new(stdout.lock()), tags);
    if let Some(join) = join {
        writer = writer.with_join(join);
    }

    let source = open_dump(file).with_context(|| format!("opening {}", file.display()))?;
    writer.write_header()?;
    let records = writer
        .write_all(BlockReader::<_, TagMap>::with_config(source, config.clone()))
        .with_context(|| format!("exporting {}", file.display()))?;
    writer.flush()?;
    info!("Exported {records} records ({} rows)", writer.rows_written());
    Ok(())
}

fn show(index: &Path, keys: &[String], json: bool, config: PicaConfig) -> Result<()> {
    let index = OffsetIndex::load(index).with_context(|| format!("loading {}", index.display()))?;
    let mut reader = IndexedReader::open_with_config(index, config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for key in keys {
        let record = reader
            .fetch(key)
            .with_context(|| format!("fetching record {key}"))?;
        if json {
            writeln!(out, "{}", record.to_json_pretty()?)?;
        } else {
            writeln!(out, "PPN {key}")?;
            writeln!(out, "{record}")?;
        }
    }
    out.flush()?;
    Ok(())
}
