//! ISDB CLI
//!
//! Command-line interface for the Interactive Sound Installations Database:
//! - Serving the sunburst dashboard over HTTP (`isdb serve`)
//! - Inspecting hierarchies, tags and glossary from a terminal
//! - Checking a dataset revision against the taxonomy (`isdb check`)

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use isdb_catalog::{Catalog, Dimension, Listing};

mod server;

const DATA_ENV: &str = "ISDB_DATA";
const TAXONOMY_ENV: &str = "ISDB_TAXONOMY";
const DEFAULT_DATA: &str = "data/installations.csv";

#[derive(Parser)]
#[command(name = "isdb")]
#[command(
    author,
    version,
    about = "ISDB: explore interactive sound installations by tag"
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// Raise log verbosity (`-v` info, `-vv` debug, `-vvv` trace). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Installation spreadsheet (CSV). Falls back to `$ISDB_DATA`, then `data/installations.csv`.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Taxonomy JSON. Falls back to `$ISDB_TAXONOMY`, then the builtin taxonomy.
    #[arg(long, global = true)]
    taxonomy: Option<PathBuf>,
}

impl SourceArgs {
    fn data_path(&self) -> PathBuf {
        self.data
            .clone()
            .or_else(|| env::var_os(DATA_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA))
    }

    fn taxonomy_path(&self) -> Option<PathBuf> {
        self.taxonomy
            .clone()
            .or_else(|| env::var_os(TAXONOMY_ENV).map(PathBuf::from))
    }

    fn load(&self) -> Result<Catalog> {
        let data = self.data_path();
        let taxonomy = self.taxonomy_path();
        Catalog::load(&data, taxonomy.as_deref())
            .with_context(|| format!("failed to load catalog from {}", data.display()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard and its JSON API.
    Serve(ServeArgs),

    /// Print the sunburst hierarchy of one dimension.
    Sunburst {
        /// Dimension code or name (`AI`, `SD`, `IN`, `FI`).
        #[arg(long, default_value = "AI")]
        dimension: String,
        /// Output format: `json` or `table`.
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Print the dropdown options (every leaf tag, captioned `parent | label`).
    Tags {
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List installations carrying every given tag.
    List {
        /// Tag label; repeat for a conjunction (`--tag Touch --tag Music`).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Dimension whose labels win when a label is ambiguous.
        #[arg(long, default_value = "AI")]
        dimension: String,
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Print the glossary of dimensions, groups and tags.
    Glossary {
        /// Output format: `json` or `text`.
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check the dataset against the taxonomy.
    Check,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    /// Listen address (use `127.0.0.1:0` to auto-pick a free port).
    #[arg(long, default_value = "127.0.0.1:8050")]
    listen: std::net::SocketAddr,

    /// Write `{version, addr, pid}` JSON here once listening.
    #[arg(long)]
    ready_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Table,
    Text,
}

impl OutputFormat {
    fn parse(s: &str, allowed: &[OutputFormat]) -> Result<Self> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "table" | "tsv" => Self::Table,
            "text" | "txt" => Self::Text,
            other => return Err(anyhow!("unknown output format `{other}`")),
        };
        if !allowed.contains(&format) {
            let expected: Vec<&str> = allowed.iter().map(|f| f.name()).collect();
            return Err(anyhow!(
                "output format `{}` not supported here (expected {})",
                format.name(),
                expected.join("|")
            ));
        }
        Ok(format)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Table => "table",
            Self::Text => "text",
        }
    }
}

fn init_tracing(verbose: u8, serving: bool) {
    let default = match (verbose, serving) {
        (0, false) => "warn",
        (0, true) | (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Serve(_)));

    match cli.command {
        Commands::Serve(args) => server::cmd_serve(&cli.source, args),
        Commands::Sunburst { dimension, format } => cmd_sunburst(&cli.source, &dimension, &format),
        Commands::Tags { format } => cmd_tags(&cli.source, &format),
        Commands::List {
            tags,
            dimension,
            format,
        } => cmd_list(&cli.source, &tags, &dimension, &format),
        Commands::Glossary { format } => cmd_glossary(&cli.source, &format),
        Commands::Check => cmd_check(&cli.source),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_sunburst(source: &SourceArgs, dimension: &str, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format, &[OutputFormat::Json, OutputFormat::Table])?;
    let dimension = Dimension::parse(dimension)?;
    let catalog = source.load()?;

    let figure = catalog.figure(dimension);
    if format == OutputFormat::Json {
        return print_json(&figure);
    }

    println!(
        "{} {} ({} installations, {} nodes)",
        "sunburst".green().bold(),
        figure.name.bold(),
        figure.installations,
        figure.ids.len()
    );
    println!("id\tlabel\tparent\tvalue");
    for i in 0..figure.ids.len() {
        println!(
            "{}\t{}\t{}\t{}",
            figure.ids[i],
            isdb_catalog::taxonomy::strip_marker(&figure.labels[i]),
            figure.parents[i],
            figure.values[i]
        );
    }
    Ok(())
}

fn cmd_tags(source: &SourceArgs, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format, &[OutputFormat::Json, OutputFormat::Table])?;
    let catalog = source.load()?;
    let options = catalog.tags().dropdown_options();
    if format == OutputFormat::Json {
        return print_json(&options);
    }
    for entry in catalog.tags().entries() {
        println!("{}\t{}\t{}", entry.dimension.code(), entry.id, entry.caption());
    }
    Ok(())
}

fn cmd_list(source: &SourceArgs, tags: &[String], dimension: &str, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format, &[OutputFormat::Json, OutputFormat::Table])?;
    let dimension = Dimension::parse(dimension)?;
    let catalog = source.load()?;

    let listing = catalog.listing(tags, None, dimension);
    if format == OutputFormat::Json {
        return print_json(&listing);
    }

    match &listing {
        Listing::Everything { prompt, .. } => eprintln!("{} {prompt}", "info:".yellow().bold()),
        Listing::Filtered { chosen, count, .. } => eprintln!(
            "{} {count} installation(s) for {}",
            "ok".green().bold(),
            chosen.join(", ")
        ),
        Listing::NoMatch { chosen, message } => {
            eprintln!("{} {message} ({})", "info:".yellow().bold(), chosen.join(", "));
            return Ok(());
        }
    }

    println!("{}", catalog.display_columns().join("\t"));
    for row in listing.rows() {
        let cells: Vec<&str> = row.cells.iter().map(|c| c.text.as_str()).collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}

fn cmd_glossary(source: &SourceArgs, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format, &[OutputFormat::Json, OutputFormat::Text])?;
    let catalog = source.load()?;
    let glossary = catalog.glossary();
    match format {
        OutputFormat::Json => print_json(&glossary),
        _ => {
            print!("{}", glossary.render_text());
            Ok(())
        }
    }
}

fn cmd_check(source: &SourceArgs) -> Result<()> {
    let catalog = source.load()?;
    let report = catalog.report();

    for column in &report.missing_columns {
        eprintln!("{} declared tag column missing from dataset: {column}", "warn:".yellow().bold());
    }
    for column in &report.unmapped_columns {
        eprintln!("{} dataset column not used by the taxonomy: {column}", "info:".yellow().bold());
    }
    for leaf in &report.empty_leaves {
        eprintln!("{} no installation carries {leaf}", "info:".yellow().bold());
    }

    let nodes: usize = catalog.hierarchies().iter().map(|h| h.len()).sum();
    eprintln!(
        "{} {} installations, {} tags, {} sunburst nodes",
        "ok".green().bold(),
        report.installations,
        catalog.tags().len(),
        nodes
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_respects_allowed_set() {
        let both = [OutputFormat::Json, OutputFormat::Table];
        assert_eq!(OutputFormat::parse(" JSON ", &both).unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("tsv", &both).unwrap(), OutputFormat::Table);
        assert!(OutputFormat::parse("text", &both).is_err());
        assert!(OutputFormat::parse("yaml", &both).is_err());
    }

    #[test]
    fn explicit_data_flag_wins() {
        let source = SourceArgs {
            data: Some(PathBuf::from("/tmp/sheet.csv")),
            taxonomy: None,
        };
        assert_eq!(source.data_path(), PathBuf::from("/tmp/sheet.csv"));
    }

    #[test]
    fn cli_parses_repeated_tags() {
        let cli = Cli::try_parse_from([
            "isdb", "--data", "x.csv", "list", "--tag", "Touch", "--tag", "Music", "--dimension", "FI",
        ])
        .unwrap();
        assert_eq!(cli.source.data, Some(PathBuf::from("x.csv")));
        match cli.command {
            Commands::List { tags, dimension, .. } => {
                assert_eq!(tags, vec!["Touch".to_string(), "Music".to_string()]);
                assert_eq!(dimension, "FI");
            }
            _ => panic!("expected list"),
        }
    }
}
