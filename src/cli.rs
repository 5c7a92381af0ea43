//! Command-line front end over the query pipeline.
//!
//! The CLI owns all user-facing printing and error display; the core modules
//! only return results.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::api::HttpRepositoryApi;
use crate::config::Settings;
use crate::export::DEFAULT_CSV_DELIMITER;
use crate::load_config::load_config;
use crate::pagination::WindowingMode;
use crate::query::RepositoryQuery;
use crate::usage;

/// CLI for ir-query: retrieve and export repository collection records.
#[derive(Parser)]
#[clap(
    name = "ir-query",
    version,
    about = "Query, normalize and export bibliographic records from a repository JSON API"
)]
pub struct Cli {
    /// Path to the YAML settings file
    #[clap(long, global = true, default_value = "ir-query.yaml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the configured collections and their PIDs
    ListCollections,
    /// Retrieve one collection and export it
    ExportCollection {
        /// Collection PID
        pid: String,
        #[clap(flatten)]
        export: ExportArgs,
    },
    /// Retrieve every repository item and export the result
    ExportAll {
        #[clap(flatten)]
        export: ExportArgs,
    },
    /// Retrieve a collection and search one field for a value
    Search {
        /// Collection PID
        pid: String,
        /// Field to search on
        field: String,
        /// Value to match, case-insensitively
        value: String,
    },
    /// Merge a collection with a usage-report CSV and export the result
    UsageReport {
        /// Collection PID
        pid: String,
        /// Path to the usage-report CSV
        #[clap(long)]
        usage_csv: PathBuf,
        /// Directory the report is written to (created if absent)
        #[clap(long, default_value = ".")]
        out_dir: PathBuf,
        /// Cover remainder records with a final partial request window
        #[clap(long)]
        exhaustive: bool,
    },
}

#[derive(clap::Args)]
pub struct ExportArgs {
    /// Directory the export file is written to (created if absent)
    #[clap(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Output file format
    #[clap(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Cover remainder records with a final partial request window instead of
    /// the historical truncating plan
    #[clap(long)]
    pub exhaustive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Extracted async CLI logic entrypoint for integration tests and main().
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_config(&cli.config)?;

    match cli.command {
        Commands::ListCollections => {
            println!("Configured collections (all items: {}):", settings.catalog.all_items_pid());
            for (name, pid) in settings.catalog.iter() {
                println!("  {pid:>8}  {name}");
            }
            Ok(())
        }
        Commands::ExportCollection { pid, export } => {
            let mut query = build_query(&settings, export.exhaustive);
            let count = query.retrieve_collection(&pid).await?;
            query.apply_field_projection()?;
            let path = write_export(&query, &export)?;
            println!("Exported {count} records to {}", path.display());
            Ok(())
        }
        Commands::ExportAll { export } => {
            let mut query = build_query(&settings, export.exhaustive);
            let count = query.retrieve_all().await?;
            query.apply_field_projection()?;
            let path = write_export(&query, &export)?;
            println!("Exported {count} records to {}", path.display());
            Ok(())
        }
        Commands::Search { pid, field, value } => {
            let mut query = build_query(&settings, false);
            query.retrieve_collection(&pid).await?;
            query.apply_field_projection()?;
            let matches = query.search(&field, &value)?;
            println!("{} records match {value:?} on {field}:", matches.len());
            println!("{}", serde_json::to_string_pretty(&matches)?);
            Ok(())
        }
        Commands::UsageReport {
            pid,
            usage_csv,
            out_dir,
            exhaustive,
        } => {
            let mut query = build_query(&settings, exhaustive);
            let count = query.retrieve_collection(&pid).await?;
            query.apply_field_projection()?;

            let usage_rows = usage::read_usage_csv(&usage_csv)
                .with_context(|| format!("reading usage report {}", usage_csv.display()))?;
            let today = chrono::Local::now().date_naive();
            let merged = usage::merge_with_usage(query.records(), &usage_rows, today);
            let merged_fields = usage::usage_report_fields(query.fields());

            let path = crate::export::write_csv(
                &merged,
                &merged_fields,
                &out_dir,
                &format!("usage_report_{}", today.format("%Y_%m_%d")),
                DEFAULT_CSV_DELIMITER,
            )?;
            println!(
                "Merged {} of {count} records with usage data, wrote {}",
                merged.len(),
                path.display()
            );
            Ok(())
        }
    }
}

fn build_query(settings: &Settings, exhaustive: bool) -> RepositoryQuery<HttpRepositoryApi> {
    let api = HttpRepositoryApi::new(settings.base_url.clone());
    let mut query = RepositoryQuery::new(api, settings.catalog.clone(), settings.fields.clone());
    query.set_page_cap(settings.page_cap);
    query.set_date_filter(settings.date_filter.clone());
    if exhaustive {
        query.set_windowing_mode(WindowingMode::Exhaustive);
    }
    query
}

fn write_export(
    query: &RepositoryQuery<HttpRepositoryApi>,
    export: &ExportArgs,
) -> Result<PathBuf> {
    let path = match export.format {
        ExportFormat::Csv => query.export_csv(&export.out_dir, DEFAULT_CSV_DELIMITER)?,
        ExportFormat::Json => query.export_json(&export.out_dir)?,
    };
    Ok(path)
}
