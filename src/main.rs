//! `dynadump` command line: export and import DynamoDB tables.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dynadump::client::ClientConfig;
use dynadump::config::{DEFAULT_EXPORT_DIR, ExportAllOptions, ImportAllOptions, ImportSingleOptions};
use dynadump::orchestrate::{export_all, import_all, import_single};
use dynadump::progress::ConsoleProgress;
use dynadump::store::DynamoStore;

/// Back up and restore DynamoDB tables as local JSON files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Options {
    #[command(flatten)]
    connection: Connection,

    /// Enables verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Connection {
    /// The AWS region for DynamoDB requests
    #[arg(long = "region", global = true)]
    region: Option<String>,

    /// An optional endpoint URL for DynamoDB
    #[arg(long = "endpoint-url", global = true)]
    endpoint_url: Option<String>,

    /// AWS profile to take credentials from
    #[arg(long = "profile", global = true)]
    profile: Option<String>,

    /// Talk to DynamoDB Local on localhost:8000 with dummy credentials
    #[arg(long = "local", global = true, conflicts_with = "profile")]
    local: bool,
}

impl Connection {
    fn client_config(&self) -> ClientConfig {
        let mut config = if self.local {
            ClientConfig::local()
        } else {
            ClientConfig::default()
        };
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(endpoint) = &self.endpoint_url {
            config.endpoint_url = Some(endpoint.clone());
        }
        if self.profile.is_some() {
            config.profile = self.profile.clone();
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export every table to <path>/<table>.json and <path>/<table>.data.json
    ExportAll {
        /// Directory the artifacts are written to
        #[arg(short = 'p', long = "path", default_value = DEFAULT_EXPORT_DIR)]
        path: PathBuf,

        /// Table to skip (repeatable)
        #[arg(short = 'i', long = "ignore", num_args = 1..)]
        ignore: Vec<String>,
    },

    /// Import every artifact pair found in <path>
    ImportAll {
        /// Directory the artifacts are read from
        #[arg(short = 'p', long = "path", default_value = DEFAULT_EXPORT_DIR)]
        path: PathBuf,

        /// Regex applied to each table name to build the destination name
        #[arg(short = 'r', long = "replace")]
        replace: Option<String>,

        /// Replacement for the first --replace match
        #[arg(short = 'w', long = "with", requires = "replace")]
        with: Option<String>,

        /// Maximum items imported per table (0 for all)
        #[arg(short = 'l', long = "row-import-limit", default_value_t = 0)]
        row_limit: u64,
    },

    /// Import one table, optionally under another name
    Import {
        /// Artifact name to read
        #[arg(short = 's', long = "source")]
        source: String,

        /// Destination table (defaults to the source name)
        #[arg(short = 'd', long = "destination")]
        destination: Option<String>,

        /// Directory the artifacts are read from
        #[arg(short = 'p', long = "path", default_value = DEFAULT_EXPORT_DIR)]
        path: PathBuf,

        /// Maximum items imported (0 for all)
        #[arg(short = 'l', long = "row-import-limit", default_value_t = 0)]
        row_limit: u64,
    },
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "dynadump=debug" } else { "dynadump=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(options: Options) -> Result<()> {
    let store = DynamoStore::connect(&options.connection.client_config()).await;
    let progress = ConsoleProgress;

    match options.command {
        Command::ExportAll { path, ignore } => {
            let export = ExportAllOptions {
                export_dir: path,
                ignore,
            };
            export_all(&store, &export, &progress)
                .await
                .with_context(|| format!("export to {} failed", export.export_dir.display()))?;
        }
        Command::ImportAll {
            path,
            replace,
            with,
            row_limit,
        } => {
            let import = ImportAllOptions {
                import_dir: path,
                rename_pattern: replace.unwrap_or_default(),
                rename_replacement: with.unwrap_or_default(),
                row_limit,
            };
            import_all(&store, &import, &progress)
                .await
                .with_context(|| format!("import from {} failed", import.import_dir.display()))?;
        }
        Command::Import {
            source,
            destination,
            path,
            row_limit,
        } => {
            let import = ImportSingleOptions {
                import_dir: path,
                source_table: source,
                destination_table: destination.filter(|d| !d.is_empty()),
                row_limit,
            };
            import_single(&store, &import, &progress)
                .await
                .with_context(|| format!("import of {} failed", import.source_table))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = Options::parse();
    init_tracing(options.verbose);

    let result = run(options).await;
    println!("done");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
