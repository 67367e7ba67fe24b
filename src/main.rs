mod aggregate;
mod graph;
mod ingest;
mod model;
mod report;
mod store;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::aggregate::{extract_secondary, roll_up};
use crate::graph::assays::{NOT_VALIDATED_ASSAY_PROJECTS, collect_assays};
use crate::graph::counts::{NOT_VALIDATED_PROJECTS, collect_counts};
use crate::graph::{GraphClient, RetryPolicy};
use crate::ingest::ingest_bucket;
use crate::model::NodeRegistry;
use crate::report::html::{
    write_assay_matrix, write_counts_matrix, write_detailed_matrix, write_main_matrix,
};
use crate::report::{copy_to_server, unix_now};
use crate::store::DirStore;

#[derive(Debug, Parser)]
#[command(name = "submission-matrix", version, about = "Data submission reporting matrix")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the submitted-data matrix from a bucket mirror.
    Matrix {
        /// Directory holding the bucket mirror (one subdirectory per
        /// organization).
        #[arg(long)]
        input: PathBuf,
        /// Output HTML file.
        #[arg(long, default_value = "matrix.html")]
        output: PathBuf,
        /// Render the detailed assay-metadata matrix instead of the
        /// per-node-type counts.
        #[arg(long)]
        create_secondary_matrix: bool,
        /// Copy the finished report into the web server directory.
        #[arg(long)]
        copy_file_to_server: bool,
        #[arg(long, default_value = "/usr/share/nginx/html")]
        server_dir: PathBuf,
    },
    /// Build the counts matrix by querying the submission graph service.
    Counts {
        /// JSON file with `access_key`/`secret_key` for the service.
        #[arg(long)]
        keys_file: PathBuf,
        /// GraphQL endpoint URL.
        #[arg(long)]
        endpoint: String,
        /// Output HTML file.
        #[arg(long, default_value = "matrix_api.html")]
        output: PathBuf,
        /// Copy the finished report into the web server directory.
        #[arg(long)]
        copy_file_to_server: bool,
        #[arg(long, default_value = "/usr/share/nginx/html")]
        server_dir: PathBuf,
    },
    /// Build the per-experiment assay summary from the graph service.
    Assays {
        /// JSON file with `access_key`/`secret_key` for the service.
        #[arg(long)]
        keys_file: PathBuf,
        /// GraphQL endpoint URL.
        #[arg(long)]
        endpoint: String,
        /// Output HTML file.
        #[arg(long, default_value = "matrix_assays.html")]
        output: PathBuf,
        /// Copy the finished report into the web server directory.
        #[arg(long)]
        copy_file_to_server: bool,
        #[arg(long, default_value = "/usr/share/nginx/html")]
        server_dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Matrix {
            input,
            output,
            create_secondary_matrix,
            copy_file_to_server,
            server_dir,
        } => {
            run_matrix(&input, &output, create_secondary_matrix).map_err(|e| e.to_string())?;
            publish(&output, copy_file_to_server, &server_dir)
        }
        Command::Counts {
            keys_file,
            endpoint,
            output,
            copy_file_to_server,
            server_dir,
        } => {
            run_counts(&keys_file, &endpoint, &output).map_err(|e| e.to_string())?;
            publish(&output, copy_file_to_server, &server_dir)
        }
        Command::Assays {
            keys_file,
            endpoint,
            output,
            copy_file_to_server,
            server_dir,
        } => {
            run_assays(&keys_file, &endpoint, &output).map_err(|e| e.to_string())?;
            publish(&output, copy_file_to_server, &server_dir)
        }
    }
}

fn run_matrix(
    input: &Path,
    output: &Path,
    create_secondary_matrix: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = NodeRegistry::new();
    let store = DirStore::new(input);
    let orgs = ingest_bucket(&store, &registry)?;
    tracing::info!("ingested {} organization(s) from {}", orgs.len(), input.display());

    if create_secondary_matrix {
        let rows: BTreeMap<_, _> = orgs
            .iter()
            .map(|(org, bucket)| (org.clone(), extract_secondary(bucket)))
            .collect();
        write_detailed_matrix(&rows, unix_now(), output)?;
    } else {
        let rolled: BTreeMap<_, _> = orgs
            .iter()
            .map(|(org, bucket)| (org.clone(), roll_up(bucket)))
            .collect();
        write_main_matrix(&rolled, unix_now(), output)?;
    }
    tracing::info!("wrote {}", output.display());
    Ok(())
}

fn run_counts(
    keys_file: &Path,
    endpoint: &str,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = GraphClient::connect(endpoint, keys_file, RetryPolicy::default())?;
    let rows = collect_counts(&mut client, NOT_VALIDATED_PROJECTS)?;
    tracing::info!("collected counts for {} project(s)", rows.len());
    write_counts_matrix(&rows, unix_now(), output)?;
    tracing::info!("wrote {}", output.display());
    Ok(())
}

fn run_assays(
    keys_file: &Path,
    endpoint: &str,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = GraphClient::connect(endpoint, keys_file, RetryPolicy::default())?;
    let rows = collect_assays(&mut client, NOT_VALIDATED_ASSAY_PROJECTS)?;
    tracing::info!("collected assay data for {} experiment(s)", rows.len());
    write_assay_matrix(&rows, unix_now(), output)?;
    tracing::info!("wrote {}", output.display());
    Ok(())
}

fn publish(output: &Path, copy_file_to_server: bool, server_dir: &Path) -> Result<(), String> {
    if copy_file_to_server {
        copy_to_server(output, server_dir).map_err(|e| e.to_string())?;
    }
    Ok(())
}
