use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wikistatic::build::build_site;
use wikistatic::config::Config;

#[derive(Parser)]
#[command(name = "wikistatic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project file (defaults to the nearest `wikistatic.yaml`
    /// in the current directory or its ancestors)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the static site
    Build {
        /// Output directory (overrides `output_directory`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build { output } => {
            let config = match &cli.config {
                Some(path) => Config::from_project_file(path, output.as_deref())?,
                None => Config::from_directory(&std::env::current_dir()?, output.as_deref())?,
            };
            let report = build_site(&config)?;
            println!(
                "Wrote {} pages to '{}' ({} skipped)",
                report.articles + 1,
                config.output_directory.display(),
                report.skipped
            );
            Ok(())
        }
    }
}
