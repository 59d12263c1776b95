use anyhow::Context;
use clap::{Parser, Subcommand};
use docshelf::catalog::Catalog;
use docshelf::config::Config;
use docshelf::models::ModelRegistry;
use docshelf::papers::{AcquisitionManager, DeleteOutcome};
use docshelf::report::{Report, Severity};
use docshelf::{ArtifactId, DocshelfError};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docshelf")]
#[command(about = "Search arXiv, download papers and GGUF models", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/docshelf/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the paper catalog
    Search {
        /// Keywords (all papers when omitted)
        keywords: Vec<String>,
        /// Start index
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        start: u32,
        /// Max number of results
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=1000))]
        max: u32,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Download every paper in the results
        #[arg(long)]
        download: bool,
    },
    /// Manage downloaded papers
    Papers {
        #[command(subcommand)]
        command: PapersCommand,
    },
    /// Manage downloaded models
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },
}

#[derive(Subcommand)]
enum PapersCommand {
    /// List downloaded papers
    List {
        /// Only list IDs, without fetching titles from the catalog
        #[arg(long)]
        offline: bool,
    },
    /// Download papers by ID, skipping those already present
    Fetch {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete downloaded papers by ID
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete every downloaded paper
    Clean,
}

#[derive(Subcommand)]
enum ModelsCommand {
    /// List downloaded models
    List,
    /// Download a GGUF file from a Hugging Face repository
    Download {
        /// Repository name (default from config)
        #[arg(long)]
        repo: Option<String>,
        /// File name with .gguf extension (default from config)
        #[arg(long)]
        file: Option<String>,
    },
    /// Delete a downloaded model
    Delete { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Search {
            keywords,
            start,
            max,
            json,
            download,
        } => run_search(&config, &keywords.join(" "), start, max, json, download).await,
        Commands::Papers { command } => run_papers(&config, command).await,
        Commands::Models { command } => run_models(&config, command).await,
    }
}

async fn run_search(
    config: &Config,
    keywords: &str,
    start: u32,
    max: u32,
    json: bool,
    download: bool,
) -> anyhow::Result<()> {
    let manager = AcquisitionManager::new(config).unwrap_or_else(|e| fail(&e));
    let keyword = Some(keywords).filter(|k| !k.trim().is_empty());

    let catalog = manager
        .query_catalog(keyword, start, max)
        .await
        .unwrap_or_else(|e| fail(&e));

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        print_catalog(&catalog);
    }

    if download && !catalog.is_empty() {
        let result = manager
            .fetch_missing(catalog.ids().cloned())
            .await
            .unwrap_or_else(|e| fail(&e));
        render(&result.report());
    }

    Ok(())
}

async fn run_papers(config: &Config, command: PapersCommand) -> anyhow::Result<()> {
    let manager = AcquisitionManager::new(config).unwrap_or_else(|e| fail(&e));

    match command {
        PapersCommand::List { offline } => {
            let local = manager.list_local();
            if local.is_empty() {
                render(&Report::info("No papers downloaded yet"));
                return Ok(());
            }

            if offline {
                for id in &local {
                    println!("{id}");
                }
                return Ok(());
            }

            let catalog = manager.local_catalog().await.unwrap_or_else(|e| fail(&e));
            print_catalog(&catalog);
            for id in local.iter().filter(|id| !catalog.contains(id)) {
                println!("{id}  (no catalog metadata)");
            }
        }
        PapersCommand::Fetch { ids } => {
            let result = manager
                .fetch_missing(ids.into_iter().map(ArtifactId::from))
                .await
                .unwrap_or_else(|e| fail(&e));
            let report = result.report();
            render(&report);
            if report.is_error() {
                std::process::exit(1);
            }
        }
        PapersCommand::Delete { ids } => {
            let ids: Vec<ArtifactId> = ids.into_iter().map(ArtifactId::from).collect();
            for (id, outcome) in manager.delete(&ids) {
                let report = match outcome {
                    DeleteOutcome::Deleted => Report::info(format!("Paper {id} deleted")),
                    DeleteOutcome::NotFound => {
                        Report::warning(format!("Can not delete {id} as not downloaded"))
                    }
                    DeleteOutcome::Failed(e) => Report::error(format!("Paper {id}: {e}")),
                };
                render(&report);
            }
        }
        PapersCommand::Clean => {
            let outcomes = manager.delete_all();
            let mut removed = 0;
            for (id, outcome) in &outcomes {
                match outcome {
                    DeleteOutcome::Failed(e) => render(&Report::error(format!("Paper {id}: {e}"))),
                    _ => removed += 1,
                }
            }
            render(&Report::info(format!("Removed {removed} papers")));
            if removed < outcomes.len() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_models(config: &Config, command: ModelsCommand) -> anyhow::Result<()> {
    let registry = ModelRegistry::new(config).unwrap_or_else(|e| fail(&e));

    match command {
        ModelsCommand::List => {
            let available = registry.list_available();
            if available.is_empty() {
                render(&Report::info("No models downloaded yet"));
            }
            for (name, path) in &available {
                println!("{name}\t{}", path.display());
            }
        }
        ModelsCommand::Download { repo, file } => {
            let repo = repo.unwrap_or_else(|| config.models.default_repo.clone());
            let file = file.unwrap_or_else(|| config.models.default_file.clone());

            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec})",
                )?
                .progress_chars("=> "),
            );

            let status = registry
                .download(&repo, &file, |progress| {
                    if let Some(total) = progress.total {
                        bar.set_length(total);
                    }
                    bar.set_position(progress.downloaded);
                })
                .await;
            bar.finish_and_clear();

            render(&status.unwrap_or_else(|e| fail(&e)).report());
        }
        ModelsCommand::Delete { name } => {
            let path = registry.delete(&name).unwrap_or_else(|e| fail(&e));
            render(&Report::info(format!("File {} deleted", path.display())));
        }
    }

    Ok(())
}

fn print_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        render(&Report::info("No entries found"));
        return;
    }

    for entry in catalog.entries() {
        let date = entry
            .published_date()
            .map_or_else(|| entry.published.clone(), |d| d.to_string());
        println!("{}  {date}  {}", entry.id, entry.title);
        println!("    {}", entry.authors.join(", "));
    }
}

fn render(report: &Report) {
    match report.severity {
        Severity::Info => println!("{report}"),
        Severity::Warning => eprintln!("Warning: {report}"),
        Severity::Error => eprintln!("Error: {report}"),
    }
}

fn fail(err: &DocshelfError) -> ! {
    render(&Report::from(err));
    std::process::exit(1);
}
