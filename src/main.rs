// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use repotool::{RepoConfig, Repository};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "repotool")]
#[command(author, version, about = "Build and maintain a package repository database", long_about = None)]
struct Cli {
    /// Working directory (default: current directory)
    #[arg(short = 'C', long, global = true, env = "REPOTOOL_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Cache store directory, relative to the working directory
    #[arg(long, global = true, env = "REPOTOOL_CACHE_DIR", default_value = repotool::cache::DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Database archive file name
    #[arg(long, global = true, env = "REPOTOOL_DB_NAME", default_value = repotool::db::DEFAULT_DB_NAME)]
    db_name: String,

    /// zstd compression level for the database archive (1-22)
    #[arg(long, global = true, default_value_t = repotool::db::DEFAULT_COMPRESSION_LEVEL)]
    level: i32,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register packages and rebuild the database
    Add {
        /// Package archives to register
        packages: Vec<PathBuf>,
        /// Also publish packages and database to ./root/<NAME> (prompts when NAME is omitted)
        #[arg(long, value_name = "NAME", num_args = 0..=1)]
        create_repo: Option<Option<String>>,
    },
    /// Rebuild the database from the cache store
    Rebuild,
    /// Remove packages from the cache store and rebuild the database
    Remove {
        /// Package names to remove
        names: Vec<String>,
    },
    /// List packages staged in the cache store
    List {
        /// List the entries of the database archive instead
        #[arg(long)]
        database: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

impl Cli {
    fn config(&self) -> Result<RepoConfig> {
        let config = match &self.work_dir {
            Some(dir) => RepoConfig::new(dir),
            None => RepoConfig::from_current_dir()?,
        };

        Ok(config
            .with_cache_dir(&self.cache_dir)
            .with_db_name(&self.db_name)
            .with_compression_level(self.level))
    }
}

/// Ask for a repository name on stdin
fn prompt_repo_name() -> Result<String> {
    print!("repo name: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read repository name")?;
    Ok(line.trim().to_string())
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Add {
            packages,
            create_repo,
        }) => {
            if packages.is_empty() {
                println!("Specify packages to register");
                println!("Run 'repotool add --help' for usage information");
                return Ok(());
            }

            let repo_name = match create_repo {
                Some(Some(name)) => Some(name.clone()),
                Some(None) => Some(prompt_repo_name()?),
                None => None,
            };
            if let Some(name) = &repo_name {
                repotool::packages::validate_name(name)?;
                println!("Creating repository in ./root/{}", name);
            }

            let repo = Repository::open(cli.config()?)?;

            let registered = repo
                .register(packages)
                .context("Failed to register packages")?;
            for metadata in &registered {
                println!("Registered {} from {}", metadata.name, metadata.source.display());
            }

            let summary = repo.rebuild().context("Failed to rebuild database")?;
            println!(
                "Success: {} ({} files)",
                summary.path.display(),
                summary.entries
            );

            if let Some(name) = repo_name {
                let published = repo
                    .publish(packages, &name)
                    .context("Failed to publish repository, try to copy the files manually")?;
                println!(
                    "Published {} package(s) to {}",
                    published.packages.len(),
                    published.repo_dir.display()
                );
            }

            Ok(())
        }
        Some(Commands::Rebuild) => {
            let repo = Repository::open(cli.config()?)?;
            let summary = repo.rebuild().context("Failed to rebuild database")?;
            println!(
                "Success: {} ({} files)",
                summary.path.display(),
                summary.entries
            );
            Ok(())
        }
        Some(Commands::Remove { names }) => {
            let repo = Repository::open(cli.config()?)?;
            let removed = repo.remove(names).context("Failed to remove packages")?;
            info!("Removed {} package(s) from the cache", removed);

            let summary = repo.rebuild().context("Failed to rebuild database")?;
            println!(
                "Removed {} package(s); {} now has {} files",
                removed,
                summary.path.display(),
                summary.entries
            );
            Ok(())
        }
        Some(Commands::List { database }) => {
            let repo = Repository::open(cli.config()?)?;

            if *database {
                let db_path = repo.db_path();
                let names = repotool::db::list_archive(&db_path)
                    .with_context(|| format!("Failed to read {}", db_path.display()))?;
                for name in &names {
                    println!("  {}", name);
                }
                println!("\nTotal: {} entries", names.len());
                return Ok(());
            }

            let entries = repo.list()?;
            if entries.is_empty() {
                println!("No packages cached.");
            } else {
                println!("Cached packages:");
                for entry in &entries {
                    if entry.is_complete() {
                        println!("  {}", entry.name);
                    } else {
                        println!("  {} (incomplete)", entry.name);
                    }
                }
                println!("\nTotal: {} package(s)", entries.len());
            }
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "repotool", &mut io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("repotool v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'repotool --help' for usage information");
            Ok(())
        }
    }
}
