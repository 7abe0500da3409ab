//! update-component-sbom: rewrite SBOMs with release coordinates
//!
//! Resolves each component of a release snapshot, downloads the SBOM of every
//! image it covers and rewrites package identifiers to point at the release
//! repository, digest and tags.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use component_sbom::{
    cli,
    config::{self, AppConfig, ConfigOverrides, ResolveConfig, UpdateConfig},
    pipeline::exit_codes,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "update-component-sbom")]
#[command(version)]
#[command(about = "Rewrite SBOM package URLs to release coordinates", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Every SBOM was updated
    1  One or more components or SBOMs failed (the rest were still processed)
    2  Error occurred before processing started

EXAMPLES:
    # Rewrite all SBOMs of a snapshot
    update-component-sbom update --snapshot-path snapshot.json --output-path sboms/

    # Show how components resolve without rewriting anything
    update-component-sbom resolve --snapshot-path snapshot.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

// ============================================================================
// Command argument structs
// ============================================================================

/// Flags shared by commands that talk to registries
#[derive(clap::Args)]
struct RegistryArgs {
    /// Path to the snapshot spec JSON
    #[arg(long)]
    snapshot_path: PathBuf,

    /// Docker-style credential store (default: ~/.docker/config.json)
    #[arg(long, env = "COMPONENT_SBOM_AUTH_FILE")]
    auth_file: Option<PathBuf>,

    /// Proceed without credentials for references the store does not cover
    #[arg(long)]
    allow_anonymous: bool,

    /// Per-attempt timeout for oras and cosign, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Retries after a failed oras or cosign invocation
    #[arg(long)]
    max_retries: Option<u32>,

    /// oras executable
    #[arg(long, env = "COMPONENT_SBOM_ORAS")]
    oras: Option<PathBuf>,

    /// cosign executable
    #[arg(long, env = "COMPONENT_SBOM_COSIGN")]
    cosign: Option<PathBuf>,
}

impl RegistryArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            auth_file: self.auth_file.clone(),
            allow_anonymous: self.allow_anonymous,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            oras: self.oras.clone(),
            cosign: self.cosign.clone(),
        }
    }
}

/// Arguments for the `update` subcommand
#[derive(Parser)]
struct UpdateArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Directory that receives one rewritten SBOM per image digest
    #[arg(long)]
    output_path: PathBuf,

    /// Write a JSON report of every unit's outcome
    #[arg(long)]
    report_file: Option<PathBuf>,
}

/// Arguments for the `resolve` subcommand
#[derive(Parser)]
struct ResolveArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Write the resolved snapshot to a file instead of stdout
    #[arg(short, long)]
    output_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite the SBOMs of every image in a snapshot
    Update(UpdateArgs),

    /// Resolve snapshot components to their manifest trees
    Resolve(ResolveArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .component-sbom.yaml in the current directory
    Init,
}

/// Load the config file and layer command-line overrides on top.
fn effective_config(cli_config: Option<&std::path::Path>, args: &RegistryArgs) -> Result<AppConfig> {
    let (mut app, loaded_from) = config::load_or_default(cli_config);
    if let Some(path) = &loaded_from {
        tracing::debug!("Loaded configuration from {}", path.display());
    }
    app.apply_overrides(&args.overrides());
    cli::validate_config(&app)?;
    Ok(app)
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Update(args) => {
            let app = effective_config(cli.config.as_deref(), &args.registry)?;
            cli::run_update(UpdateConfig {
                snapshot_path: args.registry.snapshot_path,
                output_dir: args.output_path,
                report_file: args.report_file,
                app,
            })
            .await
        }

        Commands::Resolve(args) => {
            let app = effective_config(cli.config.as_deref(), &args.registry)?;
            cli::run_resolve(ResolveConfig {
                snapshot_path: args.registry.snapshot_path,
                output_file: args.output_file,
                app,
            })
            .await
        }

        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "update-component-sbom",
                &mut io::stdout(),
            );
            Ok(exit_codes::SUCCESS)
        }

        Commands::ConfigSchema { output } => {
            let schema = config::generate_json_schema().context("failed to render schema")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => println!("{schema}"),
            }
            Ok(exit_codes::SUCCESS)
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (app, loaded_from) = config::load_or_default(cli.config.as_deref());
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml = serde_yaml::to_string(&app).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(exit_codes::SUCCESS)
            }
            ConfigAction::Path => {
                let search_paths = [
                    std::env::current_dir().ok(),
                    ::dirs::config_dir().map(|p| p.join("component-sbom")),
                ];
                eprintln!("Config file search paths (in order):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {}", path.display());
                }
                match config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Discovered: {}", path.display()),
                    None => eprintln!("No config file found"),
                }
                Ok(exit_codes::SUCCESS)
            }
            ConfigAction::Init => {
                let target = PathBuf::from(".component-sbom.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                std::fs::write(&target, config::generate_example_config())
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(exit_codes::SUCCESS)
            }
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            exit_codes::ERROR
        }
    };
    std::process::exit(code);
}
