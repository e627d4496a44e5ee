use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use npm_vulnscan::{
    config::Config,
    logging,
    output::{format_report_to_string, print_cli_table, OutputFormat},
    scan::{run_scan, ScanContext},
    scanner::{DependencyLister, ListingFile, NpmLister},
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const VULNERABLE: u8 = 1;
    pub const ERROR: u8 = 2;
}

#[derive(Parser)]
#[command(name = "npm-vulnscan")]
#[command(
    author,
    version,
    about = "Check an npm project's full dependency tree against a CSV list of vulnerable versions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a project's dependencies
    Scan {
        /// CSV file listing vulnerable packages and versions
        #[arg(short, long)]
        csv: PathBuf,

        /// npm project directory (must contain package.json)
        #[arg(short, long, required_unless_present = "listing", conflicts_with = "listing")]
        project: Option<PathBuf>,

        /// Saved output of `npm list --json --all` to use instead of running npm
        #[arg(short, long)]
        listing: Option<PathBuf>,

        /// Report file to write
        #[arg(short, long)]
        output: PathBuf,

        /// CSV column with package names (1-based)
        #[arg(long)]
        name_col: Option<usize>,

        /// CSV column with vulnerable versions (1-based)
        #[arg(long)]
        version_col: Option<usize>,

        /// Report format (text, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Deepest dependency nesting level to record
        #[arg(long)]
        max_depth: Option<usize>,

        /// Also save the raw npm output in this directory (only with --project)
        #[arg(long, conflicts_with = "listing")]
        dump_dir: Option<PathBuf>,

        /// Only write the report, print nothing
        #[arg(short, long)]
        quiet: bool,

        /// Log every pipeline step to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let (mut config, config_error) = Config::load_or_default();

    match cli.command {
        Commands::Scan {
            csv,
            project,
            listing,
            output,
            name_col,
            version_col,
            format,
            max_depth,
            dump_dir,
            quiet,
            verbose,
        } => {
            let level = if verbose { "debug" } else { config.log_level.as_str() };
            logging::init_tracing(level)?;
            if let Some(e) = config_error {
                warn!(
                    path = %Config::config_path().display(),
                    error = %format!("{:#}", e),
                    "ignoring unusable config file, using defaults"
                );
            }

            if let Some(n) = name_col {
                config.name_column = n;
            }
            if let Some(n) = version_col {
                config.version_column = n;
            }
            let columns = config.columns()?;
            let format_str = format.unwrap_or_else(|| config.default_format.clone());
            let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

            let context = ScanContext::new(csv)
                .with_columns(columns)
                .with_max_depth(max_depth.unwrap_or(config.max_depth));

            let lister: Box<dyn DependencyLister> = match (listing, project) {
                (Some(path), _) => Box::new(ListingFile::new(path)),
                (None, Some(project)) => {
                    let mut lister = NpmLister::new(project).with_program(&config.npm_command);
                    if let Some(dir) = dump_dir.or_else(|| config.dump_dir.clone()) {
                        lister = lister.with_dump_dir(dir);
                    }
                    Box::new(lister)
                }
                (None, None) => anyhow::bail!("either --project or --listing is required"),
            };

            scan(&context, lister.as_ref(), &output, format, quiet).await
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn scan(
    context: &ScanContext,
    lister: &dyn DependencyLister,
    output_file: &Path,
    format: OutputFormat,
    quiet: bool,
) -> Result<u8> {
    let progress = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Analyzing dependencies ({})...", lister.name()));
        Some(pb)
    };

    let result = run_scan(context, lister).await;
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            return Err(e).context("scan failed");
        }
    };

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Checked {} dependencies against {} database entries",
            report.dependencies.len(),
            report.database.len()
        ));
    }

    let content = format_report_to_string(&report, format)?;
    std::fs::write(output_file, content)
        .with_context(|| format!("failed to write report to {}", output_file.display()))?;
    info!(path = %output_file.display(), "report written");

    if !quiet {
        print_cli_table(&report);
        println!("Report written to: {}", output_file.display());
    }

    if report.outcome.has_vulnerabilities() {
        Ok(exit_codes::VULNERABLE)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'npm-vulnscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
