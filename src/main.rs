use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod github;
mod pipeline;
mod sheets;

use config::Config;
use error::SyncError;
use pipeline::report::{OutputFormat, ReportGenerator};
use pipeline::{FetchOutcome, FetcherConfig, IssueFetcher, ProjectWindow};

#[derive(Parser)]
#[command(name = "issue-sheet-sync")]
#[command(about = "Sync GitHub issue metrics into a Google spreadsheet")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "ISSUE_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Organization or user owning the repository
    #[arg(short, long, env = "GITHUB_ORG")]
    org: Option<String>,

    /// Repository whose issues are synced
    #[arg(short, long, env = "GITHUB_REPO")]
    repo: Option<String>,

    /// File containing a GitHub personal access token
    #[arg(long, env = "GITHUB_PAT_PATH")]
    pat_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FetchArgs {
    /// File with the project start instant (ISO-8601)
    #[arg(long)]
    project_start_file: Option<PathBuf>,

    /// Leave pull requests out of the result
    #[arg(long)]
    skip_pull_requests: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch issues and overwrite the spreadsheet range with them
    Sync {
        #[command(flatten)]
        fetch: FetchArgs,

        /// File containing the spreadsheet id
        #[arg(long)]
        spreadsheet_id_file: Option<PathBuf>,

        /// Target range, e.g. "Issues!A2:F"
        #[arg(long)]
        range: Option<String>,

        /// Cached Google OAuth credential
        #[arg(long)]
        token_file: Option<PathBuf>,
    },

    /// Fetch issues and print them without touching the spreadsheet
    Fetch {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Output file path (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short = 'f', long, default_value = "json")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<SyncError>()
            .map(SyncError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(org) = cli.org {
        config.github.org = org;
    }
    if let Some(repo) = cli.repo {
        config.github.repo = repo;
    }

    // Unauthenticated requests work, just with a much lower rate limit
    let token = match &cli.pat_path {
        Some(path) => Some(config::read_required(path)?),
        None => None,
    };

    match cli.command {
        Commands::Sync {
            fetch,
            spreadsheet_id_file,
            range,
            token_file,
        } => {
            if let Some(path) = spreadsheet_id_file {
                config.sheets.spreadsheet_id_file = path;
            }
            if let Some(range) = range {
                config.sheets.range = range;
            }
            if let Some(path) = token_file {
                config.sheets.token_file = path;
            }

            // Local inputs first so a misconfigured run fails before any API call
            let spreadsheet_id = config::read_required(&config.sheets.spreadsheet_id_file)?;
            let http = reqwest::Client::new();
            let credential = sheets::CredentialStore::new(&config.sheets.token_file)
                .authorize(&http)
                .await?;

            let outcome = fetch_issues(&mut config, &fetch, token).await?;
            println!("{}", ReportGenerator::new(OutputFormat::Json).generate(&outcome.records)?);

            let writer = sheets::SheetsClient::new(&config.sheets, &credential)?;
            let summary = writer
                .write(&outcome.records, &spreadsheet_id, &config.sheets.range)
                .await?;

            println!(
                "{} rows written to {}",
                summary.updated_rows,
                summary.updated_range.as_deref().unwrap_or(&config.sheets.range)
            );
        }
        Commands::Fetch {
            fetch,
            output,
            format,
        } => {
            let outcome = fetch_issues(&mut config, &fetch, token).await?;
            let content = ReportGenerator::new(format).generate(&outcome.records)?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, content)
                    .with_context(|| format!("failed to write {}", output_path.display()))?;
                println!("Issues written to {}", output_path.display());
            } else {
                println!("{}", content);
            }
        }
    }

    println!("Finished at {}", Local::now().format("%d.%m.%Y, %H:%M:%S"));
    Ok(())
}

async fn fetch_issues(
    config: &mut Config,
    args: &FetchArgs,
    token: Option<String>,
) -> Result<FetchOutcome, SyncError> {
    if let Some(path) = &args.project_start_file {
        config.project.start_file = path.clone();
    }
    if args.skip_pull_requests {
        config.github.skip_pull_requests = true;
    }

    let window = ProjectWindow::load(&config.project.start_file)?;
    if let Some(start) = window.start() {
        println!("Including issues active since {}", start.format("%d.%m.%Y, %H:%M:%S"));
    }
    let client = github::GitHubClient::new(&config.github, token)?;
    let fetcher = IssueFetcher::new(
        client,
        FetcherConfig {
            window,
            skip_pull_requests: config.github.skip_pull_requests,
        },
    );

    let outcome = fetcher.fetch().await?;
    info!(
        pages = outcome.pages,
        seen = outcome.issues_seen,
        kept = outcome.records.len(),
        rate_limit = %outcome.last_rate_limit,
        "Fetched issues"
    );

    Ok(outcome)
}
