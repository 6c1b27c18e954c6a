use anyhow::{Context, Result, bail};
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use wrapped_sync::{AuthMode, Config, SyncPipeline, TokenProvider};

#[derive(Parser)]
#[command(name = "wrapped-sync")]
#[command(about = "Sync your Spotify top artists, tracks, genres and playlists into Supabase")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest today's rankings and upsert them into the store
    Sync {
        /// Authorize in the browser instead of using SPOTIFY_REFRESH_TOKEN
        #[arg(long)]
        interactive: bool,

        /// Capture date stamped on every row (defaults to yesterday)
        #[arg(long, value_name = "YYYY-MM-DD", env = "WRAPPED_CAPTURE_DATE")]
        date: Option<NaiveDate>,

        /// Fetch and build rows without writing to the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Authorize in the browser and print a refresh token for unattended runs
    Auth,

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Sync {
            interactive,
            date,
            dry_run,
        } => {
            let mode = if interactive {
                AuthMode::Interactive
            } else {
                AuthMode::RefreshToken
            };
            sync(mode, date, dry_run).await?;
        }
        Commands::Auth => {
            authorize().await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

fn load_config(refresh_mode: bool, needs_store: bool) -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let missing = config.get_missing_config(refresh_mode, needs_store);
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Set these in your environment or a .env file (see `wrapped-sync setup`).".yellow()
        );
        std::process::exit(1);
    }

    Ok(config)
}

/// Statistics lag by a day, so runs are stamped with yesterday's date.
fn default_capture_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

async fn sync(mode: AuthMode, date: Option<NaiveDate>, dry_run: bool) -> Result<()> {
    println!("{}", "Spotify Wrapped Sync".cyan().bold());
    println!("{}", "=".repeat(50));

    if dry_run {
        println!("{}", "DRY RUN MODE - Nothing will be written".yellow());
    }

    let config = load_config(mode == AuthMode::RefreshToken, !dry_run)?;
    let capture_date = date.unwrap_or_else(default_capture_date);

    let pipeline = SyncPipeline::connect(&config, mode, capture_date, dry_run)
        .await
        .context("Failed to initialize sync")?;

    let report = pipeline.run().await;
    pipeline.print_summary(&report);
    pipeline
        .save_sync_report(&report)
        .context("Failed to save sync report")?;

    let failed = report.failed_tables();
    if !failed.is_empty() {
        bail!(
            "{} of {} tables failed to sync: {}",
            failed.len(),
            report.tables.len(),
            failed.join(", ")
        );
    }

    println!("\n{}", "Sync completed!".green());
    Ok(())
}

async fn authorize() -> Result<()> {
    let config = load_config(false, false)?;

    let token = TokenProvider::new(&config)?
        .interactive()
        .await
        .context("Authorization failed")?;

    match token.refresh_token {
        Some(refresh_token) => {
            println!("\n{}", "Authorization successful!".green());
            println!("Add this to your .env for unattended runs:\n");
            println!("SPOTIFY_REFRESH_TOKEN={}", refresh_token);
        }
        None => {
            println!(
                "{}",
                "Authorized, but Spotify did not return a refresh token.".yellow()
            );
        }
    }

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Spotify Wrapped Sync Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify API Setup".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");
    println!("   - Add 'http://localhost:3000/callback' as a redirect URI");

    println!("\n{}", "2. Supabase Setup".yellow());
    println!("   - Create tables artists, tracks, genres and playlists");
    println!("   - Give each a text column 'unique_key' with a unique constraint");
    println!("   - Copy the project URL and a service key");

    println!("\n{}", "3. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("     SPOTIFY_REDIRECT_URI=http://localhost:3000/callback");
    println!("     SUPABASE_URL=https://your-project.supabase.co");
    println!("     SUPABASE_KEY=your_service_key");

    println!("\n{}", "4. Usage".yellow());
    println!("   - wrapped-sync auth                 (authorize and get a refresh token)");
    println!("   - wrapped-sync sync --dry-run       (preview without writing)");
    println!("   - wrapped-sync sync                 (unattended run with SPOTIFY_REFRESH_TOKEN)");
    println!("   - wrapped-sync sync --interactive   (authorize in the browser for this run)");

    println!("\n{}", "Ready to start syncing!".green());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_parses_capture_date() {
        let cli = Cli::try_parse_from(["wrapped-sync", "sync", "--date", "2024-02-29", "--dry-run"])
            .unwrap();
        match cli.command {
            Commands::Sync { date, dry_run, interactive } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 29));
                assert!(dry_run);
                assert!(!interactive);
            }
            _ => panic!("expected sync"),
        }

        assert!(Cli::try_parse_from(["wrapped-sync", "sync", "--date", "29/02/2024"]).is_err());
    }

    #[test]
    fn test_capture_date_falls_back_to_env() {
        let command = Cli::command();
        let sync = command.find_subcommand("sync").unwrap();
        let date = sync.get_arguments().find(|a| a.get_id() == "date").unwrap();
        assert_eq!(
            date.get_env().and_then(|v| v.to_str()),
            Some("WRAPPED_CAPTURE_DATE")
        );
    }
}

