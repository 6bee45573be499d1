use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use dealership_api::client::{run_login_probe, DealershipClient, ProbeOutcome, StopHandle};

#[derive(Parser)]
#[command(
    name = "login-probe",
    about = "Tries every password of a word list against the login endpoint",
    version
)]
struct Cli {
    #[arg(long, default_value = "http://localhost:8080", help = "Base URL of the API")]
    base_url: String,
    #[arg(long, default_value = "admin", help = "Account to probe")]
    username: String,
    #[arg(long, help = "File with one candidate password per line")]
    wordlist: PathBuf,
    #[arg(long, default_value = "info", help = "Log level")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dealership_api::config::init_tracing(&cli.log_level, false);

    let raw = tokio::fs::read_to_string(&cli.wordlist)
        .await
        .with_context(|| format!("failed to read {}", cli.wordlist.display()))?;
    let words: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect();

    let client = DealershipClient::new(&cli.base_url).context("failed to build HTTP client")?;

    let stop = StopHandle::new();
    let on_ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping probe");
            on_ctrl_c.stop();
        }
    });

    info!(words = words.len(), username = %cli.username, "starting login probe");
    match run_login_probe(&client, &cli.username, words, &stop).await {
        ProbeOutcome::Found { password, attempt } => {
            println!("password found on attempt {attempt}: {password}");
        }
        ProbeOutcome::Exhausted { attempts } => {
            println!("no password matched after {attempts} attempts");
        }
        ProbeOutcome::Stopped { attempts } => {
            println!("stopped after {attempts} attempts");
        }
    }
    Ok(())
}
