use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use fleet_status::status::{aggregate_strings, format_status, resolve_excluded};

#[derive(Parser)]
#[command(name = "fleet-cli")]
#[command(about = "Query and exercise the fleet status service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[arg(short, long, env = "FLEET_STATUS_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every tracked resource
    Resources,
    /// Show one resource with its sub-resources
    Get { kind: String, id: String },
    /// Mark a resource as deploying, or clear the flag with --done
    Deploying {
        kind: String,
        id: String,
        #[arg(long)]
        done: bool,
    },
    /// Render a status string as a display label
    Format { status: String },
    /// Aggregate container status strings offline
    Aggregate {
        #[arg(long, default_value_t = 0)]
        max_restart_count: i64,
        #[arg(required = true)]
        statuses: Vec<String>,
    },
    /// List the services a Compose file excludes from health checks
    Exclusions { compose_file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Format { status } => println!("{}", format_status(&status)),
        Commands::Aggregate {
            max_restart_count,
            statuses,
        } => println!("{}", aggregate_strings(&statuses, max_restart_count)),
        Commands::Exclusions { compose_file } => {
            let content = std::fs::read_to_string(&compose_file)?;
            for name in resolve_excluded(&content) {
                println!("{}", name);
            }
        }
        Commands::Resources => {
            let res = reqwest::Client::new()
                .get(format!("{}/api/resources", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Get { kind, id } => {
            let res = reqwest::Client::new()
                .get(format!("{}/api/resources/{}/{}", cli.url, kind, id))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Deploying { kind, id, done } => {
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
            );
            let res = reqwest::Client::new()
                .put(format!("{}/api/resources/{}/{}/deploying", cli.url, kind, id))
                .headers(headers)
                .json(&serde_json::json!({ "deploying": !done }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
