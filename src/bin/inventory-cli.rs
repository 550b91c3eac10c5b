use clap::{Parser, Subcommand};
use inventory_service::observability::tracing::{inject_headers, new_root_context, trace_id_of};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "inventory-cli")]
#[command(about = "Client for the inventory service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "INVENTORY_URL", default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call /data under a fresh trace
    Data,
    /// Check backend readiness
    Health,
    /// Dump Prometheus metrics
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Data => {
            let trace = new_root_context();
            let mut req = client.get(format!("{base}/data"));
            for (name, value) in inject_headers(&trace) {
                req = req.header(name, value);
            }
            let res = req.send().await?;
            println!("trace_id: {}", trace_id_of(&trace));
            print_json(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{base}/healthz")).send().await?;
            print_text(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{base}/metrics")).send().await?;
            print_text(res).await?;
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {status}");
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {status}");
    }
    println!("{text}");
    Ok(())
}
