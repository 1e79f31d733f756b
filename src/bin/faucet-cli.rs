use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "faucet-cli")]
#[command(about = "Command-line client for the testnet faucet API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show 24 hour transaction counts and queue size
    Stats {
        /// Include the faucet wallet balance
        #[arg(long)]
        wallet_info: bool,
    },
    /// Request funds for a wallet address
    Fund {
        /// Destination wallet (0x-prefixed)
        address: String,
    },
    /// Check that the faucet is up
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Stats { wallet_info } => {
            let mut req = client.get(format!("{}/api/stats", base));
            if wallet_info {
                req = req.query(&[("include_wallet_info", "true")]);
            }
            req.send().await?
        }
        Commands::Fund { address } => {
            client
                .post(format!("{}/api/fund", base))
                .json(&json!({ "wallet_address": address }))
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Error bodies are JSON too; show them the same way.
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: faucet API returned status {}", status);
        eprintln!("{}", body);
    }
    Ok(())
}
