use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "chainlet-cli")]
#[command(about = "CLI client for the chainlet node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine the next block
    Mine,
    /// Submit a transaction
    Submit {
        /// Sender
        #[arg(long)]
        sender: String,
        /// Recipient
        #[arg(long)]
        recipient: String,
        /// Amount
        #[arg(long)]
        amount: i64,
    },
    /// Print the full chain
    Chain,
    /// Register peer nodes (host:port or full URLs)
    Register { nodes: Vec<String> },
    /// Run conflict resolution against registered peers
    Resolve,
}

#[derive(Serialize)]
struct NewTransaction {
    sender: String,
    recipient: String,
    amount: i64,
}

#[derive(Serialize)]
struct RegisterNodes {
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node;
    let client = reqwest::Client::new();

    let res = match cli.cmd {
        Command::Mine => client.get(format!("{node}/mine")).send().await?,
        Command::Submit {
            sender,
            recipient,
            amount,
        } => {
            let tx = NewTransaction {
                sender,
                recipient,
                amount,
            };
            client
                .post(format!("{node}/transactions/new"))
                .json(&tx)
                .send()
                .await?
        }
        Command::Chain => client.get(format!("{node}/chain")).send().await?,
        Command::Register { nodes } => client
            .post(format!("{node}/nodes/register"))
            .json(&RegisterNodes { nodes })
            .send()
            .await?,
        Command::Resolve => client.get(format!("{node}/nodes/resolve")).send().await?,
    };

    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}
