use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "plane-cli")]
#[command(about = "Client for the agent control plane", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8888")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show device identity and agent version
    Info,
    /// List stored snapshots
    Snapshots,
    /// Capture a new snapshot
    Capture,
    /// Download a snapshot (and its screenshot) to a directory
    Fetch {
        id: i64,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Run an action against a selector
    Exec {
        #[arg(short, long)]
        selector: String,
        #[arg(short, long)]
        action: Option<String>,
        #[arg(long)]
        fast_query: bool,
    },
    /// Push a rule document into the ephemeral subscription
    PushRules { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = |route: &str| format!("{}/api/{}", cli.url.trim_end_matches('/'), route);

    match cli.command {
        Commands::Info => {
            let res = client.post(api("getServerInfo")).json(&json!({})).send().await?;
            print_response(res).await?;
        }
        Commands::Snapshots => {
            let res = client.post(api("getSnapshots")).json(&json!({})).send().await?;
            print_response(res).await?;
        }
        Commands::Capture => {
            let res = client.post(api("captureSnapshot")).json(&json!({})).send().await?;
            print_response(res).await?;
        }
        Commands::Fetch { id, out } => {
            tokio::fs::create_dir_all(&out).await?;
            for (route, ext) in [("getSnapshot", "json"), ("getScreenshot", "png")] {
                let res = client.post(api(route)).json(&json!({ "id": id })).send().await?;
                if !res.status().is_success() {
                    report_failure(res).await;
                    continue;
                }
                let path = out.join(format!("{id}.{ext}"));
                tokio::fs::write(&path, res.bytes().await?).await?;
                println!("saved {}", path.display());
            }
        }
        Commands::Exec {
            selector,
            action,
            fast_query,
        } => {
            let body = json!({ "selector": selector, "action": action, "fastQuery": fast_query });
            let res = client.post(api("execSelector")).json(&body).send().await?;
            print_response(res).await?;
        }
        Commands::PushRules { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let res = client.post(api("updateSubscription")).body(text).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn report_failure(res: reqwest::Response) {
    eprintln!("Error: control plane returned status {}", res.status());
    if let Ok(body) = res.json::<Value>().await {
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            eprintln!("Message: {}", message);
        }
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !res.status().is_success() {
        report_failure(res).await;
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
