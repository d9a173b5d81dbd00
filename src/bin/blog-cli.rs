use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "blog-cli")]
#[command(about = "Operator CLI for the blog API", long_about = None)]
struct Cli {
    #[arg(short, long, env = "BLOG_URL", default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "BLOG_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Storage mode, connection state and process vitals
    Diagnostics,
    /// Server version and status
    Status,
    /// Post and subscriber counts from the active backend
    Stats,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Diagnostics => "/admin/diagnostics",
            Commands::Status => "/admin/status",
            Commands::Stats => "/api/admin/stats",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(url).headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: blog API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
