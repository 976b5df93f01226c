use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, RANGE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for a running drive relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay status and cache size
    Health,
    /// Request a file and report how the relay delivered it
    Fetch {
        /// Path of the file on the relay
        path: String,
        /// Byte range, e.g. "bytes=0-99"
        #[arg(short, long)]
        range: Option<String>,
    },
    /// Upload a local file into a drive directory
    Upload {
        /// Local file to send
        file: PathBuf,
        /// Destination directory on the drive
        #[arg(short, long, default_value = "/")]
        dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // Redirects are reported, not followed.
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/_relay/health", cli.url)).send().await?;
            print_json(res).await?;
        }
        Commands::Fetch { path, range } => {
            let mut headers = HeaderMap::new();
            if let Some(range) = range {
                headers.insert(RANGE, HeaderValue::from_str(&range)?);
            }
            let res = client
                .get(format!("{}{}", cli.url, path))
                .headers(headers)
                .send()
                .await?;
            println!("Status: {}", res.status());
            for name in ["x-provider", "location", "content-length", "content-range", "etag"] {
                if let Some(value) = res.headers().get(name) {
                    println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
                }
            }
        }
        Commands::Upload { file, dir } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or("upload path has no file name")?
                .to_string();
            let body = tokio::fs::read(&file).await?;
            let res = client
                .put(format!("{}{}", cli.url, dir))
                .query(&[("upload", filename.as_str())])
                .body(body)
                .send()
                .await?;
            print_json(res).await?;
        }
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if status.is_success() {
        match serde_json::from_str::<Value>(&text) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{}", text),
        }
    } else {
        eprintln!("Error: HTTP {}", status);
        eprintln!("{}", text);
    }
    Ok(())
}
