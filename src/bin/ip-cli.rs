use axum::http::{HeaderMap, HeaderName, HeaderValue};
use clap::{Parser, Subcommand};
use serde_json::Value;

use client_ip::{ClientIpResolver, TrustedPrefixSet};

#[derive(Parser)]
#[command(name = "ip-cli")]
#[command(about = "Inspect client IP resolution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an address offline from a header value and peer address
    Resolve {
        /// Proxy header to read
        #[arg(long, default_value = "X-Forwarded-For")]
        header: String,

        /// Value of that header, e.g. "1.2.3.4, 10.0.0.1"
        #[arg(long)]
        value: Option<String>,

        /// Transport peer address (ip:port)
        #[arg(long, default_value = "")]
        peer: String,

        /// Trusted proxy network (repeatable)
        #[arg(long = "trusted")]
        trusted: Vec<String>,

        /// Ignore the header, as a server not behind a proxy would
        #[arg(long)]
        direct: bool,
    },
    /// Ask a running server which address it sees for us
    Whoami {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            header,
            value,
            peer,
            trusted,
            direct,
        } => {
            let name = HeaderName::from_bytes(header.as_bytes())?;
            let resolver = ClientIpResolver::new(
                !direct,
                Some(name.clone()),
                TrustedPrefixSet::parse(&trusted)?,
            );

            let mut headers = HeaderMap::new();
            if let Some(value) = value {
                headers.insert(name, HeaderValue::from_str(&value)?);
            }

            let resolved = resolver.resolve(&headers, &peer);
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Commands::Whoami { url } => {
            let res = reqwest::get(format!("{}/ip", url.trim_end_matches('/'))).await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: server returned status {}", status);
                if let Ok(text) = res.text().await {
                    eprintln!("Response: {}", text);
                }
                return Ok(());
            }

            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
