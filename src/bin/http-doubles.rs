//! http-doubles CLI binary.
//!
//! Serves, validates and queries double configurations from the command line.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use http_doubles::cli::{load_config, Cli, Command};
use http_doubles::{DoubleRow, PrettyPrint, ResponseBody, Server, ServerConfig};
use tabled::Table;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> http_doubles::Result<()> {
    match cli.command {
        Command::Serve {
            config,
            port,
            fixtures_folder,
        } => {
            let config = load_config(config.as_deref(), port, fixtures_folder)?;
            handle_serve(config).await
        }
        Command::Check { config } => handle_check(&config, cli.json),
        Command::Request {
            config,
            method,
            url,
        } => handle_request(&config, &method, &url, cli.json).await,
    }
}

async fn handle_serve(config: ServerConfig) -> http_doubles::Result<()> {
    let mut server = Server::new();
    let addr = server.serve(config).await?;

    tracing::info!(
        %addr,
        doubles = server.doubles().len(),
        "serving doubles, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    server.stop().await
}

fn handle_check(path: &Path, json: bool) -> http_doubles::Result<()> {
    let config = load_config(Some(path), None, None)?;
    let doubles = config.doubles.unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&doubles)?);
    } else {
        let rows: Vec<DoubleRow> = doubles.iter().map(DoubleRow::from).collect();
        println!("{}", Table::new(rows));
        println!(
            "\n{} double(s), port {}, fixtures in {}",
            doubles.len(),
            config.http_port,
            config.fixtures_folder.display()
        );
    }
    Ok(())
}

async fn handle_request(
    path: &Path,
    method: &str,
    url: &str,
    json: bool,
) -> http_doubles::Result<()> {
    let config = load_config(Some(path), None, None)?;
    let server = Server::builder().config(config).build();
    let response = server.request(method, url).await?;

    if json {
        let status = response.status.as_u16();
        let headers: serde_json::Map<String, serde_json::Value> = response
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    serde_json::Value::String(
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    ),
                )
            })
            .collect();
        let body = response.into_bytes().await?;
        let output = serde_json::json!({
            "status": status,
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", response.pretty_print());
    if matches!(response.body, ResponseBody::Stream(_)) {
        let body = response.into_bytes().await?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&body)?;
        stdout.flush()?;
    }
    Ok(())
}
