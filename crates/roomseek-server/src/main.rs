//! RoomSeek: natural-language rental search interpreter.

use std::path::PathBuf;
use std::sync::Arc;

use roomseek_core::RoomSeekConfig;
use roomseek_extract::{classify, extract_fallback};
use roomseek_runtime::interpreter::preview_parameters;
use roomseek_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> PathBuf {
    std::env::var("ROOMSEEK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/roomseek.json"))
}

/// Print the gate decision and the rule-based extraction for `text`.
fn print_classification(text: &str) -> anyhow::Result<()> {
    let record = extract_fallback(text);
    let report = serde_json::json!({
        "message": text,
        "relevance": classify(text),
        "record": record,
        "searchParams": preview_parameters(&record),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "classify" => {
                if args.len() < 3 {
                    eprintln!("Usage: roomseek classify <message>");
                    std::process::exit(1);
                }
                return print_classification(&args[2..].join(" "));
            }
            "--help" | "-h" | "help" => {
                println!("RoomSeek — rental search message interpreter");
                println!();
                println!("Usage: roomseek [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  classify <message>       Classify a message offline");
                println!("  help                     Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'roomseek help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Normal server startup
    let config_path = resolve_config_path();
    let config = RoomSeekConfig::load(&config_path);
    config.validate()?;
    let port = config.port;

    let state = Arc::new(AppState::from_config(&config));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("RoomSeek server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
