mod backend;
mod calc;
mod config;
mod dashboard;
mod document;
mod export;
mod ipc;
mod llm;
mod merge;
mod prompts;
mod records;
mod selection;
mod session;
mod tutor;

use backend::HttpBackend;
use clap::Parser;
use config::Config;
use llm::{LlmBackend, OpenAiBackend};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eeebeed=info")),
        )
        .init();

    let config = Config::parse();
    let backend = HttpBackend::new(&config.backend_url, config.api_token.as_deref())?;
    let llm: Option<Box<dyn LlmBackend>> = match config.llm_api_key.as_deref() {
        Some(key) if config.llm_enabled() => Some(Box::new(OpenAiBackend::new(
            &config.llm_url,
            &config.llm_model,
            key,
        )?)),
        _ => {
            warn!("no generation API key configured; tutor output is disabled");
            None
        }
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = backend.base_url(),
        llm = llm.is_some(),
        "eeebeed started"
    );

    let backend_url = backend.base_url().to_string();
    let mut state = ipc::AppState::new(
        Box::new(backend),
        backend_url,
        llm,
        config.org_code.clone(),
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to reply to.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    info!("stdin closed; shutting down");
    Ok(())
}
