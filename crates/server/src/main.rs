//! # webbook-server
//!
//! HTTP server for the webbook workbook editor: upload an `.xlsx`/`.xlsm`
//! file, edit it sheet by sheet, run grouped reports and chart specs,
//! then download it back with macros intact.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;
mod session;

use routes::{create_router, AppState};
use session::EditSession;

#[derive(Parser, Debug)]
#[command(name = "webbook-server", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Workbook to open as a ready-made session at startup
    #[arg(long)]
    workbook: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let state = AppState::new();

    if let Some(path) = &args.workbook {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read workbook {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "workbook.xlsx".to_string(), |n| n.to_string_lossy().into_owned());
        let session = EditSession::new(&file_name, bytes)
            .with_context(|| format!("failed to open workbook {}", path.display()))?;
        let id = state.sessions.insert(session);
        tracing::info!(%id, file = %file_name, "preloaded workbook session");
    }

    let app = create_router(state);

    tracing::info!(addr = %args.bind, "webbook-server listening");
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
