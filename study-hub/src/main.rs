use axum::{routing::get, serve, Router};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use study_hub::api;
use study_hub_core::auth::Hs256Verifier;
use study_hub_core::events::EventBus;
use study_hub_core::store::ContentStore;

#[derive(Parser)]
#[command(name = "study-hub")]
#[command(about = "Study collaboration hub: flashcards, PDF links and quizzes")]
struct Cli {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Directory holding the persisted tables
    #[arg(short, long, default_value = "data")]
    data_dir: String,

    /// HS256 secret for bearer-token auth
    #[arg(long, default_value = "dev-secret")]
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let store = Arc::new(RwLock::new(ContentStore::new(&cli.data_dir)?));
    let events = EventBus::new();
    let verifier = Arc::new(Hs256Verifier::new(cli.jwt_secret));

    let router = api::router(store, events, verifier);
    let app = Router::new()
        .merge(router)
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&cli.addr).await?;
    info!(addr = %cli.addr, "listening");
    serve(listener, app.into_make_service()).await?;
    Ok(())
}
