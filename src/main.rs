mod auth;
mod conf;
mod error;
mod game;
mod middleware;
mod models;
mod routes;
mod state;
mod store;
mod wallet;
mod ws;

use anyhow::{Context, Result};
use conf::{Config, StoreTarget};
use game::catalog::Catalog;
use state::AppState;
use std::sync::Arc;
use store::{JsonFileStore, MemoryStore, ProfileStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quiz_arena=info,tower_http=info")),
    )
    .init();

  let config = Config::load();

  let catalog = match &config.catalog {
    Some(path) => Catalog::from_file(path)?,
    None => Catalog::builtin()?,
  };
  tracing::info!(rooms = catalog.iter().count(), "room catalog loaded");

  let store: Arc<dyn ProfileStore> = match &config.store {
    StoreTarget::Memory => Arc::new(MemoryStore::default()),
    StoreTarget::File(path) => {
      tracing::info!(path = %path.display(), "using file profile store");
      Arc::new(JsonFileStore::new(path.clone()))
    }
  };

  let state = Arc::new(AppState::new(catalog, store));

  // 启动后台游戏循环
  tokio::spawn(game::game_loop(state.clone()));

  let app = routes::app(state);

  let listener = tokio::net::TcpListener::bind(config.bind)
    .await
    .with_context(|| format!("binding {}", config.bind))?;
  tracing::info!("Server listening on {}", config.bind);
  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}
