use crate::auth::token::TokenManager;
use crate::game::catalog::Catalog;
use crate::game::session::GameSession;
use crate::store::ProfileStore;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct AppState {
  pub catalog: Catalog,
  pub store: Arc<dyn ProfileStore>,
  pub token_manager: TokenManager,
  pub games: DashMap<Uuid, Arc<RwLock<GameSession>>>,
}

impl AppState {
  pub fn new(catalog: Catalog, store: Arc<dyn ProfileStore>) -> Self {
    Self {
      catalog,
      store,
      token_manager: TokenManager::new(),
      games: DashMap::new(),
    }
  }
}
