use crate::state::AppState;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod catalog;
pub mod pool;
pub mod round;
pub mod session;

const LOOP_INTERVAL: Duration = Duration::from_millis(100);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

// 驱动所有会话的计时器，并清理长时间无人操作的会话
pub async fn game_loop(state: Arc<AppState>) {
  let mut interval = tokio::time::interval(LOOP_INTERVAL);
  interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
  loop {
    interval.tick().await;
    sweep(&state, Instant::now()).await;
  }
}

pub async fn sweep(state: &AppState, now: Instant) {
  let sessions: Vec<_> = state
    .games
    .iter()
    .map(|e| (*e.key(), e.value().clone()))
    .collect();

  let mut idle = Vec::new();
  for (id, lock) in sessions {
    let mut game = lock.write().await;
    game.advance(now);
    if now.duration_since(game.last_active) > IDLE_TIMEOUT {
      idle.push(id);
    }
  }

  for id in idle {
    if state.games.remove(&id).is_some() {
      tracing::info!(session = %id, "idle session torn down");
    }
  }
}
