use crate::models::{ClientAction, InternalMsg};
use crate::routes::session_for;
use crate::state::AppState;
use crate::store::Profile;
use axum::{
  Extension,
  extract::{
    Query, State,
    ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
  },
  response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::{
  sync::Arc,
  time::{Duration, Instant},
};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(serde::Deserialize)]
pub struct WsParams {
  game: Uuid,
}

pub async fn ws_handler(
  State(state): State<Arc<AppState>>,
  ws: WebSocketUpgrade,
  Query(params): Query<WsParams>,
  Extension(profile): Extension<Profile>,
) -> Response {
  // Reject strangers before upgrading.
  if let Err(e) = session_for(&state, params.game, &profile).await {
    return e.into_response();
  }
  ws.on_upgrade(move |socket| handle_socket(socket, state, params.game))
}

fn frame(kind: &str, data: impl serde::Serialize) -> Option<Message> {
  serde_json::to_string(&serde_json::json!({ "type": kind, "data": data }))
    .ok()
    .map(Message::text)
}

fn game_closed() -> Message {
  Message::Close(Some(CloseFrame {
    code: 4004,
    reason: "Game closed".into(),
  }))
}

async fn current_view(state: &AppState, game_id: Uuid) -> Option<Message> {
  let lock = state.games.get(&game_id).map(|e| e.value().clone())?;
  let game = lock.read().await;
  frame("update", game.view(Instant::now()))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, game_id: Uuid) {
  let (mut sender, mut receiver) = socket.split();

  let mut heartbeat_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
  heartbeat_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

  let mut broadcast_rx = {
    let Some(lock) = state.games.get(&game_id).map(|e| e.value().clone()) else {
      return;
    };
    let game = lock.read().await;
    game.tx.subscribe()
  };

  if let Some(msg) = current_view(&state, game_id).await {
    let _ = sender.send(msg).await;
  }

  let mut last_heartbeat = Instant::now();

  loop {
    tokio::select! {
      Some(Ok(msg)) = receiver.next() => {
        last_heartbeat = Instant::now();
        match msg {
          Message::Text(text) => {
            if let Ok(action) = serde_json::from_str::<ClientAction>(&text) {
              let Some(lock) = state.games.get(&game_id).map(|e| e.value().clone()) else {
                let _ = sender.send(game_closed()).await;
                break;
              };
              let mut game = lock.write().await;
              let now = Instant::now();
              match action {
                ClientAction::Answer { option } => { game.submit(option, now); },
                ClientAction::Restart => game.restart(now),
              }
            }
          },
          Message::Pong(_) => {},
          Message::Close(_) => break,
          _ => {}
        }
      }
      res = broadcast_rx.recv() => {
        match res {
          Ok(InternalMsg::StateUpdated) => {
            let Some(msg) = current_view(&state, game_id).await else {
              let _ = sender.send(game_closed()).await;
              break;
            };
            if sender.send(msg).await.is_err() { break; }
          },
          Ok(InternalMsg::Toast { msg, kind, time }) => {
            let data = serde_json::json!({ "msg": msg, "kind": kind, "time": time });
            if let Some(m) = frame("toast", data) {
              if sender.send(m).await.is_err() { break; }
            }
          },
          Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::debug!(game = %game_id, skipped, "socket lagged");
          },
          // Session torn down.
          Err(tokio::sync::broadcast::error::RecvError::Closed) => {
            let _ = sender.send(game_closed()).await;
            break;
          }
        }
      }
      _ = heartbeat_interval.tick() => {
        if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
          break;
        }
        let _ = sender.send(Message::Ping(vec![].into())).await;
      }
    }
  }
  tracing::debug!(game = %game_id, "socket closed");
}

#[cfg(test)]
mod tests {
  use crate::game::catalog::Catalog;
  use crate::game::round::FEEDBACK_DELAY;
  use crate::game::session::GameSession;
  use crate::routes::app;
  use crate::state::AppState;
  use crate::store::MemoryStore;
  use axum::body::Body;
  use axum::http::{Request, StatusCode, header};
  use futures::{SinkExt, StreamExt};
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use serde_json::{Value, json};
  use std::net::SocketAddr;
  use std::sync::Arc;
  use std::time::{Duration, Instant};
  use tokio::net::TcpStream;
  use tokio::sync::RwLock;
  use tokio::time::timeout;
  use tokio_tungstenite::tungstenite::{Message as WsMessage, client::IntoClientRequest};
  use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
  use tower::ServiceExt;
  use uuid::Uuid;

  type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

  async fn serve(state: Arc<AppState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app(state)).await });
    addr
  }

  async fn cookie_for(state: &AppState, name: &str) -> (i64, String) {
    let profile = state.store.load_or_create(name).await.unwrap();
    let token = state.token_manager.generate_token(&profile).unwrap();
    (profile.id, format!("token={}", token))
  }

  async fn open(
    addr: SocketAddr,
    game: Uuid,
    cookie: &str,
  ) -> Result<Client, tokio_tungstenite::tungstenite::Error> {
    let mut req = format!("ws://{}/ws?game={}", addr, game)
      .into_client_request()
      .unwrap();
    req
      .headers_mut()
      .insert("Cookie", cookie.parse().unwrap());
    connect_async(req).await.map(|(ws, _)| ws)
  }

  // Reads frames until one of `kind` shows up, skipping pings and other frames.
  async fn frame_of(ws: &mut Client, kind: &str) -> Value {
    loop {
      let msg = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("no frame in time")
        .expect("socket ended")
        .unwrap();
      if !msg.is_text() {
        continue;
      }
      let frame: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
      if frame["type"] == kind {
        return frame["data"].clone();
      }
    }
  }

  async fn close_code(ws: &mut Client) -> Option<u16> {
    loop {
      let next = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("socket left open");
      match next {
        Some(Ok(WsMessage::Close(frame))) => return frame.map(|f| f.code.into()),
        Some(Ok(_)) => continue,
        _ => return None,
      }
    }
  }

  #[tokio::test]
  async fn socket_plays_a_round_and_closes_on_teardown() {
    let state = Arc::new(AppState::new(
      Catalog::builtin().unwrap(),
      Arc::new(MemoryStore::default()),
    ));
    let addr = serve(state.clone()).await;
    let (owner, cookie) = cookie_for(&state, "olga").await;
    let (_, stranger) = cookie_for(&state, "mallory").await;

    let id = Uuid::now_v7();
    let room = state.catalog.get(2).unwrap();
    let game = GameSession::new(id, owner, room, StdRng::seed_from_u64(0), Instant::now());
    state.games.insert(id, Arc::new(RwLock::new(game)));

    // Strangers are turned away before the upgrade.
    match open(addr, id, &stranger).await {
      Err(tokio_tungstenite::tungstenite::Error::Http(resp)) => {
        assert_eq!(resp.status().as_u16(), StatusCode::FORBIDDEN.as_u16());
      }
      other => panic!("stranger got {:?}", other.map(|_| ())),
    }

    let mut ws = open(addr, id, &cookie).await.unwrap();
    let first = frame_of(&mut ws, "update").await;
    assert_eq!(first["question_index"], 0);
    assert_eq!(first["outcome"]["status"], "in_progress");
    assert!(first.get("correct_answer").is_none());

    // Room 2 opens with answer 1.
    let answer = json!({ "type": "Answer", "data": { "option": 3 } });
    ws.send(WsMessage::text(answer.to_string())).await.unwrap();
    let locked = frame_of(&mut ws, "update").await;
    assert_eq!(locked["input_locked"], true);
    assert_eq!(locked["selected"], 3);
    assert_eq!(locked["correct_answer"], 1);

    crate::game::sweep(&state, Instant::now() + FEEDBACK_DELAY).await;
    let toast = frame_of(&mut ws, "toast").await;
    assert_eq!(toast["kind"], "error");
    assert_eq!(toast["msg"], "Room 2: You were eliminated");
    let over = frame_of(&mut ws, "update").await;
    assert_eq!(over["outcome"]["reason"], "wrong");

    let restart = json!({ "type": "Restart" });
    ws.send(WsMessage::text(restart.to_string())).await.unwrap();
    let toast = frame_of(&mut ws, "toast").await;
    assert_eq!(toast["kind"], "info");
    assert_eq!(toast["msg"], "Room 2: New game started");
    let fresh = frame_of(&mut ws, "update").await;
    assert_eq!(fresh["outcome"]["status"], "in_progress");
    assert_eq!(fresh["players_remaining"], 100);

    let req = Request::builder()
      .method("DELETE")
      .uri(format!("/games/{}", id))
      .header(header::COOKIE, &cookie)
      .body(Body::empty())
      .unwrap();
    let resp = app(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(close_code(&mut ws).await, Some(4004));
  }

  #[tokio::test]
  async fn idle_reaping_closes_the_socket() {
    let state = Arc::new(AppState::new(
      Catalog::builtin().unwrap(),
      Arc::new(MemoryStore::default()),
    ));
    let addr = serve(state.clone()).await;
    let (owner, cookie) = cookie_for(&state, "pat").await;

    let id = Uuid::now_v7();
    let start = Instant::now();
    let room = state.catalog.get(1).unwrap();
    let game = GameSession::new(id, owner, room, StdRng::seed_from_u64(1), start);
    state.games.insert(id, Arc::new(RwLock::new(game)));

    let mut ws = open(addr, id, &cookie).await.unwrap();
    frame_of(&mut ws, "update").await;

    crate::game::sweep(&state, start + Duration::from_secs(601)).await;
    assert!(!state.games.contains_key(&id));
    assert_eq!(close_code(&mut ws).await, Some(4004));
  }
}
