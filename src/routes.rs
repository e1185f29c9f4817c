use crate::game::catalog::OPTION_COUNT;
use crate::game::round::Transition;
use crate::game::session::GameSession;
use crate::models::{AnswerReply, GameView, LobbyView, RewardRow, RoomSummary};
use crate::store::{Profile, Renamed};
use crate::wallet::{self, Coin, DepositAddress, DepositRequest, Receipt, WithdrawRequest};
use crate::{
  auth::valid_username,
  error::AppError,
  middleware::{TOKEN_COOKIE, auth_middleware},
  state::AppState,
  ws,
};
use axum::{
  Extension, Json, Router,
  extract::{Path, State},
  http::StatusCode,
  middleware,
  response::IntoResponse,
  routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_cookies::{Cookie, CookieManagerLayer, Cookies};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const PLACES: [&str; 3] = ["1st Place", "2nd Place", "3rd Place"];

pub fn app(state: Arc<AppState>) -> Router {
  let auth_routes = Router::new()
    .route("/me", get(me).put(rename))
    .route("/rooms/{id}/play", post(play))
    .route("/games/{id}", get(game_view).delete(leave_game))
    .route("/games/{id}/answer", post(answer))
    .route("/games/{id}/restart", post(restart))
    .route("/wallet/coins", get(coins))
    .route("/wallet/deposit/{coin}", get(deposit_address))
    .route("/wallet/deposit", post(deposit))
    .route("/wallet/withdraw", post(withdraw))
    .route("/ws", get(ws::ws_handler))
    .layer(middleware::from_fn_with_state(
      state.clone(),
      auth_middleware,
    ));

  let public_routes = Router::new()
    .route("/login", post(login))
    .route("/logout", get(logout))
    .route("/rooms", get(list_rooms))
    .route("/rooms/{id}", get(lobby));

  Router::new()
    .merge(public_routes)
    .merge(auth_routes)
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new().deflate(true).gzip(true))
        .layer(CookieManagerLayer::new()),
    )
    .with_state(state)
}

fn set_token(cookies: &Cookies, state: &AppState, profile: &Profile) -> Result<(), AppError> {
  let token = state.token_manager.generate_token(profile)?;
  cookies.add(
    Cookie::build((TOKEN_COOKIE, token))
      .path("/")
      .http_only(true)
      .build(),
  );
  Ok(())
}

#[derive(Deserialize)]
struct LoginParams {
  username: String,
}

async fn login(
  State(state): State<Arc<AppState>>,
  cookies: Cookies,
  Json(form): Json<LoginParams>,
) -> Result<Json<Profile>, AppError> {
  let username = form.username.trim();
  if !valid_username(username) {
    return Err(AppError::bad_request(
      "Username must be 1-16 letters, digits, '_' or '-'.",
    ));
  }
  let profile = state.store.load_or_create(username).await?;
  set_token(&cookies, &state, &profile)?;
  tracing::info!(username, id = profile.id, "logged in");
  Ok(Json(profile))
}

async fn logout(cookies: Cookies) -> impl IntoResponse {
  cookies.remove(Cookie::build((TOKEN_COOKIE, "")).path("/").build());
  StatusCode::NO_CONTENT
}

async fn me(Extension(profile): Extension<Profile>) -> Json<Profile> {
  Json(profile)
}

async fn rename(
  State(state): State<Arc<AppState>>,
  Extension(profile): Extension<Profile>,
  cookies: Cookies,
  Json(form): Json<LoginParams>,
) -> Result<Json<Profile>, AppError> {
  let new_name = form.username.trim();
  if new_name == profile.username {
    return Ok(Json(profile));
  }
  if !valid_username(new_name) {
    return Err(AppError::bad_request(
      "Username must be 1-16 letters, digits, '_' or '-'.",
    ));
  }
  let renamed = match state.store.rename(&profile.username, new_name).await? {
    Renamed::Done(p) => p,
    Renamed::Taken => return Err(AppError::bad_request("Username is already taken.")),
    Renamed::Missing => return Err(AppError::Unauthorized),
  };
  set_token(&cookies, &state, &renamed)?;
  tracing::info!(from = %profile.username, to = %renamed.username, "profile renamed");
  Ok(Json(renamed))
}

async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummary>> {
  let rooms = state
    .catalog
    .iter()
    .map(|r| RoomSummary {
      id: r.id,
      name: r.name.clone(),
      entry_fee: r.entry_fee,
      max_prize: r.max_prize(),
      theme: r.theme.clone(),
    })
    .collect();
  Json(rooms)
}

async fn lobby(
  State(state): State<Arc<AppState>>,
  Path(id): Path<u32>,
) -> Result<Json<LobbyView>, AppError> {
  let room = state
    .catalog
    .get(id)
    .ok_or_else(|| AppError::not_found("Invalid Room"))?;

  Ok(Json(LobbyView {
    id: room.id,
    name: room.name.clone(),
    entry_fee: room.entry_fee,
    headline: format!("Win up to ${}", room.max_prize()),
    rewards: PLACES
      .iter()
      .zip(room.prizes)
      .map(|(place, prize)| RewardRow {
        place: place.to_string(),
        prize,
      })
      .collect(),
    question_count: room.deck.len(),
    theme: room.theme.clone(),
  }))
}

async fn play(
  State(state): State<Arc<AppState>>,
  Path(id): Path<u32>,
  Extension(profile): Extension<Profile>,
) -> Result<impl IntoResponse, AppError> {
  let room = state
    .catalog
    .get(id)
    .ok_or_else(|| AppError::not_found("Invalid Room"))?;

  let now = Instant::now();
  let session_id = Uuid::now_v7();
  let session = GameSession::new(
    session_id,
    profile.id,
    room,
    StdRng::from_entropy(),
    now,
  );
  let view = session.view(now);
  state
    .games
    .insert(session_id, Arc::new(RwLock::new(session)));

  tracing::info!(session = %session_id, room = id, user = profile.id, "game started");
  Ok((StatusCode::CREATED, Json(view)))
}

pub(crate) async fn session_for(
  state: &AppState,
  id: Uuid,
  profile: &Profile,
) -> Result<Arc<RwLock<GameSession>>, AppError> {
  let lock = state
    .games
    .get(&id)
    .map(|e| e.value().clone())
    .ok_or_else(|| AppError::not_found("Game not found"))?;
  if lock.read().await.owner != profile.id {
    return Err(AppError::Forbidden);
  }
  Ok(lock)
}

async fn game_view(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Extension(profile): Extension<Profile>,
) -> Result<Json<GameView>, AppError> {
  let lock = session_for(&state, id, &profile).await?;
  let mut game = lock.write().await;
  let now = Instant::now();
  game.advance(now);
  game.last_active = now;
  Ok(Json(game.view(now)))
}

#[derive(Deserialize)]
struct AnswerParams {
  option: usize,
}

async fn answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Extension(profile): Extension<Profile>,
  Json(form): Json<AnswerParams>,
) -> Result<Json<AnswerReply>, AppError> {
  if form.option >= OPTION_COUNT {
    return Err(AppError::bad_request(format!(
      "option must be between 0 and {}",
      OPTION_COUNT - 1
    )));
  }
  let lock = session_for(&state, id, &profile).await?;
  let mut game = lock.write().await;
  let now = Instant::now();
  let transition = game.submit(form.option, now);
  Ok(Json(AnswerReply {
    accepted: transition != Transition::Ignored,
    game: game.view(now),
  }))
}

async fn restart(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Extension(profile): Extension<Profile>,
) -> Result<Json<GameView>, AppError> {
  let lock = session_for(&state, id, &profile).await?;
  let mut game = lock.write().await;
  let now = Instant::now();
  game.restart(now);
  Ok(Json(game.view(now)))
}

async fn leave_game(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Extension(profile): Extension<Profile>,
) -> Result<StatusCode, AppError> {
  let lock = session_for(&state, id, &profile).await?;
  let finished = lock.read().await.outcome().is_terminal();
  state.games.remove(&id);
  tracing::info!(session = %id, finished, "game torn down");
  Ok(StatusCode::NO_CONTENT)
}

async fn coins() -> Json<Vec<Coin>> {
  Json(Coin::all())
}

async fn deposit_address(Path(coin): Path<String>) -> Result<Json<DepositAddress>, AppError> {
  let coin: Coin = coin
    .parse()
    .map_err(|_| AppError::not_found(format!("Unknown coin {}", coin)))?;
  Ok(Json(wallet::deposit_address(coin)))
}

async fn deposit(Json(req): Json<DepositRequest>) -> Result<Json<Receipt>, AppError> {
  wallet::deposit(&req)
    .map(Json)
    .map_err(AppError::BadRequest)
}

async fn withdraw(Json(req): Json<WithdrawRequest>) -> Result<Json<Receipt>, AppError> {
  wallet::withdraw(&req)
    .map(Json)
    .map_err(AppError::BadRequest)
}
