use crate::game::round::Outcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
  Success,
  Error,
  Warning,
  Info,
}

#[derive(Debug, Clone, Serialize)]
pub enum InternalMsg {
  StateUpdated,
  Toast {
    msg: String,
    kind: ToastKind,
    time: String,
  },
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientAction {
  Answer { option: usize },
  Restart,
}

#[derive(Serialize)]
pub struct RoomSummary {
  pub id: u32,
  pub name: String,
  pub entry_fee: u32,
  pub max_prize: u32,
  pub theme: String,
}

#[derive(Serialize)]
pub struct LobbyView {
  pub id: u32,
  pub name: String,
  pub entry_fee: u32,
  pub headline: String,
  pub rewards: Vec<RewardRow>,
  pub question_count: usize,
  pub theme: String,
}

#[derive(Serialize)]
pub struct RewardRow {
  pub place: String,
  pub prize: u32,
}

#[derive(Serialize)]
pub struct GameView {
  pub session_id: String,
  pub room_id: u32,
  pub room_name: String,
  pub theme: String,
  pub stake: String,
  pub question_index: usize,
  pub total_questions: usize,
  pub prompt: String,
  pub options: Vec<String>,
  pub seconds_remaining: u32,
  pub next_tick_ms: Option<u64>,
  pub selected: Option<usize>,
  pub input_locked: bool,
  // Only revealed once input is locked
  #[serde(skip_serializing_if = "Option::is_none")]
  pub correct_answer: Option<usize>,
  pub players_remaining: u32,
  pub outcome: Outcome,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

#[derive(Serialize)]
pub struct AnswerReply {
  pub accepted: bool,
  pub game: GameView,
}
