use super::catalog::RoomTier;
use super::round::{Elimination, Event, FEEDBACK_DELAY, Outcome, RoundController, Transition};
use crate::models::{GameView, InternalMsg, ToastKind};
use chrono::Local;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

const TICK: Duration = Duration::from_secs(1);

/// One player's run through a room, clocked by wall time.
pub struct GameSession {
  pub id: Uuid,
  pub owner: i64,
  pub room: Arc<RoomTier>,
  pub tx: broadcast::Sender<InternalMsg>,
  pub last_active: Instant,
  controller: RoundController,
  rng: StdRng,
  next_tick: Option<Instant>,
  settle_at: Option<Instant>,
}

impl GameSession {
  pub fn new(id: Uuid, owner: i64, room: Arc<RoomTier>, rng: StdRng, now: Instant) -> Self {
    let (tx, _) = broadcast::channel(64);
    Self {
      id,
      owner,
      controller: RoundController::new(room.deck.clone()),
      room,
      tx,
      last_active: now,
      rng,
      next_tick: Some(now + TICK),
      settle_at: None,
    }
  }

  pub fn outcome(&self) -> Outcome {
    self.controller.outcome()
  }

  /// Fires every tick and settle that came due by `now`, oldest first.
  pub fn advance(&mut self, now: Instant) {
    loop {
      let tick = self.next_tick.filter(|t| *t <= now);
      let settle = self.settle_at.filter(|t| *t <= now);
      let (event, at) = match (tick, settle) {
        (Some(t), Some(s)) if s <= t => (Event::Settle, s),
        (Some(t), _) => (Event::Tick, t),
        (None, Some(s)) => (Event::Settle, s),
        (None, None) => break,
      };
      match event {
        Event::Tick => self.next_tick = Some(at + TICK),
        _ => self.settle_at = None,
      }
      let transition = self.controller.apply(event, &mut self.rng);
      self.react(transition, at);
    }
  }

  pub fn submit(&mut self, option: usize, now: Instant) -> Transition {
    self.advance(now);
    self.last_active = now;
    let transition = self.controller.apply(Event::Submit(option), &mut self.rng);
    if transition == Transition::Ignored {
      tracing::debug!(session = %self.id, option, "answer ignored");
    }
    self.react(transition, now);
    transition
  }

  pub fn restart(&mut self, now: Instant) {
    self.last_active = now;
    let transition = self.controller.apply(Event::Restart, &mut self.rng);
    self.react(transition, now);
  }

  fn react(&mut self, transition: Transition, at: Instant) {
    match transition {
      Transition::Ignored => return,
      Transition::Ticked { .. } => {}
      Transition::Locked { correct, timed_out } => {
        tracing::debug!(session = %self.id, correct, timed_out, "input locked");
        self.next_tick = None;
        self.settle_at = Some(at + FEEDBACK_DELAY);
      }
      Transition::Advanced { question_index } => {
        tracing::debug!(session = %self.id, question_index, "advanced");
        self.next_tick = Some(at + TICK);
      }
      Transition::Won => {
        self.stop_clock();
        tracing::info!(session = %self.id, room = self.room.id, "player won");
        self.toast(
          ToastKind::Success,
          format!("Room {}: You won ${}!", self.room.id, self.room.max_prize()),
        );
      }
      Transition::Eliminated(reason) => {
        self.stop_clock();
        tracing::info!(session = %self.id, room = self.room.id, %reason, "player eliminated");
        match reason {
          Elimination::Wrong => self.toast(
            ToastKind::Error,
            format!("Room {}: You were eliminated", self.room.id),
          ),
          Elimination::Timeout => self.toast(ToastKind::Warning, "Time's up!".into()),
        }
      }
      Transition::Restarted => {
        self.settle_at = None;
        self.next_tick = Some(at + TICK);
        self.toast(ToastKind::Info, format!("Room {}: New game started", self.room.id));
      }
    }
    let _ = self.tx.send(InternalMsg::StateUpdated);
  }

  fn stop_clock(&mut self) {
    self.next_tick = None;
    self.settle_at = None;
  }

  fn toast(&self, kind: ToastKind, msg: String) {
    let _ = self.tx.send(InternalMsg::Toast {
      msg,
      kind,
      time: Local::now().format("%H:%M:%S").to_string(),
    });
  }

  pub fn view(&self, now: Instant) -> GameView {
    let state = self.controller.state();
    let deck = self.controller.deck();
    let question = deck.get(state.question_index);
    let outcome = self.controller.outcome();

    let message = match outcome {
      Outcome::InProgress => None,
      Outcome::Won => Some(format!("You just won ${}!", self.room.max_prize())),
      Outcome::Eliminated(_) => Some("You were eliminated!".to_string()),
    };

    GameView {
      session_id: self.id.to_string(),
      room_id: self.room.id,
      room_name: self.room.name.clone(),
      theme: self.room.theme.clone(),
      stake: format!("${} ⇒ ${}", self.room.entry_fee, self.room.max_prize()),
      question_index: state.question_index,
      total_questions: deck.len(),
      prompt: question.map(|q| q.prompt.clone()).unwrap_or_default(),
      options: question.map(|q| q.options.to_vec()).unwrap_or_default(),
      seconds_remaining: state.seconds_remaining,
      next_tick_ms: self
        .next_tick
        .map(|t| t.saturating_duration_since(now).as_millis() as u64),
      selected: state.selected,
      input_locked: state.input_locked,
      correct_answer: if state.input_locked {
        question.map(|q| q.answer)
      } else {
        None
      },
      players_remaining: self.controller.players_remaining(),
      outcome,
      message,
    }
  }
}
