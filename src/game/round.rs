//! Round controller: a pure reducer over one player's run through a deck.
//!
//! Time only enters through events. The caller fires `Tick` once per second
//! and `Settle` once the answer feedback has been on screen long enough.

use super::catalog::{Deck, OPTION_COUNT};
use super::pool::{self, FULL_LOBBY};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;

pub const ROUND_SECONDS: u32 = 10;
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(900);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundState {
  pub question_index: usize,
  pub seconds_remaining: u32,
  pub selected: Option<usize>,
  pub input_locked: bool,
}

impl Default for RoundState {
  fn default() -> Self {
    Self {
      question_index: 0,
      seconds_remaining: ROUND_SECONDS,
      selected: None,
      input_locked: false,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Elimination {
  Wrong,
  Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum Outcome {
  #[default]
  InProgress,
  Won,
  Eliminated(Elimination),
}

impl Outcome {
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Self::InProgress)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
  Tick,
  Submit(usize),
  Settle,
  Restart,
}

/// What a single event did, so the caller can notify and reschedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  Ignored,
  Ticked { seconds_remaining: u32 },
  /// Input locked; a verdict waits for `Settle`.
  Locked { correct: bool, timed_out: bool },
  Advanced { question_index: usize },
  Won,
  Eliminated(Elimination),
  Restarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
  Advance,
  Eliminate(Elimination),
}

pub struct RoundController {
  deck: Arc<Deck>,
  state: RoundState,
  outcome: Outcome,
  players_remaining: u32,
  pending: Option<Verdict>,
}

impl RoundController {
  pub fn new(deck: Arc<Deck>) -> Self {
    Self {
      deck,
      state: RoundState::default(),
      outcome: Outcome::InProgress,
      players_remaining: FULL_LOBBY,
      pending: None,
    }
  }

  pub fn state(&self) -> &RoundState {
    &self.state
  }

  pub fn outcome(&self) -> Outcome {
    self.outcome
  }

  pub fn players_remaining(&self) -> u32 {
    self.players_remaining
  }

  pub fn deck(&self) -> &Deck {
    &self.deck
  }

  /// True while the countdown should keep running.
  pub fn timer_running(&self) -> bool {
    self.outcome == Outcome::InProgress && !self.state.input_locked
  }

  pub fn apply<R: Rng + ?Sized>(&mut self, event: Event, rng: &mut R) -> Transition {
    match event {
      Event::Tick => self.tick(),
      Event::Submit(option) => self.submit(option),
      Event::Settle => self.settle(rng),
      Event::Restart => self.restart(),
    }
  }

  fn tick(&mut self) -> Transition {
    if !self.timer_running() {
      return Transition::Ignored;
    }
    self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
    if self.state.seconds_remaining > 0 {
      return Transition::Ticked {
        seconds_remaining: self.state.seconds_remaining,
      };
    }
    self.state.input_locked = true;
    self.pending = Some(Verdict::Eliminate(Elimination::Timeout));
    Transition::Locked {
      correct: false,
      timed_out: true,
    }
  }

  fn submit(&mut self, option: usize) -> Transition {
    if !self.timer_running() || option >= OPTION_COUNT {
      return Transition::Ignored;
    }
    let Some(question) = self.deck.get(self.state.question_index) else {
      return Transition::Ignored;
    };
    let correct = question.is_correct(option);

    self.state.input_locked = true;
    self.state.selected = Some(option);
    self.pending = Some(if correct {
      Verdict::Advance
    } else {
      Verdict::Eliminate(Elimination::Wrong)
    });
    Transition::Locked {
      correct,
      timed_out: false,
    }
  }

  fn settle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Transition {
    let Some(verdict) = self.pending.take() else {
      return Transition::Ignored;
    };
    self.state.selected = None;

    match verdict {
      Verdict::Eliminate(reason) => {
        self.outcome = Outcome::Eliminated(reason);
        Transition::Eliminated(reason)
      }
      Verdict::Advance => {
        let current = self.state.question_index;
        let next = current + 1;
        self.players_remaining =
          pool::next_remaining(self.players_remaining, next, self.deck.len(), rng);

        if self.deck.is_last(current) {
          self.outcome = Outcome::Won;
          return Transition::Won;
        }
        self.state.question_index = next;
        self.state.seconds_remaining = ROUND_SECONDS;
        self.state.input_locked = false;
        Transition::Advanced {
          question_index: next,
        }
      }
    }
  }

  fn restart(&mut self) -> Transition {
    self.state = RoundState::default();
    self.outcome = Outcome::InProgress;
    self.players_remaining = FULL_LOBBY;
    self.pending = None;
    Transition::Restarted
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::game::catalog::Question;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  fn deck(answers: &[usize]) -> Arc<Deck> {
    let questions = answers
      .iter()
      .enumerate()
      .map(|(i, &answer)| Question {
        prompt: format!("question {}", i),
        options: ["a".into(), "b".into(), "c".into(), "d".into()],
        answer,
      })
      .collect();
    Arc::new(Deck::new(questions).unwrap())
  }

  fn answer(ctl: &mut RoundController, option: usize, rng: &mut StdRng) -> Transition {
    ctl.apply(Event::Submit(option), rng);
    ctl.apply(Event::Settle, rng)
  }

  #[test]
  fn all_correct_wins_with_one_player_left() {
    let answers = [2, 1, 2, 1, 0];
    let mut ctl = RoundController::new(deck(&answers));
    let mut rng = StdRng::seed_from_u64(1);

    let mut last = Transition::Ignored;
    let mut previous = ctl.players_remaining();
    for &a in &answers {
      last = answer(&mut ctl, a, &mut rng);
      assert!(ctl.players_remaining() <= previous);
      previous = ctl.players_remaining();
    }
    assert_eq!(last, Transition::Won);
    assert_eq!(ctl.outcome(), Outcome::Won);
    assert_eq!(ctl.players_remaining(), 1);
  }

  #[test]
  fn counter_is_one_on_last_question() {
    let mut ctl = RoundController::new(deck(&[0, 0, 0, 0, 0]));
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..4 {
      answer(&mut ctl, 0, &mut rng);
    }
    assert_eq!(ctl.state().question_index, 4);
    assert_eq!(ctl.players_remaining(), 1);
    assert_eq!(ctl.outcome(), Outcome::InProgress);
  }

  #[test]
  fn wrong_answer_freezes_index() {
    let mut ctl = RoundController::new(deck(&[0, 0, 0, 0, 0]));
    let mut rng = StdRng::seed_from_u64(5);
    answer(&mut ctl, 0, &mut rng);
    answer(&mut ctl, 0, &mut rng);

    assert_eq!(
      ctl.apply(Event::Submit(3), &mut rng),
      Transition::Locked {
        correct: false,
        timed_out: false
      }
    );
    assert_eq!(
      ctl.apply(Event::Settle, &mut rng),
      Transition::Eliminated(Elimination::Wrong)
    );
    assert_eq!(ctl.outcome(), Outcome::Eliminated(Elimination::Wrong));
    assert_eq!(ctl.state().question_index, 2);
  }

  #[test]
  fn ticks_count_down_then_time_out_once() {
    let mut ctl = RoundController::new(deck(&[1, 1]));
    let mut rng = StdRng::seed_from_u64(9);

    for expected in (1..ROUND_SECONDS).rev() {
      assert_eq!(
        ctl.apply(Event::Tick, &mut rng),
        Transition::Ticked {
          seconds_remaining: expected
        }
      );
    }
    assert_eq!(
      ctl.apply(Event::Tick, &mut rng),
      Transition::Locked {
        correct: false,
        timed_out: true
      }
    );
    assert_eq!(ctl.state().seconds_remaining, 0);

    // Locked: further ticks and answers bounce off.
    assert_eq!(ctl.apply(Event::Tick, &mut rng), Transition::Ignored);
    assert_eq!(ctl.apply(Event::Submit(1), &mut rng), Transition::Ignored);
    assert_eq!(ctl.state().seconds_remaining, 0);

    assert_eq!(
      ctl.apply(Event::Settle, &mut rng),
      Transition::Eliminated(Elimination::Timeout)
    );
    assert_eq!(ctl.apply(Event::Settle, &mut rng), Transition::Ignored);
    assert_eq!(ctl.outcome(), Outcome::Eliminated(Elimination::Timeout));
  }

  #[test]
  fn answer_locks_out_timeout() {
    let mut ctl = RoundController::new(deck(&[1, 1]));
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..ROUND_SECONDS - 1 {
      ctl.apply(Event::Tick, &mut rng);
    }
    ctl.apply(Event::Submit(1), &mut rng);
    // The tick that would have hit zero lands while locked.
    assert_eq!(ctl.apply(Event::Tick, &mut rng), Transition::Ignored);
    assert_eq!(
      ctl.apply(Event::Settle, &mut rng),
      Transition::Advanced { question_index: 1 }
    );
    assert_eq!(ctl.state().seconds_remaining, ROUND_SECONDS);
    assert!(!ctl.state().input_locked);
  }

  #[test]
  fn double_submit_keeps_first_choice() {
    let mut ctl = RoundController::new(deck(&[1, 1]));
    let mut rng = StdRng::seed_from_u64(2);
    ctl.apply(Event::Submit(0), &mut rng);
    assert_eq!(ctl.apply(Event::Submit(1), &mut rng), Transition::Ignored);
    assert_eq!(ctl.state().selected, Some(0));
    assert_eq!(
      ctl.apply(Event::Settle, &mut rng),
      Transition::Eliminated(Elimination::Wrong)
    );
  }

  #[test]
  fn terminal_state_rejects_input() {
    let mut ctl = RoundController::new(deck(&[1]));
    let mut rng = StdRng::seed_from_u64(2);
    assert_eq!(answer(&mut ctl, 1, &mut rng), Transition::Won);
    assert_eq!(ctl.apply(Event::Tick, &mut rng), Transition::Ignored);
    assert_eq!(ctl.apply(Event::Submit(1), &mut rng), Transition::Ignored);
    assert_eq!(ctl.apply(Event::Settle, &mut rng), Transition::Ignored);
    assert_eq!(ctl.outcome(), Outcome::Won);
    assert_eq!(ctl.players_remaining(), 1);
  }

  #[test]
  fn out_of_range_option_is_ignored() {
    let mut ctl = RoundController::new(deck(&[1]));
    let mut rng = StdRng::seed_from_u64(2);
    assert_eq!(ctl.apply(Event::Submit(4), &mut rng), Transition::Ignored);
    assert!(ctl.timer_running());
  }

  #[test]
  fn restart_resets_everything() {
    let mut ctl = RoundController::new(deck(&[0, 0, 0]));
    let mut rng = StdRng::seed_from_u64(4);
    answer(&mut ctl, 0, &mut rng);
    ctl.apply(Event::Tick, &mut rng);
    ctl.apply(Event::Submit(2), &mut rng);
    ctl.apply(Event::Settle, &mut rng);
    assert!(ctl.outcome().is_terminal());

    assert_eq!(ctl.apply(Event::Restart, &mut rng), Transition::Restarted);
    assert_eq!(ctl.state(), &RoundState::default());
    assert_eq!(ctl.outcome(), Outcome::InProgress);
    assert_eq!(ctl.players_remaining(), FULL_LOBBY);
    assert_eq!(ctl.apply(Event::Settle, &mut rng), Transition::Ignored);

    // Restarting mid-feedback also drops the queued verdict.
    ctl.apply(Event::Submit(1), &mut rng);
    ctl.apply(Event::Restart, &mut rng);
    assert_eq!(ctl.apply(Event::Settle, &mut rng), Transition::Ignored);
    assert_eq!(ctl.state(), &RoundState::default());
  }

  #[test]
  fn every_session_ends_exactly_once() {
    for seed in 0..50u64 {
      let mut rng = StdRng::seed_from_u64(seed);
      let mut ctl = RoundController::new(deck(&[0, 1, 2, 3, 0]));
      let mut terminals = 0;
      for step in 0..200 {
        let event = match rng.gen_range(0..4) {
          0 | 1 => Event::Tick,
          2 => Event::Submit(rng.gen_range(0..OPTION_COUNT)),
          _ => Event::Settle,
        };
        let t = ctl.apply(event, &mut rng);
        if matches!(t, Transition::Won | Transition::Eliminated(_)) {
          terminals += 1;
        }
        if step > 150 && ctl.outcome().is_terminal() {
          break;
        }
      }
      // Drain: keep the clock running until the session has to end.
      for _ in 0..ROUND_SECONDS + 1 {
        for event in [Event::Tick, Event::Settle] {
          let t = ctl.apply(event, &mut rng);
          if matches!(t, Transition::Won | Transition::Eliminated(_)) {
            terminals += 1;
          }
        }
      }
      assert!(ctl.outcome().is_terminal(), "seed {seed}");
      assert_eq!(terminals, 1, "seed {seed}");
    }
  }
}
