use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub const OPTION_COUNT: usize = 4;

const DEFAULT_CATALOG: &str = include_str!("../../assets/rooms.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
  pub prompt: String,
  pub options: [String; OPTION_COUNT],
  pub answer: usize,
}

impl Question {
  pub fn is_correct(&self, option: usize) -> bool {
    option == self.answer
  }
}

/// Ordered, non-empty question sequence played by one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck(Vec<Question>);

impl Deck {
  pub fn new(questions: Vec<Question>) -> Result<Self> {
    let deck = Self(questions);
    deck.validate()?;
    Ok(deck)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn get(&self, index: usize) -> Option<&Question> {
    self.0.get(index)
  }

  pub fn is_last(&self, index: usize) -> bool {
    index + 1 >= self.0.len()
  }

  fn validate(&self) -> Result<()> {
    ensure!(!self.0.is_empty(), "deck has no questions");
    for (i, q) in self.0.iter().enumerate() {
      ensure!(
        q.answer < OPTION_COUNT,
        "question {} has answer index {} out of range",
        i,
        q.answer
      );
      ensure!(!q.prompt.trim().is_empty(), "question {} has an empty prompt", i);
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTier {
  pub id: u32,
  pub name: String,
  pub entry_fee: u32,
  /// Payouts for 1st, 2nd and 3rd place.
  pub prizes: [u32; 3],
  pub theme: String,
  pub deck: Arc<Deck>,
}

impl RoomTier {
  pub fn max_prize(&self) -> u32 {
    self.prizes[0]
  }
}

pub struct Catalog {
  rooms: BTreeMap<u32, Arc<RoomTier>>,
}

impl Catalog {
  pub fn builtin() -> Result<Self> {
    Self::from_json(DEFAULT_CATALOG).context("embedded room catalog is invalid")
  }

  pub fn from_file(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading room catalog {}", path.display()))?;
    Self::from_json(&raw).with_context(|| format!("parsing room catalog {}", path.display()))
  }

  pub fn from_json(raw: &str) -> Result<Self> {
    let tiers: Vec<RoomTier> = serde_json::from_str(raw)?;
    ensure!(!tiers.is_empty(), "catalog has no rooms");

    let mut rooms = BTreeMap::new();
    for tier in tiers {
      tier
        .deck
        .validate()
        .with_context(|| format!("room {}", tier.id))?;
      if rooms.contains_key(&tier.id) {
        bail!("duplicate room id {}", tier.id);
      }
      rooms.insert(tier.id, Arc::new(tier));
    }
    Ok(Self { rooms })
  }

  pub fn get(&self, id: u32) -> Option<Arc<RoomTier>> {
    self.rooms.get(&id).cloned()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<RoomTier>> {
    self.rooms.values()
  }
}
