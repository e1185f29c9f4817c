use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub const STARTING_BALANCE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub username: String,
  pub id: i64,
  pub balance: f64,
}

impl Profile {
  pub fn fresh(username: String) -> Self {
    Self {
      username,
      id: rand::thread_rng().gen_range(100_000_000..1_000_000_000),
      balance: STARTING_BALANCE,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Renamed {
  Done(Profile),
  Taken,
  Missing,
}

/// Key-value home of user profiles, keyed by username.
///
/// Every method runs under one store-wide lock, so a create or a rename is
/// never interleaved with another write.
#[async_trait]
pub trait ProfileStore: Send + Sync {
  async fn load(&self, username: &str) -> Result<Option<Profile>>;
  async fn load_or_create(&self, username: &str) -> Result<Profile>;
  /// Moves the profile under `from` to `to`, keeping its id and balance.
  async fn rename(&self, from: &str, to: &str) -> Result<Renamed>;
}

type Profiles = BTreeMap<String, Profile>;

// Returns the profile and whether it was just created.
fn get_or_insert(all: &mut Profiles, username: &str) -> (Profile, bool) {
  if let Some(p) = all.get(username) {
    return (p.clone(), false);
  }
  let profile = Profile::fresh(username.to_string());
  all.insert(username.to_string(), profile.clone());
  tracing::info!(username, id = profile.id, "profile created");
  (profile, true)
}

fn move_profile(all: &mut Profiles, from: &str, to: &str) -> Renamed {
  if all.contains_key(to) {
    return Renamed::Taken;
  }
  let Some(old) = all.remove(from) else {
    return Renamed::Missing;
  };
  let renamed = Profile {
    username: to.to_string(),
    ..old
  };
  all.insert(to.to_string(), renamed.clone());
  Renamed::Done(renamed)
}

#[derive(Default)]
pub struct MemoryStore {
  profiles: Mutex<Profiles>,
}

#[async_trait]
impl ProfileStore for MemoryStore {
  async fn load(&self, username: &str) -> Result<Option<Profile>> {
    Ok(self.profiles.lock().await.get(username).cloned())
  }

  async fn load_or_create(&self, username: &str) -> Result<Profile> {
    let mut all = self.profiles.lock().await;
    Ok(get_or_insert(&mut all, username).0)
  }

  async fn rename(&self, from: &str, to: &str) -> Result<Renamed> {
    let mut all = self.profiles.lock().await;
    Ok(move_profile(&mut all, from, to))
  }
}

/// Whole store kept as one JSON object on disk, rewritten on every change.
pub struct JsonFileStore {
  path: PathBuf,
  lock: Mutex<()>,
}

impl JsonFileStore {
  pub fn new(path: PathBuf) -> Self {
    Self {
      path,
      lock: Mutex::new(()),
    }
  }

  async fn read_all(&self) -> Result<Profiles> {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
      Ok(raw) => serde_json::from_str(&raw)
        .with_context(|| format!("parsing profile store {}", self.path.display())),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
      Err(e) => {
        Err(e).with_context(|| format!("reading profile store {}", self.path.display()))
      }
    }
  }

  async fn write_all(&self, all: &Profiles) -> Result<()> {
    let raw = serde_json::to_string_pretty(all)?;
    let tmp = self.path.with_extension("tmp");
    tokio::fs::write(&tmp, raw)
      .await
      .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, &self.path)
      .await
      .with_context(|| format!("replacing profile store {}", self.path.display()))?;
    Ok(())
  }
}

#[async_trait]
impl ProfileStore for JsonFileStore {
  async fn load(&self, username: &str) -> Result<Option<Profile>> {
    let _guard = self.lock.lock().await;
    Ok(self.read_all().await?.remove(username))
  }

  async fn load_or_create(&self, username: &str) -> Result<Profile> {
    let _guard = self.lock.lock().await;
    let mut all = self.read_all().await?;
    let (profile, created) = get_or_insert(&mut all, username);
    if created {
      self.write_all(&all).await?;
    }
    Ok(profile)
  }

  async fn rename(&self, from: &str, to: &str) -> Result<Renamed> {
    let _guard = self.lock.lock().await;
    let mut all = self.read_all().await?;
    let outcome = move_profile(&mut all, from, to);
    // 旧名和新名在同一次写入中替换
    if let Renamed::Done(_) = outcome {
      self.write_all(&all).await?;
    }
    Ok(outcome)
  }
}
