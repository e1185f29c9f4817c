use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(name = "quiz-arena", about = "Quiz battle royale rooms over HTTP and WebSocket")]
pub struct Config {
  /// Address the HTTP server listens on.
  #[arg(long, env = "QUIZ_ARENA_BIND", default_value = "0.0.0.0:8080")]
  pub bind: SocketAddr,

  /// JSON room catalog; the embedded one is used when absent.
  #[arg(long, env = "QUIZ_ARENA_CATALOG")]
  pub catalog: Option<PathBuf>,

  /// Profile store: `memory` or a path to a JSON file.
  #[arg(long, env = "QUIZ_ARENA_STORE", default_value = "memory")]
  pub store: StoreTarget,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreTarget {
  Memory,
  File(PathBuf),
}

impl std::str::FromStr for StoreTarget {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "memory" => Self::Memory,
      path => Self::File(PathBuf::from(path)),
    })
  }
}

impl Config {
  pub fn load() -> Self {
    Self::parse()
  }
}
