//! Deposit and withdrawal forms. Nothing here moves money; requests are
//! validated and answered with a simulated confirmation.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Coin {
  Btc,
  Eth,
  Usdt,
  Ltc,
}

impl Coin {
  pub fn address(self) -> &'static str {
    match self {
      Self::Btc => "bc1qm9kxyzexamplebtcaddress",
      Self::Eth => "0x1a2b3c4dexampleethaddress",
      Self::Usdt => "TA1b2c3d4exampleusdtaddress",
      Self::Ltc => "ltc1qxyzexampleltcaddress",
    }
  }

  pub fn all() -> Vec<Coin> {
    Self::iter().collect()
  }
}

#[derive(Debug, Serialize)]
pub struct DepositAddress {
  pub coin: Coin,
  pub address: &'static str,
  pub note: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
  pub coin: Coin,
  pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
  pub address: String,
  pub amount: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Receipt {
  pub message: String,
}

pub fn deposit_address(coin: Coin) -> DepositAddress {
  DepositAddress {
    coin,
    address: coin.address(),
    note: "Deposits are processed after network confirmation.",
  }
}

/// Amount fields arrive as free text, the way a form submits them.
pub fn parse_amount(raw: &str) -> Result<f64, String> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err("Please fill in all fields.".into());
  }
  match raw.parse::<f64>() {
    Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
    _ => Err("Amount must be a positive number.".into()),
  }
}

pub fn deposit(req: &DepositRequest) -> Result<Receipt, String> {
  let amount = parse_amount(&req.amount)?;
  Ok(Receipt {
    message: format!(
      "Send {} worth ${:.2} to {}. Your balance updates after confirmation.",
      req.coin.to_string().to_uppercase(),
      amount,
      req.coin.address()
    ),
  })
}

pub fn withdraw(req: &WithdrawRequest) -> Result<Receipt, String> {
  if req.address.trim().is_empty() {
    return Err("Please fill in all fields.".into());
  }
  let amount = parse_amount(&req.amount)?;
  Ok(Receipt {
    message: format!(
      "Withdrawal of ${:.2} submitted successfully. Withdrawals take 5-15 minutes to process.",
      amount
    ),
  })
}
