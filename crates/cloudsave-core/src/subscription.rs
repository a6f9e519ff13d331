//! Subscription codes and the tier hierarchy they are checked against.
//!
//! Tiers form a fixed total order. A held tier satisfies a requirement when
//! its power is at least the required tier's power.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Access tiers, declared in ascending order of power.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
  Bronze,
  Silver,
  Gold,
  Diamond,
  Platinum,
}

impl Tier {
  pub const ALL: [Tier; 5] =
    [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Diamond, Tier::Platinum];

  /// Integer rank reported to clients as `tierLevel`; BRONZE is 1.
  pub fn power(self) -> u8 {
    match self {
      Self::Bronze => 1,
      Self::Silver => 2,
      Self::Gold => 3,
      Self::Diamond => 4,
      Self::Platinum => 5,
    }
  }

  pub fn satisfies(self, required: Tier) -> bool { self.power() >= required.power() }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Bronze => "BRONZE",
      Self::Silver => "SILVER",
      Self::Gold => "GOLD",
      Self::Diamond => "DIAMOND",
      Self::Platinum => "PLATINUM",
    }
  }
}

/// Parsing trims and uppercases first, so `" gold"` is [`Tier::Gold`].
impl FromStr for Tier {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let normalised = s.trim().to_ascii_uppercase();
    Tier::ALL
      .into_iter()
      .find(|t| t.as_str() == normalised)
      .ok_or_else(|| Error::UnknownTier(s.to_owned()))
  }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── SubscriptionCode ────────────────────────────────────────────────────────

/// A provisioned subscription entitlement.
///
/// `tier` is kept as the raw stored text: a value outside the hierarchy is a
/// data-integrity problem that must surface at verification time, not vanish
/// at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCode {
  pub code:      String,
  pub tier:      String,
  pub is_active: bool,
}

impl SubscriptionCode {
  pub fn new(code: &str, tier: Tier) -> Self {
    Self { code: normalize_code(code), tier: tier.to_string(), is_active: true }
  }

  /// Resolve the stored tier text against the hierarchy.
  pub fn tier(&self) -> Result<Tier> { self.tier.parse() }
}

/// Subscription codes are compared trimmed and uppercased.
pub fn normalize_code(code: &str) -> String { code.trim().to_ascii_uppercase() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn powers_follow_declaration_order() {
    let powers: Vec<u8> = Tier::ALL.iter().map(|t| t.power()).collect();
    assert_eq!(powers, vec![1, 2, 3, 4, 5]);
    assert!(Tier::ALL.windows(2).all(|w| w[0] < w[1]));
  }

  #[test]
  fn gold_satisfies_silver_but_bronze_not_gold() {
    assert!(Tier::Gold.satisfies(Tier::Silver));
    assert!(Tier::Gold.satisfies(Tier::Gold));
    assert!(!Tier::Bronze.satisfies(Tier::Gold));
  }

  #[test]
  fn parse_is_case_and_space_insensitive() {
    assert_eq!(" platinum ".parse::<Tier>().unwrap(), Tier::Platinum);
    assert_eq!("Diamond".parse::<Tier>().unwrap(), Tier::Diamond);
    assert!(matches!("WOOD".parse::<Tier>(), Err(Error::UnknownTier(_))));
    assert!("".parse::<Tier>().is_err());
  }

  #[test]
  fn serialises_as_uppercase_name() {
    assert_eq!(serde_json::to_string(&Tier::Silver).unwrap(), "\"SILVER\"");
  }

  #[test]
  fn corrupt_stored_tier_is_reported() {
    let sub = SubscriptionCode { code: "X".into(), tier: "mythril".into(), is_active: true };
    assert!(sub.tier().is_err());
    assert_eq!(SubscriptionCode::new(" vip-1 ", Tier::Gold).code, "VIP-1");
  }
}
