//! Save codes, the short, human-relayable keys handed out for stored blobs.
//!
//! A code is five uppercase letters drawn from an alphabet that leaves out
//! the visually ambiguous `I`, `L` and `O`. The code is the only credential a
//! caller needs to read a save back.

use std::{fmt, str::FromStr};

use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The 23 letters a code may contain.
pub const ALPHABET: &[u8; 23] = b"ABCDEFGHJKMNPQRSTUVWXYZ";

/// Number of characters in every code.
pub const CODE_LEN: usize = 5;

/// How many fresh codes are drawn before issuance gives up on collisions.
pub const MAX_GENERATION_ATTEMPTS: usize = 100;

/// Bytes at or above this value are rejected so `byte % 23` stays uniform.
const ACCEPT_BELOW: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

// ─── SaveCode ────────────────────────────────────────────────────────────────

/// A validated, normalised save code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SaveCode(String);

impl SaveCode {
  /// Draw a code uniformly at random from [`ALPHABET`].
  pub fn generate<R: RngCore + ?Sized>(rng: &mut R) -> Self {
    let mut code = String::with_capacity(CODE_LEN);
    let mut buf = [0u8; 16];
    while code.len() < CODE_LEN {
      rng.fill_bytes(&mut buf);
      for &b in buf.iter().filter(|&&b| b < ACCEPT_BELOW) {
        if code.len() == CODE_LEN {
          break;
        }
        code.push(char::from(ALPHABET[usize::from(b) % ALPHABET.len()]));
      }
    }
    Self(code)
  }

  /// Normalise (trim, uppercase) and validate caller input.
  pub fn parse(input: &str) -> Result<Self> {
    let normalised = input.trim().to_ascii_uppercase();
    if is_valid(&normalised) {
      Ok(Self(normalised))
    } else {
      Err(Error::InvalidCode(input.to_owned()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// Exact-match check: five characters, every one of them in [`ALPHABET`].
pub fn is_valid(code: &str) -> bool {
  code.len() == CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b))
}

impl FromStr for SaveCode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl TryFrom<String> for SaveCode {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
}

impl From<SaveCode> for String {
  fn from(code: SaveCode) -> Self { code.0 }
}

impl AsRef<str> for SaveCode {
  fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for SaveCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use rand_core::{OsRng, impls};

  use super::*;

  /// Replays a fixed byte script, cycling when exhausted.
  struct ScriptRng {
    bytes: Vec<u8>,
    pos:   usize,
  }

  impl RngCore for ScriptRng {
    fn next_u32(&mut self) -> u32 { impls::next_u32_via_fill(self) }

    fn next_u64(&mut self) -> u64 { impls::next_u64_via_fill(self) }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
      for slot in dest {
        *slot = self.bytes[self.pos % self.bytes.len()];
        self.pos += 1;
      }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
      self.fill_bytes(dest);
      Ok(())
    }
  }

  #[test]
  fn alphabet_excludes_ambiguous_letters() {
    assert_eq!(ALPHABET.len(), 23);
    for banned in [b'I', b'L', b'O'] {
      assert!(!ALPHABET.contains(&banned));
    }
  }

  #[test]
  fn generated_codes_use_only_the_alphabet() {
    for _ in 0..2_000 {
      let code = SaveCode::generate(&mut OsRng);
      assert!(is_valid(code.as_str()), "bad code {code}");
      assert_eq!(code.as_str(), code.as_str().to_ascii_uppercase());
    }
  }

  #[test]
  fn generation_skips_biased_bytes() {
    // 253..=255 fall outside the uniform zone and must be discarded.
    let mut rng = ScriptRng { bytes: vec![255, 0, 254, 1, 253, 22, 23, 24], pos: 0 };
    let code = SaveCode::generate(&mut rng);
    assert_eq!(code.as_str(), "ABZAB");
  }

  #[test]
  fn parse_normalises_case_and_whitespace() {
    let code = SaveCode::parse("  abcde \n").unwrap();
    assert_eq!(code.as_str(), "ABCDE");
  }

  #[test]
  fn parse_rejects_malformed_codes() {
    for bad in ["", "ABCD", "ABCDEF", "ABCDI", "LABCD", "ABODE", "AB1DE", "ÄBCDE"] {
      assert!(SaveCode::parse(bad).is_err(), "{bad:?} should be rejected");
    }
  }

  #[test]
  fn serde_validates_on_deserialise() {
    let ok: SaveCode = serde_json::from_str("\"xyzab\"").unwrap();
    assert_eq!(ok.as_str(), "XYZAB");
    assert!(serde_json::from_str::<SaveCode>("\"HELLO\"").is_err());
  }
}
