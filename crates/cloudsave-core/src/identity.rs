//! Pseudonymous caller identities for rate-limit bucketing.
//!
//! Raw network addresses and device tokens never reach the store. Each one is
//! passed through HMAC-SHA256 keyed with a deployment secret; only the hex
//! digest is persisted. The secret lives in configuration, never in the
//! database, so a copy of the store alone cannot be used to test guesses.

use std::{fmt, net::IpAddr};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// The hashed identities derived from one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  /// Digest of the caller's network address.
  pub address:  String,
  /// Digest of the caller-supplied device token, when one was sent.
  pub device:   Option<String>,
  /// Digest over both of the above.
  pub combined: String,
}

/// Keyed one-way hasher for caller identities.
///
/// Cloning is cheap; the keyed MAC state is copied, not re-derived.
#[derive(Clone)]
pub struct IdentityHasher {
  mac: HmacSha256,
}

impl IdentityHasher {
  /// Build a hasher from the configured secret.
  pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
    let secret = secret.as_ref();
    if secret.is_empty() {
      return Err(Error::EmptySecret);
    }
    // HMAC accepts keys of any length; this only fails for fixed-size MACs.
    let mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::EmptySecret)?;
    Ok(Self { mac })
  }

  pub fn address(&self, addr: IpAddr) -> String {
    self.digest(b"address", &[addr.to_string().as_bytes()])
  }

  /// Returns `None` for an absent or blank token.
  pub fn device(&self, device_id: &str) -> Option<String> {
    let device_id = device_id.trim();
    (!device_id.is_empty()).then(|| self.digest(b"device", &[device_id.as_bytes()]))
  }

  /// Derive the full identity triple for a request.
  pub fn identify(&self, addr: IpAddr, device_id: Option<&str>) -> Identity {
    let address = self.address(addr);
    let device = device_id.and_then(|d| self.device(d));
    let combined = self.digest(b"combined", &[
      address.as_bytes(),
      device.as_deref().unwrap_or_default().as_bytes(),
    ]);
    Identity { address, device, combined }
  }

  fn digest(&self, domain: &[u8], parts: &[&[u8]]) -> String {
    let mut mac = self.mac.clone();
    mac.update(domain);
    for part in parts {
      // Length-prefix each part so ("ab", "c") and ("a", "bc") differ.
      mac.update(&(part.len() as u64).to_be_bytes());
      mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes())
  }
}

impl fmt::Debug for IdentityHasher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IdentityHasher").finish_non_exhaustive()
  }
}
