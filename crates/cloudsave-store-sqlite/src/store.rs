//! [`SqliteStore`] — the SQLite implementation of [`SaveStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use cloudsave_core::{
  blob::SavedBlob,
  code::SaveCode,
  log::{LogAction, RequestLogEntry},
  store::{InsertOutcome, SaveOwner, SaveStore, SweepReport},
  subscription::{SubscriptionCode, normalize_code},
};

use crate::{
  Result,
  encode::{RawSavedBlob, RawSubscription, decode_count, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A cloudsave store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All writes
/// go through one connection thread, so each `call` closure runs serialised.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a single-value `COUNT(*)` query.
  async fn count(&self, sql: &'static str, args: Vec<String>) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(sql, rusqlite::params_from_iter(args), |r| r.get(0))?)
      })
      .await?;
    Ok(decode_count(n))
  }
}

// ─── SaveStore impl ──────────────────────────────────────────────────────────

impl SaveStore for SqliteStore {
  type Error = crate::Error;

  // ── Request log ───────────────────────────────────────────────────────────

  async fn log_request(&self, entry: RequestLogEntry) -> Result<()> {
    let at_str = encode_dt(entry.created_at);
    let action = entry.action.as_str();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO request_log (identity_hash, action, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![entry.identity_hash, action, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_requests_since(&self, since: DateTime<Utc>) -> Result<u64> {
    self
      .count("SELECT COUNT(*) FROM request_log WHERE created_at > ?1", vec![
        encode_dt(since),
      ])
      .await
  }

  async fn count_actions_since(
    &self,
    identity_hash: &str,
    action:        LogAction,
    since:         DateTime<Utc>,
  ) -> Result<u64> {
    self
      .count(
        "SELECT COUNT(*) FROM request_log
         WHERE identity_hash = ?1 AND action = ?2 AND created_at > ?3",
        vec![identity_hash.to_owned(), action.as_str().to_owned(), encode_dt(since)],
      )
      .await
  }

  // ── Saved blobs ───────────────────────────────────────────────────────────

  async fn count_saves_since(&self, owner: SaveOwner<'_>, since: DateTime<Utc>) -> Result<u64> {
    let (sql, hash) = match owner {
      SaveOwner::Address(h) => (
        "SELECT COUNT(*) FROM saved_blobs WHERE address_hash = ?1 AND created_at > ?2",
        h,
      ),
      SaveOwner::Device(h) => (
        "SELECT COUNT(*) FROM saved_blobs WHERE device_hash = ?1 AND created_at > ?2",
        h,
      ),
    };
    self.count(sql, vec![hash.to_owned(), encode_dt(since)]).await
  }

  async fn count_blobs(&self) -> Result<u64> {
    self.count("SELECT COUNT(*) FROM saved_blobs", vec![]).await
  }

  async fn insert_blob(&self, blob: &SavedBlob, capacity: u64) -> Result<InsertOutcome> {
    let code_str      = blob.code.to_string();
    let data          = blob.data.clone();
    let size_kb       = blob.size_kb;
    let address_hash  = blob.address_hash.clone();
    let device_hash   = blob.device_hash.clone();
    let combined_hash = blob.combined_hash.clone();
    let at_str        = encode_dt(blob.created_at);

    // `None` signals a code clash; the transaction is dropped and rolled back.
    let outcome: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let total: i64 =
          tx.query_row("SELECT COUNT(*) FROM saved_blobs", [], |r| r.get(0))?;

        let mut evicted: Option<String> = None;
        if decode_count(total) >= capacity {
          evicted = tx
            .query_row(
              "SELECT code FROM saved_blobs ORDER BY created_at ASC, rowid ASC LIMIT 1",
              [],
              |r| r.get(0),
            )
            .optional()?;
          if let Some(oldest) = &evicted {
            tx.execute("DELETE FROM saved_blobs WHERE code = ?1", rusqlite::params![oldest])?;
          }
        }

        let inserted = tx.execute(
          "INSERT INTO saved_blobs (
             code, data, size_kb, address_hash, device_hash, combined_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            code_str,
            data,
            size_kb,
            address_hash,
            device_hash,
            combined_hash,
            at_str,
          ],
        );

        match inserted {
          Ok(_) => {
            tx.commit()?;
            Ok(Some(evicted))
          }
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
          {
            Ok(None)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match outcome {
      None => Ok(InsertOutcome::CodeTaken),
      Some(evicted) => Ok(InsertOutcome::Inserted {
        evicted: evicted.as_deref().map(SaveCode::parse).transpose()?,
      }),
    }
  }

  async fn get_blob(
    &self,
    code:          &SaveCode,
    created_after: DateTime<Utc>,
  ) -> Result<Option<SavedBlob>> {
    let code_str  = code.to_string();
    let after_str = encode_dt(created_after);

    let raw: Option<RawSavedBlob> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT code, data, size_kb, address_hash, device_hash, combined_hash, created_at
             FROM saved_blobs
             WHERE code = ?1 AND created_at > ?2",
            rusqlite::params![code_str, after_str],
            |row| {
              Ok(RawSavedBlob {
                code:          row.get(0)?,
                data:          row.get(1)?,
                size_kb:       row.get(2)?,
                address_hash:  row.get(3)?,
                device_hash:   row.get(4)?,
                combined_hash: row.get(5)?,
                created_at:    row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSavedBlob::into_blob).transpose()
  }

  async fn sweep(
    &self,
    blobs_before:    DateTime<Utc>,
    requests_before: DateTime<Utc>,
  ) -> Result<SweepReport> {
    let blobs_str    = encode_dt(blobs_before);
    let requests_str = encode_dt(requests_before);

    let (blobs, requests) = self
      .conn
      .call(move |conn| {
        let blobs = conn.execute(
          "DELETE FROM saved_blobs WHERE created_at < ?1",
          rusqlite::params![blobs_str],
        )?;
        let requests = conn.execute(
          "DELETE FROM request_log WHERE created_at < ?1",
          rusqlite::params![requests_str],
        )?;
        Ok((blobs, requests))
      })
      .await?;

    Ok(SweepReport { blobs: blobs as u64, requests: requests as u64 })
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  async fn get_subscription(&self, code: &str) -> Result<Option<SubscriptionCode>> {
    let code_str = normalize_code(code);

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT code, tier, is_active FROM subscription_codes WHERE code = ?1",
            rusqlite::params![code_str],
            |row| {
              Ok(RawSubscription {
                code:      row.get(0)?,
                tier:      row.get(1)?,
                is_active: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(SubscriptionCode::from))
  }

  async fn put_subscription(&self, subscription: SubscriptionCode) -> Result<()> {
    let code_str = normalize_code(&subscription.code);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subscription_codes (code, tier, is_active) VALUES (?1, ?2, ?3)
           ON CONFLICT(code) DO UPDATE SET tier = excluded.tier, is_active = excluded.is_active",
          rusqlite::params![code_str, subscription.tier, subscription.is_active],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn deactivate_subscription(&self, code: &str) -> Result<bool> {
    let code_str = normalize_code(code);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE subscription_codes SET is_active = 0 WHERE code = ?1",
          rusqlite::params![code_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}
