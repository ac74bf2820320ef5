//! Read and write paths for user records.
//!
//! Every mutation upserts by `uid` inside a transaction and bumps `updated_at`.
//! Tags have set semantics (`INSERT OR IGNORE` on the composite key); CIDs are
//! append-only.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::users::types::{Tag, User, WalletAddress};

/// Store failures a caller can branch on. Everything else surfaces as a
/// plain [`anyhow::Error`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("wallet {wallet} is already registered to another user")]
    WalletConflict { wallet: String },
}

/// Aggregate counts for the `stats` command.
#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total_users: u64,
    pub registered_users: u64,
    pub completed_setup: u64,
    pub by_tag: BTreeMap<String, u64>,
    pub conversation_cids: u64,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Insert a bare record for `uid` if none exists. Returns the row id.
fn ensure_user(tx: &Transaction, uid: &str) -> Result<i64> {
    let ts = now();
    tx.execute(
        "INSERT OR IGNORE INTO users (uid, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![uid, ts],
    )?;
    let id = tx.query_row("SELECT id FROM users WHERE uid = ?1", params![uid], |row| {
        row.get(0)
    })?;
    Ok(id)
}

fn touch(tx: &Transaction, user_id: i64) -> Result<()> {
    tx.execute(
        "UPDATE users SET updated_at = ?1 WHERE id = ?2",
        params![now(), user_id],
    )?;
    Ok(())
}

/// Bind a wallet to `uid`, creating the record on first registration.
///
/// Re-registering the same pair is a no-op apart from `updated_at`. A wallet
/// already bound to a different uid fails with [`StoreError::WalletConflict`].
pub fn register(conn: &mut Connection, uid: &str, wallet: &WalletAddress) -> Result<User> {
    let tx = conn.transaction()?;

    let owner: Option<String> = tx
        .query_row(
            "SELECT uid FROM users WHERE wallet_address = ?1",
            params![wallet.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(owner) = owner {
        if owner != uid {
            return Err(StoreError::WalletConflict {
                wallet: wallet.to_string(),
            }
            .into());
        }
    }

    let ts = now();
    tx.execute(
        "INSERT INTO users (uid, wallet_address, created_at, updated_at) VALUES (?1, ?2, ?3, ?3) \
         ON CONFLICT(uid) DO UPDATE SET wallet_address = excluded.wallet_address, updated_at = excluded.updated_at",
        params![uid, wallet.as_str(), ts],
    )?;
    tx.commit()?;

    tracing::debug!(uid, wallet = %wallet, "user registered");
    require_user(conn, uid)
}

/// Merge `tags` into the user's tag set, creating the user if needed.
pub fn add_tags(conn: &mut Connection, uid: &str, tags: &[Tag]) -> Result<User> {
    let tx = conn.transaction()?;
    let user_id = ensure_user(&tx, uid)?;

    let ts = now();
    let mut added = 0usize;
    for tag in tags {
        added += tx.execute(
            "INSERT OR IGNORE INTO user_tags (user_id, tag, added_at) VALUES (?1, ?2, ?3)",
            params![user_id, tag.as_str(), ts],
        )?;
    }
    touch(&tx, user_id)?;
    tx.commit()?;

    tracing::debug!(uid, requested = tags.len(), added, "tags merged");
    require_user(conn, uid)
}

/// Append an archived conversation CID, creating the user if needed.
pub fn push_conversation_cid(conn: &mut Connection, uid: &str, cid: &str) -> Result<User> {
    let tx = conn.transaction()?;
    let user_id = ensure_user(&tx, uid)?;
    tx.execute(
        "INSERT INTO conversation_cids (user_id, cid, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, cid, now()],
    )?;
    touch(&tx, user_id)?;
    tx.commit()?;

    require_user(conn, uid)
}

fn require_user(conn: &Connection, uid: &str) -> Result<User> {
    find_by_uid(conn, uid)?.ok_or_else(|| anyhow::anyhow!("user {uid} vanished after write"))
}

pub fn find_by_uid(conn: &Connection, uid: &str) -> Result<Option<User>> {
    find_where(conn, "uid = ?1", uid)
}

pub fn find_by_wallet(conn: &Connection, wallet: &WalletAddress) -> Result<Option<User>> {
    find_where(conn, "wallet_address = ?1", wallet.as_str())
}

fn find_where(conn: &Connection, predicate: &str, value: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT id, uid, wallet_address, is_setup_completed, created_at, updated_at \
                 FROM users WHERE {predicate}"
            ),
            params![value],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    User {
                        uid: row.get(1)?,
                        wallet_address: row.get(2)?,
                        is_setup_completed: row.get(3)?,
                        tags: Vec::new(),
                        conversation_cids: Vec::new(),
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    },
                ))
            },
        )
        .optional()?;

    let Some((user_id, mut user)) = row else {
        return Ok(None);
    };
    user.tags = load_tags(conn, user_id)?;
    user.conversation_cids = load_cids(conn, user_id)?;
    Ok(Some(user))
}

fn load_tags(conn: &Connection, user_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT tag FROM user_tags WHERE user_id = ?1 ORDER BY rowid")?;
    let raw: Vec<String> = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tags = Vec::with_capacity(raw.len());
    for s in raw {
        match s.parse::<Tag>() {
            Ok(tag) => tags.push(tag),
            Err(e) => tracing::warn!(user_id, error = %e, "skipping unreadable tag row"),
        }
    }
    Ok(tags)
}

fn load_cids(conn: &Connection, user_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT cid FROM conversation_cids WHERE user_id = ?1 ORDER BY id")?;
    let cids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cids)
}

/// `false` when no record exists.
pub fn is_setup_completed(conn: &Connection, uid: &str) -> Result<bool> {
    let flag: Option<bool> = conn
        .query_row(
            "SELECT is_setup_completed FROM users WHERE uid = ?1",
            params![uid],
            |row| row.get(0),
        )
        .optional()?;
    Ok(flag.unwrap_or(false))
}

/// Tags of the user owning `wallet`, or `None` if no such user.
pub fn tags_for_wallet(conn: &Connection, wallet: &WalletAddress) -> Result<Option<Vec<Tag>>> {
    Ok(find_by_wallet(conn, wallet)?.map(|u| u.tags))
}

/// CIDs of the user owning `wallet`, or `None` if no such user.
pub fn cids_for_wallet(conn: &Connection, wallet: &WalletAddress) -> Result<Option<Vec<String>>> {
    Ok(find_by_wallet(conn, wallet)?.map(|u| u.conversation_cids))
}

/// Wallets of registered users carrying `tag`.
pub fn members_with_tag(conn: &Connection, tag: Tag) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT u.wallet_address FROM user_tags t JOIN users u ON u.id = t.user_id \
         WHERE t.tag = ?1 AND u.wallet_address IS NOT NULL ORDER BY t.rowid",
    )?;
    let wallets = stmt
        .query_map(params![tag.as_str()], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(wallets)
}

pub fn user_stats(conn: &Connection) -> Result<UserStats> {
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    let mut by_tag = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT tag, COUNT(*) FROM user_tags GROUP BY tag")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (tag, n) = row?;
        by_tag.insert(tag, n as u64);
    }

    Ok(UserStats {
        total_users: count("SELECT COUNT(*) FROM users")?,
        registered_users: count("SELECT COUNT(*) FROM users WHERE wallet_address IS NOT NULL")?,
        completed_setup: count("SELECT COUNT(*) FROM users WHERE is_setup_completed = 1")?,
        by_tag,
        conversation_cids: count("SELECT COUNT(*) FROM conversation_cids")?,
    })
}
