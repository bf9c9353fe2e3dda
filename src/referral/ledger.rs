//! Persistent SQLite storage for referral counts and issued invite links.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// One inviter's standing in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralStat {
    pub user_id: i64,
    pub referral_count: u32,
}

/// Ledger of referral credits plus the registry of issued invite-link tokens.
///
/// User ids are stored as TEXT keys. A missing referral row means count 0;
/// rows are never deleted and counts never decrease.
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    /// Open (or create) the ledger at the given path.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        let ledger = Self { conn: Mutex::new(conn) };
        ledger.init_schema()?;
        info!("Opened ledger at {:?}", path);
        Ok(ledger)
    }

    /// In-memory ledger, used by tests.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self { conn: Mutex::new(conn) };
        ledger.init_schema()?;
        Ok(ledger)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS referrals (
                user_id TEXT PRIMARY KEY,
                referral_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS invite_links (
                user_id TEXT PRIMARY KEY,
                link_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
    }

    /// Credit one referral to the inviter and return the post-increment count.
    ///
    /// A single upsert statement, so two racing credits for the same inviter
    /// cannot lose an update.
    pub fn credit_referral(&self, inviter_id: i64) -> rusqlite::Result<u32> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "INSERT INTO referrals (user_id, referral_count) VALUES (?1, 1)
             ON CONFLICT(user_id) DO UPDATE SET referral_count = referral_count + 1
             RETURNING referral_count",
            params![inviter_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Current count for an inviter; absent rows read as 0.
    pub fn referral_count(&self, inviter_id: i64) -> rusqlite::Result<u32> {
        let conn = self.conn.lock().unwrap();
        let count: Option<i64> = conn
            .query_row(
                "SELECT referral_count FROM referrals WHERE user_id = ?1",
                params![inviter_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0) as u32)
    }

    /// Record the most recently issued invite-link token for a user,
    /// replacing any previous one. Kept as an audit trail; nothing reads
    /// it back on the hot path.
    pub fn store_invite_link(&self, user_id: i64, link_id: &str) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap();
        let created_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        conn.execute(
            "INSERT OR REPLACE INTO invite_links (user_id, link_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![user_id.to_string(), link_id, created_at],
        )?;
        Ok(())
    }

    /// All inviters with at least one credited referral, in storage order.
    pub fn stats(&self) -> rusqlite::Result<Vec<ReferralStat>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, referral_count FROM referrals WHERE referral_count > 0",
        )?;
        let rows = stmt.query_map([], |row| {
            let user_id: String = row.get(0)?;
            let referral_count: i64 = row.get(1)?;
            Ok((user_id, referral_count))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (user_id, referral_count) = row?;
            // Rows written by this bot always hold numeric ids.
            let Ok(user_id) = user_id.parse::<i64>() else { continue };
            result.push(ReferralStat { user_id, referral_count: referral_count as u32 });
        }
        Ok(result)
    }

    /// Stored invite-link token for a user, if any.
    #[cfg(test)]
    pub fn invite_link(&self, user_id: i64) -> Option<String> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT link_id FROM invite_links WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )
        .ok()
    }

    /// Number of registry rows.
    #[cfg(test)]
    pub fn invite_link_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM invite_links", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_inviter_reads_zero() {
        let ledger = Ledger::open_in_memory().unwrap();
        assert_eq!(ledger.referral_count(42).unwrap(), 0);
    }

    #[test]
    fn test_n_credits_yield_count_n() {
        let ledger = Ledger::open_in_memory().unwrap();
        for expected in 1..=50u32 {
            let count = ledger.credit_referral(42).unwrap();
            assert_eq!(count, expected);
        }
        assert_eq!(ledger.referral_count(42).unwrap(), 50);
    }

    #[test]
    fn test_credits_are_per_inviter() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.credit_referral(1).unwrap();
        ledger.credit_referral(1).unwrap();
        ledger.credit_referral(2).unwrap();
        assert_eq!(ledger.referral_count(1).unwrap(), 2);
        assert_eq!(ledger.referral_count(2).unwrap(), 1);
    }

    #[test]
    fn test_second_invite_link_overwrites_first() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.store_invite_link(7, "aaaa").unwrap();
        ledger.store_invite_link(7, "bbbb").unwrap();
        assert_eq!(ledger.invite_link_count(), 1);
        assert_eq!(ledger.invite_link(7).as_deref(), Some("bbbb"));
    }

    #[test]
    fn test_invite_links_per_user() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.store_invite_link(7, "aaaa").unwrap();
        ledger.store_invite_link(8, "cccc").unwrap();
        assert_eq!(ledger.invite_link_count(), 2);
        assert_eq!(ledger.invite_link(7).as_deref(), Some("aaaa"));
        assert_eq!(ledger.invite_link(8).as_deref(), Some("cccc"));
    }

    #[test]
    fn test_stats_omits_zero_counts() {
        let ledger = Ledger::open_in_memory().unwrap();
        assert!(ledger.stats().unwrap().is_empty());

        ledger.credit_referral(1).unwrap();
        ledger.credit_referral(1).unwrap();
        ledger.credit_referral(2).unwrap();

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.len(), 2);
        assert!(stats.contains(&ReferralStat { user_id: 1, referral_count: 2 }));
        assert!(stats.contains(&ReferralStat { user_id: 2, referral_count: 1 }));
    }

    #[test]
    fn test_ledger_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.db");

        {
            let ledger = Ledger::open(&path).unwrap();
            ledger.credit_referral(9).unwrap();
            ledger.store_invite_link(9, "dddd").unwrap();
        }

        let ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.referral_count(9).unwrap(), 1);
        assert_eq!(ledger.invite_link(9).as_deref(), Some("dddd"));
    }
}
