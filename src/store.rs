// SQLite persistence for resumable auction session state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::auction::player::Money;

/// The client-side state that survives a restart: opponent name list,
/// available-player cache, and total budget. All of it is invalidated when
/// the auction finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Identifier for the auction session the rows belong to.
    pub session_id: String,
    /// Registered opponents in registration order (normalized names).
    pub opponents: Vec<String>,
    /// Last known available-player cache, in catalog order.
    pub available_players: Vec<String>,
    /// The main team's total budget fixed at initialization.
    pub total_budget: Money,
}

/// Persistence seam for session resume. Called only by `AuctionSession` at
/// well-defined transition points: initialize, after each purchase, finish.
pub trait SessionStore: Send + Sync {
    fn save(&self, state: &SessionState) -> Result<()>;
    fn load(&self) -> Result<Option<SessionState>>;
    fn clear(&self) -> Result<()>;
}

/// Generate a new unique session ID based on the current UTC timestamp.
///
/// Format: `auction_YYYYMMDD_HHMMSS_SSS`. The millisecond suffix keeps ids
/// unique even when two auctions start in the same second.
pub fn generate_session_id() -> String {
    chrono::Utc::now()
        .format("auction_%Y%m%d_%H%M%S_%3f")
        .to_string()
}

// ---------------------------------------------------------------------------
// SqliteSessionStore
// ---------------------------------------------------------------------------

/// Storage keys, one row per persisted item.
const KEY_SESSION_ID: &str = "session_id";
const KEY_OPPONENTS: &str = "opponents";
const KEY_AVAILABLE: &str = "available_players";
const KEY_TOTAL_BUDGET: &str = "total_budget";

/// SQLite-backed `SessionStore`: a single key-value table of JSON values.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral in-memory store (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open session store at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set session store pragmas")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("failed to create session store schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection. Panics if the mutex is poisoned (another
    /// thread panicked while holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("session store mutex poisoned")
    }

    fn load_value(conn: &Connection, key: &str) -> Result<Option<serde_json::Value>> {
        let mut stmt = conn
            .prepare("SELECT value FROM session_state WHERE key = ?1")
            .context("failed to prepare session state query")?;
        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query session state")?;

        match rows.next() {
            Some(row) => {
                let json_str = row.context("failed to read session state row")?;
                let value = serde_json::from_str(&json_str)
                    .context("failed to deserialize session state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

impl SessionStore for SqliteSessionStore {
    /// Persist the full snapshot in a single transaction; repeated saves
    /// overwrite the previous values.
    fn save(&self, state: &SessionState) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin save transaction")?;

        let rows = [
            (KEY_SESSION_ID, serde_json::to_value(&state.session_id)?),
            (KEY_OPPONENTS, serde_json::to_value(&state.opponents)?),
            (KEY_AVAILABLE, serde_json::to_value(&state.available_players)?),
            (KEY_TOTAL_BUDGET, serde_json::to_value(state.total_budget)?),
        ];
        for (key, value) in rows {
            let json_str =
                serde_json::to_string(&value).context("failed to serialize session value")?;
            tx.execute(
                "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
                params![key, json_str],
            )
            .context("failed to save session value")?;
        }

        tx.commit().context("failed to commit session save")
    }

    /// Load the stored snapshot. Returns `None` when no session has been
    /// saved (or a previous one was cleared).
    fn load(&self) -> Result<Option<SessionState>> {
        let conn = self.conn();

        let Some(session_id) = Self::load_value(&conn, KEY_SESSION_ID)? else {
            return Ok(None);
        };
        let Some(total_budget) = Self::load_value(&conn, KEY_TOTAL_BUDGET)? else {
            return Ok(None);
        };

        let session_id: String =
            serde_json::from_value(session_id).context("stored session_id is not a string")?;
        let total_budget: Money = serde_json::from_value(total_budget)
            .context("stored total_budget is not a number")?;
        let opponents: Vec<String> = match Self::load_value(&conn, KEY_OPPONENTS)? {
            Some(v) => serde_json::from_value(v).context("stored opponents are malformed")?,
            None => Vec::new(),
        };
        let available_players: Vec<String> = match Self::load_value(&conn, KEY_AVAILABLE)? {
            Some(v) => {
                serde_json::from_value(v).context("stored available players are malformed")?
            }
            None => Vec::new(),
        };

        Ok(Some(SessionState {
            session_id,
            opponents,
            available_players,
            total_budget,
        }))
    }

    /// Delete all stored session state (the auction finished).
    fn clear(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM session_state", [])
            .context("failed to clear session state")?;
        Ok(())
    }
}
