//! Scoped transactional sessions over the shared connection pool.
//!
//! A [`Session`] owns one pooled connection. No transaction exists until
//! [`Session::begin`] is called. Values read through a session are owned
//! Rust values, so they stay usable after commit without re-querying.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Transaction isolation levels a session can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    EngineDefault,
}

impl IsolationLevel {
    pub const ALL: [Self; 5] = [
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Serializable,
        Self::EngineDefault,
    ];

    /// Config spelling of the level, also used for display.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "read-uncommitted",
            Self::ReadCommitted => "read-committed",
            Self::RepeatableRead => "repeatable-read",
            Self::Serializable => "serializable",
            Self::EngineDefault => "engine-default",
        }
    }

    /// The `read_uncommitted` pragma value that gives this level in
    /// `SQLite`, or `None` when `SQLite` cannot provide it.
    ///
    /// `SQLite` transactions are serializable; dirty reads are only
    /// reachable through the pragma.
    const fn sqlite_read_uncommitted(self) -> Option<bool> {
        match self {
            Self::ReadUncommitted => Some(true),
            Self::Serializable | Self::EngineDefault => Some(false),
            Self::ReadCommitted | Self::RepeatableRead => None,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| StoreError::Validation(format!("unknown isolation level {s:?}")))
    }
}

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no transaction.
    Open,
    /// Inside a transaction started with [`Session::begin`].
    Active,
    Committed,
    RolledBack,
    Closed,
}

/// Produces sessions bound to one pool and one isolation level.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    pool: Pool<Sqlite>,
    isolation: IsolationLevel,
}

impl SessionFactory {
    pub const fn new(pool: Pool<Sqlite>, isolation: IsolationLevel) -> Self {
        Self { pool, isolation }
    }

    pub const fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Open a new session.
    ///
    /// Fails with [`StoreError::UnsupportedIsolation`] when the configured
    /// level cannot be honored; it is never silently downgraded. May wait
    /// for a free connection when the pool is exhausted.
    pub async fn create_session(&self) -> Result<Session, StoreError> {
        let read_uncommitted = self
            .isolation
            .sqlite_read_uncommitted()
            .ok_or(StoreError::UnsupportedIsolation(self.isolation))?;

        let mut conn = self.pool.acquire().await?;
        sqlx::query(if read_uncommitted {
            "PRAGMA read_uncommitted = 1"
        } else {
            "PRAGMA read_uncommitted = 0"
        })
        .execute(&mut *conn)
        .await?;

        debug!(isolation = %self.isolation, "Session opened");
        Ok(Session {
            conn: Some(conn),
            state: SessionState::Open,
            isolation: self.isolation,
        })
    }

    /// Scoped acquisition.
    ///
    /// With `None`, a fresh session is opened and closed when the scope is
    /// dropped; a transaction still active at that point is rolled back.
    /// With `Some`, the caller keeps ownership and the scope only borrows.
    pub async fn create_context<'a>(
        &self,
        existing: Option<&'a mut Session>,
    ) -> Result<SessionScope<'a>, StoreError> {
        match existing {
            Some(session) => Ok(SessionScope::Borrowed(session)),
            None => Ok(SessionScope::Owned(self.create_session().await?)),
        }
    }
}

/// A transactional handle holding one pooled connection.
///
/// Operations take `&mut self`, so a session is never used by two
/// operations at once.
pub struct Session {
    conn: Option<PoolConnection<Sqlite>>,
    state: SessionState,
    isolation: IsolationLevel,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("isolation", &self.isolation)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn in_transaction(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The underlying connection, for executing statements.
    pub fn connection(&mut self) -> Result<&mut SqliteConnection, StoreError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| StoreError::SessionState("session is closed".to_string()))
    }

    /// Start a transaction.
    pub async fn begin(&mut self) -> Result<(), StoreError> {
        match self.state {
            SessionState::Open | SessionState::Committed | SessionState::RolledBack => {}
            SessionState::Active => {
                return Err(StoreError::SessionState(
                    "transaction already active".to_string(),
                ));
            }
            SessionState::Closed => {
                return Err(StoreError::SessionState("session is closed".to_string()));
            }
        }
        sqlx::query("BEGIN").execute(self.connection()?).await?;
        self.state = SessionState::Active;
        Ok(())
    }

    /// Commit the active transaction.
    pub async fn commit(&mut self) -> Result<(), StoreError> {
        self.require_active("commit")?;
        sqlx::query("COMMIT").execute(self.connection()?).await?;
        self.state = SessionState::Committed;
        Ok(())
    }

    /// Roll back the active transaction.
    pub async fn rollback(&mut self) -> Result<(), StoreError> {
        self.require_active("rollback")?;
        sqlx::query("ROLLBACK").execute(self.connection()?).await?;
        self.state = SessionState::RolledBack;
        Ok(())
    }

    /// Roll back anything pending and return the connection to the pool.
    ///
    /// Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), StoreError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let rolled_back = if self.in_transaction() {
            self.rollback().await
        } else {
            Ok(())
        };
        if rolled_back.is_err() {
            self.discard_connection();
        }
        self.conn = None;
        self.state = SessionState::Closed;
        debug!("Session closed");
        rolled_back
    }

    fn require_active(&self, action: &str) -> Result<(), StoreError> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Closed => Err(StoreError::SessionState("session is closed".to_string())),
            _ => Err(StoreError::SessionState(format!(
                "cannot {action} without an active transaction"
            ))),
        }
    }

    /// Close the connection instead of returning it to the pool. `SQLite`
    /// rolls back any open transaction when the connection closes.
    fn discard_connection(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.in_transaction() {
            warn!("Session dropped inside a transaction, rolling back");
            self.discard_connection();
        }
    }
}

/// A session for the duration of one store operation.
///
/// Derefs to [`Session`].
#[derive(Debug)]
pub enum SessionScope<'a> {
    Owned(Session),
    Borrowed(&'a mut Session),
}

impl SessionScope<'_> {
    pub const fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

impl Deref for SessionScope<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        match self {
            Self::Owned(session) => session,
            Self::Borrowed(session) => session,
        }
    }
}

impl DerefMut for SessionScope<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        match self {
            Self::Owned(session) => session,
            Self::Borrowed(session) => session,
        }
    }
}
