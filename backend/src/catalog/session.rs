//! Open import sessions.
//!
//! A session holds a parsed upload between the preview and the import call. It is never
//! persisted; closing the session or a successful import discards it. Sessions left open
//! longer than the configured lifetime are dropped the next time one is opened, and are
//! reported as absent before that.

use crate::catalog::delimited::SourceTable;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

struct Session {
    table: Arc<SourceTable>,
    opened_at: Instant,
}

#[derive(Clone)]
pub struct ImportSessions {
    tables: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for ImportSessions {
    fn default() -> Self {
        ImportSessions::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl ImportSessions {
    pub fn with_ttl(ttl: Duration) -> Self {
        ImportSessions {
            tables: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Stores `table` under a fresh session id, dropping expired sessions first.
    pub async fn open(&self, table: SourceTable) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();
        let mut tables = self.tables.write().await;
        let before = tables.len();
        tables.retain(|_, session| session.opened_at.elapsed() < self.ttl);
        if tables.len() < before {
            debug!("Dropped {} expired import sessions", before - tables.len());
        }
        tables.insert(
            session_id.clone(),
            Session {
                table: Arc::new(table),
                opened_at: Instant::now(),
            },
        );
        session_id
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<SourceTable>> {
        self.tables
            .read()
            .await
            .get(session_id)
            .filter(|session| session.opened_at.elapsed() < self.ttl)
            .map(|session| session.table.clone())
    }

    /// Returns whether a session was open under `session_id`.
    pub async fn close(&self, session_id: &str) -> bool {
        self.tables
            .write()
            .await
            .remove(session_id)
            .is_some_and(|session| session.opened_at.elapsed() < self.ttl)
    }

    /// Headers of the session, if it is open.
    pub async fn headers(&self, session_id: &str) -> Option<Vec<String>> {
        self.get(session_id).await.map(|t| t.headers.clone())
    }

    #[cfg(test)]
    async fn stored(&self) -> usize {
        self.tables.read().await.len()
    }
}
