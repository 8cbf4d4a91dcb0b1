//! Embedded property-graph store.
//!
//! Nodes are addressed by label plus one identity property, relationships by
//! `(type, from, to)`. Every read or write happens inside a [`Session`] taken
//! from the store's bounded pool; the session's slot is returned when the
//! value is dropped, whatever the outcome of the work done with it.

mod keys;
mod txn;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use redb::Database;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use keys::{IN_EDGES_TABLE, NODES_TABLE, OUT_EDGES_TABLE};
pub use txn::{Assignment, EdgeRef, NodeRef, Properties, ReadTx, WriteCounters, WriteTx};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),
    #[error("corrupt property map: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("no session available within {0:?}")]
    AcquireTimeout(Duration),
    #[error("graph store is closed")]
    Closed,
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

macro_rules! storage_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(error: $source) -> Self {
                    StoreError::Storage(error.into())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Pool limits applied when the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_sessions: usize,
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_sessions: 50,
            acquire_timeout: Duration::from_secs(120),
        }
    }
}

/// Process-wide handle to the graph store. Cheap to clone.
#[derive(Clone)]
pub struct GraphStore {
    db: Arc<Database>,
    sessions: Arc<Semaphore>,
    options: PoolOptions,
}

impl GraphStore {
    pub fn open(path: impl AsRef<Path>, options: PoolOptions) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::open(path).or_else(|_| Database::create(path))?;
        init_db(&db)?;
        info!(path = %path.display(), max_sessions = options.max_sessions, "graph store opened");
        Ok(Self::from_database(db, options))
    }

    #[cfg(test)]
    pub(crate) fn in_memory(options: PoolOptions) -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        init_db(&db)?;
        Ok(Self::from_database(db, options))
    }

    fn from_database(db: Database, options: PoolOptions) -> Self {
        Self {
            db: Arc::new(db),
            sessions: Arc::new(Semaphore::new(options.max_sessions)),
            options,
        }
    }

    /// Waits for a free session slot, up to the configured acquisition timeout.
    pub async fn session(&self) -> Result<Session, StoreError> {
        let permit = tokio::time::timeout(
            self.options.acquire_timeout,
            self.sessions.clone().acquire_owned(),
        )
        .await
        .map_err(|_| StoreError::AcquireTimeout(self.options.acquire_timeout))?
        .map_err(|_| StoreError::Closed)?;

        Ok(Session {
            db: self.db.clone(),
            _permit: permit,
        })
    }

    /// Stops handing out sessions once the in-flight ones have finished.
    pub async fn close(&self) {
        let slots = u32::try_from(self.options.max_sessions).unwrap_or(u32::MAX);
        if let Ok(drained) = self.sessions.acquire_many(slots).await {
            self.sessions.close();
            drop(drained);
        }
        info!("graph store closed");
    }
}

fn init_db(db: &Database) -> Result<(), StoreError> {
    let write_txn = db.begin_write()?;
    write_txn.open_table(NODES_TABLE)?;
    write_txn.open_table(OUT_EDGES_TABLE)?;
    write_txn.open_table(IN_EDGES_TABLE)?;
    write_txn.commit()?;
    Ok(())
}

/// A scoped handle to the store. Each `execute_*` call runs one transaction.
pub struct Session {
    db: Arc<Database>,
    _permit: OwnedSemaphorePermit,
}

impl Session {
    pub async fn execute_read<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&ReadTx) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        run_blocking(move || {
            let tx = ReadTx::begin(&db)?;
            work(&tx)
        })
        .await
    }

    /// Runs `work` in a write transaction and commits it if `work` succeeds.
    /// A failed `work` drops the transaction, which rolls it back.
    pub async fn execute_write<T, F>(&self, work: F) -> Result<(T, WriteCounters), StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut WriteTx) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        let (value, counters) = run_blocking(move || {
            let mut tx = WriteTx::begin(&db)?;
            let value = work(&mut tx)?;
            let counters = tx.commit()?;
            Ok((value, counters))
        })
        .await?;
        debug!(?counters, "write committed");
        Ok((value, counters))
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
