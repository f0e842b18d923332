//! Checkpoint Store (§4.4): the durable `symbol -> largest persisted
//! timestamp` map the Ingestion Coordinator consults to compute each job's
//! effective start (`marketpipe_core::Checkpoint::effective_start`).

use marketpipe_core::{Checkpoint, Symbol, Timestamp};
use sqlx::{AnyPool, Row};

use crate::error::RepositoryError;

pub struct CheckpointStore {
    pool: AnyPool,
}

impl CheckpointStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, symbol: &Symbol) -> Result<Option<Checkpoint>, RepositoryError> {
        let row = sqlx::query("SELECT cursor_ns FROM checkpoints WHERE symbol = ?")
            .bind(symbol.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Checkpoint::new(symbol.clone(), Timestamp::from_nanos(r.get::<i64, _>("cursor_ns")))))
    }

    /// Upsert the checkpoint. Callers only ever move the cursor forward
    /// (enforced by the coordinator, not this store, since a checkpoint
    /// reset is a legitimate operational action).
    pub async fn set(&self, checkpoint: &Checkpoint) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO checkpoints (symbol, cursor_ns) VALUES (?, ?)
             ON CONFLICT (symbol) DO UPDATE SET cursor_ns = excluded.cursor_ns",
        )
        .bind(checkpoint.symbol.as_str())
        .bind(checkpoint.cursor.as_nanos())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear(&self, symbol: &Symbol) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM checkpoints WHERE symbol = ?").bind(symbol.as_str()).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{connect, ensure_schema};

    async fn store() -> CheckpointStore {
        let pool = connect("sqlite::memory:").await.unwrap();
        ensure_schema(&pool).await.unwrap();
        CheckpointStore::new(pool)
    }

    #[tokio::test]
    async fn missing_checkpoint_is_none() {
        let store = store().await;
        let symbol = Symbol::new("AAPL").unwrap();
        assert!(store.get(&symbol).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = store().await;
        let symbol = Symbol::new("AAPL").unwrap();
        let cp = Checkpoint::new(symbol.clone(), Timestamp::from_nanos(123_000));
        store.set(&cp).await.unwrap();
        let loaded = store.get(&symbol).await.unwrap().unwrap();
        assert_eq!(loaded.cursor.as_nanos(), 123_000);
    }

    #[tokio::test]
    async fn set_overwrites_existing() {
        let store = store().await;
        let symbol = Symbol::new("AAPL").unwrap();
        store.set(&Checkpoint::new(symbol.clone(), Timestamp::from_nanos(100))).await.unwrap();
        store.set(&Checkpoint::new(symbol.clone(), Timestamp::from_nanos(200))).await.unwrap();
        assert_eq!(store.get(&symbol).await.unwrap().unwrap().cursor.as_nanos(), 200);
    }

    #[tokio::test]
    async fn clear_removes_checkpoint() {
        let store = store().await;
        let symbol = Symbol::new("AAPL").unwrap();
        store.set(&Checkpoint::new(symbol.clone(), Timestamp::from_nanos(100))).await.unwrap();
        store.clear(&symbol).await.unwrap();
        assert!(store.get(&symbol).await.unwrap().is_none());
    }
}
