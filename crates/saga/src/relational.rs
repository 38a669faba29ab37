use std::ops::{Deref, DerefMut};

use brandcfg_db::{DbConn, DbPool};
use sqlx::{Sqlite, Transaction};

/// One open relational transaction.
///
/// Derefs to the underlying connection, so repositories take `&mut tx`
/// directly. Dropping without commit rolls back.
pub struct RelationalTx {
    tx: Transaction<'static, Sqlite>,
}

impl RelationalTx {
    pub async fn begin(pool: &DbPool) -> Result<Self, sqlx::Error> {
        let tx = pool.begin().await?;
        tracing::debug!("Began database transaction");
        Ok(Self { tx })
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await?;
        tracing::debug!("Committed database transaction");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await?;
        tracing::debug!("Rolled back database transaction");
        Ok(())
    }
}

impl Deref for RelationalTx {
    type Target = DbConn;

    fn deref(&self) -> &DbConn {
        &self.tx
    }
}

impl DerefMut for RelationalTx {
    fn deref_mut(&mut self) -> &mut DbConn {
        &mut self.tx
    }
}
