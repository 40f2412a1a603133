use std::path::Path;

use rusqlite::Connection;

mod batch;
mod current;
mod error;
mod helpers;
mod migrations;
mod rollups;
mod spans;
mod stats;
mod types;

pub use batch::WriteBatch;
pub use error::{DbError, Result};
pub use migrations::MIGRATIONS;
pub use types::{Bucket, EnrichmentTarget, SpanInsert};

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "cache_size", -20_000)?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        Ok(Self { conn })
    }

    /// Starts the transaction that one page of samples (or one sweep) is applied in.
    /// Dropping the batch without committing rolls it back.
    pub fn begin_batch(&mut self) -> Result<WriteBatch<'_>> {
        Ok(WriteBatch::new(self.conn.transaction()?))
    }
}
