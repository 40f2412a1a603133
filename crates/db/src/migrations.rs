use rusqlite::Connection;

use crate::Db;
use crate::error::Result;

const MIGRATION_0001: &str = include_str!("../migrations/0001_init.sql");
const MIGRATION_0002: &str = include_str!("../migrations/0002_add_channel_meta.sql");

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init", MIGRATION_0001),
    ("0002_add_channel_meta", MIGRATION_0002),
];

impl Db {
    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (name, sql) in MIGRATIONS {
            if *name == "0002_add_channel_meta" {
                ensure_channel_meta_columns(&tx)?;
            }
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }
}

pub(crate) fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ensure_channel_meta_columns(conn: &Connection) -> Result<()> {
    if !table_has_column(conn, "stream_current", "followers_total")? {
        conn.execute(
            "ALTER TABLE stream_current ADD COLUMN followers_total INTEGER",
            [],
        )?;
    }
    if !table_has_column(conn, "stream_current", "avatar_url")? {
        conn.execute("ALTER TABLE stream_current ADD COLUMN avatar_url TEXT", [])?;
    }
    for table in ["stream_agg_hourly", "stream_agg_daily"] {
        if !table_has_column(conn, table, "followers_latest")? {
            conn.execute(
                &format!("ALTER TABLE {} ADD COLUMN followers_latest INTEGER", table),
                [],
            )?;
        }
    }
    Ok(())
}
