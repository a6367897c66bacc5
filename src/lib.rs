pub mod app;
#[cfg(feature = "ssr")]
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
#[cfg(feature = "ssr")]
pub mod schema;

#[cfg(feature = "ssr")]
use chrono::Utc;
#[cfg(feature = "ssr")]
use diesel::connection::SimpleConnection;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;
#[cfg(feature = "ssr")]
use leptos::logging::log;
#[cfg(feature = "ssr")]
use uuid::Uuid;

#[cfg(feature = "ssr")]
use crate::error::StoreError;
#[cfg(feature = "ssr")]
use crate::model::{
    NewAdminSession, NewPoolRow, PoolKind, PoolRecord, PoolRow, PoolSnapshot, PoolSummary,
};
#[cfg(feature = "ssr")]
use crate::schema::{admin_sessions, pools};

pub const MAX_POOL_KEY_LEN: usize = 64;

/// Lifetime of an admin session. The login cookie's `Max-Age` uses the same value.
pub const ADMIN_SESSION_SECS: i64 = 86_400;

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    use crate::app::*;
    console_error_panic_hook::set_once();
    leptos::mount::hydrate_body(App);
}

/// Pool keys end up in URLs, so they are limited to ASCII letters, digits, '-' and '_'.
pub fn is_valid_pool_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_POOL_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Proof that the caller presented a live admin session. Only `validate_admin_token` hands these
/// out, and every store mutation asks for one.
#[cfg(feature = "ssr")]
#[derive(Debug)]
pub struct AdminCapability {
    _private: (),
}

// Enable WAL mode to allow concurrent reads during writes, and a timeout to retry locked
// operations.
#[cfg(feature = "ssr")]
const SQLITE_PRAGMAS: &str = "PRAGMA foreign_keys = ON; \
    PRAGMA journal_mode = WAL; \
    PRAGMA synchronous = NORMAL; \
    PRAGMA busy_timeout = 10000;";

#[cfg(feature = "ssr")]
pub const SCHEMA_SQL: &str = "\
    CREATE TABLE IF NOT EXISTS pools (\
        week_key TEXT PRIMARY KEY NOT NULL, \
        kind TEXT NOT NULL, \
        record TEXT NOT NULL, \
        updated_at TIMESTAMP NOT NULL\
    ); \
    CREATE TABLE IF NOT EXISTS admin_sessions (\
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
        token TEXT NOT NULL UNIQUE, \
        created_at TIMESTAMP NOT NULL, \
        expires_at TIMESTAMP\
    );";

/// Applies the pragmas to every connection the r2d2 pool hands out.
#[cfg(feature = "ssr")]
#[derive(Debug, Clone, Copy)]
pub struct SqlitePragmas;

#[cfg(feature = "ssr")]
impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(SQLITE_PRAGMAS)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[cfg(feature = "ssr")]
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection, StoreError> {
    let mut conn = SqliteConnection::establish(database_url)?;
    conn.batch_execute(SQLITE_PRAGMAS)?;
    Ok(conn)
}

/// Creates the tables if they don't exist yet.
#[cfg(feature = "ssr")]
pub fn init_schema(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    conn.batch_execute(SCHEMA_SQL)?;
    Ok(())
}

// The kind column wins over whatever the blob says.
#[cfg(feature = "ssr")]
fn decode_row(row: &PoolRow) -> Result<PoolSnapshot, StoreError> {
    let kind = PoolKind::parse(&row.kind).ok_or_else(|| StoreError::UnknownKind(row.kind.clone()))?;
    let mut snapshot = PoolRecord::decode(&row.record)?;
    snapshot.kind = kind;
    Ok(snapshot)
}

/// Loads the pool stored under `key`, or None if there isn't one.
#[cfg(feature = "ssr")]
pub fn load_pool(
    conn: &mut SqliteConnection,
    key: &str,
) -> Result<Option<PoolSnapshot>, StoreError> {
    let row: Option<PoolRow> = pools::table
        .filter(pools::week_key.eq(key))
        .select(PoolRow::as_select())
        .first(conn)
        .optional()?;
    row.as_ref().map(decode_row).transpose()
}

/// Replaces the whole record stored under `key`. Last write wins.
#[cfg(feature = "ssr")]
pub fn save_pool(
    conn: &mut SqliteConnection,
    _admin: &AdminCapability,
    key: &str,
    snapshot: &PoolSnapshot,
) -> Result<(), StoreError> {
    if !is_valid_pool_key(key) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    let record = PoolRecord::encode(snapshot)?;

    conn.transaction::<_, StoreError, _>(|conn| {
        diesel::delete(pools::table.filter(pools::week_key.eq(key))).execute(conn)?;
        let new_row = NewPoolRow {
            week_key: key,
            kind: snapshot.kind.as_str(),
            record: &record,
            updated_at: Utc::now().naive_utc(),
        };
        diesel::insert_into(pools::table)
            .values(&new_row)
            .execute(conn)?;
        Ok(())
    })?;

    log!(
        "Saved pool {} ({} of {} squares assigned)",
        key,
        snapshot.grid.assigned_count(),
        snapshot.grid.cells().len()
    );
    Ok(())
}

/// Lists every readable pool, templates first, then by key.
#[cfg(feature = "ssr")]
pub fn list_pools(conn: &mut SqliteConnection) -> Result<Vec<PoolSummary>, StoreError> {
    let rows: Vec<PoolRow> = pools::table
        .order(pools::week_key.asc())
        .select(PoolRow::as_select())
        .load(conn)?;

    // A row that no longer decodes is left out of the listing.
    let mut summaries: Vec<PoolSummary> = rows
        .iter()
        .filter_map(|row| match decode_row(row) {
            Ok(snapshot) => Some(PoolSummary {
                key: row.week_key.clone(),
                kind: snapshot.kind,
                title: snapshot.title,
                completed: snapshot.completed,
                assigned: snapshot.grid.assigned_count(),
                updated_at: row.updated_at,
            }),
            Err(e) => {
                log!("Skipping pool {} in listing: {}", row.week_key, e);
                None
            }
        })
        .collect();
    summaries.sort_by_key(|summary| summary.kind != PoolKind::Template);
    Ok(summaries)
}

/// Deletes a pool. Returns the number of rows removed.
#[cfg(feature = "ssr")]
pub fn delete_pool(
    conn: &mut SqliteConnection,
    _admin: &AdminCapability,
    key: &str,
) -> Result<usize, StoreError> {
    let deleted = diesel::delete(pools::table.filter(pools::week_key.eq(key))).execute(conn)?;
    Ok(deleted)
}

/// Creates a weekly pool from `source_key`, usually a season template. The new week keeps the
/// title, teams and roster and starts with an empty board, 0-9 labels and no scores.
#[cfg(feature = "ssr")]
pub fn create_week_from_template(
    conn: &mut SqliteConnection,
    admin: &AdminCapability,
    source_key: &str,
    week_key: &str,
) -> Result<PoolSnapshot, StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        let source = load_pool(conn, source_key)?
            .ok_or_else(|| StoreError::NotFound(source_key.to_string()))?;
        if load_pool(conn, week_key)?.is_some() {
            return Err(StoreError::AlreadyExists(week_key.to_string()));
        }

        let week = source.new_week();
        save_pool(conn, admin, week_key, &week)?;
        Ok(week)
    })
}

/// Creates an admin session and returns the token.
#[cfg(feature = "ssr")]
pub fn create_admin_session(conn: &mut SqliteConnection) -> Result<String, StoreError> {
    let token_str = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let new_session = NewAdminSession {
        token: token_str.clone(),
        created_at: now,
        expires_at: now + chrono::Duration::seconds(ADMIN_SESSION_SECS),
    };
    diesel::insert_into(admin_sessions::table)
        .values(&new_session)
        .execute(conn)?;
    Ok(token_str)
}

/// Returns an admin capability if the token belongs to a live admin session.
#[cfg(feature = "ssr")]
pub fn validate_admin_token(
    conn: &mut SqliteConnection,
    token: &str,
) -> Result<Option<AdminCapability>, StoreError> {
    if Uuid::parse_str(token).is_err() {
        return Ok(None);
    }
    let now = Utc::now().naive_utc();
    let count: i64 = admin_sessions::table
        .filter(admin_sessions::token.eq(token))
        .filter(
            admin_sessions::expires_at
                .is_null()
                .or(admin_sessions::expires_at.gt(now)),
        )
        .count()
        .get_result(conn)?;
    Ok((count > 0).then_some(AdminCapability { _private: () }))
}

#[cfg(feature = "ssr")]
pub fn delete_admin_session(conn: &mut SqliteConnection, token: &str) -> Result<usize, StoreError> {
    let deleted = diesel::delete(admin_sessions::table.filter(admin_sessions::token.eq(token)))
        .execute(conn)?;
    Ok(deleted)
}

/// Removes every pool and admin session.
#[cfg(feature = "ssr")]
pub fn reset_database(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        diesel::delete(admin_sessions::table).execute(conn)?;
        diesel::delete(pools::table).execute(conn)?;
        Ok(())
    })
}

#[cfg(test)]
mod key_tests {
    use super::*;

    #[test]
    fn test_is_valid_pool_key() {
        assert!(is_valid_pool_key("week-1"));
        assert!(is_valid_pool_key("season_2024"));
        assert!(!is_valid_pool_key(""));
        assert!(!is_valid_pool_key("week 1"));
        assert!(!is_valid_pool_key("../etc"));
        assert!(!is_valid_pool_key(&"a".repeat(MAX_POOL_KEY_LEN + 1)));
    }
}
