//! Pool construction and schema bootstrap.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{CoreError, CoreResult};

/// Connect to the given SQLite database, creating the file if needed.
pub async fn connect(url: &str) -> CoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| CoreError::Internal(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Connect to a private in-memory database.
///
/// The pool is pinned to a single connection: separate SQLite connections to
/// `:memory:` get separate databases, so a larger pool would silently shard
/// the data.
pub async fn connect_memory() -> CoreResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| CoreError::Internal(e.to_string()))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Returns true when the error is a unique-constraint violation on the given
/// constraint (matched by the column list SQLite reports, e.g.
/// `workspace_members.user_id`).
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.message().contains(constraint)
        }
        _ => false,
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        avatar_url TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS workspaces (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        brand_color TEXT NOT NULL,
        plan TEXT NOT NULL,
        trial_ends_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    // user_id is globally unique: one workspace membership per user,
    // enforced here rather than by check-then-create.
    "CREATE TABLE IF NOT EXISTS workspace_members (
        id BLOB PRIMARY KEY,
        workspace_id BLOB NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
        user_id BLOB NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS clients (
        id BLOB PRIMARY KEY,
        workspace_id BLOB NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS client_contacts (
        id BLOB PRIMARY KEY,
        client_id BLOB NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
        user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        is_primary INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        UNIQUE (client_id, user_id)
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS client_contacts_primary
        ON client_contacts (client_id) WHERE is_primary = 1",
    "CREATE TABLE IF NOT EXISTS projects (
        id BLOB PRIMARY KEY,
        client_id BLOB NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL,
        start_date TEXT,
        due_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS approval_requests (
        id BLOB PRIMARY KEY,
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        requested_by_id BLOB NOT NULL REFERENCES users(id),
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL,
        response_note TEXT,
        responded_by_id BLOB REFERENCES users(id),
        responded_at TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS invoices (
        id BLOB PRIMARY KEY,
        client_id BLOB NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
        number TEXT NOT NULL,
        status TEXT NOT NULL,
        currency TEXT NOT NULL,
        subtotal INTEGER NOT NULL,
        tax INTEGER NOT NULL DEFAULT 0,
        total INTEGER NOT NULL,
        due_date TEXT,
        sent_at TEXT,
        paid_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS invoice_items (
        id BLOB PRIMARY KEY,
        invoice_id BLOB NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        description TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        unit_price INTEGER NOT NULL,
        total INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id BLOB PRIMARY KEY,
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        author_id BLOB NOT NULL REFERENCES users(id),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS project_updates (
        id BLOB PRIMARY KEY,
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        author_id BLOB NOT NULL REFERENCES users(id),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS files (
        id BLOB PRIMARY KEY,
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        uploaded_by_id BLOB NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        key TEXT NOT NULL,
        url TEXT NOT NULL,
        content_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )",
    // Append-only. Nothing in the application updates or deletes rows here;
    // entity_type is stored explicitly instead of being derived from action.
    "CREATE TABLE IF NOT EXISTS activity_log (
        id BLOB PRIMARY KEY,
        workspace_id BLOB NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
        user_id BLOB NOT NULL,
        action TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id BLOB,
        description TEXT NOT NULL,
        project_id BLOB,
        client_id BLOB,
        metadata TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS activity_log_workspace
        ON activity_log (workspace_id, created_at)",
    "CREATE INDEX IF NOT EXISTS projects_client ON projects (client_id)",
    "CREATE INDEX IF NOT EXISTS invoices_client ON invoices (client_id)",
    "CREATE INDEX IF NOT EXISTS client_contacts_user ON client_contacts (user_id)",
];

/// Create all tables and indexes. Idempotent.
pub async fn migrate(pool: &SqlitePool) -> CoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
