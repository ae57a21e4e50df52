//! Database schema migrations for summaries.db
//!
//! Schema versions:
//!   1 = base tables (summaries, ignore_patterns, metadata)
//!   2 = language column on summaries
//!   3 = code graph tables (code_entities, code_relationships, summary_context, doc_quality)
//!   4 = analysis_file_hashes (incremental graph extraction)
//!
//! Migrations are ordered, idempotent functions keyed off the
//! `schema_version` metadata value. Opening a database whose recorded
//! version is newer than [`SCHEMA_VERSION_CURRENT`] is refused.

use rusqlite::Connection;

use crate::error::{ParanoidError, Result};

pub const SCHEMA_VERSION_CURRENT: i64 = 4;

const SCHEMA_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS summaries (
    path TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    hash TEXT NOT NULL,
    description TEXT NOT NULL,
    file_extension TEXT,
    error TEXT,
    needs_update INTEGER DEFAULT 0,
    model TEXT NOT NULL,
    model_version TEXT,
    prompt_version TEXT NOT NULL,
    context_level INTEGER DEFAULT 0,
    generated_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    tokens_used INTEGER,
    generation_time_ms INTEGER
);
CREATE INDEX IF NOT EXISTS idx_summaries_kind ON summaries(kind);
CREATE INDEX IF NOT EXISTS idx_summaries_updated_at ON summaries(updated_at);
CREATE INDEX IF NOT EXISTS idx_summaries_needs_update ON summaries(needs_update);

CREATE TABLE IF NOT EXISTS ignore_patterns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern TEXT NOT NULL,
    added_at TEXT NOT NULL,
    source TEXT
);
CREATE INDEX IF NOT EXISTS idx_ignore_source ON ignore_patterns(source);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT
);
"#;

// No FK from code_entities.file_path to summaries: analyze must be able
// to run before any summaries exist.
const SCHEMA_V3_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS code_entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    parent_name TEXT,
    start_line INTEGER,
    end_line INTEGER,
    docstring TEXT,
    signature TEXT,
    language TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    parent_entity_id INTEGER,
    FOREIGN KEY (parent_entity_id) REFERENCES code_entities(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_entities_name ON code_entities(name);
CREATE INDEX IF NOT EXISTS idx_entities_qualified_name ON code_entities(qualified_name);
CREATE INDEX IF NOT EXISTS idx_entities_file ON code_entities(file_path);

CREATE TABLE IF NOT EXISTS code_relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_entity_id INTEGER,
    to_entity_id INTEGER,
    from_file TEXT,
    to_file TEXT,
    kind TEXT NOT NULL,
    location TEXT,
    FOREIGN KEY (from_entity_id) REFERENCES code_entities(id) ON DELETE CASCADE,
    -- Incoming edges from other files fall back to their textual hint
    -- when the target file is re-analyzed; the resolution pass relinks them
    FOREIGN KEY (to_entity_id) REFERENCES code_entities(id) ON DELETE SET NULL
);
CREATE INDEX IF NOT EXISTS idx_rel_from ON code_relationships(from_entity_id);
CREATE INDEX IF NOT EXISTS idx_rel_to ON code_relationships(to_entity_id);
CREATE INDEX IF NOT EXISTS idx_rel_kind ON code_relationships(kind);
CREATE INDEX IF NOT EXISTS idx_rel_from_file ON code_relationships(from_file);

CREATE TABLE IF NOT EXISTS summary_context (
    summary_path TEXT PRIMARY KEY,
    imports_hash TEXT,
    callers_count INTEGER DEFAULT 0,
    callees_count INTEGER DEFAULT 0,
    context_version TEXT
);

CREATE TABLE IF NOT EXISTS doc_quality (
    entity_id INTEGER PRIMARY KEY,
    has_docstring INTEGER DEFAULT 0,
    has_examples INTEGER DEFAULT 0,
    has_type_hints INTEGER DEFAULT 0,
    priority_score INTEGER DEFAULT 0,
    last_reviewed TEXT,
    FOREIGN KEY (entity_id) REFERENCES code_entities(id) ON DELETE CASCADE
);
"#;

const SCHEMA_V4_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS analysis_file_hashes (
    file_path TEXT PRIMARY KEY,
    content_hash TEXT NOT NULL
);
"#;

fn get_schema_version(conn: &Connection) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    if let Some(row) = rows.next()? {
        let raw: String = row.get(0)?;
        Ok(raw.parse::<i64>().unwrap_or(0))
    } else {
        Ok(0)
    }
}

fn set_schema_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [version.to_string()],
    )?;
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
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

/// v1 -> v2: language column on summaries, backfilling existing file
/// rows with the given default language label.
fn migrate_to_v2(conn: &Connection, default_language: &str) -> Result<Vec<String>> {
    let mut messages = Vec::new();
    if !has_column(conn, "summaries", "language")? {
        conn.execute("ALTER TABLE summaries ADD COLUMN language TEXT", [])?;
        conn.execute(
            "UPDATE summaries SET language = ?1 \
             WHERE kind = 'file' AND (language IS NULL OR language = '')",
            [default_language],
        )?;
        messages.push(format!(
            "Database migrated to schema v2: added language support. \
             Existing file summaries marked as {}.",
            default_language
        ));
    }
    set_schema_version(conn, 2)?;
    Ok(messages)
}

/// v2 -> v3: code graph tables
fn migrate_to_v3(conn: &Connection) -> Result<Vec<String>> {
    conn.execute_batch(SCHEMA_V3_SQL)?;
    set_schema_version(conn, 3)?;
    Ok(vec![
        "Database migrated to schema v3: added code graph tables.".to_string(),
    ])
}

/// v3 -> v4: analysis file hashes for incremental graph extraction
fn migrate_to_v4(conn: &Connection) -> Result<Vec<String>> {
    conn.execute_batch(SCHEMA_V4_SQL)?;
    set_schema_version(conn, 4)?;
    Ok(vec![
        "Database migrated to schema v4: added analysis file hashes for incremental analyze."
            .to_string(),
    ])
}

/// Bring the schema up to [`SCHEMA_VERSION_CURRENT`], running each
/// pending migration in order. Returns user-facing migration notices.
/// Refuses databases created by a newer engine.
pub fn run_migrations(conn: &Connection, default_language: &str) -> Result<Vec<String>> {
    let mut messages = Vec::new();

    conn.execute_batch(SCHEMA_V1_SQL)?;

    let version = get_schema_version(conn)?;
    if version > SCHEMA_VERSION_CURRENT {
        return Err(ParanoidError::SchemaIncompatible {
            found: version,
            supported: SCHEMA_VERSION_CURRENT,
        });
    }
    if version == 0 {
        // Fresh database: the base schema already matches v1
        set_schema_version(conn, 1)?;
    }

    let version = get_schema_version(conn)?;
    if version < 2 {
        messages.extend(migrate_to_v2(conn, default_language)?);
    }
    let version = get_schema_version(conn)?;
    if version < 3 {
        messages.extend(migrate_to_v3(conn)?);
    }
    let version = get_schema_version(conn)?;
    if version < 4 {
        messages.extend(migrate_to_v4(conn)?);
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        conn
    }

    #[test]
    fn test_fresh_db_migrates_to_current() {
        let conn = open_memory();
        run_migrations(&conn, "python").unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION_CURRENT);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = open_memory();
        let first = run_migrations(&conn, "python").unwrap();
        assert!(!first.is_empty());
        let second = run_migrations(&conn, "python").unwrap();
        assert!(second.is_empty(), "re-run produced messages: {:?}", second);
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION_CURRENT);
    }

    #[test]
    fn test_v1_to_v2_backfills_language() {
        let conn = open_memory();
        // Simulate a v1 database: base schema without the language column
        conn.execute_batch(SCHEMA_V1_SQL).unwrap();
        set_schema_version(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO summaries (path, kind, hash, description, model, prompt_version, generated_at, updated_at) \
             VALUES ('/p/a.py', 'file', 'h', 'd', 'm', 'v1', 't', 't')",
            [],
        )
        .unwrap();

        run_migrations(&conn, "python").unwrap();

        let language: String = conn
            .query_row("SELECT language FROM summaries WHERE path = '/p/a.py'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(language, "python");
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let conn = open_memory();
        run_migrations(&conn, "python").unwrap();
        set_schema_version(&conn, SCHEMA_VERSION_CURRENT + 1).unwrap();

        let err = run_migrations(&conn, "python").unwrap_err();
        assert!(matches!(
            err,
            ParanoidError::SchemaIncompatible { found, supported }
                if found == SCHEMA_VERSION_CURRENT + 1 && supported == SCHEMA_VERSION_CURRENT
        ));
    }

    #[test]
    fn test_graph_tables_exist_after_migration() {
        let conn = open_memory();
        run_migrations(&conn, "python").unwrap();
        for table in [
            "code_entities",
            "code_relationships",
            "summary_context",
            "doc_quality",
            "analysis_file_hashes",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }
}
