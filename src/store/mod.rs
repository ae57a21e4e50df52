//! Per-project persistent store
//!
//! A single-file transactional SQLite database at
//! `<project>/.paranoid-coder/summaries.db` holds summaries, the code
//! graph, context snapshots, ignore-pattern audit rows, metadata, and
//! the vector tables (see [`vector`]). All writes run inside
//! transactions; deleting a file summary fans out to its entities,
//! their relationships, its context snapshot, its analysis hash, and
//! all vectors keyed on it.

pub mod migrations;
pub mod models;
pub mod vector;

use std::path::{Path, PathBuf};
use std::sync::Once;

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::{normalize_path, PARANOID_DIR, SUMMARIES_DB};
use crate::error::{ParanoidError, Result};

pub use models::{
    DocQuality, Entity, EntityKind, IgnorePatternRow, ProjectStats, RelationKind, Relationship,
    Summary, SummaryContext, SummaryKind,
};
pub use vector::VecResult;

static REGISTER_VEC: Once = Once::new();

/// Register the sqlite-vec extension for every subsequently opened
/// connection. Must run before the first `Connection::open`.
fn register_vector_extension() {
    REGISTER_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

/// Current RFC 3339 UTC timestamp, the store's canonical time format
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Handle to a project's summaries.db
pub struct Store {
    conn: Connection,
    project_root: PathBuf,
    migration_messages: Vec<String>,
}

impl Store {
    /// Open the store for a project, creating the database file and the
    /// data directory if missing. Fails with `NoProjectFound` when the
    /// project was never initialized; use [`Store::create`] from init.
    pub fn open(project_root: &Path) -> Result<Self> {
        let data_dir = project_root.join(PARANOID_DIR);
        if !data_dir.is_dir() {
            return Err(ParanoidError::NoProjectFound {
                path: project_root.display().to_string(),
            });
        }
        Self::open_at(project_root, &data_dir)
    }

    /// Create the project data directory and open the store. Used by init.
    pub fn create(project_root: &Path) -> Result<Self> {
        let data_dir = project_root.join(PARANOID_DIR);
        std::fs::create_dir_all(&data_dir)?;
        Self::open_at(project_root, &data_dir)
    }

    fn open_at(project_root: &Path, data_dir: &Path) -> Result<Self> {
        register_vector_extension();
        let conn = Connection::open(data_dir.join(SUMMARIES_DB))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let migration_messages = migrations::run_migrations(&conn, "python")?;

        let store = Self {
            conn,
            project_root: project_root.to_path_buf(),
            migration_messages,
        };
        store.seed_metadata()?;
        Ok(store)
    }

    /// In-memory store for tests
    #[doc(hidden)]
    pub fn open_in_memory(project_root: &Path) -> Result<Self> {
        register_vector_extension();
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let migration_messages = migrations::run_migrations(&conn, "python")?;
        let store = Self {
            conn,
            project_root: project_root.to_path_buf(),
            migration_messages,
        };
        store.seed_metadata()?;
        Ok(store)
    }

    fn seed_metadata(&self) -> Result<()> {
        if self.get_metadata("project_root")?.is_none() {
            self.set_metadata("project_root", &normalize_path(&self.project_root))?;
            self.set_metadata("created_at", &now_rfc3339())?;
        }
        Ok(())
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Migration notices from open, shown once per command
    pub fn migration_messages(&self) -> &[String] {
        &self.migration_messages
    }

    // ========== Summaries ==========

    pub fn get_summary(&self, path: &str) -> Result<Option<Summary>> {
        let row = self
            .conn
            .query_row(
                "SELECT path, kind, hash, description, file_extension, language, error, \
                 needs_update, model, model_version, prompt_version, context_level, \
                 generated_at, updated_at, tokens_used, generation_time_ms \
                 FROM summaries WHERE path = ?1",
                [path],
                row_to_summary,
            )
            .optional()?;
        Ok(row)
    }

    pub fn upsert_summary(&self, summary: &Summary) -> Result<()> {
        self.conn.execute(
            "INSERT INTO summaries (path, kind, hash, description, file_extension, language, \
             error, needs_update, model, model_version, prompt_version, context_level, \
             generated_at, updated_at, tokens_used, generation_time_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16) \
             ON CONFLICT(path) DO UPDATE SET \
               kind=excluded.kind, hash=excluded.hash, description=excluded.description, \
               file_extension=excluded.file_extension, language=excluded.language, \
               error=excluded.error, needs_update=excluded.needs_update, \
               model=excluded.model, model_version=excluded.model_version, \
               prompt_version=excluded.prompt_version, context_level=excluded.context_level, \
               generated_at=excluded.generated_at, updated_at=excluded.updated_at, \
               tokens_used=excluded.tokens_used, generation_time_ms=excluded.generation_time_ms",
            params![
                summary.path,
                summary.kind.as_str(),
                summary.hash,
                summary.description,
                summary.file_extension,
                summary.language,
                summary.error,
                summary.needs_update as i64,
                summary.model,
                summary.model_version,
                summary.prompt_version,
                summary.context_level as i64,
                summary.generated_at,
                summary.updated_at,
                summary.tokens_used,
                summary.generation_time_ms,
            ],
        )?;
        Ok(())
    }

    /// Delete a summary and everything keyed on it: entities (and their
    /// relationships and doc-quality rows via FK cascade), file-level
    /// relationships, the context snapshot, the analysis hash, and all
    /// vector rows for the path and its entities.
    pub fn delete_summary(&self, path: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let entity_ids: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM code_entities WHERE file_path = ?1")?;
            let ids = stmt
                .query_map([path], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            ids
        };

        for entity_id in &entity_ids {
            vector::delete_entity_vector(&tx, *entity_id)?;
        }
        vector::delete_summary_vector(&tx, path)?;

        tx.execute(
            "DELETE FROM code_relationships WHERE from_file = ?1 OR to_file = ?1",
            [path],
        )?;
        tx.execute("DELETE FROM code_entities WHERE file_path = ?1", [path])?;
        tx.execute("DELETE FROM summary_context WHERE summary_path = ?1", [path])?;
        tx.execute("DELETE FROM analysis_file_hashes WHERE file_path = ?1", [path])?;
        tx.execute("DELETE FROM summaries WHERE path = ?1", [path])?;

        tx.commit()?;
        Ok(())
    }

    /// Direct children of a directory path: entries one segment below
    pub fn list_children(&self, path: &str) -> Result<Vec<Summary>> {
        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{}/", path)
        };
        let nested = format!("{}%/%", prefix);
        let like = format!("{}%", prefix);

        let mut stmt = self.conn.prepare(
            "SELECT path, kind, hash, description, file_extension, language, error, \
             needs_update, model, model_version, prompt_version, context_level, \
             generated_at, updated_at, tokens_used, generation_time_ms \
             FROM summaries WHERE path LIKE ?1 AND path NOT LIKE ?2 ORDER BY path",
        )?;
        let rows = stmt
            .query_map(params![like, nested], row_to_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All summaries, optionally scoped to a path and everything under it
    pub fn all_summaries(&self, scope: Option<&str>) -> Result<Vec<Summary>> {
        let sql_base = "SELECT path, kind, hash, description, file_extension, language, error, \
                        needs_update, model, model_version, prompt_version, context_level, \
                        generated_at, updated_at, tokens_used, generation_time_ms FROM summaries";
        let rows = match scope {
            None => {
                let mut stmt = self.conn.prepare(&format!("{} ORDER BY path", sql_base))?;
                let rows = stmt
                    .query_map([], row_to_summary)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            Some(scope) => {
                let base = scope.trim_end_matches('/');
                let like = format!("{}/%", base);
                let mut stmt = self.conn.prepare(&format!(
                    "{} WHERE path = ?1 OR path LIKE ?2 ORDER BY path",
                    sql_base
                ))?;
                let rows = stmt
                    .query_map(params![base, like], row_to_summary)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    /// Flag a summary for regeneration on the next summarize run
    pub fn mark_needs_update(&self, path: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("UPDATE summaries SET needs_update = 1 WHERE path = ?1", [path])?;
        Ok(changed > 0)
    }

    /// Aggregate statistics, optionally scoped to a path prefix
    pub fn stats(&self, scope: Option<&str>) -> Result<ProjectStats> {
        let (filter, args): (String, Vec<String>) = match scope {
            None => (String::new(), Vec::new()),
            Some(scope) => {
                let base = scope.trim_end_matches('/').to_string();
                let like = format!("{}/%", base);
                (
                    " WHERE (path = ?1 OR path LIKE ?2)".to_string(),
                    vec![base, like],
                )
            }
        };
        let params_ref: Vec<&dyn rusqlite::ToSql> =
            args.iter().map(|a| a as &dyn rusqlite::ToSql).collect();

        let mut stats = ProjectStats::default();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT kind, COUNT(*) FROM summaries{} GROUP BY kind",
            filter
        ))?;
        let mut rows = stmt.query(params_ref.as_slice())?;
        while let Some(row) = rows.next()? {
            stats.count_by_kind.push((row.get(0)?, row.get(1)?));
        }

        let lang_filter = if filter.is_empty() {
            " WHERE kind = 'file'".to_string()
        } else {
            format!("{} AND kind = 'file'", filter)
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT COALESCE(language, 'unknown'), COUNT(*) AS cnt FROM summaries{} \
             GROUP BY language ORDER BY cnt DESC",
            lang_filter
        ))?;
        let mut rows = stmt.query(params_ref.as_slice())?;
        while let Some(row) = rows.next()? {
            stats.count_by_language.push((row.get(0)?, row.get(1)?));
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT model, COUNT(*) AS cnt FROM summaries{} GROUP BY model ORDER BY cnt DESC",
            filter
        ))?;
        let mut rows = stmt.query(params_ref.as_slice())?;
        while let Some(row) = rows.next()? {
            stats.model_breakdown.push((row.get(0)?, row.get(1)?));
        }

        stats.last_updated_at = self
            .conn
            .query_row(
                &format!("SELECT MAX(updated_at) FROM summaries{}", filter),
                params_ref.as_slice(),
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        Ok(stats)
    }

    // ========== Entities ==========

    /// Insert an entity and set its database id
    pub fn insert_entity(&self, entity: &mut Entity) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO code_entities (file_path, kind, name, qualified_name, parent_name, \
             start_line, end_line, docstring, signature, language, parent_entity_id, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                entity.file_path,
                entity.kind.as_str(),
                entity.name,
                entity.qualified_name,
                entity.parent_name,
                entity.start_line,
                entity.end_line,
                entity.docstring,
                entity.signature,
                entity.language,
                entity.parent_entity_id,
                now_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        entity.id = Some(id);
        Ok(id)
    }

    pub fn entity_by_id(&self, id: i64) -> Result<Option<Entity>> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", ENTITY_SELECT),
                [id],
                row_to_entity,
            )
            .optional()?;
        Ok(row)
    }

    pub fn entities_for_file(&self, file_path: &str) -> Result<Vec<Entity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE file_path = ?1 ORDER BY start_line", ENTITY_SELECT))?;
        let rows = stmt
            .query_map([file_path], row_to_entity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All entities matching a name: exact qualified-name matches first;
    /// when there are none, simple-name matches.
    pub fn entities_matching_name(&self, name: &str) -> Result<Vec<Entity>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE qualified_name = ?1 ORDER BY file_path",
            ENTITY_SELECT
        ))?;
        let qualified = stmt
            .query_map([name], row_to_entity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if !qualified.is_empty() {
            return Ok(qualified);
        }

        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE name = ?1 ORDER BY file_path", ENTITY_SELECT))?;
        let simple = stmt
            .query_map([name], row_to_entity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(simple)
    }

    /// All entities with their updated_at timestamps, for the indexer
    pub fn entities_for_indexing(&self, scope: Option<&str>) -> Result<Vec<(Entity, String)>> {
        let sql = format!(
            "SELECT id, file_path, kind, name, qualified_name, parent_name, start_line, \
             end_line, docstring, signature, language, parent_entity_id, updated_at \
             FROM code_entities{} ORDER BY file_path, start_line",
            match scope {
                None => String::new(),
                Some(_) => " WHERE file_path = ?1 OR file_path LIKE ?2".to_string(),
            }
        );
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(Entity, String)> {
            Ok((row_to_entity(row)?, row.get(12)?))
        };
        let rows = match scope {
            None => {
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            Some(scope) => {
                let base = scope.trim_end_matches('/');
                let like = format!("{}/%", base);
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![base, like], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    /// Remove all entities and relationships originating from a file.
    /// Entity-referencing relationships and doc-quality rows go with
    /// them via foreign-key cascade.
    pub fn delete_entities_for_file(&self, file_path: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM code_relationships WHERE from_file = ?1",
            [file_path],
        )?;
        tx.execute("DELETE FROM code_entities WHERE file_path = ?1", [file_path])?;
        tx.commit()?;
        Ok(())
    }

    pub fn has_graph_data(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM code_entities", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    // ========== Relationships ==========

    pub fn insert_relationship(&self, rel: &Relationship) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO code_relationships (from_entity_id, to_entity_id, from_file, to_file, \
             kind, location) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rel.from_entity_id,
                rel.to_entity_id,
                rel.from_file,
                rel.to_file,
                rel.kind.as_str(),
                rel.location,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Incoming `calls` edges: (caller qualified name, caller file, location)
    pub fn callers_of(&self, entity_id: i64) -> Result<Vec<(String, String, Option<String>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.qualified_name, e.file_path, r.location \
             FROM code_relationships r JOIN code_entities e ON e.id = r.from_entity_id \
             WHERE r.to_entity_id = ?1 AND r.kind = 'calls' \
             ORDER BY e.file_path, e.qualified_name",
        )?;
        let rows = stmt
            .query_map([entity_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Outgoing `calls` edges: (target name, resolved target file, location).
    /// Unresolved targets surface the textual hint kept in to_file.
    pub fn callees_of(
        &self,
        entity_id: i64,
    ) -> Result<Vec<(String, Option<String>, Option<String>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(e.qualified_name, r.to_file, '(unknown)'), e.file_path, r.location \
             FROM code_relationships r LEFT JOIN code_entities e ON e.id = r.to_entity_id \
             WHERE r.from_entity_id = ?1 AND r.kind = 'calls' \
             ORDER BY 1",
        )?;
        let rows = stmt
            .query_map([entity_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Module names imported by a file (to_file of its `imports` edges)
    pub fn imports_of_file(&self, file_path: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT to_file FROM code_relationships \
             WHERE from_file = ?1 AND kind = 'imports' AND to_file IS NOT NULL \
             ORDER BY to_file",
        )?;
        let rows = stmt
            .query_map([file_path], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    /// Files whose import target equals `module` or a dotted parent of it
    pub fn importers_of_module(&self, module: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT from_file FROM code_relationships \
             WHERE kind = 'imports' AND from_file IS NOT NULL AND to_file IS NOT NULL \
             AND (to_file = ?1 OR ?1 LIKE to_file || '.%') \
             ORDER BY from_file",
        )?;
        let rows = stmt
            .query_map([module], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    /// All relative-path import edges (from_file, to_file), for JS/TS
    /// importer resolution
    pub fn relative_import_edges(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_file, to_file FROM code_relationships \
             WHERE kind = 'imports' AND from_file IS NOT NULL AND to_file IS NOT NULL \
             AND (to_file LIKE './%' OR to_file LIKE '../%')",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Call and inheritance edges whose target never resolved:
    /// (id, textual target, source file)
    pub fn unresolved_relationships(&self) -> Result<Vec<(i64, String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, to_file, from_file FROM code_relationships \
             WHERE to_entity_id IS NULL AND to_file IS NOT NULL AND from_file IS NOT NULL \
             AND kind IN ('calls', 'inherits')",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fill a relationship's resolved target entity
    pub fn set_relationship_target(&self, relationship_id: i64, entity_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE code_relationships SET to_entity_id = ?1 WHERE id = ?2",
            params![entity_id, relationship_id],
        )?;
        Ok(())
    }

    /// Parent classes of an entity via `inherits` edges: (target name,
    /// resolved entity id if any, location)
    pub fn parents_of(&self, entity_id: i64) -> Result<Vec<(String, Option<i64>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(e.qualified_name, r.to_file, '(unknown)'), r.to_entity_id \
             FROM code_relationships r LEFT JOIN code_entities e ON e.id = r.to_entity_id \
             WHERE r.from_entity_id = ?1 AND r.kind = 'inherits' ORDER BY 1",
        )?;
        let rows = stmt
            .query_map([entity_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Child classes: entities with an `inherits` edge pointing at this one
    pub fn children_of(&self, entity_id: i64) -> Result<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.qualified_name \
             FROM code_relationships r JOIN code_entities e ON e.id = r.from_entity_id \
             WHERE r.to_entity_id = ?1 AND r.kind = 'inherits' ORDER BY e.qualified_name",
        )?;
        let rows = stmt
            .query_map([entity_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ========== Summary context ==========

    pub fn get_summary_context(&self, path: &str) -> Result<Option<SummaryContext>> {
        let row = self
            .conn
            .query_row(
                "SELECT summary_path, imports_hash, callers_count, callees_count, context_version \
                 FROM summary_context WHERE summary_path = ?1",
                [path],
                |row| {
                    Ok(SummaryContext {
                        path: row.get(0)?,
                        imports_hash: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        callers_count: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        callees_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                        context_version: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn set_summary_context(&self, context: &SummaryContext) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO summary_context \
             (summary_path, imports_hash, callers_count, callees_count, context_version) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                context.path,
                context.imports_hash,
                context.callers_count,
                context.callees_count,
                context.context_version,
            ],
        )?;
        Ok(())
    }

    // ========== Analysis file hashes ==========

    pub fn get_analysis_hash(&self, file_path: &str) -> Result<Option<String>> {
        let row = self
            .conn
            .query_row(
                "SELECT content_hash FROM analysis_file_hashes WHERE file_path = ?1",
                [file_path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row)
    }

    pub fn set_analysis_hash(&self, file_path: &str, content_hash: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO analysis_file_hashes (file_path, content_hash) VALUES (?1, ?2)",
            params![file_path, content_hash],
        )?;
        Ok(())
    }

    // ========== Metadata ==========

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let row = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(row)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // ========== Ignore patterns ==========

    pub fn add_ignore_pattern(&self, pattern: &str, source: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ignore_patterns (pattern, added_at, source) VALUES (?1, ?2, ?3)",
            params![pattern, now_rfc3339(), source],
        )?;
        Ok(())
    }

    /// Replace all patterns recorded for one source with the current set
    pub fn set_ignore_patterns_for_source(&self, source: &str, patterns: &[String]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM ignore_patterns WHERE source = ?1", [source])?;
        let now = now_rfc3339();
        for pattern in patterns {
            tx.execute(
                "INSERT INTO ignore_patterns (pattern, added_at, source) VALUES (?1, ?2, ?3)",
                params![pattern, now, source],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn ignore_patterns(&self) -> Result<Vec<IgnorePatternRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, pattern, added_at, source FROM ignore_patterns ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(IgnorePatternRow {
                    id: row.get(0)?,
                    pattern: row.get(1)?,
                    added_at: row.get(2)?,
                    source: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ========== Doc quality ==========

    pub fn upsert_doc_quality(&self, quality: &DocQuality) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO doc_quality \
             (entity_id, has_docstring, has_examples, has_type_hints, priority_score, last_reviewed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                quality.entity_id,
                quality.has_docstring as i64,
                quality.has_examples as i64,
                quality.has_type_hints as i64,
                quality.priority_score,
                quality.last_reviewed,
            ],
        )?;
        Ok(())
    }

    pub fn get_doc_quality(&self, entity_id: i64) -> Result<Option<DocQuality>> {
        let row = self
            .conn
            .query_row(
                "SELECT entity_id, has_docstring, has_examples, has_type_hints, priority_score, \
                 last_reviewed FROM doc_quality WHERE entity_id = ?1",
                [entity_id],
                |row| {
                    Ok(DocQuality {
                        entity_id: row.get(0)?,
                        has_docstring: row.get::<_, i64>(1)? != 0,
                        has_examples: row.get::<_, i64>(2)? != 0,
                        has_type_hints: row.get::<_, i64>(3)? != 0,
                        priority_score: row.get(4)?,
                        last_reviewed: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

const ENTITY_SELECT: &str = "SELECT id, file_path, kind, name, qualified_name, parent_name, \
                             start_line, end_line, docstring, signature, language, \
                             parent_entity_id FROM code_entities";

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<Summary> {
    let kind_raw: String = row.get(1)?;
    Ok(Summary {
        path: row.get(0)?,
        kind: SummaryKind::from_str(&kind_raw).unwrap_or(SummaryKind::File),
        hash: row.get(2)?,
        description: row.get(3)?,
        file_extension: row.get(4)?,
        language: row.get(5)?,
        error: row.get(6)?,
        needs_update: row.get::<_, Option<i64>>(7)?.unwrap_or(0) != 0,
        model: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        model_version: row.get(9)?,
        prompt_version: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        context_level: row.get::<_, Option<i64>>(11)?.unwrap_or(0) as u8,
        generated_at: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(13)?.unwrap_or_default(),
        tokens_used: row.get(14)?,
        generation_time_ms: row.get(15)?,
    })
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    let kind_raw: String = row.get(2)?;
    Ok(Entity {
        id: row.get(0)?,
        file_path: row.get(1)?,
        kind: EntityKind::from_str(&kind_raw).unwrap_or(EntityKind::Function),
        name: row.get(3)?,
        qualified_name: row.get(4)?,
        parent_name: row.get(5)?,
        start_line: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        end_line: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        docstring: row.get(8)?,
        signature: row.get(9)?,
        language: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        parent_entity_id: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_store() -> Store {
        Store::open_in_memory(&PathBuf::from("/p")).unwrap()
    }

    fn sample_summary(path: &str, kind: SummaryKind) -> Summary {
        Summary {
            path: path.to_string(),
            kind,
            hash: "h".to_string(),
            description: format!("summary of {}", path),
            file_extension: Some(".py".to_string()),
            language: Some("python".to_string()),
            error: None,
            needs_update: false,
            model: "test-model".to_string(),
            model_version: None,
            prompt_version: "v1".to_string(),
            context_level: 0,
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            tokens_used: None,
            generation_time_ms: None,
        }
    }

    fn sample_entity(file: &str, name: &str, kind: EntityKind) -> Entity {
        Entity {
            id: None,
            file_path: file.to_string(),
            kind,
            name: name.rsplit('.').next().unwrap().to_string(),
            qualified_name: name.to_string(),
            parent_name: None,
            parent_entity_id: None,
            start_line: 1,
            end_line: 10,
            docstring: None,
            signature: Some("()".to_string()),
            language: "python".to_string(),
        }
    }

    #[test]
    fn test_summary_upsert_and_get() {
        let store = test_store();
        let summary = sample_summary("/p/src/a.py", SummaryKind::File);
        store.upsert_summary(&summary).unwrap();

        let loaded = store.get_summary("/p/src/a.py").unwrap().unwrap();
        assert_eq!(loaded.description, "summary of /p/src/a.py");
        assert_eq!(loaded.kind, SummaryKind::File);

        // Upsert replaces
        let mut updated = summary.clone();
        updated.description = "new".to_string();
        store.upsert_summary(&updated).unwrap();
        let loaded = store.get_summary("/p/src/a.py").unwrap().unwrap();
        assert_eq!(loaded.description, "new");
    }

    #[test]
    fn test_list_children_direct_only() {
        let store = test_store();
        store
            .upsert_summary(&sample_summary("/p/src/a.py", SummaryKind::File))
            .unwrap();
        store
            .upsert_summary(&sample_summary("/p/src/b.py", SummaryKind::File))
            .unwrap();
        store
            .upsert_summary(&sample_summary("/p/src/sub", SummaryKind::Directory))
            .unwrap();
        store
            .upsert_summary(&sample_summary("/p/src/sub/nested.py", SummaryKind::File))
            .unwrap();

        let children = store.list_children("/p/src").unwrap();
        let paths: Vec<&str> = children.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/p/src/a.py", "/p/src/b.py", "/p/src/sub"]);
    }

    #[test]
    fn test_all_summaries_scoped() {
        let store = test_store();
        store
            .upsert_summary(&sample_summary("/p/src/a.py", SummaryKind::File))
            .unwrap();
        store
            .upsert_summary(&sample_summary("/p/docs/readme.md", SummaryKind::File))
            .unwrap();

        let all = store.all_summaries(None).unwrap();
        assert_eq!(all.len(), 2);
        let scoped = store.all_summaries(Some("/p/src")).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].path, "/p/src/a.py");
    }

    #[test]
    fn test_entities_and_relationships() {
        let store = test_store();
        let mut class = sample_entity("/p/src/a.py", "User", EntityKind::Class);
        let class_id = store.insert_entity(&mut class).unwrap();

        let mut method = sample_entity("/p/src/a.py", "User.login", EntityKind::Method);
        method.parent_name = Some("User".to_string());
        method.parent_entity_id = Some(class_id);
        let method_id = store.insert_entity(&mut method).unwrap();

        let mut caller = sample_entity("/p/src/b.py", "authenticate", EntityKind::Function);
        let caller_id = store.insert_entity(&mut caller).unwrap();

        store
            .insert_relationship(&Relationship {
                id: None,
                kind: RelationKind::Calls,
                from_entity_id: Some(caller_id),
                to_entity_id: Some(method_id),
                from_file: Some("/p/src/b.py".to_string()),
                to_file: Some("User.login".to_string()),
                location: Some("/p/src/b.py:3".to_string()),
                from_entity_qualified_name: None,
            })
            .unwrap();

        let callers = store.callers_of(method_id).unwrap();
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].0, "authenticate");

        let callees = store.callees_of(caller_id).unwrap();
        assert_eq!(callees.len(), 1);
        assert_eq!(callees[0].0, "User.login");
    }

    #[test]
    fn test_entities_matching_name_prefers_qualified() {
        let store = test_store();
        let mut method = sample_entity("/p/a.py", "User.login", EntityKind::Method);
        store.insert_entity(&mut method).unwrap();
        let mut func = sample_entity("/p/b.py", "login", EntityKind::Function);
        store.insert_entity(&mut func).unwrap();

        let by_qualified = store.entities_matching_name("User.login").unwrap();
        assert_eq!(by_qualified.len(), 1);
        assert_eq!(by_qualified[0].qualified_name, "User.login");

        // Simple name finds both the bare function and the method by name
        let by_simple = store.entities_matching_name("login").unwrap();
        assert_eq!(by_simple.len(), 2);
    }

    #[test]
    fn test_delete_summary_cascades() {
        let store = test_store();
        store
            .upsert_summary(&sample_summary("/p/src/a.py", SummaryKind::File))
            .unwrap();
        let mut entity = sample_entity("/p/src/a.py", "greet", EntityKind::Function);
        let entity_id = store.insert_entity(&mut entity).unwrap();
        store
            .insert_relationship(&Relationship {
                id: None,
                kind: RelationKind::Imports,
                from_entity_id: None,
                to_entity_id: None,
                from_file: Some("/p/src/a.py".to_string()),
                to_file: Some("os".to_string()),
                location: Some("/p/src/a.py:1".to_string()),
                from_entity_qualified_name: None,
            })
            .unwrap();
        store
            .set_summary_context(&SummaryContext {
                path: "/p/src/a.py".to_string(),
                imports_hash: "abc".to_string(),
                callers_count: 1,
                callees_count: 2,
                context_version: "1".to_string(),
            })
            .unwrap();
        store.set_analysis_hash("/p/src/a.py", "deadbeef").unwrap();
        store
            .upsert_doc_quality(&DocQuality {
                entity_id,
                has_docstring: true,
                has_examples: false,
                has_type_hints: false,
                priority_score: 10,
                last_reviewed: None,
            })
            .unwrap();

        store.delete_summary("/p/src/a.py").unwrap();

        assert!(store.get_summary("/p/src/a.py").unwrap().is_none());
        assert!(store.entities_for_file("/p/src/a.py").unwrap().is_empty());
        assert!(store.imports_of_file("/p/src/a.py").unwrap().is_empty());
        assert!(store.get_summary_context("/p/src/a.py").unwrap().is_none());
        assert!(store.get_analysis_hash("/p/src/a.py").unwrap().is_none());
        assert!(store.get_doc_quality(entity_id).unwrap().is_none());
    }

    #[test]
    fn test_stats_breakdowns() {
        let store = test_store();
        store
            .upsert_summary(&sample_summary("/p/a.py", SummaryKind::File))
            .unwrap();
        let mut ts = sample_summary("/p/b.ts", SummaryKind::File);
        ts.language = Some("typescript".to_string());
        store.upsert_summary(&ts).unwrap();
        store
            .upsert_summary(&sample_summary("/p", SummaryKind::Directory))
            .unwrap();

        let stats = store.stats(None).unwrap();
        let files = stats
            .count_by_kind
            .iter()
            .find(|(k, _)| k == "file")
            .map(|(_, n)| *n);
        assert_eq!(files, Some(2));
        assert_eq!(stats.count_by_language.len(), 2);
        assert!(stats.last_updated_at.is_some());
    }

    #[test]
    fn test_ignore_pattern_source_replacement() {
        let store = test_store();
        store
            .set_ignore_patterns_for_source("builtin", &[".git/".to_string()])
            .unwrap();
        store.add_ignore_pattern("*.log", "command").unwrap();
        store
            .set_ignore_patterns_for_source("builtin", &[".git/".to_string(), "dist/".to_string()])
            .unwrap();

        let rows = store.ignore_patterns().unwrap();
        let builtin: Vec<&str> = rows
            .iter()
            .filter(|r| r.source == "builtin")
            .map(|r| r.pattern.as_str())
            .collect();
        assert_eq!(builtin, vec![".git/", "dist/"]);
        assert!(rows.iter().any(|r| r.source == "command"));
    }

    #[test]
    fn test_analysis_hash_round_trip() {
        let store = test_store();
        assert!(store.get_analysis_hash("/p/a.py").unwrap().is_none());
        store.set_analysis_hash("/p/a.py", "abc123").unwrap();
        assert_eq!(
            store.get_analysis_hash("/p/a.py").unwrap().as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_mark_needs_update() {
        let store = test_store();
        store
            .upsert_summary(&sample_summary("/p/a.py", SummaryKind::File))
            .unwrap();
        assert!(store.mark_needs_update("/p/a.py").unwrap());
        assert!(store.get_summary("/p/a.py").unwrap().unwrap().needs_update);
        assert!(!store.mark_needs_update("/p/missing.py").unwrap());
    }
}
