//! Vector tables for summary and entity embeddings
//!
//! Uses sqlite-vec `vec0` virtual tables inside the same summaries.db.
//! Each row keeps the embedding model and the source object's
//! `updated_at` so the indexer can detect staleness without re-reading
//! the embedding itself. Embeddings are fixed-dimension f32 arrays
//! serialized little-endian.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::store::Store;

const VEC_SUMMARIES: &str = "vec_summaries";
const VEC_ENTITIES: &str = "vec_entities";
const META_DIM_SUMMARIES: &str = "rag_embedding_dim";
const META_DIM_ENTITIES: &str = "rag_embedding_dim_entities";

/// A single vector search hit
#[derive(Debug, Clone)]
pub struct VecResult {
    /// Summary path, or the entity's file path for entity hits
    pub path: String,
    /// "file", "directory", or "entity"
    pub kind: String,
    pub description: String,
    /// L2 distance; lower is more similar
    pub distance: f64,
    pub entity_id: Option<i64>,
    pub qualified_name: Option<String>,
    pub start_line: Option<i64>,
}

impl VecResult {
    /// Convert L2 distance to a relevance score in (0, 1]
    pub fn relevance(&self) -> f64 {
        1.0 / (1.0 + self.distance)
    }
}

/// Serialize an embedding as little-endian f32 bytes for vec0
fn embedding_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn stored_dim(conn: &Connection, key: &str) -> Result<Option<usize>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(raw.and_then(|v| v.parse().ok()))
}

fn set_stored_dim(conn: &Connection, key: &str, dim: usize) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, dim.to_string()],
    )?;
    Ok(())
}

pub(crate) fn delete_summary_vector(conn: &Connection, path: &str) -> Result<()> {
    if table_exists(conn, VEC_SUMMARIES)? {
        conn.execute(
            &format!("DELETE FROM {} WHERE path = ?1", VEC_SUMMARIES),
            [path],
        )?;
    }
    Ok(())
}

pub(crate) fn delete_entity_vector(conn: &Connection, entity_id: i64) -> Result<()> {
    if table_exists(conn, VEC_ENTITIES)? {
        conn.execute(
            &format!("DELETE FROM {} WHERE entity_id = ?1", VEC_ENTITIES),
            [entity_id],
        )?;
    }
    Ok(())
}

impl Store {
    /// Ensure the summary vector table exists with the given dimension.
    /// A dimension change drops and recreates the table (a full reindex
    /// follows in that case).
    pub fn ensure_summary_vectors(&self, dim: usize) -> Result<()> {
        let conn = self.conn();
        if table_exists(conn, VEC_SUMMARIES)? {
            if stored_dim(conn, META_DIM_SUMMARIES)? == Some(dim) {
                return Ok(());
            }
            conn.execute(&format!("DROP TABLE {}", VEC_SUMMARIES), [])?;
        }
        conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE {} USING vec0(\
                 embedding FLOAT[{}], path TEXT, kind TEXT, model TEXT, updated_at TEXT, \
                 +description TEXT)",
                VEC_SUMMARIES, dim
            ),
            [],
        )?;
        set_stored_dim(conn, META_DIM_SUMMARIES, dim)
    }

    pub fn ensure_entity_vectors(&self, dim: usize) -> Result<()> {
        let conn = self.conn();
        if table_exists(conn, VEC_ENTITIES)? {
            if stored_dim(conn, META_DIM_ENTITIES)? == Some(dim) {
                return Ok(());
            }
            conn.execute(&format!("DROP TABLE {}", VEC_ENTITIES), [])?;
        }
        conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE {} USING vec0(\
                 embedding FLOAT[{}], entity_id INTEGER, file_path TEXT, \
                 qualified_name TEXT, start_line INTEGER, model TEXT, updated_at TEXT, \
                 +description TEXT)",
                VEC_ENTITIES, dim
            ),
            [],
        )?;
        set_stored_dim(conn, META_DIM_ENTITIES, dim)
    }

    /// Replace the vector row for a summary path
    pub fn put_summary_vector(
        &self,
        path: &str,
        kind: &str,
        model: &str,
        updated_at: &str,
        description: &str,
        embedding: &[f32],
    ) -> Result<()> {
        self.ensure_summary_vectors(embedding.len())?;
        let conn = self.conn();
        delete_summary_vector(conn, path)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (embedding, path, kind, model, updated_at, description) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                VEC_SUMMARIES
            ),
            params![
                embedding_bytes(embedding),
                path,
                kind,
                model,
                updated_at,
                description
            ],
        )?;
        Ok(())
    }

    /// Replace the vector row for an entity
    #[allow(clippy::too_many_arguments)]
    pub fn put_entity_vector(
        &self,
        entity_id: i64,
        file_path: &str,
        qualified_name: &str,
        start_line: i64,
        model: &str,
        updated_at: &str,
        description: &str,
        embedding: &[f32],
    ) -> Result<()> {
        self.ensure_entity_vectors(embedding.len())?;
        let conn = self.conn();
        delete_entity_vector(conn, entity_id)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (embedding, entity_id, file_path, qualified_name, start_line, \
                 model, updated_at, description) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                VEC_ENTITIES
            ),
            params![
                embedding_bytes(embedding),
                entity_id,
                file_path,
                qualified_name,
                start_line,
                model,
                updated_at,
                description
            ],
        )?;
        Ok(())
    }

    pub fn delete_summary_vector(&self, path: &str) -> Result<()> {
        delete_summary_vector(self.conn(), path)
    }

    pub fn delete_entity_vector(&self, entity_id: i64) -> Result<()> {
        delete_entity_vector(self.conn(), entity_id)
    }

    pub fn summary_vector_count(&self) -> Result<i64> {
        let conn = self.conn();
        if !table_exists(conn, VEC_SUMMARIES)? {
            return Ok(0);
        }
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", VEC_SUMMARIES), [], |r| {
            r.get(0)
        })?;
        Ok(count)
    }

    pub fn entity_vector_count(&self) -> Result<i64> {
        let conn = self.conn();
        if !table_exists(conn, VEC_ENTITIES)? {
            return Ok(0);
        }
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", VEC_ENTITIES), [], |r| {
            r.get(0)
        })?;
        Ok(count)
    }

    /// path -> (updated_at, model) for every indexed summary
    pub fn indexed_summary_vectors(
        &self,
    ) -> Result<std::collections::HashMap<String, (String, String)>> {
        let conn = self.conn();
        let mut map = std::collections::HashMap::new();
        if !table_exists(conn, VEC_SUMMARIES)? {
            return Ok(map);
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT path, updated_at, model FROM {}",
            VEC_SUMMARIES
        ))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let path: String = row.get(0)?;
            let updated_at: Option<String> = row.get(1)?;
            let model: Option<String> = row.get(2)?;
            map.insert(
                path,
                (updated_at.unwrap_or_default(), model.unwrap_or_default()),
            );
        }
        Ok(map)
    }

    /// entity_id -> (updated_at, model) for every indexed entity
    pub fn indexed_entity_vectors(
        &self,
    ) -> Result<std::collections::HashMap<i64, (String, String)>> {
        let conn = self.conn();
        let mut map = std::collections::HashMap::new();
        if !table_exists(conn, VEC_ENTITIES)? {
            return Ok(map);
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT entity_id, updated_at, model FROM {}",
            VEC_ENTITIES
        ))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let updated_at: Option<String> = row.get(1)?;
            let model: Option<String> = row.get(2)?;
            map.insert(
                id,
                (updated_at.unwrap_or_default(), model.unwrap_or_default()),
            );
        }
        Ok(map)
    }

    /// KNN search over summary embeddings, nearest first
    pub fn nearest_summaries(&self, query: &[f32], k: usize) -> Result<Vec<VecResult>> {
        let conn = self.conn();
        if !table_exists(conn, VEC_SUMMARIES)? {
            return Ok(Vec::new());
        }
        if stored_dim(conn, META_DIM_SUMMARIES)? != Some(query.len()) {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT path, kind, description, distance FROM {} \
             WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
            VEC_SUMMARIES
        ))?;
        let rows = stmt
            .query_map(params![embedding_bytes(query), k as i64], |row| {
                Ok(VecResult {
                    path: row.get(0)?,
                    kind: row.get::<_, Option<String>>(1)?.unwrap_or_else(|| "file".into()),
                    description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    distance: row.get(3)?,
                    entity_id: None,
                    qualified_name: None,
                    start_line: None,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// KNN search over entity embeddings, nearest first
    pub fn nearest_entities(&self, query: &[f32], k: usize) -> Result<Vec<VecResult>> {
        let conn = self.conn();
        if !table_exists(conn, VEC_ENTITIES)? {
            return Ok(Vec::new());
        }
        if stored_dim(conn, META_DIM_ENTITIES)? != Some(query.len()) {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT entity_id, file_path, qualified_name, start_line, description, distance \
             FROM {} WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
            VEC_ENTITIES
        ))?;
        let rows = stmt
            .query_map(params![embedding_bytes(query), k as i64], |row| {
                Ok(VecResult {
                    path: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    kind: "entity".to_string(),
                    description: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    distance: row.get(5)?,
                    entity_id: row.get(0)?,
                    qualified_name: row.get(2)?,
                    start_line: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Remove every summary vector row; table and dimension stay
    pub fn clear_summary_vectors(&self) -> Result<()> {
        let conn = self.conn();
        if table_exists(conn, VEC_SUMMARIES)? {
            conn.execute(&format!("DELETE FROM {}", VEC_SUMMARIES), [])?;
        }
        Ok(())
    }

    pub fn clear_entity_vectors(&self) -> Result<()> {
        let conn = self.conn();
        if table_exists(conn, VEC_ENTITIES)? {
            conn.execute(&format!("DELETE FROM {}", VEC_ENTITIES), [])?;
        }
        Ok(())
    }
}
