//! High-level typed queries over the code graph
//!
//! Callers of `get_callers` must tolerate missing edges: call-target
//! resolution is best-effort and dynamically dispatched calls stay
//! unresolved.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::normalize_path;
use crate::error::Result;
use crate::store::{Entity, EntityKind, Store};

/// A caller of an entity
#[derive(Debug, Clone, Serialize)]
pub struct CallerInfo {
    pub qualified_name: String,
    pub file_path: String,
    pub location: Option<String>,
}

/// A call target of an entity. `file_path` is None when the target is
/// unresolved and only the textual name is known.
#[derive(Debug, Clone, Serialize)]
pub struct CalleeInfo {
    pub target_name: String,
    pub file_path: Option<String>,
    pub location: Option<String>,
}

/// A node in an inheritance tree; `entity` is None for base classes
/// that were never resolved to a definition.
#[derive(Debug, Clone, Serialize)]
pub struct InheritanceNode {
    pub qualified_name: String,
    pub file_path: Option<String>,
    #[serde(skip)]
    pub entity: Option<Entity>,
    pub parents: Vec<String>,
    pub children: Vec<InheritanceNode>,
}

/// Graph query API over a project's store
pub struct GraphQueries<'a> {
    store: &'a Store,
    project_root: PathBuf,
}

impl<'a> GraphQueries<'a> {
    pub fn new(store: &'a Store, project_root: &Path) -> Self {
        Self {
            store,
            project_root: project_root.to_path_buf(),
        }
    }

    /// Who calls this entity (incoming `calls` edges)
    pub fn get_callers(&self, entity_id: i64) -> Result<Vec<CallerInfo>> {
        let raw = self.store.callers_of(entity_id)?;
        Ok(raw
            .into_iter()
            .map(|(qualified_name, file_path, location)| CallerInfo {
                qualified_name,
                file_path,
                location,
            })
            .collect())
    }

    /// What this entity calls (outgoing `calls` edges)
    pub fn get_callees(&self, entity_id: i64) -> Result<Vec<CalleeInfo>> {
        let raw = self.store.callees_of(entity_id)?;
        Ok(raw
            .into_iter()
            .map(|(target_name, file_path, location)| CalleeInfo {
                target_name,
                file_path,
                location,
            })
            .collect())
    }

    /// Module names this file imports
    pub fn get_imports(&self, file_path: &Path) -> Result<Vec<String>> {
        self.store.imports_of_file(&normalize_path(file_path))
    }

    /// Files that import this file.
    ///
    /// Two resolutions run: dotted module names derived from the path
    /// relative to the project root (Python style, `__init__.py` folds
    /// into its package), and JS/TS relative imports resolved against
    /// the importing file with extension and index probing.
    pub fn get_importers(&self, file_path: &Path) -> Result<Vec<String>> {
        let key = normalize_path(file_path);
        let mut result: Vec<String> = Vec::new();

        if let Some(module) = file_path_to_module_name(&key, &self.project_root) {
            result.extend(self.store.importers_of_module(&module)?);
        }

        for (from_file, to_file) in self.store.relative_import_edges()? {
            if let Some(resolved) = resolve_relative_import(&from_file, &to_file) {
                if resolved == key && !result.contains(&from_file) {
                    result.push(from_file);
                }
            }
        }

        result.sort();
        result.dedup();
        Ok(result)
    }

    /// Inheritance tree for a class: direct parent names plus the
    /// recursive tree of resolved subclasses. Returns None for ids that
    /// do not name a class.
    pub fn get_inheritance_tree(&self, entity_id: i64) -> Result<Option<InheritanceNode>> {
        let Some(entity) = self.store.entity_by_id(entity_id)? else {
            return Ok(None);
        };
        if entity.kind != EntityKind::Class {
            return Ok(None);
        }
        let mut visited = std::collections::HashSet::new();
        Ok(Some(self.build_inheritance_node(entity, &mut visited)?))
    }

    fn build_inheritance_node(
        &self,
        entity: Entity,
        visited: &mut std::collections::HashSet<i64>,
    ) -> Result<InheritanceNode> {
        let entity_id = entity.id.expect("stored entity has id");
        visited.insert(entity_id);
        let parents = self
            .store
            .parents_of(entity_id)?
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        let mut children = Vec::new();
        for (child_id, child_name) in self.store.children_of(entity_id)? {
            // Inheritance data can contain cycles; visit each class once
            if visited.contains(&child_id) {
                continue;
            }
            match self.store.entity_by_id(child_id)? {
                Some(child) => children.push(self.build_inheritance_node(child, visited)?),
                None => children.push(InheritanceNode {
                    qualified_name: child_name,
                    file_path: None,
                    entity: None,
                    parents: Vec::new(),
                    children: Vec::new(),
                }),
            }
        }

        Ok(InheritanceNode {
            qualified_name: entity.qualified_name.clone(),
            file_path: Some(entity.file_path.clone()),
            entity: Some(entity),
            parents,
            children,
        })
    }

    /// Locate definitions by qualified name, falling back to simple
    /// name. May return multiple matches; callers decide how to handle
    /// ambiguity.
    pub fn find_definition(&self, name: &str) -> Result<Vec<Entity>> {
        self.store.entities_matching_name(name)
    }
}

/// Dotted module name for a file path under the project root.
/// `src/foo/bar.py` -> `src.foo.bar`; `foo/__init__.py` -> `foo`.
fn file_path_to_module_name(file_path: &str, project_root: &Path) -> Option<String> {
    let root = normalize_path(project_root);
    let relative = file_path.strip_prefix(&root)?.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    let mut parts: Vec<&str> = relative.split('/').collect();
    let last = parts.pop()?;
    if last != "__init__.py" {
        let stem = last.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(last);
        parts.push(stem);
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}

/// Resolve a `./` or `../` import against the importing file. Probes
/// the bare path, known extensions, and directory index files.
fn resolve_relative_import(from_file: &str, to_file: &str) -> Option<String> {
    if !to_file.starts_with('.') {
        return None;
    }
    let from_dir = Path::new(from_file).parent()?;
    let joined = from_dir.join(to_file);
    let base = normalize_components(&joined);

    if base.is_file() {
        return Some(normalize_path(&base));
    }
    for ext in ["js", "jsx", "ts", "tsx"] {
        let candidate = base.with_extension(ext);
        if candidate.is_file() {
            return Some(normalize_path(&candidate));
        }
    }
    for index in ["index.js", "index.ts", "index.tsx"] {
        let candidate = base.join(index);
        if candidate.is_file() {
            return Some(normalize_path(&candidate));
        }
    }
    None
}

/// Collapse `.` and `..` components without touching the filesystem
fn normalize_components(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                result.pop();
            }
            other => result.push(other),
        }
    }
    result
}
