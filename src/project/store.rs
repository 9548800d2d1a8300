//! Project persistence
//!
//! `JsonProjectStore` keeps one pretty-printed `<id>.json` per project in a
//! flat directory.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use super::record::{Project, ProjectSummary};
use crate::error::{Result, TapGridError};

/// Extension of project files in a store.
pub const PROJECT_EXTENSION: &str = "json";

/// Load/save collaborator for projects.
pub trait ProjectStore {
    /// Insert or replace by id; touches `modified_at`.
    fn save(&self, project: &mut Project) -> Result<()>;

    fn load(&self, id: Uuid) -> Result<Project>;

    /// All projects, sorted by name.
    fn list(&self) -> Result<Vec<ProjectSummary>>;

    fn delete(&self, id: Uuid) -> Result<()>;
}

/// Directory of JSON project files.
#[derive(Debug, Clone)]
pub struct JsonProjectStore {
    root: PathBuf,
}

impl JsonProjectStore {
    /// The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding project `id`.
    pub fn project_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.{}", id, PROJECT_EXTENSION))
    }

    fn ensure_root(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| TapGridError::DirectoryCreateError {
                path: self.root.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn project_files(&self) -> Vec<PathBuf> {
        if !self.root.exists() {
            return Vec::new();
        }

        WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(PROJECT_EXTENSION)
            })
            .map(|entry| entry.path().to_path_buf())
            .collect()
    }
}

impl ProjectStore for JsonProjectStore {
    fn save(&self, project: &mut Project) -> Result<()> {
        project.validate()?;
        self.ensure_root()?;
        project.touch();

        let path = self.project_path(project.id);
        let content = serde_json::to_string_pretty(project)?;
        fs::write(&path, content).map_err(|e| TapGridError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        info!("[STORE] Saved '{}' to {}", project.name, path.display());
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Project> {
        let path = self.project_path(id);
        if !path.exists() {
            return Err(TapGridError::ProjectNotFound { id: id.to_string() });
        }
        debug!("[STORE] Loading {}", path.display());
        Project::from_file(&path)
    }

    fn list(&self) -> Result<Vec<ProjectSummary>> {
        let mut summaries: Vec<ProjectSummary> = self
            .project_files()
            .into_iter()
            .filter_map(|path| match Project::from_file(&path) {
                Ok(project) => Some(project.summary()),
                Err(e) => {
                    warn!("[STORE] Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        let path = self.project_path(id);
        if !path.exists() {
            return Err(TapGridError::ProjectNotFound { id: id.to_string() });
        }
        fs::remove_file(&path).map_err(|e| TapGridError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;
        info!("[STORE] Deleted project {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{Tempo, TimeSignature};
    use tempfile::TempDir;

    fn project(name: &str) -> Project {
        Project::new(
            name,
            format!("{}.wav", name),
            Tempo::new(100).unwrap(),
            TimeSignature::new(3, 4).unwrap(),
            vec![0.0, 1800.0, 3600.0],
            4000.0,
        )
        .unwrap()
    }

    #[test]
    fn test_save_creates_directory_and_loads_back() {
        let temp = TempDir::new().unwrap();
        let store = JsonProjectStore::new(temp.path().join("projects"));
        let mut demo = project("demo");

        store.save(&mut demo).unwrap();
        assert!(store.project_path(demo.id).exists());

        let loaded = store.load(demo.id).unwrap();
        assert_eq!(loaded, demo);
    }

    #[test]
    fn test_save_upserts_and_touches_modified_at() {
        let temp = TempDir::new().unwrap();
        let store = JsonProjectStore::new(temp.path());
        let mut demo = project("demo");
        store.save(&mut demo).unwrap();
        let first_modified = demo.modified_at;

        demo.name = "renamed".to_string();
        store.save(&mut demo).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "renamed");
        assert!(demo.modified_at >= first_modified);
        assert_eq!(demo.created_at, store.load(demo.id).unwrap().created_at);
    }

    #[test]
    fn test_list_sorted_by_name() {
        let temp = TempDir::new().unwrap();
        let store = JsonProjectStore::new(temp.path());
        for name in ["zeta", "alpha", "mid"] {
            store.save(&mut project(name)).unwrap();
        }
        fs::write(temp.path().join("notes.txt"), "not a project").unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_list_skips_corrupt_files() {
        let temp = TempDir::new().unwrap();
        let store = JsonProjectStore::new(temp.path());
        store.save(&mut project("good")).unwrap();
        fs::write(temp.path().join("broken.json"), "{ not json").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].to_string(), "good (3/4, 100 BPM)");
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonProjectStore::new(temp.path().join("nothing-here"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let store = JsonProjectStore::new(temp.path());
        let mut demo = project("demo");
        store.save(&mut demo).unwrap();

        store.delete(demo.id).unwrap();
        assert!(matches!(
            store.load(demo.id),
            Err(TapGridError::ProjectNotFound { .. })
        ));
        assert!(matches!(
            store.delete(demo.id),
            Err(TapGridError::ProjectNotFound { .. })
        ));
    }

    #[test]
    fn test_save_rejects_invalid_project() {
        let temp = TempDir::new().unwrap();
        let store = JsonProjectStore::new(temp.path());
        let mut demo = project("demo");
        demo.audio_reference.clear();
        assert!(store.save(&mut demo).is_err());
        assert!(!store.project_path(demo.id).exists());
    }
}
