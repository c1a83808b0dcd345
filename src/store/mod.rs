use chrono::Utc;
use fs_err as fs;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::ChainError;
use crate::wire::{ConfigurationMeta, Module, SavedConfiguration};

const INDEX_FILE: &str = "index.json";

/// Named chain configurations kept as JSON files in one directory, plus an
/// index listing them in save order.
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn entry_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Index of all saved configurations. A missing or unreadable index is
    /// treated as empty.
    pub fn list(&self) -> Vec<ConfigurationMeta> {
        let path = self.index_path();
        if !path.exists() {
            return Vec::new();
        }
        let parsed = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<Vec<ConfigurationMeta>>(&s).map_err(anyhow::Error::from));
        match parsed {
            Ok(index) => index,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read configuration index");
                Vec::new()
            }
        }
    }

    /// Saves the editable part of each module (prompt and inputs) under
    /// `name`. Outputs, errors and ids are not kept.
    pub fn save(&self, name: &str, modules: &[Module]) -> Result<ConfigurationMeta, ChainError> {
        if name.trim().is_empty() {
            return Err(ChainError::Store("configuration name is required".into()));
        }
        if modules.is_empty() {
            return Err(ChainError::Store("nothing to save: chain has no modules".into()));
        }

        let config = SavedConfiguration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            timestamp: Utc::now(),
            modules: modules.iter().map(Module::blueprint).collect(),
        };

        fs::create_dir_all(&self.dir).map_err(store_err)?;
        let body = to_string_pretty(&config).map_err(store_err)?;
        fs::write(self.entry_path(config.id), body).map_err(store_err)?;

        let mut index = self.list();
        index.push(config.meta());
        self.write_index(&index)?;

        tracing::info!(id = %config.id, name, modules = modules.len(), "saved configuration");
        Ok(config.meta())
    }

    /// `None` when no configuration with `id` exists.
    pub fn load(&self, id: Uuid) -> Result<Option<SavedConfiguration>, ChainError> {
        let path = self.entry_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(store_err)?;
        let config = serde_json::from_str(&text).map_err(store_err)?;
        Ok(Some(config))
    }

    /// Returns whether anything was removed.
    pub fn remove(&self, id: Uuid) -> Result<bool, ChainError> {
        let mut index = self.list();
        let before = index.len();
        index.retain(|m| m.id != id);
        let listed = index.len() != before;
        if listed {
            self.write_index(&index)?;
        }

        let path = self.entry_path(id);
        let existed = path.exists();
        if existed {
            fs::remove_file(&path).map_err(store_err)?;
        }
        Ok(listed || existed)
    }

    fn write_index(&self, index: &[ConfigurationMeta]) -> Result<(), ChainError> {
        let body = to_string_pretty(index).map_err(store_err)?;
        fs::write(self.index_path(), body).map_err(store_err)
    }
}

fn store_err(e: impl std::fmt::Display) -> ChainError {
    ChainError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(prompt: &str, output: Option<&str>) -> Module {
        let mut m = Module::with_prompt(prompt);
        m.inputs = vec!["@Module[0].x".into()];
        m.output = output.map(String::from);
        m.error = "stale".into();
        m
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("missing"));
        assert!(store.list().is_empty());
        assert!(store.load(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_strips_run_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let modules = vec![module("one", Some("out")), module("two", None)];

        let meta = store.save("Bug Classifier", &modules).unwrap();
        assert_eq!(meta.name, "Bug Classifier");
        assert_eq!(store.list(), vec![meta.clone()]);

        let loaded = store.load(meta.id).unwrap().unwrap();
        assert_eq!(loaded.meta(), meta);
        assert_eq!(loaded.modules.len(), 2);
        for (saved, original) in loaded.modules.iter().zip(&modules) {
            assert_eq!(saved.prompt, original.prompt);
            assert_eq!(saved.inputs, original.inputs);
            assert_ne!(saved.id, original.id);
            assert!(saved.output.is_none());
            assert!(saved.error.is_empty());
        }
    }

    #[test]
    fn test_index_keeps_save_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let a = store.save("a", &[module("x", None)]).unwrap();
        let b = store.save("b", &[module("y", None)]).unwrap();
        let names: Vec<String> = store.list().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(store.remove(a.id).unwrap());
        assert!(!store.remove(a.id).unwrap());
        assert_eq!(store.list(), vec![b]);
    }

    #[test]
    fn test_rejects_blank_name_and_empty_chain() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        assert!(matches!(store.save("  ", &[module("x", None)]), Err(ChainError::Store(_))));
        assert!(matches!(store.save("n", &[]), Err(ChainError::Store(_))));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_corrupt_index_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{not json").unwrap();
        let store = ConfigStore::new(dir.path());
        assert!(store.list().is_empty());
        // saving still works and replaces the broken index
        store.save("fresh", &[module("x", None)]).unwrap();
        assert_eq!(store.list().len(), 1);
    }
}
