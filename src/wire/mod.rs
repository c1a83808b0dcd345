use anyhow::Context;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::errors::ChainError;

// ========================================
// Chain records and on-disk documents
// ========================================

/// One step of a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,
    pub inputs: Vec<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rendered_prompt: String,
    #[serde(skip_serializing)]
    pub is_loading: bool,
    pub output: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl Default for Module {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            inputs: Vec::new(),
            prompt: String::new(),
            rendered_prompt: String::new(),
            is_loading: false,
            output: None,
            error: String::new(),
        }
    }
}

impl Module {
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Self::default() }
    }

    /// Only the editable parts survive; everything derived from a run is reset.
    pub fn blueprint(&self) -> Self {
        Self {
            prompt: self.prompt.clone(),
            inputs: self.inputs.clone(),
            ..Self::default()
        }
    }
}

/// A chain as read from or written to a `.json` / `.yaml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocFormat {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> Result<DocFormat, ChainError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => Ok(DocFormat::Json),
        "yaml" | "yml" => Ok(DocFormat::Yaml),
        _ => Err(ChainError::Format(path.display().to_string())),
    }
}

pub fn read_document(path: &Path) -> anyhow::Result<ChainDocument> {
    let format = format_of(path)?;
    let text = fs::read_to_string(path)?;
    let doc = match format {
        DocFormat::Json => serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?,
        DocFormat::Yaml => serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?,
    };
    Ok(doc)
}

pub fn write_document(path: &Path, doc: &ChainDocument) -> anyhow::Result<()> {
    let body = match format_of(path)? {
        DocFormat::Json => serde_json::to_string_pretty(doc)?,
        DocFormat::Yaml => serde_yaml::to_string(doc)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body)?;
    Ok(())
}

/// Index entry of a saved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationMeta {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub modules: Vec<Module>,
}

impl SavedConfiguration {
    pub fn meta(&self) -> ConfigurationMeta {
        ConfigurationMeta {
            id: self.id,
            name: self.name.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_module_fills_defaults() {
        let doc: ChainDocument =
            serde_json::from_str(r#"{"modules":[{"prompt":"hi @Input1","inputs":["x"]}]}"#).unwrap();
        let m = &doc.modules[0];
        assert_eq!(m.prompt, "hi @Input1");
        assert_eq!(m.inputs, vec!["x"]);
        assert!(m.output.is_none());
        assert!(m.error.is_empty());
        assert!(!m.is_loading);
    }

    #[test]
    fn module_keys_are_camel_case() {
        let m: Module = serde_json::from_str(
            r#"{"prompt":"p","renderedPrompt":"p rendered","isLoading":true,"output":"o"}"#,
        )
        .unwrap();
        assert_eq!(m.rendered_prompt, "p rendered");
        assert!(m.is_loading);

        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains(r#""renderedPrompt":"p rendered""#), "{json}");
        assert!(!json.contains("isLoading"), "{json}");
        assert!(!json.contains("rendered_prompt"), "{json}");
    }

    #[test]
    fn yaml_document_parses() {
        let yaml = "name: demo\nmodules:\n  - prompt: first\n  - prompt: use @Module[0]\n    output: done\n";
        let doc: ChainDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.name.as_deref(), Some("demo"));
        assert_eq!(doc.modules.len(), 2);
        assert_eq!(doc.modules[1].output.as_deref(), Some("done"));
    }

    #[test]
    fn documents_follow_file_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = Module::with_prompt("Describe @Input1");
        first.inputs.push("rust".into());
        first.output = Some(r#"{"a":1}"#.into());
        let doc = ChainDocument { name: Some("n".into()), modules: vec![first] };

        for file in ["chain.json", "nested/chain.yaml", "chain.YML"] {
            let path = dir.path().join(file);
            write_document(&path, &doc).unwrap();
            let back = read_document(&path).unwrap();
            assert_eq!(back.name, doc.name, "{file}");
            assert_eq!(back.modules, doc.modules, "{file}");
        }

        let err = write_document(&dir.path().join("chain.txt"), &doc).unwrap_err();
        assert!(err.to_string().contains("unsupported chain file format"));
    }

    #[test]
    fn blueprint_drops_run_state() {
        let mut m = Module::with_prompt("p");
        m.inputs.push("a".into());
        m.output = Some("out".into());
        m.rendered_prompt = "p".into();
        m.error = "Prompt is required.".into();
        let b = m.blueprint();
        assert_ne!(b.id, m.id);
        assert_eq!(b.prompt, "p");
        assert_eq!(b.inputs, vec!["a"]);
        assert!(b.output.is_none());
        assert!(b.rendered_prompt.is_empty());
        assert!(b.error.is_empty());
    }
}
