use anyhow::Context;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Args, ProviderKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: String,
    pub provider: ProviderKind,
    /// Falls back to `GEMINI_MODEL` for Gemini, then the provider default.
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub api_base: Option<String>,
    /// Saved configurations; defaults to `<root>/.promptchain/configurations`.
    pub store_dir: Option<String>,
    pub save_artifacts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: ".".into(),
            provider: ProviderKind::Gemini,
            model: None,
            timeout_secs: 120,
            api_base: None,
            store_dir: None,
            save_artifacts: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("invalid config TOML")
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p)?;
                Self::from_toml_str(&text).with_context(|| format!("loading {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Command-line flags win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(root) = &args.root {
            self.root = root.clone();
        }
        if let Some(provider) = args.provider {
            if provider != self.provider {
                // a model configured for another backend would not apply
                self.model = None;
            }
            self.provider = provider;
        }
        if let Some(model) = &args.model {
            self.model = Some(model.clone());
        }
        if let Some(t) = args.timeout_secs {
            self.timeout_secs = t;
        }
        if let Some(base) = &args.api_base {
            self.api_base = Some(base.clone());
        }
    }

    pub fn resolved_model(&self) -> String {
        if let Some(m) = self.model.as_ref().filter(|m| !m.trim().is_empty()) {
            return m.clone();
        }
        if self.provider == ProviderKind::Gemini {
            if let Ok(m) = std::env::var("GEMINI_MODEL") {
                if !m.trim().is_empty() {
                    return m;
                }
            }
        }
        self.provider.default_model().to_string()
    }

    pub fn data_dir(&self) -> PathBuf {
        Path::new(&self.root).join(".promptchain")
    }

    pub fn store_dir(&self) -> PathBuf {
        match &self.store_dir {
            Some(d) => PathBuf::from(d),
            None => self.data_dir().join("configurations"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str("provider = \"openai\"\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(cfg.provider, ProviderKind::OpenAI);
        assert_eq!(cfg.resolved_model(), "gpt-4o");
        assert_eq!(cfg.timeout_secs, 120);
        assert!(cfg.save_artifacts);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(Config::from_toml_str("provider = \"palm\"").is_err());
    }

    #[test]
    fn test_args_override_file() {
        let mut cfg = Config::from_toml_str("provider = \"openai\"\nmodel = \"gpt-4o\"\ntimeout_secs = 5").unwrap();
        let args = Args::parse_from(["promptchain", "--provider", "echo", "--root", "/tmp/x", "list"]);
        cfg.apply_args(&args);
        assert_eq!(cfg.provider, ProviderKind::Echo);
        assert_eq!(cfg.resolved_model(), "echo");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.store_dir(), PathBuf::from("/tmp/x/.promptchain/configurations"));
    }

    #[test]
    fn test_explicit_store_dir() {
        let cfg = Config::from_toml_str("store_dir = \"/var/lib/chains\"").unwrap();
        assert_eq!(cfg.store_dir(), PathBuf::from("/var/lib/chains"));
    }
}
