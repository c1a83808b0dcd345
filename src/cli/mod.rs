use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    #[value(alias = "google")]
    Gemini,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Anthropic,
    Ollama,
    /// Offline backend that answers with the prompt itself.
    Echo,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::OpenAI => "gpt-4.1-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::Ollama => "llama3.1",
            ProviderKind::Echo => "echo",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "promptchain", version, about = "Compose and run chained LLM prompts with @Input/@Module references")]
pub struct Args {
    /// TOML file with provider, model and storage settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Base URL override for the selected provider
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Directory that holds `.promptchain/` (saved configurations, run artifacts)
    #[arg(long, global = true)]
    pub root: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a chain file with one empty module
    New {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Print every module with its rendered prompt, without calling a model
    Render(ChainFileArgs),
    /// Check prompts and references
    Validate(ChainFileArgs),
    /// Run all modules in order, or a single one with --module
    Run(RunArgs),
    /// Save a chain file as a named configuration
    Save {
        file: PathBuf,
        #[arg(long)]
        name: String,
    },
    /// List saved configurations
    List,
    /// Show a saved configuration
    Show { id: String },
    /// Write a saved configuration out as a chain file
    Export {
        id: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Delete a saved configuration
    Remove { id: String },
}

#[derive(ClapArgs, Debug)]
pub struct ChainFileArgs {
    /// Chain document (.json, .yaml or .yml), or `saved:<id>`
    pub file: String,
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    /// Chain document (.json, .yaml or .yml), or `saved:<id>`
    pub file: String,

    /// 1-based module number to run on its own
    #[arg(long)]
    pub module: Option<usize>,

    /// Where to write the chain with outputs filled in
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_artifacts: bool,
}
