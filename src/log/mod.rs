use crate::chain::Chain;
use crate::wire::{write_document, ChainDocument};
use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--debug`.
pub fn init_tracing(debug: bool) {
    let default = if debug { "promptchain=debug" } else { "promptchain=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub chain: PathBuf,
    pub modules: Vec<PathBuf>,
}

fn run_dir(data_dir: &Path, run: Uuid) -> PathBuf {
    data_dir.join("runs").join(run.to_string())
}

/// Writes the rendered prompt and output of each module in `ran`, plus the
/// whole chain as it stands after the run.
pub fn save_run(
    data_dir: &Path,
    run: Uuid,
    chain: &Chain,
    name: Option<String>,
    ran: &[usize],
) -> anyhow::Result<SavedPaths> {
    let dir = run_dir(data_dir, run);
    fs::create_dir_all(&dir)?;

    let mut modules = Vec::new();
    for &index in ran {
        let module = chain.get(index)?;
        let n = index + 1;

        let p = dir.join(format!("module-{n}.prompt.txt"));
        fs::write(&p, &module.rendered_prompt)?;
        modules.push(p);

        if let Some(output) = &module.output {
            let p = dir.join(format!("module-{n}.output.txt"));
            fs::write(&p, output)?;
            modules.push(p);
        }
    }

    let chain_path = dir.join("chain.json");
    let doc: ChainDocument = chain.to_document(name);
    write_document(&chain_path, &doc)?;

    tracing::debug!(dir = %dir.display(), files = modules.len() + 1, "run artifacts saved");
    Ok(SavedPaths { dir, chain: chain_path, modules })
}

pub fn print_planned_paths(data_dir: &Path, run: Uuid) {
    let dir = run_dir(data_dir, run);
    tracing::debug!("planned artifacts directory: {}", dir.display());
}

pub fn print_saved_paths(saved: &SavedPaths) {
    tracing::debug!("artifacts directory: {}", saved.dir.display());
    for p in &saved.modules {
        tracing::debug!("saved {}", p.display());
    }
    tracing::debug!("chain saved at: {}", saved.chain.display());
}
