use anyhow::{anyhow, bail, Context};
use clap::Parser;
use std::path::Path;
use uuid::Uuid;

use promptchain::chain::Chain;
use promptchain::cli::{self, Command, RunArgs};
use promptchain::errors::ChainError;
use promptchain::runner::{self, RunEvent};
use promptchain::store::ConfigStore;
use promptchain::wire::{self, ChainDocument, SavedConfiguration};
use promptchain::{config, log, provider, ux};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    log::init_tracing(args.debug);

    let mut cfg = config::Config::load(args.config.as_deref())?;
    cfg.apply_args(&args);
    let store = ConfigStore::new(cfg.store_dir());
    tracing::debug!(store = %store.dir().display(), provider = ?cfg.provider, "configuration loaded");

    match &args.command {
        Command::New { file, name } => {
            if file.exists() {
                bail!("{} already exists", file.display());
            }
            wire::write_document(file, &Chain::new().to_document(name.clone()))?;
            println!("Created {}", file.display());
        }
        Command::Render(a) => {
            let (mut chain, _) = load_chain(&a.file, &store)?;
            for i in 0..chain.len() {
                chain.render(i)?;
            }
            ux::show_chain(&chain);
        }
        Command::Validate(a) => {
            let (mut chain, _) = load_chain(&a.file, &store)?;
            let invalid = chain.validate();
            let forward = chain.forward_references();
            ux::show_validation(&chain, &invalid, &forward);
            if !invalid.is_empty() {
                return Err(ChainError::InvalidModules(invalid).into());
            }
        }
        Command::Run(a) => run(&cfg, &args, a, &store).await?,
        Command::Save { file, name } => {
            let (chain, _) = load_chain(&file.to_string_lossy(), &store)?;
            let meta = store.save(name, chain.modules())?;
            println!("Saved '{}' as {}", meta.name, meta.id);
        }
        Command::List => ux::show_configurations(&store.list()),
        Command::Show { id } => {
            let saved = load_saved(&store, id)?;
            ux::show_configurations(&[saved.meta()]);
            ux::show_chain(&Chain::from_modules(saved.modules));
        }
        Command::Export { id, out } => {
            let saved = load_saved(&store, id)?;
            let doc = ChainDocument { name: Some(saved.name), modules: saved.modules };
            wire::write_document(out, &doc)?;
            println!("Exported to {}", out.display());
        }
        Command::Remove { id } => {
            let uuid = parse_id(id)?;
            if !store.remove(uuid)? {
                bail!("no saved configuration {id}");
            }
            println!("Removed {id}");
        }
    }

    Ok(())
}

async fn run(cfg: &config::Config, args: &cli::Args, a: &RunArgs, store: &ConfigStore) -> anyhow::Result<()> {
    let (mut chain, name) = load_chain(&a.file, store)?;
    let provider = provider::make_provider(cfg)?;

    let run_id = Uuid::new_v4();
    if args.debug {
        log::print_planned_paths(&cfg.data_dir(), run_id);
    }

    let single = match a.module {
        Some(n) => Some(n.checked_sub(1).ok_or_else(|| anyhow!("module numbers start at 1"))?),
        None => None,
    };

    let progress = ux::Progress::new(if single.is_some() { 1 } else { chain.len() }, !args.no_progress);
    let mut on_event = |e: RunEvent<'_>| progress.on_event(e);
    let result = match single {
        Some(index) => runner::run_module(&mut chain, index, provider.as_ref(), &mut on_event)
            .await
            .map(|_| vec![index]),
        None => runner::run_all(&mut chain, provider.as_ref(), &mut on_event)
            .await
            .map(|_| (0..chain.len()).collect::<Vec<_>>()),
    };
    progress.finish();

    let ran = match result {
        Ok(ran) => ran,
        Err(e) => {
            if let ChainError::InvalidModules(invalid) = &e {
                ux::show_validation(&chain, invalid, &[]);
            }
            return Err(e.into());
        }
    };

    for &i in &ran {
        ux::show_module(i, chain.get(i)?);
    }

    if cfg.save_artifacts && !a.no_artifacts {
        let saved = log::save_run(&cfg.data_dir(), run_id, &chain, name.clone(), &ran)?;
        if args.debug {
            log::print_saved_paths(&saved);
        }
    }

    if let Some(out) = &a.out {
        wire::write_document(out, &chain.to_document(name))?;
        println!("\nWrote {}", out.display());
    }

    Ok(())
}

/// A chain file path, or `saved:<id>` for a stored configuration.
fn load_chain(source: &str, store: &ConfigStore) -> anyhow::Result<(Chain, Option<String>)> {
    if let Some(id) = source.strip_prefix("saved:") {
        let saved = load_saved(store, id)?;
        return Ok((Chain::from_modules(saved.modules), Some(saved.name)));
    }
    let doc = wire::read_document(Path::new(source))?;
    let name = doc.name.clone();
    Ok((Chain::from_document(doc), name))
}

fn load_saved(store: &ConfigStore, id: &str) -> anyhow::Result<SavedConfiguration> {
    store
        .load(parse_id(id)?)?
        .ok_or_else(|| anyhow!("no saved configuration {id}"))
}

fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id.trim()).with_context(|| format!("'{id}' is not a configuration id"))
}
