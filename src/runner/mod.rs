use std::time::Instant;

use crate::chain::{is_blank, Chain, PROMPT_REQUIRED};
use crate::errors::ChainError;
use crate::provider::{send_prompt, Provider};

/// Progress notifications emitted while modules run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent<'a> {
    Started { index: usize, prompt: &'a str },
    Finished { index: usize, output: &'a str, elapsed_ms: u64 },
}

/// Runs one module against the current outputs of the modules before it.
///
/// A blank prompt is flagged on the module and nothing is sent. References to
/// modules that have not run yet render as error text instead of failing.
pub async fn run_module(
    chain: &mut Chain,
    index: usize,
    provider: &dyn Provider,
    on_event: &mut dyn FnMut(RunEvent<'_>),
) -> Result<(), ChainError> {
    let module = chain.get_mut(index)?;
    if is_blank(&module.prompt) {
        module.error = PROMPT_REQUIRED.to_string();
        return Err(ChainError::InvalidModules(vec![index]));
    }
    execute(chain, index, provider, on_event).await
}

/// Runs every module in order. Refuses to start when any prompt is blank;
/// in that case all offending modules are flagged together.
pub async fn run_all(
    chain: &mut Chain,
    provider: &dyn Provider,
    on_event: &mut dyn FnMut(RunEvent<'_>),
) -> Result<(), ChainError> {
    let invalid = chain.validate();
    if !invalid.is_empty() {
        tracing::warn!(?invalid, "refusing to run chain with blank prompts");
        return Err(ChainError::InvalidModules(invalid));
    }

    for index in 0..chain.len() {
        execute(chain, index, provider, on_event).await?;
    }
    Ok(())
}

async fn execute(
    chain: &mut Chain,
    index: usize,
    provider: &dyn Provider,
    on_event: &mut dyn FnMut(RunEvent<'_>),
) -> Result<(), ChainError> {
    let prompt = chain.preview(index)?;
    {
        let module = chain.get_mut(index)?;
        module.is_loading = true;
        module.output = None;
        module.error.clear();
        module.rendered_prompt = prompt.clone();
    }

    tracing::info!(module = index + 1, provider = provider.name(), "running module");
    on_event(RunEvent::Started { index, prompt: &prompt });

    let started = Instant::now();
    let output = send_prompt(provider, &prompt).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let module = chain.get_mut(index)?;
    module.is_loading = false;
    tracing::debug!(module = index + 1, bytes = output.len(), elapsed_ms, "module finished");
    let output: &str = module.output.insert(output);
    on_event(RunEvent::Finished { index, output, elapsed_ms });
    Ok(())
}
