use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};

use crate::chain::Chain;
use crate::runner::RunEvent;
use crate::wire::{ConfigurationMeta, Module};

pub fn show_chain(chain: &Chain) {
    for (i, m) in chain.modules().iter().enumerate() {
        show_module(i, m);
        if i + 1 < chain.len() {
            println!("{}", "        ↓".dimmed());
        }
    }
}

pub fn show_module(index: usize, m: &Module) {
    println!("\n{}", format!("=== Module {} ===", index + 1).bold());

    if m.inputs.is_empty() {
        println!("{}", "No inputs.".dimmed().italic());
    }
    for (j, input) in m.inputs.iter().enumerate() {
        println!("  {} {}", format!("Input {}:", j + 1).cyan(), input);
    }

    println!("{}", "Prompt".bold());
    println!("{}", indent(&m.prompt, 2));
    if !m.error.is_empty() {
        println!("  {}", m.error.red());
    }

    if !m.rendered_prompt.is_empty() {
        println!("{}", "Rendered Prompt".bold());
        println!("{}", indent(&m.rendered_prompt, 2));
    }

    if let Some(output) = m.output.as_deref().filter(|o| !o.is_empty()) {
        println!(
            "{} {}",
            "Output".blue().bold(),
            format!("({})", format_size(output.len(), DECIMAL)).dimmed()
        );
        println!("{}", indent(output, 2));
    }
}

pub fn show_validation(chain: &Chain, invalid: &[usize], forward: &[(usize, usize)]) {
    for &i in invalid {
        println!("{} Module {}: {}", "✗".red().bold(), i + 1, chain.modules()[i].error);
    }
    for &(module, target) in forward {
        println!(
            "{} Module {}: @Module[{}] is not an earlier module and will render as an error",
            "!".yellow().bold(),
            module + 1,
            target
        );
    }
    if invalid.is_empty() && forward.is_empty() {
        println!("{} {} module(s) ok", "✓".green().bold(), chain.len());
    }
}

pub fn show_configurations(list: &[ConfigurationMeta]) {
    if list.is_empty() {
        println!("{}", "No saved configurations.".dimmed());
        return;
    }
    for meta in list {
        println!(
            "{}  {}  {}",
            meta.id.to_string().dimmed(),
            meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            meta.name.bold()
        );
    }
}

/// Progress bar over a chain run; a no-op when disabled.
pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn new(total: usize, enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg} {elapsed}") {
                pb.set_style(style);
            }
            pb
        });
        Self { bar }
    }

    pub fn on_event(&self, event: RunEvent<'_>) {
        let Some(pb) = &self.bar else { return };
        match event {
            RunEvent::Started { index, .. } => {
                pb.set_message(format!("Module {}", index + 1));
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
            }
            RunEvent::Finished { index, output, elapsed_ms } => {
                pb.println(format!(
                    "{} Module {} ({}, {}ms)",
                    "✓".green(),
                    index + 1,
                    format_size(output.len(), DECIMAL),
                    elapsed_ms
                ));
                pb.inc(1);
            }
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
    }
}

fn indent(s: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    s.lines()
        .map(|l| format!("{}{}", pad, l))
        .collect::<Vec<_>>()
        .join("\n")
}
