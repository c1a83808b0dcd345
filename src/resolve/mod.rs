//! `@InputK` / `@Module[i].path` reference resolution and prompt rendering.
//!
//! Resolution never fails: a reference that cannot be satisfied is replaced by
//! a bracketed `[Error: ...]` text so the problem is visible in the rendered
//! prompt itself.

use regex::{Captures, Regex};
use serde_json::{Number, Value};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::wire::Module;

/// An input whose whole value is a module reference.
static WHOLE_MODULE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@Module\[([0-9]+)\](?:\.([A-Za-z0-9_.]+))?$").unwrap());

/// Module references embedded anywhere in a prompt.
static MODULE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@Module\[([0-9]+)\](?:\.([A-Za-z0-9_.]+))?").unwrap());

/// A parsed `@Module[i]` or `@Module[i].a.b` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRef<'a> {
    /// `None` when the digits do not fit in a `usize`.
    pub index: Option<usize>,
    pub digits: &'a str,
    pub path: Option<&'a str>,
}

impl<'a> ModuleRef<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        let digits = caps.get(1)?.as_str();
        Some(Self {
            index: digits.parse().ok(),
            digits,
            path: caps.get(2).map(|m| m.as_str()),
        })
    }

    /// 1-based position used in error texts.
    fn position(&self) -> String {
        match self.index.and_then(|i| i.checked_add(1)) {
            Some(p) => p.to_string(),
            None => self.digits.to_string(),
        }
    }
}

/// Parses `value` when the whole string is a module reference.
pub fn parse_module_ref(value: &str) -> Option<ModuleRef<'_>> {
    WHOLE_MODULE_REF
        .captures(value)
        .and_then(|caps| ModuleRef::from_captures(&caps))
}

/// Resolves a reference from the point of view of module `current`.
/// Only modules strictly before `current` are eligible.
pub fn resolve_module_ref(r: &ModuleRef<'_>, current: usize, modules: &[Module]) -> String {
    let Some(index) = r.index.filter(|&i| i < current) else {
        return format!("[Error: Invalid Module index {}]", r.position());
    };

    let output = modules
        .get(index)
        .and_then(|m| m.output.as_deref())
        .filter(|o| !o.is_empty());
    let Some(output) = output else {
        return format!("[Error: No output for Module {}]", r.position());
    };

    let Some(path) = r.path else {
        return output.to_string();
    };

    match serde_json::from_str::<Value>(output) {
        Ok(json) => match value_by_path(&json, path) {
            Some(v) => stringify_value(v),
            None => format!("[Error: Path not found - {path}]"),
        },
        Err(_) => "[Error: Invalid JSON for path access]".to_string(),
    }
}

/// An input that is exactly a module reference resolves to that module's
/// output; any other input is used verbatim.
pub fn resolve_input_value(input: &str, current: usize, modules: &[Module]) -> String {
    match parse_module_ref(input) {
        Some(r) => resolve_module_ref(&r, current, modules),
        None => input.to_string(),
    }
}

/// Walks a dot-separated path through objects (by key) and arrays (by index).
pub fn value_by_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(root, |acc, seg| match acc {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Strings verbatim, other scalars in their textual form, containers as
/// compact JSON.
pub fn stringify_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => integral_floats_as_ints(v).to_string(),
    }
}

/// Rebuilds `v` with every integral float turned into an integer so nested
/// numbers print the same way `format_number` prints scalars. Key order is kept.
fn integral_floats_as_ints(v: &Value) -> Value {
    match v {
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => Value::Number(Number::from(f as i64)),
            _ => v.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(integral_floats_as_ints).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, item)| (k.clone(), integral_floats_as_ints(item)))
                .collect(),
        ),
        _ => v.clone(),
    }
}

fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // integral floats print without a fraction, e.g. 3.0 -> "3"
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Renders the prompt of the module at `current`.
///
/// Every `@Input<k>` is replaced by the resolved value of input `k`, in input
/// order. The result is then scanned once for `@Module[...]` references, which
/// are replaced by their resolution; substituted text is not rescanned.
pub fn render_prompt(module: &Module, current: usize, modules: &[Module]) -> String {
    let mut rendered = module.prompt.clone();

    for (i, input) in module.inputs.iter().enumerate() {
        let placeholder = format!("@Input{}", i + 1);
        if !rendered.contains(&placeholder) {
            continue;
        }
        let value = resolve_input_value(input, current, modules);
        rendered = rendered.replace(&placeholder, &value);
    }

    MODULE_REF
        .replace_all(&rendered, |caps: &Captures<'_>| match ModuleRef::from_captures(caps) {
            Some(r) => resolve_module_ref(&r, current, modules),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Indices of every module the prompt or inputs of `module` refer to.
pub fn referenced_modules(module: &Module) -> BTreeSet<usize> {
    std::iter::once(module.prompt.as_str())
        .chain(module.inputs.iter().map(String::as_str))
        .flat_map(|text| MODULE_REF.captures_iter(text))
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .collect()
}
