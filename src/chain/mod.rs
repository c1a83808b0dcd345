use crate::errors::ChainError;
use crate::resolve;
use crate::wire::{ChainDocument, Module};

pub const PROMPT_REQUIRED: &str = "Prompt is required.";

/// Ordered modules; position is both execution order and reference scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    modules: Vec<Module>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// A chain always starts with one empty module.
    pub fn new() -> Self {
        Self { modules: vec![Module::default()] }
    }

    pub fn from_modules(modules: Vec<Module>) -> Self {
        if modules.is_empty() {
            return Self::new();
        }
        Self { modules }
    }

    pub fn from_document(doc: ChainDocument) -> Self {
        Self::from_modules(doc.modules)
    }

    pub fn to_document(&self, name: Option<String>) -> ChainDocument {
        ChainDocument { name, modules: self.modules.clone() }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Module, ChainError> {
        self.modules.get(index).ok_or(ChainError::NoSuchModule(index))
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Result<&mut Module, ChainError> {
        self.modules.get_mut(index).ok_or(ChainError::NoSuchModule(index))
    }

    pub fn add_input(&mut self, module: usize) -> Result<(), ChainError> {
        self.get_mut(module)?.inputs.push(String::new());
        self.render(module)?;
        Ok(())
    }

    pub fn remove_input(&mut self, module: usize, input: usize) -> Result<(), ChainError> {
        let m = self.get_mut(module)?;
        if input >= m.inputs.len() {
            return Err(ChainError::NoSuchInput { module, input });
        }
        m.inputs.remove(input);
        self.render(module)?;
        Ok(())
    }

    pub fn set_input(&mut self, module: usize, input: usize, value: impl Into<String>) -> Result<(), ChainError> {
        let m = self.get_mut(module)?;
        let slot = m
            .inputs
            .get_mut(input)
            .ok_or(ChainError::NoSuchInput { module, input })?;
        *slot = value.into();
        self.render(module)?;
        Ok(())
    }

    pub fn set_prompt(&mut self, module: usize, value: impl Into<String>) -> Result<(), ChainError> {
        let m = self.get_mut(module)?;
        m.prompt = value.into();
        m.error = if is_blank(&m.prompt) { PROMPT_REQUIRED.to_string() } else { String::new() };
        self.render(module)?;
        Ok(())
    }

    /// Inserts a fresh module right after `module`; returns its index.
    pub fn add_next_step(&mut self, module: usize) -> Result<usize, ChainError> {
        self.get(module)?;
        self.modules.insert(module + 1, Module::default());
        Ok(module + 1)
    }

    pub fn remove_module(&mut self, module: usize) -> Result<Module, ChainError> {
        self.get(module)?;
        if self.modules.len() == 1 {
            return Err(ChainError::LastModule);
        }
        Ok(self.modules.remove(module))
    }

    /// Recomputes and stores the rendered prompt of `module`.
    pub fn render(&mut self, module: usize) -> Result<&str, ChainError> {
        let rendered = self.preview(module)?;
        let m = self.get_mut(module)?;
        m.rendered_prompt = rendered;
        Ok(&m.rendered_prompt)
    }

    /// Renders `module` against the current outputs without storing it.
    pub fn preview(&self, module: usize) -> Result<String, ChainError> {
        let m = self.get(module)?;
        Ok(resolve::render_prompt(m, module, &self.modules))
    }

    /// Marks every blank-prompt module at once and clears the error on the
    /// rest. Returns the invalid indices.
    pub fn validate(&mut self) -> Vec<usize> {
        let mut invalid = Vec::new();
        for (i, m) in self.modules.iter_mut().enumerate() {
            if is_blank(&m.prompt) {
                m.error = PROMPT_REQUIRED.to_string();
                invalid.push(i);
            } else {
                m.error.clear();
            }
        }
        invalid
    }

    /// `(module, referenced)` pairs where a module refers to itself or to a
    /// later module. Such references always render as an index error.
    pub fn forward_references(&self) -> Vec<(usize, usize)> {
        self.modules
            .iter()
            .enumerate()
            .flat_map(|(i, m)| {
                resolve::referenced_modules(m)
                    .into_iter()
                    .filter(move |&r| r >= i)
                    .map(move |r| (i, r))
            })
            .collect()
    }
}

pub fn is_blank(prompt: &str) -> bool {
    prompt.trim().is_empty()
}
