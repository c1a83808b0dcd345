use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("module {} does not exist", .0 + 1)] NoSuchModule(usize),
    #[error("module {} has no input {}", .module + 1, .input + 1)] NoSuchInput { module: usize, input: usize },
    #[error("a chain must keep at least one module")] LastModule,
    #[error("prompt is required for module(s) {}", display_positions(.0))] InvalidModules(Vec<usize>),
    #[error("unsupported chain file format: {0}")] Format(String),
    #[error("store error: {0}")] Store(String),
}

fn display_positions(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
