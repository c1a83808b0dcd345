//! Chained prompt composition: modules whose prompts reference their own
//! inputs (`@Input1`) and the outputs of earlier modules (`@Module[0].path`),
//! rendered and run in order against a language model.

pub mod chain;
pub mod cli;
pub mod config;
pub mod errors;
pub mod log;
pub mod provider;
pub mod resolve;
pub mod runner;
pub mod store;
pub mod ux;
pub mod wire;
