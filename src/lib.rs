//! DfE EIR rule generation
//!
//! Compiles the DfE Employer's Information Requirements rulebook into IDS
//! rule files for each lifecycle stage and generation pass, and writes
//! sample-data fixtures tagged with the rules they pass or fail. The rule
//! compiler itself lives in `ids_core`; this crate supplies the rulebook,
//! configuration and file output.

pub mod config;
pub mod export;
pub mod fixtures;
pub mod pipeline;
pub mod rulebook;

pub use config::{ConfigLoader, GeneratorConfig, GeneratorInputs};
pub use pipeline::{Pipeline, RunOptions, RunReport};
