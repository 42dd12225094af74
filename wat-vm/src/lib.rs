//! Parser, instantiator, stack machine and assertion harness for
//! WebAssembly text-format conformance scripts.
//!
//! Mirrors the shape `fuel_vm` gives its own crate root: thin, mostly
//! `pub mod` plus a `prelude` re-exporting what a caller usually needs.

#![deny(unsafe_code)]

pub mod compile_stack;
pub mod driver;
pub mod error;
pub mod eval;
pub mod function;
pub mod globals;
pub mod harness;
pub mod instantiate;
pub mod labels;
pub mod locals;
pub mod module;
pub mod node;
pub mod parser;
pub mod raw;
pub mod stack;

pub mod prelude {
    pub use crate::driver::{run_file, run_text, RunSummary};
    pub use crate::error::{ErrorKind, WatError};
    pub use crate::harness::{run_script, Directive, DirectiveOutcome};
    pub use crate::instantiate::instantiate;
    pub use crate::module::{Instance, Module};
    pub use crate::parser::parse_script;
}
