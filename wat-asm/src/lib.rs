//! Operator tags, the error/trap taxonomy and the control-flow `Report`
//! signal. This crate plays the role `fuel-asm` plays for `fuel-vm`: it
//! defines what the interpreter executes without knowing how to execute it.

#![deny(unsafe_code)]

pub mod error;
pub mod operator;
pub mod report;

pub use error::ErrorKind;
pub use operator::{NumOp, OperatorTag};
pub use report::Report;
