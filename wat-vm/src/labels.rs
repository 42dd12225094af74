//! Static resolution of branch targets to relative block depths.
//!
//! `logic.py`'s `BranchExpression`/`BranchIfExpression` walk a dynamic stack
//! of in-scope label names at evaluation time and raise on a miss. Here that
//! walk happens once, during validation: [`LabelStack`] mirrors the nesting
//! of `block`/`loop`/`if` while a function body is being checked, and a
//! `br $name` or `br N` is turned into a [`wat_asm::Report::Break`] depth
//! before the typed tree is ever evaluated.

use wat_asm::ErrorKind;

use crate::error::WatError;

/// One entry per currently open `block`/`loop`/`if`/function body scope,
/// innermost last.
#[derive(Debug, Default)]
pub struct LabelStack {
    names: Vec<Option<String>>,
}

impl LabelStack {
    pub fn new() -> Self {
        Self { names: Vec::new() }
    }

    pub fn push(&mut self, name: Option<String>) {
        self.names.push(name);
    }

    pub fn pop(&mut self) {
        self.names.pop();
    }

    pub fn depth(&self) -> u32 {
        self.names.len() as u32
    }

    /// Resolve a branch target token (`"0"`, `"$done"`, ...) to a depth
    /// relative to the current innermost scope (`0` means "this scope").
    pub fn resolve(&self, token: &str) -> Result<u32, WatError> {
        if let Ok(n) = token.parse::<u32>() {
            if (n as usize) < self.names.len() {
                return Ok(n);
            }
            return Err(WatError::new(
                ErrorKind::UnknownLabel,
                format!("branch depth {n} exceeds enclosing scope count"),
            ));
        }

        for (rel, name) in self.names.iter().rev().enumerate() {
            if name.as_deref() == Some(token) {
                return Ok(rel as u32);
            }
        }

        Err(WatError::new(
            ErrorKind::UnknownLabel,
            format!("no enclosing block labeled {token}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_depth_resolves_directly() {
        let mut labels = LabelStack::new();
        labels.push(None);
        labels.push(None);
        assert_eq!(labels.resolve("0").unwrap(), 0);
        assert_eq!(labels.resolve("1").unwrap(), 1);
    }

    #[test]
    fn named_label_resolves_to_relative_depth() {
        let mut labels = LabelStack::new();
        labels.push(Some("$outer".to_string()));
        labels.push(Some("$inner".to_string()));
        assert_eq!(labels.resolve("$inner").unwrap(), 0);
        assert_eq!(labels.resolve("$outer").unwrap(), 1);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let mut labels = LabelStack::new();
        labels.push(Some("$outer".to_string()));
        assert_eq!(
            labels.resolve("$missing").unwrap_err().kind,
            ErrorKind::UnknownLabel
        );
    }

    #[test]
    fn out_of_range_depth_is_an_error() {
        let mut labels = LabelStack::new();
        labels.push(None);
        assert_eq!(labels.resolve("5").unwrap_err().kind, ErrorKind::UnknownLabel);
    }
}
