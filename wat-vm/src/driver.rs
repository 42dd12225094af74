//! Drives a whole script file: strip comments, parse, run every directive,
//! print the pass/fail trace, tally the result.
//!
//! Grounded on `interpreter.py::check_asserts`/`read_expressions`: same
//! per-assertion "was successful!" / "was unsuccessful!" trace and final
//! tally line, same `FAIL_CODE`/`ENDC` ANSI highlighting for failures, but
//! comment stripping and file reading are now a real pass over the text
//! instead of a blind `.replace('\n', '')` (the original drops newlines
//! only, so a `;;` line comment would have swallowed the rest of the file;
//! this strips `;;` and `(; ... ;)` properly first).

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::WatError;
use crate::harness::{run_script, Directive, DirectiveOutcome};
use crate::parser::parse_script;

const FAIL_CODE: &str = "\x1b[91m";
const ENDC: &str = "\x1b[0m";

/// Strip `;; line` and `(; block ;)` comments, the way a `.wast` lexer
/// would, before tokenizing. Quoted strings are passed through untouched
/// so a `;` inside a string literal is never mistaken for a comment.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut i = 0;
    let mut in_string = false;

    while i < n {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ';' if chars.get(i + 1) == Some(&';') => {
                while i < n && chars[i] != '\n' {
                    i += 1;
                }
            }
            '(' if chars.get(i + 1) == Some(&';') => {
                let mut depth = 1;
                i += 2;
                while i < n && depth > 0 {
                    if chars[i] == '(' && chars.get(i + 1) == Some(&';') {
                        depth += 1;
                        i += 2;
                    } else if chars[i] == ';' && chars.get(i + 1) == Some(&')') {
                        depth -= 1;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Summary printed once a whole script has run.
pub struct RunSummary {
    pub passed: usize,
    pub total: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Correct assertions: {}/{}.", self.passed, self.total)
    }
}

fn is_assertion(directive: &Directive) -> bool {
    matches!(
        directive.outcome,
        DirectiveOutcome::Passed | DirectiveOutcome::Failed { .. }
    )
}

/// Run a script's text end to end, printing one line per assertion
/// directive and a final tally, and return the tally for the caller. The
/// CLI binary exits zero whenever the run completes at all, regardless of
/// how many assertions failed; a non-zero exit is reserved for a missing
/// input file or an I/O error.
pub fn run_text(text: &str) -> Result<RunSummary, WatError> {
    let stripped = strip_comments(text);
    let forms = parse_script(&stripped)?;
    let directives = run_script(&forms);

    let mut passed = 0usize;
    let mut total = 0usize;
    for (index, directive) in directives.iter().filter(|d| is_assertion(d)).enumerate() {
        total += 1;
        match &directive.outcome {
            DirectiveOutcome::Passed => {
                passed += 1;
                println!(
                    "Assertion #{index} of type \"{}\" was successful! ({})",
                    directive.description, directive.head
                );
            }
            DirectiveOutcome::Failed { reason } => {
                println!(
                    "{FAIL_CODE}Assertion #{index} of type \"{}\" was unsuccessful! ({reason}){ENDC}",
                    directive.description
                );
            }
            _ => unreachable!("filtered to only Passed/Failed above"),
        }
    }
    println!();
    let summary = RunSummary { passed, total };
    println!("{summary}");
    Ok(summary)
}

pub fn run_file(path: &Path) -> Result<RunSummary, WatError> {
    let text = fs::read_to_string(path).map_err(|e| {
        crate::error::kind::invalid_syntax(format!("could not read {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "running conformance script");
    run_text(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_comments() {
        let text = "(module) ;; trailing comment\n(; a block (; nested ;) comment ;) (invoke \"f\")";
        let stripped = strip_comments(text);
        assert!(!stripped.contains(';'));
    }

    #[test]
    fn comment_markers_inside_strings_are_preserved() {
        let text = r#"(assert_trap (invoke "f") "unreachable")"#;
        let stripped = strip_comments(text);
        assert_eq!(stripped, text);
    }

    #[test]
    fn tallies_pass_and_fail_counts() {
        let text = r#"
            (module
              (func (export "add") (param i32 i32) (result i32)
                (i32.add (local.get 0) (local.get 1))))
            (assert_return (invoke "add" (i32.const 2) (i32.const 2)) (i32.const 4))
            (assert_return (invoke "add" (i32.const 2) (i32.const 2)) (i32.const 5))
        "#;
        let summary = run_text(text).unwrap();
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.total, 2);
    }
}
