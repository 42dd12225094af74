//! Character stream → raw S-expression tree.
//!
//! Shaped after `expressions.py::SExpression` (`get_parentheses` /
//! `__new__`), reworked into an explicit recursive-descent tokenizer instead
//! of a regex-scan-then-reparse approach.

use crate::error::{kind, WatError};
use crate::raw::RawNode;

/// Split `text` into top-level whitespace-separated tokens, where a token is
/// either a balanced-parenthesis group, a quoted string, or a bare word.
/// Parentheses and whitespace inside a quoted string do not count.
fn tokenize(text: &str) -> Result<Vec<String>, WatError> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < n {
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= n {
            break;
        }

        match chars[i] {
            '(' => {
                let start = i;
                let mut depth: i32 = 0;
                let mut in_quotes = false;
                while i < n {
                    let c = chars[i];
                    if in_quotes {
                        if c == '"' {
                            in_quotes = false;
                        }
                        i += 1;
                        continue;
                    }
                    match c {
                        '"' => {
                            in_quotes = true;
                            i += 1;
                        }
                        '(' => {
                            depth += 1;
                            i += 1;
                        }
                        ')' => {
                            depth -= 1;
                            i += 1;
                            if depth == 0 {
                                break;
                            }
                            if depth < 0 {
                                return Err(kind::invalid_syntax(
                                    "unbalanced closing parenthesis",
                                ));
                            }
                        }
                        _ => i += 1,
                    }
                }
                if depth != 0 {
                    return Err(kind::invalid_syntax("unbalanced opening parenthesis"));
                }
                tokens.push(chars[start..i].iter().collect());
            }
            ')' => {
                return Err(kind::invalid_syntax("unexpected closing parenthesis"));
            }
            '"' => {
                let start = i;
                i += 1;
                while i < n && chars[i] != '"' {
                    i += 1;
                }
                if i >= n {
                    return Err(kind::invalid_syntax("unterminated string literal"));
                }
                i += 1;
                tokens.push(chars[start..i].iter().collect());
            }
            _ => {
                let start = i;
                while i < n && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
                    i += 1;
                }
                tokens.push(chars[start..i].iter().collect());
            }
        }
    }

    Ok(tokens)
}

fn is_bare(token: &str) -> bool {
    !token.starts_with('(')
}

/// Fold the head token plus however many following tokens the grammar says
/// belong to it ("special multi-word heads": `invoke "name"`, `call $id`,
/// `type $id`, `local $id ty`, `table funcref`). Returns the folded head
/// plus whatever tokens remain as children.
fn fold_head(first: String, mut rest: Vec<String>) -> (String, Vec<String>) {
    match first.as_str() {
        "invoke" if !rest.is_empty() => {
            let name = rest.remove(0);
            (format!("invoke {name}"), rest)
        }
        "call" if rest.first().is_some_and(|t| is_bare(t)) => {
            let id = rest.remove(0);
            (format!("call {id}"), rest)
        }
        "type" if rest.first().is_some_and(|t| is_bare(t)) => {
            let id = rest.remove(0);
            (format!("type {id}"), rest)
        }
        "local" if rest.first().is_some_and(|t| t.starts_with('$')) => {
            let id = rest.remove(0);
            (format!("local {id}"), rest)
        }
        "table" if rest.first().map(String::as_str) == Some("funcref") => {
            rest.remove(0);
            ("tablefuncref".to_string(), rest)
        }
        _ => (first, rest),
    }
}

/// Parse one token (as produced by [`tokenize`]) into a [`RawNode`].
fn parse_form(token: &str) -> Result<RawNode, WatError> {
    let token = token.trim();
    if token == "quote" {
        return Err(kind::unexpected_token(
            "quoted binary/text module forms are not supported",
        ));
    }
    if !(token.starts_with('(') && token.ends_with(')')) {
        return Ok(RawNode::leaf(token));
    }

    let inner = &token[1..token.len() - 1];
    let mut tokens = tokenize(inner)?;
    if tokens.is_empty() {
        return Err(kind::invalid_syntax("empty parenthesized expression"));
    }
    let first = tokens.remove(0);
    let (head, rest_tokens) = fold_head(first, tokens);

    let mut children = Vec::with_capacity(rest_tokens.len());
    for t in rest_tokens {
        children.push(parse_form(&t)?);
    }

    if let Some(first_child) = children.first() {
        if first_child.is_leaf() && first_child.head == "quote" {
            return Err(kind::unexpected_token(
                "quoted binary/text module forms are not supported",
            ));
        }
    }

    let mut name = None;
    if let Some(first_child) = children.first() {
        if first_child.is_leaf() && first_child.head.starts_with('$') {
            name = Some(first_child.head.clone());
            children.remove(0);
        }
    }

    Ok(RawNode {
        head,
        name,
        children,
    })
}

/// Parse an entire (already comment-stripped) script into its top-level
/// directives, in source order.
pub fn parse_script(text: &str) -> Result<Vec<RawNode>, WatError> {
    tokenize(text)?.iter().map(|t| parse_form(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_function() {
        let forms = parse_script(
            r#"(module (func (export "add") (param i32 i32) (result i32) (i32.add (local.get 0) (local.get 1))))"#,
        )
        .unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].head, "module");
    }

    #[test]
    fn invoke_name_folds_into_head() {
        let node = parse_form(r#"(invoke "add" (i32.const 1))"#).unwrap();
        assert_eq!(node.head, r#"invoke "add""#);
        assert_eq!(node.children.len(), 1);
    }

    #[test]
    fn call_index_folds_into_head() {
        let node = parse_form("(call $add (i32.const 1) (i32.const 2))").unwrap();
        assert_eq!(node.head, "call $add");
        assert_eq!(node.children.len(), 2);
    }

    #[test]
    fn named_block_keeps_dollar_name_separate() {
        let node = parse_form("(block $done (result i32) (br $done))").unwrap();
        assert_eq!(node.head, "block");
        assert_eq!(node.name.as_deref(), Some("$done"));
    }

    #[test]
    fn table_funcref_folds_to_single_head() {
        let node = parse_form("(table funcref (elem $f1 $f2))").unwrap();
        assert_eq!(node.head, "tablefuncref");
    }

    #[test]
    fn quote_wrapped_form_is_unexpected_token() {
        let err = parse_script(r#"(module quote "(func)")"#).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnexpectedToken);
    }

    #[test]
    fn mismatched_parens_are_invalid_syntax() {
        let err = parse_script("(module (func)").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidSyntax);
    }
}
