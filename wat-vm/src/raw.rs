//! The untyped S-expression tree the parser produces.

/// One raw, untyped S-expression node: a head token, an optional `$name`
/// token that followed it, and an ordered list of children. No arithmetic or
/// type information lives here; instantiation turns this into a typed
/// operator tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub head: String,
    pub name: Option<String>,
    pub children: Vec<RawNode>,
}

impl RawNode {
    pub fn leaf(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            name: None,
            children: Vec::new(),
        }
    }

    /// True for a node with no children and no name: a bare token such as
    /// `i32`, `0x10`, or `"add"`.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.name.is_none()
    }

    /// Strip a leading/trailing `"` pair from a quoted-string token.
    pub fn unquote(token: &str) -> &str {
        token
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(token)
    }
}
