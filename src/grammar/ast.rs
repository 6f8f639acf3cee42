//! Expression AST and canonical rendering
//!
//! Every variant owns its children exclusively, so a generated tree never
//! shares subtrees. Rendering is total: any tree the generator can build
//! renders to source text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// `nil`
    Nil,
    /// Float literal
    Float(f64),
    /// Integer literal
    Integer(i64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// Reference to an environment name
    Identifier(String),
    /// Member access: `node.property`, `node[property]`, `node?.property`
    Member {
        /// Object being accessed
        node: Box<ExprNode>,
        /// Property expression (usually a string literal)
        property: Box<ExprNode>,
        /// Optional chaining (`?.`)
        optional: bool,
    },
    /// Unary operation: `op node`
    Unary {
        /// Unary operator
        op: UnaryOp,
        /// Operand
        node: Box<ExprNode>,
    },
    /// Binary operation: `left op right`
    Binary {
        /// Binary operator
        op: BinaryOp,
        /// Left operand
        left: Box<ExprNode>,
        /// Right operand
        right: Box<ExprNode>,
    },
    /// Call of an environment function or method: `callee(args)`
    Call {
        /// Called expression
        callee: Box<ExprNode>,
        /// Argument expressions
        arguments: Vec<ExprNode>,
    },
    /// Built-in function invocation: `name(args)`
    Builtin {
        /// Built-in name
        name: String,
        /// Argument expressions
        arguments: Vec<ExprNode>,
    },
    /// Array literal
    Array(Vec<ExprNode>),
    /// Map literal, key/value pairs in source order
    Map(Vec<(ExprNode, ExprNode)>),
    /// Current element inside a predicate body: `#`
    Pointer,
    /// Slice: `node[from:to]`
    Slice {
        /// Sliced expression
        node: Box<ExprNode>,
        /// Lower bound
        from: Box<ExprNode>,
        /// Upper bound
        to: Box<ExprNode>,
    },
    /// Ternary conditional: `cond ? then : otherwise`
    Conditional {
        /// Condition
        cond: Box<ExprNode>,
        /// Value when the condition holds
        then: Box<ExprNode>,
        /// Value otherwise
        otherwise: Box<ExprNode>,
    },
}

/// Construct tag of an [`ExprNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum NodeKind {
    Nil,
    Float,
    Integer,
    Str,
    Bool,
    Identifier,
    Member,
    Unary,
    Binary,
    Call,
    Builtin,
    Array,
    Map,
    Pointer,
    Slice,
    Conditional,
}

impl NodeKind {
    /// Get all node kinds
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Nil,
            Self::Float,
            Self::Integer,
            Self::Str,
            Self::Bool,
            Self::Identifier,
            Self::Member,
            Self::Unary,
            Self::Binary,
            Self::Call,
            Self::Builtin,
            Self::Array,
            Self::Map,
            Self::Pointer,
            Self::Slice,
            Self::Conditional,
        ]
    }

    /// Whether nodes of this kind never have children
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Self::Nil
                | Self::Float
                | Self::Integer
                | Self::Str
                | Self::Bool
                | Self::Identifier
                | Self::Pointer
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nil => "nil",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Identifier => "identifier",
            Self::Member => "member",
            Self::Unary => "unary",
            Self::Binary => "binary",
            Self::Call => "call",
            Self::Builtin => "builtin",
            Self::Array => "array",
            Self::Map => "map",
            Self::Pointer => "pointer",
            Self::Slice => "slice",
            Self::Conditional => "conditional",
        };
        f.write_str(name)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Negation (`-x`)
    #[serde(rename = "-")]
    Neg,
    /// Logical not (`!x`)
    #[serde(rename = "!")]
    Bang,
    /// Logical not (`not x`)
    #[serde(rename = "not")]
    Not,
}

impl UnaryOp {
    /// Get all unary operators
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Neg, Self::Bang, Self::Not]
    }

    /// Operator token
    #[must_use]
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Bang => "!",
            Self::Not => "not",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum BinaryOp {
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "||")]
    OrOr,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "&&")]
    AndAnd,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtE,
    #[serde(rename = "<=")]
    LtE,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "matches")]
    Matches,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "..")]
    Range,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "**")]
    Pow,
    #[serde(rename = "^")]
    Caret,
}

impl BinaryOp {
    /// Get all binary operators
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Or,
            Self::OrOr,
            Self::And,
            Self::AndAnd,
            Self::Eq,
            Self::NotEq,
            Self::Lt,
            Self::Gt,
            Self::GtE,
            Self::LtE,
            Self::In,
            Self::Matches,
            Self::Contains,
            Self::StartsWith,
            Self::EndsWith,
            Self::Range,
            Self::Add,
            Self::Sub,
            Self::Mul,
            Self::Div,
            Self::Mod,
            Self::Pow,
            Self::Caret,
        ]
    }

    /// Operator token
    #[must_use]
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::OrOr => "||",
            Self::And => "and",
            Self::AndAnd => "&&",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::LtE => "<=",
            Self::In => "in",
            Self::Matches => "matches",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Range => "..",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Caret => "^",
        }
    }
}

impl ExprNode {
    /// Construct tag of this node
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Nil => NodeKind::Nil,
            Self::Float(_) => NodeKind::Float,
            Self::Integer(_) => NodeKind::Integer,
            Self::Str(_) => NodeKind::Str,
            Self::Bool(_) => NodeKind::Bool,
            Self::Identifier(_) => NodeKind::Identifier,
            Self::Member { .. } => NodeKind::Member,
            Self::Unary { .. } => NodeKind::Unary,
            Self::Binary { .. } => NodeKind::Binary,
            Self::Call { .. } => NodeKind::Call,
            Self::Builtin { .. } => NodeKind::Builtin,
            Self::Array(_) => NodeKind::Array,
            Self::Map(_) => NodeKind::Map,
            Self::Pointer => NodeKind::Pointer,
            Self::Slice { .. } => NodeKind::Slice,
            Self::Conditional { .. } => NodeKind::Conditional,
        }
    }

    /// Whether this node has no children
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.kind().is_leaf()
    }

    /// Direct children in source order
    #[must_use]
    pub fn children(&self) -> Vec<&ExprNode> {
        match self {
            Self::Nil
            | Self::Float(_)
            | Self::Integer(_)
            | Self::Str(_)
            | Self::Bool(_)
            | Self::Identifier(_)
            | Self::Pointer => Vec::new(),
            Self::Member { node, property, .. } => vec![node.as_ref(), property.as_ref()],
            Self::Unary { node, .. } => vec![node.as_ref()],
            Self::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::Call { callee, arguments } => {
                std::iter::once(callee.as_ref()).chain(arguments).collect()
            }
            Self::Builtin { arguments, .. } | Self::Array(arguments) => {
                arguments.iter().collect()
            }
            Self::Map(pairs) => pairs.iter().flat_map(|(k, v)| [k, v]).collect(),
            Self::Slice { node, from, to } => vec![node.as_ref(), from.as_ref(), to.as_ref()],
            Self::Conditional {
                cond,
                then,
                otherwise,
            } => vec![cond.as_ref(), then.as_ref(), otherwise.as_ref()],
        }
    }

    /// Calculate AST depth (a leaf has depth 1)
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.children().into_iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Total number of nodes in the tree
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Self::node_count)
            .sum::<usize>()
    }

    /// Render to expression source text
    #[must_use]
    pub fn to_code(&self) -> String {
        match self {
            Self::Nil => "nil".to_string(),
            Self::Float(v) => format!("{v:?}"),
            Self::Integer(n) => n.to_string(),
            Self::Str(s) => quote(s),
            Self::Bool(b) => b.to_string(),
            Self::Identifier(name) => name.clone(),
            Self::Member {
                node,
                property,
                optional,
            } => {
                let base = node.postfix_base();
                let dot = if *optional { "?." } else { "." };
                match property.as_ref() {
                    Self::Str(name) if is_identifier(name) => format!("{base}{dot}{name}"),
                    other => {
                        let open = if *optional { "?.[" } else { "[" };
                        format!("{base}{open}{}]", other.to_code())
                    }
                }
            }
            Self::Unary { op, node } => {
                let operand = node.operand();
                match op {
                    UnaryOp::Not => format!("not {operand}"),
                    UnaryOp::Neg | UnaryOp::Bang => format!("{}{operand}", op.to_str()),
                }
            }
            Self::Binary { op, left, right } => {
                format!("{} {} {}", left.operand(), op.to_str(), right.operand())
            }
            Self::Call { callee, arguments } => {
                format!("{}({})", callee.postfix_base(), join(arguments))
            }
            Self::Builtin { name, arguments } => format!("{name}({})", join(arguments)),
            Self::Array(items) => format!("[{}]", join(items)),
            Self::Map(pairs) => {
                let pairs_str = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.to_code(), v.to_code()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{pairs_str}}}")
            }
            Self::Pointer => "#".to_string(),
            Self::Slice { node, from, to } => format!(
                "{}[{}:{}]",
                node.postfix_base(),
                from.to_code(),
                to.to_code()
            ),
            Self::Conditional {
                cond,
                then,
                otherwise,
            } => format!(
                "{} ? {} : {}",
                cond.operand(),
                then.operand(),
                otherwise.operand()
            ),
        }
    }

    /// Operator-like nodes whose text needs grouping when nested
    fn is_compound(&self) -> bool {
        matches!(
            self,
            Self::Unary { .. } | Self::Binary { .. } | Self::Conditional { .. }
        )
    }

    fn operand(&self) -> String {
        if self.is_compound() {
            format!("({})", self.to_code())
        } else {
            self.to_code()
        }
    }

    fn postfix_base(&self) -> String {
        // `1.a` and `0.5[0:1]` would lex as malformed numbers
        if self.is_compound() || matches!(self, Self::Integer(_) | Self::Float(_)) {
            format!("({})", self.to_code())
        } else {
            self.to_code()
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_code())
    }
}

fn join(nodes: &[ExprNode]) -> String {
    nodes
        .iter()
        .map(ExprNode::to_code)
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `name` can be written after a `.` in member access
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
