//! Abstract Syntax Tree types for the module language

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root AST node - one module file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// `package` clause, if any
    pub package: Option<Spanned<Identifier>>,
    /// Top-level declarations, forming the file's implicit struct
    pub decls: Vec<Spanned<Decl>>,
}

impl File {
    /// Package name, empty for package-less files
    pub fn package_name(&self) -> &str {
        self.package.as_ref().map(|p| p.node.as_str()).unwrap_or("")
    }
}

/// Declaration inside a struct body
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `label: value` or `label?: value`
    Field(Field),
    /// An expression unified into the enclosing struct: `{ #Base, x: 1 }`
    Embed(Spanned<Expr>),
    /// `...` keeps a definition open to extra fields
    Ellipsis,
    /// `if cond { decls }`
    If {
        condition: Spanned<Expr>,
        body: Vec<Spanned<Decl>>,
    },
}

/// A struct field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: Spanned<String>,
    pub optional: bool,
    pub value: Spanned<Expr>,
}

/// How a label participates in output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Exported field
    Regular,
    /// `#Name`: schema, never exported, closes structs that reference it
    Definition,
    /// `_name`: internal helper, never exported
    Hidden,
}

impl LabelKind {
    pub fn of(label: &str) -> Self {
        if label.starts_with('#') {
            LabelKind::Definition
        } else if label.starts_with('_') && label.len() > 1 {
            LabelKind::Hidden
        } else {
            LabelKind::Regular
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `_`
    Top,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// String with `\(expr)` segments
    Interpolation(Vec<Segment>),
    /// Bare reference, resolved lexically
    Ident(Identifier),
    /// `base.field`
    Selector(Box<Spanned<Expr>>, Spanned<String>),
    /// `base[index]`
    Index(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    /// `len(x)`
    Call(Spanned<Identifier>, Vec<Spanned<Expr>>),
    Unary(UnaryOp, Box<Spanned<Expr>>),
    Binary(BinaryOp, Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    /// `*expr` - default arm of a disjunction
    Default(Box<Spanned<Expr>>),
    Struct(Vec<Spanned<Decl>>),
    List(ListLit),
}

/// Part of an interpolated string
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Spanned<Expr>),
}

/// List literal: `[a, b]`, `[...T]`, `[a, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct ListLit {
    pub elements: Vec<Spanned<Expr>>,
    /// `Some(None)` for a bare `...`, `Some(Some(T))` for `...T`
    pub tail: Option<Option<Box<Spanned<Expr>>>>,
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    /// Bound constraints: `>=0`, `<10`, `!=""`
    Bound(BoundOp),
}

/// Comparison used by a bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundOp {
    GreaterOrEqual,
    Greater,
    LessOrEqual,
    Less,
    NotEqual,
}

impl BoundOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BoundOp::GreaterOrEqual => ">=",
            BoundOp::Greater => ">",
            BoundOp::LessOrEqual => "<=",
            BoundOp::Less => "<",
            BoundOp::NotEqual => "!=",
        }
    }
}

/// Infix operators, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    LogicalOr,
    LogicalAnd,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_kinds() {
        assert_eq!(LabelKind::of("name"), LabelKind::Regular);
        assert_eq!(LabelKind::of("#Deployment"), LabelKind::Definition);
        assert_eq!(LabelKind::of("_helper"), LabelKind::Hidden);
        assert_eq!(LabelKind::of("_"), LabelKind::Regular);
    }

    #[test]
    fn test_package_name_defaults_to_empty() {
        let file = File {
            package: None,
            decls: vec![],
        };
        assert_eq!(file.package_name(), "");
    }
}
