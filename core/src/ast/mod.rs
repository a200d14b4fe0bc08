//! Annotated syntax tree consumed by the code generator.
//!
//! Every node is allocated in a `bumpalo` arena and borrows its children from
//! it. The tree arrives fully resolved: types are known, identifier references
//! point at their declarations, and methods, string constants and fields carry
//! the ids and offsets assigned by earlier passes. The one annotation that is
//! still missing, the frame offset of each local variable, is produced by the
//! generator into a separate [`FrameOffsets`](crate::compiler::FrameOffsets)
//! map instead of being written back here.

mod builder;
mod span;

pub use builder::AstBuilder;
pub use span::Span;

use core::fmt;

/// Identity of a variable declaration (local, formal or field).
///
/// Ids are assigned upstream and only need to be unique within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resolved static type of an expression or declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type<'a> {
    Void,
    Int,
    Boolean,
    /// Type of the `null` literal.
    Null,
    /// Instance of a user or root class (`Object`, `String`, ...).
    Class(&'a str),
    Array(&'a Type<'a>),
}

/// How a type is laid out on the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// No value at all.
    Void,
    /// A payload word plus a tag word.
    Integer,
    /// A single word holding an address (or a small scalar).
    Reference,
}

impl<'a> Type<'a> {
    /// Classifies the type for stack layout.
    ///
    /// Everything that is neither `void` nor `int` occupies one word.
    pub fn slot_kind(&self) -> SlotKind {
        match self {
            Type::Void => SlotKind::Void,
            Type::Int => SlotKind::Integer,
            Type::Boolean | Type::Null | Type::Class(_) | Type::Array(_) => SlotKind::Reference,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int)
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Boolean => write!(f, "boolean"),
            Type::Null => write!(f, "null"),
            Type::Class(name) => write!(f, "{}", name),
            Type::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
        }
    }
}

/// Declaration an identifier reference was linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarLink {
    /// A local variable. Its frame offset is assigned during code generation.
    Local(DeclId),
    /// A formal parameter, with the frame offset computed upstream.
    Formal { id: DeclId, offset: i32 },
    /// An instance variable, at a byte offset into the receiver object.
    InstVar { id: DeclId, offset: i32 },
}

/// Target of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodLink<'a> {
    /// A routine of the runtime library, called by its bare symbol.
    Runtime { name: &'a str },
    /// A user-defined method.
    User { unique_id: u32, name: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr<'a> {
    pub span: Span,
    pub ty: Type<'a>,
    pub kind: ExprKind<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind<'a> {
    IntegerLiteral(i32),
    /// A string constant interned by the runtime under `label`.
    StringLiteral { value: &'a str, label: &'a str },
    Identifier { name: &'a str, link: VarLink },
    Binary {
        op: ArithOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    This,
    Super,
    NewObject { class: &'a str },
    Call {
        receiver: &'a Expr<'a>,
        method: MethodLink<'a>,
        args: &'a [Expr<'a>],
    },
}

impl<'a> Expr<'a> {
    /// Short description of the node kind, used in diagnostics and logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ExprKind::IntegerLiteral(_) => "integer literal",
            ExprKind::StringLiteral { .. } => "string literal",
            ExprKind::Identifier { .. } => "identifier",
            ExprKind::Binary { .. } => "arithmetic expression",
            ExprKind::This => "`this`",
            ExprKind::Super => "`super`",
            ExprKind::NewObject { .. } => "object construction",
            ExprKind::Call { .. } => "method call",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDecl<'a> {
    pub span: Span,
    pub id: DeclId,
    pub name: &'a str,
    pub ty: Type<'a>,
    pub init: &'a Expr<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt<'a> {
    pub span: Span,
    pub kind: StmtKind<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind<'a> {
    LocalVar(&'a LocalVarDecl<'a>),
    /// A method call evaluated for its effect only.
    Call(&'a Expr<'a>),
    Block(&'a [Stmt<'a>]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormalDecl<'a> {
    pub span: Span,
    pub id: DeclId,
    pub name: &'a str,
    pub ty: Type<'a>,
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstVarDecl<'a> {
    pub span: Span,
    pub id: DeclId,
    pub name: &'a str,
    pub ty: Type<'a>,
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl<'a> {
    pub span: Span,
    pub unique_id: u32,
    pub name: &'a str,
    pub return_ty: Type<'a>,
    pub formals: &'a [FormalDecl<'a>],
    /// Position of the receiver relative to the stack top on entry, before
    /// the prologue has pushed anything.
    pub this_ptr_offset: i32,
    pub body: &'a [Stmt<'a>],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl<'a> {
    pub span: Span,
    pub name: &'a str,
    pub superclass: Option<&'a str>,
    pub fields: &'a [InstVarDecl<'a>],
    pub methods: &'a [MethodDecl<'a>],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program<'a> {
    pub span: Span,
    pub main: &'a Stmt<'a>,
    pub classes: &'a [ClassDecl<'a>],
}
