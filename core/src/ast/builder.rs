use bumpalo::Bump;

use super::{
    ArithOp, ClassDecl, DeclId, Expr, ExprKind, FormalDecl, InstVarDecl, LocalVarDecl,
    MethodDecl, MethodLink, Program, Span, Stmt, StmtKind, Type, VarLink,
};

/// Convenience constructors for annotated trees allocated in an arena.
///
/// Nodes built this way carry an empty span. The builder is mostly used by
/// tests and by hosts that assemble trees programmatically; the tree reader
/// allocates nodes directly so it can attach real spans.
///
/// # Example
///
/// ```
/// use bumpalo::Bump;
/// use mjc_core::ast::{AstBuilder, Type};
///
/// let arena = Bump::new();
/// let b = AstBuilder::new(&arena);
/// let sum = b.add(b.int(1), b.int(2));
/// assert_eq!(sum.ty, Type::Int);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct AstBuilder<'a> {
    arena: &'a Bump,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self { arena }
    }

    pub fn str(&self, s: &str) -> &'a str {
        self.arena.alloc_str(s)
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub fn class_ty(&self, name: &str) -> Type<'a> {
        Type::Class(self.str(name))
    }

    pub fn array_ty(&self, elem: Type<'a>) -> Type<'a> {
        Type::Array(self.arena.alloc(elem))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn expr(&self, ty: Type<'a>, kind: ExprKind<'a>) -> &'a Expr<'a> {
        self.arena.alloc(Expr {
            span: Span::default(),
            ty,
            kind,
        })
    }

    pub fn int(&self, value: i32) -> &'a Expr<'a> {
        self.expr(Type::Int, ExprKind::IntegerLiteral(value))
    }

    pub fn string(&self, value: &str, label: &str) -> &'a Expr<'a> {
        let kind = ExprKind::StringLiteral {
            value: self.str(value),
            label: self.str(label),
        };
        self.expr(self.class_ty("String"), kind)
    }

    pub fn binary(&self, op: ArithOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Type::Int, ExprKind::Binary { op, left, right })
    }

    pub fn add(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(ArithOp::Add, left, right)
    }

    pub fn sub(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(ArithOp::Sub, left, right)
    }

    pub fn this(&self, class: &str) -> &'a Expr<'a> {
        self.expr(self.class_ty(class), ExprKind::This)
    }

    pub fn super_(&self, class: &str) -> &'a Expr<'a> {
        self.expr(self.class_ty(class), ExprKind::Super)
    }

    pub fn new_object(&self, class: &str) -> &'a Expr<'a> {
        let class = self.str(class);
        self.expr(Type::Class(class), ExprKind::NewObject { class })
    }

    pub fn var(&self, name: &str, link: VarLink, ty: Type<'a>) -> &'a Expr<'a> {
        let name = self.str(name);
        self.expr(ty, ExprKind::Identifier { name, link })
    }

    pub fn local_ref(&self, decl: &LocalVarDecl<'a>) -> &'a Expr<'a> {
        self.var(decl.name, VarLink::Local(decl.id), decl.ty)
    }

    pub fn formal_ref(&self, decl: &FormalDecl<'a>) -> &'a Expr<'a> {
        let link = VarLink::Formal {
            id: decl.id,
            offset: decl.offset,
        };
        self.var(decl.name, link, decl.ty)
    }

    pub fn field_ref(&self, decl: &InstVarDecl<'a>) -> &'a Expr<'a> {
        let link = VarLink::InstVar {
            id: decl.id,
            offset: decl.offset,
        };
        self.var(decl.name, link, decl.ty)
    }

    pub fn call(
        &self,
        receiver: &'a Expr<'a>,
        method: MethodLink<'a>,
        args: &[&'a Expr<'a>],
        ty: Type<'a>,
    ) -> &'a Expr<'a> {
        let args = self
            .arena
            .alloc_slice_fill_iter(args.iter().map(|arg| (*arg).clone()));
        self.expr(
            ty,
            ExprKind::Call {
                receiver,
                method,
                args,
            },
        )
    }

    pub fn call_user(
        &self,
        receiver: &'a Expr<'a>,
        unique_id: u32,
        name: &str,
        args: &[&'a Expr<'a>],
        ty: Type<'a>,
    ) -> &'a Expr<'a> {
        let method = MethodLink::User {
            unique_id,
            name: self.str(name),
        };
        self.call(receiver, method, args, ty)
    }

    pub fn call_runtime(
        &self,
        receiver: &'a Expr<'a>,
        name: &str,
        args: &[&'a Expr<'a>],
        ty: Type<'a>,
    ) -> &'a Expr<'a> {
        let method = MethodLink::Runtime {
            name: self.str(name),
        };
        self.call(receiver, method, args, ty)
    }

    // ========================================================================
    // Declarations and statements
    // ========================================================================

    pub fn local(
        &self,
        id: u32,
        name: &str,
        ty: Type<'a>,
        init: &'a Expr<'a>,
    ) -> &'a LocalVarDecl<'a> {
        self.arena.alloc(LocalVarDecl {
            span: Span::default(),
            id: DeclId(id),
            name: self.str(name),
            ty,
            init,
        })
    }

    pub fn formal(&self, id: u32, name: &str, ty: Type<'a>, offset: i32) -> FormalDecl<'a> {
        FormalDecl {
            span: Span::default(),
            id: DeclId(id),
            name: self.str(name),
            ty,
            offset,
        }
    }

    pub fn field(&self, id: u32, name: &str, ty: Type<'a>, offset: i32) -> InstVarDecl<'a> {
        InstVarDecl {
            span: Span::default(),
            id: DeclId(id),
            name: self.str(name),
            ty,
            offset,
        }
    }

    pub fn var_stmt(&self, decl: &'a LocalVarDecl<'a>) -> Stmt<'a> {
        Stmt {
            span: decl.span.clone(),
            kind: StmtKind::LocalVar(decl),
        }
    }

    pub fn call_stmt(&self, call: &'a Expr<'a>) -> Stmt<'a> {
        Stmt {
            span: call.span.clone(),
            kind: StmtKind::Call(call),
        }
    }

    pub fn block(&self, stmts: Vec<Stmt<'a>>) -> Stmt<'a> {
        Stmt {
            span: Span::default(),
            kind: StmtKind::Block(self.arena.alloc_slice_fill_iter(stmts)),
        }
    }

    pub fn method(
        &self,
        unique_id: u32,
        name: &str,
        return_ty: Type<'a>,
        formals: Vec<FormalDecl<'a>>,
        this_ptr_offset: i32,
        body: Vec<Stmt<'a>>,
    ) -> MethodDecl<'a> {
        MethodDecl {
            span: Span::default(),
            unique_id,
            name: self.str(name),
            return_ty,
            formals: self.arena.alloc_slice_fill_iter(formals),
            this_ptr_offset,
            body: self.arena.alloc_slice_fill_iter(body),
        }
    }

    pub fn class(
        &self,
        name: &str,
        superclass: Option<&str>,
        fields: Vec<InstVarDecl<'a>>,
        methods: Vec<MethodDecl<'a>>,
    ) -> ClassDecl<'a> {
        ClassDecl {
            span: Span::default(),
            name: self.str(name),
            superclass: superclass.map(|s| self.str(s)),
            fields: self.arena.alloc_slice_fill_iter(fields),
            methods: self.arena.alloc_slice_fill_iter(methods),
        }
    }

    pub fn program(&self, main: Stmt<'a>, classes: Vec<ClassDecl<'a>>) -> &'a Program<'a> {
        self.arena.alloc(Program {
            span: Span::default(),
            main: self.arena.alloc(main),
            classes: self.arena.alloc_slice_fill_iter(classes),
        })
    }
}
