use bumpalo::Bump;
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use tracing::debug;

use crate::ast::{
    ArithOp, ClassDecl, DeclId, Expr, ExprKind, FormalDecl, InstVarDecl, LocalVarDecl,
    MethodDecl, MethodLink, Program, Span, Stmt, StmtKind, Type, VarLink,
};

use super::error::ReadError;

#[derive(Parser)]
#[grammar = "reader/tree.pest"]
pub struct TreeParser;

/// Superclass of every class declared without `extends`.
const IMPLICIT_SUPERCLASS: &str = "Object";

/// Read a tree dump into an annotated program allocated in `arena`.
///
/// Identifier references are resolved against the declarations of the whole
/// dump, so a reference may appear before the declaration it names.
pub fn read_program<'a>(arena: &'a Bump, source: &str) -> Result<&'a Program<'a>, ReadError> {
    let mut pairs = TreeParser::parse(Rule::program, source).map_err(ReadError::from_pest)?;
    let program = pairs
        .next()
        .ok_or_else(|| ReadError::malformed(Rule::program, &Span::new(0, source.len())))?;

    let mut reader = TreeReader::new(arena);
    reader.collect_declarations(program.clone())?;
    let tree = reader.program(program)?;

    debug!(
        classes = tree.classes.len(),
        declarations = reader.declarations.len(),
        "read program tree"
    );
    Ok(tree)
}

#[derive(Debug, Clone, Copy)]
enum DeclKind {
    Local,
    Formal { offset: i32 },
    Field { offset: i32 },
}

#[derive(Debug, Clone)]
struct Declaration<'a> {
    name: &'a str,
    ty: Type<'a>,
    kind: DeclKind,
    span: Span,
}

/// Class whose methods are being read; gives `this` and `super` their types.
#[derive(Debug, Clone, Copy)]
struct Receiver<'a> {
    class: &'a str,
    superclass: &'a str,
}

struct TreeReader<'a> {
    arena: &'a Bump,
    declarations: HashMap<DeclId, Declaration<'a>>,
    receiver: Option<Receiver<'a>>,
}

fn next<'i>(
    pairs: &mut Pairs<'i, Rule>,
    parent: Rule,
    span: &Span,
) -> Result<Pair<'i, Rule>, ReadError> {
    pairs.next().ok_or_else(|| ReadError::malformed(parent, span))
}

fn parse_number<T: core::str::FromStr>(pair: &Pair<'_, Rule>) -> Result<T, ReadError> {
    pair.as_str().parse().map_err(|_| ReadError::InvalidNumber {
        text: pair.as_str().to_string(),
        span: pair.as_span().into(),
    })
}

impl<'a> TreeReader<'a> {
    fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            declarations: HashMap::new(),
            receiver: None,
        }
    }

    /// Register every field, parameter and local of the dump by id.
    fn collect_declarations(&mut self, program: Pair<'_, Rule>) -> Result<(), ReadError> {
        for pair in program.into_inner().flatten() {
            let rule = pair.as_rule();
            if !matches!(rule, Rule::field_decl | Rule::formal | Rule::local_decl) {
                continue;
            }
            let span: Span = pair.as_span().into();
            let mut inner = pair.into_inner();
            let (name, id) = self.name_and_id(next(&mut inner, rule, &span)?)?;
            let ty = self.ty(next(&mut inner, rule, &span)?)?;
            let kind = match rule {
                Rule::local_decl => DeclKind::Local,
                Rule::formal => DeclKind::Formal {
                    offset: parse_number(&next(&mut inner, rule, &span)?)?,
                },
                _ => DeclKind::Field {
                    offset: parse_number(&next(&mut inner, rule, &span)?)?,
                },
            };
            let id = DeclId(id);
            match self.declarations.entry(id) {
                Entry::Occupied(first) => {
                    return Err(ReadError::DuplicateDeclaration {
                        id,
                        span,
                        first: first.get().span.clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(Declaration {
                        name,
                        ty,
                        kind,
                        span,
                    });
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn program(&mut self, pair: Pair<'_, Rule>) -> Result<&'a Program<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut main = None;
        let mut classes = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::main_clause => {
                    let clause_span: Span = child.as_span().into();
                    let stmt = next(&mut child.into_inner(), Rule::main_clause, &clause_span)?;
                    main = Some(self.stmt(stmt)?);
                }
                Rule::class_decl => classes.push(self.class(child)?),
                Rule::EOI => {}
                other => return Err(ReadError::malformed(other, &span)),
            }
        }
        let main = main.ok_or_else(|| ReadError::malformed(Rule::program, &span))?;
        Ok(self.arena.alloc(Program {
            span,
            main: self.arena.alloc(main),
            classes: self.arena.alloc_slice_fill_iter(classes),
        }))
    }

    fn class(&mut self, pair: Pair<'_, Rule>) -> Result<ClassDecl<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let name = self.ident(&next(&mut inner, Rule::class_decl, &span)?);
        let mut superclass = None;
        let mut fields = Vec::new();
        let mut methods = Vec::new();

        for member in inner {
            match member.as_rule() {
                Rule::extends_clause => {
                    let clause_span: Span = member.as_span().into();
                    let parent =
                        next(&mut member.into_inner(), Rule::extends_clause, &clause_span)?;
                    superclass = Some(self.ident(&parent));
                }
                Rule::field_decl => fields.push(self.field(member)?),
                Rule::method_decl => {
                    self.receiver = Some(Receiver {
                        class: name,
                        superclass: superclass.unwrap_or(IMPLICIT_SUPERCLASS),
                    });
                    let method = self.method(member);
                    self.receiver = None;
                    methods.push(method?);
                }
                other => return Err(ReadError::malformed(other, &span)),
            }
        }

        Ok(ClassDecl {
            span,
            name,
            superclass,
            fields: self.arena.alloc_slice_fill_iter(fields),
            methods: self.arena.alloc_slice_fill_iter(methods),
        })
    }

    fn field(&mut self, pair: Pair<'_, Rule>) -> Result<InstVarDecl<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let (name, id) = self.name_and_id(next(&mut inner, Rule::field_decl, &span)?)?;
        let ty = self.ty(next(&mut inner, Rule::field_decl, &span)?)?;
        let offset = parse_number(&next(&mut inner, Rule::field_decl, &span)?)?;
        Ok(InstVarDecl {
            span,
            id: DeclId(id),
            name,
            ty,
            offset,
        })
    }

    fn formal(&mut self, pair: Pair<'_, Rule>) -> Result<FormalDecl<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let (name, id) = self.name_and_id(next(&mut inner, Rule::formal, &span)?)?;
        let ty = self.ty(next(&mut inner, Rule::formal, &span)?)?;
        let offset = parse_number(&next(&mut inner, Rule::formal, &span)?)?;
        Ok(FormalDecl {
            span,
            id: DeclId(id),
            name,
            ty,
            offset,
        })
    }

    fn method(&mut self, pair: Pair<'_, Rule>) -> Result<MethodDecl<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let (name, unique_id) = self.name_and_id(next(&mut inner, Rule::method_decl, &span)?)?;

        let mut formals = Vec::new();
        let mut return_ty = None;
        let mut this_ptr_offset = None;
        let mut body = None;
        for part in inner {
            match part.as_rule() {
                Rule::formal => formals.push(self.formal(part)?),
                Rule::ty => return_ty = Some(self.ty(part)?),
                Rule::offset => this_ptr_offset = Some(parse_number(&part)?),
                Rule::block => body = Some(self.block(part)?),
                other => return Err(ReadError::malformed(other, &span)),
            }
        }
        let (Some(return_ty), Some(this_ptr_offset), Some(body)) =
            (return_ty, this_ptr_offset, body)
        else {
            return Err(ReadError::malformed(Rule::method_decl, &span));
        };

        Ok(MethodDecl {
            span,
            unique_id,
            name,
            return_ty,
            formals: self.arena.alloc_slice_fill_iter(formals),
            this_ptr_offset,
            body,
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, pair: Pair<'_, Rule>) -> Result<&'a [Stmt<'a>], ReadError> {
        let stmts = pair
            .into_inner()
            .map(|stmt| self.stmt(stmt))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.arena.alloc_slice_fill_iter(stmts))
    }

    fn stmt(&mut self, pair: Pair<'_, Rule>) -> Result<Stmt<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        match pair.as_rule() {
            Rule::block => Ok(Stmt {
                span,
                kind: StmtKind::Block(self.block(pair)?),
            }),
            Rule::local_decl => {
                let mut inner = pair.into_inner();
                let (name, id) = self.name_and_id(next(&mut inner, Rule::local_decl, &span)?)?;
                let ty = self.ty(next(&mut inner, Rule::local_decl, &span)?)?;
                let init = self.expr(next(&mut inner, Rule::local_decl, &span)?)?;
                let decl = self.arena.alloc(LocalVarDecl {
                    span: span.clone(),
                    id: DeclId(id),
                    name,
                    ty,
                    init: self.arena.alloc(init),
                });
                Ok(Stmt {
                    span,
                    kind: StmtKind::LocalVar(decl),
                })
            }
            Rule::call_stmt => {
                let call = self.expr(next(&mut pair.into_inner(), Rule::call_stmt, &span)?)?;
                if !matches!(call.kind, ExprKind::Call { .. }) {
                    return Err(ReadError::ExpressionStatement { span: call.span });
                }
                Ok(Stmt {
                    span,
                    kind: StmtKind::Call(self.arena.alloc(call)),
                })
            }
            other => Err(ReadError::malformed(other, &span)),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, pair: Pair<'_, Rule>) -> Result<Expr<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let mut left = self.operand(next(&mut inner, Rule::expr, &span)?)?;

        // Operators are left-associative: `a - b - c` is `(a - b) - c`.
        while let Some(op) = inner.next() {
            let op = match op.as_rule() {
                Rule::add => ArithOp::Add,
                Rule::sub => ArithOp::Sub,
                other => return Err(ReadError::malformed(other, &span)),
            };
            let right = self.operand(next(&mut inner, Rule::expr, &span)?)?;
            left = Expr {
                span: Span::combine(&left.span, &right.span),
                ty: Type::Int,
                kind: ExprKind::Binary {
                    op,
                    left: self.arena.alloc(left),
                    right: self.arena.alloc(right),
                },
            };
        }
        Ok(left)
    }

    fn operand(&mut self, pair: Pair<'_, Rule>) -> Result<Expr<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let mut expr = self.primary(next(&mut inner, Rule::operand, &span)?)?;
        for suffix in inner {
            expr = self.call(expr, suffix)?;
        }
        Ok(expr)
    }

    fn call(&mut self, receiver: Expr<'a>, suffix: Pair<'_, Rule>) -> Result<Expr<'a>, ReadError> {
        let suffix_span: Span = suffix.as_span().into();
        let span = Span::combine(&receiver.span, &suffix_span);

        // `.method(args): type`, so the target comes first and the type last.
        let mut parts: Vec<Pair<'_, Rule>> = suffix.into_inner().collect();
        let (Some(ty), true) = (parts.pop(), !parts.is_empty()) else {
            return Err(ReadError::malformed(Rule::call_suffix, &suffix_span));
        };
        let target = parts.remove(0);
        let method = match target.as_rule() {
            Rule::runtime_ref => {
                let target_span: Span = target.as_span().into();
                let name = next(&mut target.into_inner(), Rule::runtime_ref, &target_span)?;
                MethodLink::Runtime {
                    name: self.ident(&name),
                }
            }
            Rule::decl_name => {
                let (name, unique_id) = self.name_and_id(target)?;
                MethodLink::User { unique_id, name }
            }
            other => return Err(ReadError::malformed(other, &suffix_span)),
        };
        let args = parts
            .into_iter()
            .map(|arg| self.expr(arg))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Expr {
            span,
            ty: self.ty(ty)?,
            kind: ExprKind::Call {
                receiver: self.arena.alloc(receiver),
                method,
                args: self.arena.alloc_slice_fill_iter(args),
            },
        })
    }

    fn primary(&mut self, pair: Pair<'_, Rule>) -> Result<Expr<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let (ty, kind) = match pair.as_rule() {
            Rule::int_lit => (Type::Int, ExprKind::IntegerLiteral(parse_number(&pair)?)),
            Rule::string_lit => {
                let mut inner = pair.into_inner();
                let text = next(&mut inner, Rule::string_lit, &span)?.as_str();
                let text = text
                    .strip_prefix('"')
                    .and_then(|t| t.strip_suffix('"'))
                    .unwrap_or(text);
                let label = self.ident(&next(&mut inner, Rule::string_lit, &span)?);
                (
                    Type::Class("String"),
                    ExprKind::StringLiteral {
                        value: self.arena.alloc_str(text),
                        label,
                    },
                )
            }
            Rule::this_kw => {
                let receiver = self.receiver("this", &span)?;
                (Type::Class(receiver.class), ExprKind::This)
            }
            Rule::super_kw => {
                let receiver = self.receiver("super", &span)?;
                (Type::Class(receiver.superclass), ExprKind::Super)
            }
            Rule::new_object => {
                let class = self.ident(&next(&mut pair.into_inner(), Rule::new_object, &span)?);
                (Type::Class(class), ExprKind::NewObject { class })
            }
            Rule::var_ref => return self.var_ref(pair),
            Rule::expr => return self.expr(pair),
            other => return Err(ReadError::malformed(other, &span)),
        };
        Ok(Expr { span, ty, kind })
    }

    fn var_ref(&mut self, pair: Pair<'_, Rule>) -> Result<Expr<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let (name, id) = self.name_and_id(pair)?;
        let id = DeclId(id);
        let Some(decl) = self.declarations.get(&id) else {
            return Err(ReadError::UnknownDeclaration {
                name: name.to_string(),
                id,
                span,
            });
        };
        if decl.name != name {
            return Err(ReadError::NameMismatch {
                name: name.to_string(),
                id,
                declared: decl.name.to_string(),
                span,
            });
        }
        let link = match decl.kind {
            DeclKind::Local => VarLink::Local(id),
            DeclKind::Formal { offset } => VarLink::Formal { id, offset },
            DeclKind::Field { offset } => VarLink::InstVar { id, offset },
        };
        Ok(Expr {
            span,
            ty: decl.ty,
            kind: ExprKind::Identifier {
                name: decl.name,
                link,
            },
        })
    }

    // ========================================================================
    // Lexical pieces
    // ========================================================================

    fn receiver(&self, keyword: &'static str, span: &Span) -> Result<Receiver<'a>, ReadError> {
        self.receiver.ok_or_else(|| ReadError::ReceiverOutsideMethod {
            keyword,
            span: span.clone(),
        })
    }

    fn ident(&self, pair: &Pair<'_, Rule>) -> &'a str {
        self.arena.alloc_str(pair.as_str())
    }

    /// Split `name#number` (a declaration name or a reference).
    fn name_and_id(&self, pair: Pair<'_, Rule>) -> Result<(&'a str, u32), ReadError> {
        let span: Span = pair.as_span().into();
        let rule = pair.as_rule();
        let mut inner = pair.into_inner();
        let name = self.ident(&next(&mut inner, rule, &span)?);
        let id = parse_number(&next(&mut inner, rule, &span)?)?;
        Ok((name, id))
    }

    fn ty(&self, pair: Pair<'_, Rule>) -> Result<Type<'a>, ReadError> {
        let span: Span = pair.as_span().into();
        let mut inner = pair.into_inner();
        let base = next(&mut inner, Rule::ty, &span)?;
        let mut ty = match base.as_rule() {
            Rule::int_ty => Type::Int,
            Rule::boolean_ty => Type::Boolean,
            Rule::void_ty => Type::Void,
            Rule::class_ty => Type::Class(self.ident(&base)),
            other => return Err(ReadError::malformed(other, &span)),
        };
        for _ in inner {
            ty = Type::Array(self.arena.alloc(ty));
        }
        Ok(ty)
    }
}
