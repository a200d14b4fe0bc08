//! Stack-machine code generator implementation.

use tracing::{debug, trace};

use super::{CodegenError, FrameOffsets};
use crate::{
    asm::{Directive, Instruction, InstructionSink, Line, Operand},
    ast::{
        ArithOp, ClassDecl, DeclId, Expr, ExprKind, MethodDecl, MethodLink, Program, Span, Stmt,
        StmtKind, Type, VarLink,
    },
    target::{Register, TargetConfig},
};

/// Code generator that lowers an annotated tree into assembly.
///
/// The generator keeps a static model of the runtime stack: `stack_height`
/// is the number of bytes pushed since the enclosing method body started
/// (the saved receiver word included). Every push or pop it emits updates
/// the counter by the same amount, which is what makes stack-relative
/// addressing of locals and parameters possible.
pub struct CodeGenerator<'cfg, S: InstructionSink> {
    config: &'cfg TargetConfig,

    /// Where assembly lines go.
    sink: S,

    /// Current stack height in bytes.
    stack_height: i32,

    /// Frame offsets of locals, filled in as declarations are generated.
    offsets: FrameOffsets,

    /// Locals whose slots are on the stack right now, innermost last.
    live_locals: Vec<DeclId>,
}

impl<'cfg, S: InstructionSink> CodeGenerator<'cfg, S> {
    pub fn new(config: &'cfg TargetConfig, sink: S) -> Self {
        Self {
            config,
            sink,
            stack_height: 0,
            offsets: FrameOffsets::new(),
            live_locals: Vec::new(),
        }
    }

    /// Convenience method to generate a whole program in one call.
    ///
    /// Returns the flushed sink and the offsets assigned to every local.
    pub fn compile(
        config: &'cfg TargetConfig,
        sink: S,
        program: &Program<'_>,
    ) -> Result<(S, FrameOffsets), CodegenError> {
        let mut generator = Self::new(config, sink);
        generator.program(program)?;
        Ok(generator.finish())
    }

    pub fn stack_height(&self) -> i32 {
        self.stack_height
    }

    pub fn offsets(&self) -> &FrameOffsets {
        &self.offsets
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn finish(self) -> (S, FrameOffsets) {
        (self.sink, self.offsets)
    }

    #[cfg(test)]
    pub(crate) fn set_stack_height(&mut self, height: i32) {
        self.stack_height = height;
    }

    /// Record `id` as an in-scope local with the given offset.
    #[cfg(test)]
    pub(crate) fn declare_local(&mut self, id: DeclId, offset: i32) {
        if self.offsets.assign(id, offset).is_ok() {
            self.live_locals.push(id);
        }
    }

    // === Stack Management ===

    fn sp(&self) -> Register {
        self.config.stack_pointer
    }

    fn word(&self) -> i32 {
        self.config.word_size
    }

    fn push_stack(&mut self, bytes: i32) {
        self.stack_height += bytes;
        trace!(bytes, height = self.stack_height, "push");
    }

    fn pop_stack(&mut self, bytes: i32) {
        debug_assert!(
            self.stack_height >= bytes,
            "Stack underflow: trying to pop {} but height is {}",
            bytes,
            self.stack_height
        );
        self.stack_height -= bytes;
        trace!(bytes, height = self.stack_height, "pop");
    }

    /// Emit a push of `bytes` uninitialized bytes.
    fn grow(&mut self, span: &Span, bytes: i32) {
        let sp = self.sp();
        self.emit(
            span,
            Instruction::Subu {
                rd: sp,
                rs: sp,
                rt: Operand::Imm(bytes),
            },
        );
        self.push_stack(bytes);
    }

    /// Emit a pop of `bytes` bytes.
    fn shrink(&mut self, span: &Span, bytes: i32) {
        let sp = self.sp();
        self.emit(
            span,
            Instruction::Addu {
                rd: sp,
                rs: sp,
                rt: Operand::Imm(bytes),
            },
        );
        self.pop_stack(bytes);
    }

    // === Instruction Emission ===

    fn emit(&mut self, span: &Span, line: impl Into<Line>) {
        self.sink.emit(span, line.into());
    }

    fn label(&mut self, span: &Span, label: String) {
        self.emit(span, Line::Label(label));
    }

    fn comment(&mut self, span: &Span, text: &str) {
        self.emit(span, Line::Comment(text.to_string()));
    }

    fn load(&mut self, span: &Span, rt: Register, offset: i32, base: Register) {
        self.emit(span, Instruction::Lw { rt, offset, base });
    }

    fn store(&mut self, span: &Span, rt: Register, offset: i32, base: Register) {
        self.emit(span, Instruction::Sw { rt, offset, base });
    }

    /// Push the word in the first scratch register as a value of type `ty`.
    ///
    /// Integers get the tag word stored above the payload.
    fn push_scratch(&mut self, span: &Span, ty: &Type<'_>) {
        let sp = self.sp();
        let value = self.config.scratch[0];
        if ty.is_int() {
            self.grow(span, self.config.int_slot_width);
            self.store(span, self.config.int_tag, self.word(), sp);
        } else {
            self.grow(span, self.word());
        }
        self.store(span, value, 0, sp);
    }

    /// `base + offset`, or an error if an upstream offset is out of range.
    fn displacement(&self, span: &Span, base: i32, offset: i32) -> Result<i32, CodegenError> {
        base.checked_add(offset).ok_or_else(|| CodegenError::OffsetOverflow {
            base,
            offset,
            span: span.clone(),
        })
    }

    /// Offset of a local that is currently in scope.
    fn local_offset(&self, span: &Span, name: &str, id: DeclId) -> Result<i32, CodegenError> {
        let offset = self
            .offsets
            .get(id)
            .ok_or_else(|| CodegenError::UnassignedLocal {
                name: name.to_string(),
                id,
                span: span.clone(),
            })?;
        if !self.live_locals.contains(&id) {
            return Err(CodegenError::LocalOutOfScope {
                name: name.to_string(),
                id,
                span: span.clone(),
            });
        }
        Ok(offset)
    }

    fn require_value(&self, expr: &Expr<'_>, what: &'static str) -> Result<(), CodegenError> {
        if expr.ty.is_void() {
            return Err(CodegenError::VoidValue {
                what,
                span: expr.span.clone(),
            });
        }
        Ok(())
    }

    // === Program Structure ===

    /// Generate the whole program and flush the sink.
    pub fn program(&mut self, program: &Program<'_>) -> Result<(), CodegenError> {
        let span = &program.span;
        let entry = self.config.entry_label.clone();
        debug!(classes = program.classes.len(), "generating program");

        self.emit(span, Directive::Text);
        self.emit(span, Directive::Globl(entry.clone()));
        self.label(span, entry);
        self.comment(span, "initialize registers, etc.");
        self.emit(
            span,
            Instruction::Jal {
                label: self.config.runtime_init.clone(),
            },
        );

        self.stack_height = 0;
        self.live_locals.clear();
        self.stmt(program.main)?;

        self.comment(span, "exit program");
        self.emit(
            span,
            Instruction::Li {
                rd: self.config.syscall_selector,
                imm: self.config.exit_service,
            },
        );
        self.emit(span, Instruction::Syscall);

        for class in program.classes {
            self.class(class)?;
        }

        // Placeholders for the classes the runtime predeclares.
        let config = self.config;
        for root in &config.root_classes {
            self.label(span, config.class_label(root));
        }

        self.sink.flush()?;
        Ok(())
    }

    pub fn class(&mut self, class: &ClassDecl<'_>) -> Result<(), CodegenError> {
        debug!(class = class.name, methods = class.methods.len(), "generating class");
        for method in class.methods {
            self.method(method)?;
        }
        Ok(())
    }

    /// Generate a method: prologue, body, epilogue.
    ///
    /// Frame after the prologue (stack grows down):
    ///
    /// ```text
    ///   word_size + this_ptr_offset($sp)   receiver passed by the caller
    ///   word_size($sp)                     saved return address
    ///   0($sp)                             saved receiver of the caller
    /// ```
    pub fn method(&mut self, method: &MethodDecl<'_>) -> Result<(), CodegenError> {
        let span = &method.span;
        let sp = self.sp();
        let word = self.word();
        let this = self.config.this_pointer;
        let ra = self.config.return_address;
        let label = self.config.method_label(method.unique_id, method.name);
        debug!(method = %label, this_ptr_offset = method.this_ptr_offset, "generating method");

        // Prologue
        self.emit(span, Directive::Globl(label.clone()));
        self.label(span, label);
        self.emit(
            span,
            Instruction::Subu {
                rd: sp,
                rs: sp,
                rt: Operand::Imm(self.config.frame_header_size()),
            },
        );
        self.store(span, ra, word, sp);
        self.store(span, this, 0, sp);
        self.stack_height = word;
        self.live_locals.clear();

        // The receiver sits above the frame header, independent of what the
        // body pushes later.
        let receiver = self.displacement(span, word, method.this_ptr_offset)?;
        self.load(span, this, receiver, sp);

        for stmt in method.body {
            self.stmt(stmt)?;
        }

        // Epilogue: both saved words are now below everything the body pushed.
        let height = self.stack_height;
        self.load(span, ra, height, sp);
        self.load(span, this, height - word, sp);
        let amount = self.displacement(span, height, self.config.frame_header_size())?;
        self.emit(
            span,
            Instruction::Addu {
                rd: sp,
                rs: sp,
                rt: Operand::Imm(amount),
            },
        );
        self.emit(span, Instruction::Jr { rs: ra });
        trace!(height, amount, "method epilogue");
        Ok(())
    }

    // === Statements ===

    pub fn stmt(&mut self, stmt: &Stmt<'_>) -> Result<(), CodegenError> {
        match &stmt.kind {
            StmtKind::LocalVar(decl) => {
                self.require_value(decl.init, "initializer")?;
                self.expr(decl.init)?;

                // The slot is whatever is on top of the stack now.
                let offset = -self.stack_height;
                self.offsets
                    .assign(decl.id, offset)
                    .map_err(|previous| CodegenError::OffsetReassigned {
                        name: decl.name.to_string(),
                        id: decl.id,
                        previous,
                        span: decl.span.clone(),
                    })?;
                self.live_locals.push(decl.id);
                debug!(local = decl.name, id = %decl.id, offset, "assigned frame offset");
            }

            StmtKind::Call(call) => {
                self.expr(call)?;
                // Discard the result, if any.
                let width = self.config.slot_width(&call.ty);
                if width > 0 {
                    self.shrink(&stmt.span, width);
                }
            }

            StmtKind::Block(stmts) => {
                let saved_height = self.stack_height;
                let saved_live = self.live_locals.len();
                for inner in stmts.iter() {
                    self.stmt(inner)?;
                }
                self.live_locals.truncate(saved_live);
                // Pop the locals declared in this block.
                let leftover = self.stack_height - saved_height;
                debug_assert!(leftover >= 0, "block popped more than it pushed");
                if leftover > 0 {
                    self.shrink(&stmt.span, leftover);
                }
            }
        }
        Ok(())
    }

    // === Expressions ===

    /// Generate code that pushes the value of `expr`.
    pub fn expr(&mut self, expr: &Expr<'_>) -> Result<(), CodegenError> {
        let span = &expr.span;
        let sp = self.sp();
        let word = self.word();
        let [t0, t1] = self.config.scratch;

        match &expr.kind {
            // === Literals ===
            ExprKind::IntegerLiteral(value) => {
                self.grow(span, self.config.int_slot_width);
                self.store(span, self.config.int_tag, word, sp);
                self.emit(span, Instruction::Li { rd: t0, imm: *value });
                self.store(span, t0, 0, sp);
            }

            ExprKind::StringLiteral { label, .. } => {
                self.grow(span, word);
                self.emit(
                    span,
                    Instruction::La {
                        rd: t0,
                        label: label.to_string(),
                    },
                );
                self.store(span, t0, 0, sp);
            }

            // === Arithmetic ===
            ExprKind::Binary { op, left, right } => {
                for operand in [left, right] {
                    if !operand.ty.is_int() {
                        return Err(CodegenError::NonIntegerOperand {
                            op: *op,
                            found: operand.ty.to_string(),
                            span: operand.span.clone(),
                        });
                    }
                }

                self.expr(left)?;
                self.expr(right)?;

                // Right payload on top, left payload one integer slot below.
                self.load(span, t0, 0, sp);
                self.load(span, t1, self.config.int_slot_width, sp);
                let instr = match op {
                    ArithOp::Add => Instruction::Addu {
                        rd: t0,
                        rs: t0,
                        rt: Operand::Reg(t1),
                    },
                    ArithOp::Sub => Instruction::Subu {
                        rd: t0,
                        rs: t1,
                        rt: Operand::Reg(t0),
                    },
                };
                self.emit(span, instr);

                // The result reuses the left operand's slot and tag word.
                self.shrink(span, self.config.int_slot_width);
                self.store(span, t0, 0, sp);
            }

            // === Receivers ===
            ExprKind::This | ExprKind::Super => {
                self.grow(span, word);
                self.store(span, self.config.this_pointer, 0, sp);
            }

            ExprKind::NewObject { .. } => {
                // Allocation belongs to the runtime; push a null placeholder.
                self.grow(span, word);
                self.store(span, self.config.zero, 0, sp);
            }

            // === Variables ===
            ExprKind::Identifier { name, link } => {
                self.require_value(expr, "variable")?;
                match *link {
                    VarLink::InstVar { offset, .. } => {
                        self.load(span, t0, offset, self.config.this_pointer);
                    }
                    VarLink::Formal { offset, .. } => {
                        let at = self.displacement(span, self.stack_height, offset)?;
                        self.load(span, t0, at, sp);
                    }
                    VarLink::Local(id) => {
                        let offset = self.local_offset(span, name, id)?;
                        let at = self.displacement(span, self.stack_height, offset)?;
                        self.load(span, t0, at, sp);
                    }
                }
                self.push_scratch(span, &expr.ty);
            }

            // === Calls ===
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let saved_height = self.stack_height;

                self.require_value(receiver, "receiver")?;
                self.expr(receiver)?;
                for arg in args.iter() {
                    self.require_value(arg, "argument")?;
                    self.expr(arg)?;
                }

                let target = match *method {
                    MethodLink::Runtime { name } => name.to_string(),
                    MethodLink::User { unique_id, name } => {
                        self.config.method_label(unique_id, name)
                    }
                };
                self.emit(span, Instruction::Jal { label: target });

                // The callee pops the receiver and arguments and leaves its
                // result, if any, in their place.
                self.stack_height = saved_height + self.config.slot_width(&expr.ty);
                trace!(height = self.stack_height, "after call");
            }
        }
        Ok(())
    }
}
