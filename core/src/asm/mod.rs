//! Assembly lines produced by the code generator.
//!
//! Instructions are kept typed until they reach a sink so that tests can
//! inspect them (e.g. add up every stack-pointer adjustment) without parsing
//! text. `Display` renders the assembler syntax the runtime library expects.

mod sink;

pub use sink::{AsmBuffer, CodeStream, Emitted, InstructionSink};

use core::fmt;

use crate::target::Register;

/// Third operand of an arithmetic instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Register),
    Imm(i32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::Imm(i) => write!(f, "{}", i),
        }
    }
}

/// The instruction repertoire the generator uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Load immediate.
    Li { rd: Register, imm: i32 },
    /// Load the address of a label.
    La { rd: Register, label: String },
    /// Load word from `offset(base)`.
    Lw {
        rt: Register,
        offset: i32,
        base: Register,
    },
    /// Store word to `offset(base)`.
    Sw {
        rt: Register,
        offset: i32,
        base: Register,
    },
    Addu {
        rd: Register,
        rs: Register,
        rt: Operand,
    },
    Subu {
        rd: Register,
        rs: Register,
        rt: Operand,
    },
    /// Call: jump and link.
    Jal { label: String },
    /// Jump to the address in a register.
    Jr { rs: Register },
    Syscall,
}

impl Instruction {
    /// Bytes this instruction pushes onto the stack (negative when it pops).
    ///
    /// Only immediate adjustments of `sp` by itself count; everything else
    /// leaves the stack pointer alone.
    pub fn stack_growth(&self, sp: Register) -> i32 {
        match *self {
            Instruction::Subu {
                rd,
                rs,
                rt: Operand::Imm(n),
            } if rd == sp && rs == sp => n,
            Instruction::Addu {
                rd,
                rs,
                rt: Operand::Imm(n),
            } if rd == sp && rs == sp => -n,
            _ => 0,
        }
    }
}

fn fmt_address(f: &mut fmt::Formatter<'_>, offset: i32, base: Register) -> fmt::Result {
    if offset == 0 {
        write!(f, "({})", base)
    } else {
        write!(f, "{}({})", offset, base)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Li { rd, imm } => write!(f, "li {},{}", rd, imm),
            Instruction::La { rd, label } => write!(f, "la {},{}", rd, label),
            Instruction::Lw { rt, offset, base } => {
                write!(f, "lw {},", rt)?;
                fmt_address(f, *offset, *base)
            }
            Instruction::Sw { rt, offset, base } => {
                write!(f, "sw {},", rt)?;
                fmt_address(f, *offset, *base)
            }
            Instruction::Addu { rd, rs, rt } => write!(f, "addu {},{},{}", rd, rs, rt),
            Instruction::Subu { rd, rs, rt } => write!(f, "subu {},{},{}", rd, rs, rt),
            Instruction::Jal { label } => write!(f, "jal {}", label),
            Instruction::Jr { rs } => write!(f, "jr {}", rs),
            Instruction::Syscall => write!(f, "syscall"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Start of the code section.
    Text,
    /// Make a label visible to the linker.
    Globl(String),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Text => write!(f, ".text"),
            Directive::Globl(label) => write!(f, ".globl {}", label),
        }
    }
}

/// One line of the assembly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Directive(Directive),
    Label(String),
    Comment(String),
    Instr(Instruction),
}

impl Line {
    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Line::Instr(instr) => Some(instr),
            _ => None,
        }
    }
}

impl From<Instruction> for Line {
    fn from(instr: Instruction) -> Self {
        Line::Instr(instr)
    }
}

impl From<Directive> for Line {
    fn from(directive: Directive) -> Self {
        Line::Directive(directive)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Directive(d) => write!(f, "{}", d),
            Line::Label(label) => write!(f, "{}:", label),
            Line::Comment(text) => write!(f, "# {}", text),
            Line::Instr(instr) => write!(f, "{}", instr),
        }
    }
}
