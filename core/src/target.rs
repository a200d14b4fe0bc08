//! Machine model and calling convention.
//!
//! The generator never hardcodes a register name or a slot width; it asks the
//! [`TargetConfig`] it was created with. [`TargetConfig::default`] describes
//! the MIPS-style convention the runtime library is written against:
//!
//! | role                 | default      |
//! |----------------------|--------------|
//! | stack pointer        | `$sp`        |
//! | receiver (`this`)    | `$s2`        |
//! | integer tag word     | `$s5`        |
//! | zero                 | `$zero`      |
//! | scratch              | `$t0`, `$t1` |
//! | return address       | `$ra`        |
//! | syscall selector     | `$v0`        |

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

use crate::ast::{SlotKind, Span, Type};
use crate::diagnostics::{Diagnostic, Severity};

/// General purpose registers of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Zero,
    At,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    T8,
    T9,
    Gp,
    Sp,
    Fp,
    Ra,
}

impl Register {
    const ALL: [Register; 30] = [
        Register::Zero,
        Register::At,
        Register::V0,
        Register::V1,
        Register::A0,
        Register::A1,
        Register::A2,
        Register::A3,
        Register::T0,
        Register::T1,
        Register::T2,
        Register::T3,
        Register::T4,
        Register::T5,
        Register::T6,
        Register::T7,
        Register::S0,
        Register::S1,
        Register::S2,
        Register::S3,
        Register::S4,
        Register::S5,
        Register::S6,
        Register::S7,
        Register::T8,
        Register::T9,
        Register::Gp,
        Register::Sp,
        Register::Fp,
        Register::Ra,
    ];

    /// Assembler name without the `$` sigil.
    pub fn name(self) -> &'static str {
        match self {
            Register::Zero => "zero",
            Register::At => "at",
            Register::V0 => "v0",
            Register::V1 => "v1",
            Register::A0 => "a0",
            Register::A1 => "a1",
            Register::A2 => "a2",
            Register::A3 => "a3",
            Register::T0 => "t0",
            Register::T1 => "t1",
            Register::T2 => "t2",
            Register::T3 => "t3",
            Register::T4 => "t4",
            Register::T5 => "t5",
            Register::T6 => "t6",
            Register::T7 => "t7",
            Register::S0 => "s0",
            Register::S1 => "s1",
            Register::S2 => "s2",
            Register::S3 => "s3",
            Register::S4 => "s4",
            Register::S5 => "s5",
            Register::S6 => "s6",
            Register::S7 => "s7",
            Register::T8 => "t8",
            Register::T9 => "t9",
            Register::Gp => "gp",
            Register::Sp => "sp",
            Register::Fp => "fp",
            Register::Ra => "ra",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

impl FromStr for Register {
    type Err = ConfigError;

    /// Accepts `s2` as well as `$s2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix('$').unwrap_or(s);
        Register::ALL
            .iter()
            .copied()
            .find(|r| r.name() == name)
            .ok_or_else(|| ConfigError::UnknownRegister {
                name: s.to_string(),
            })
    }
}

/// Errors in a [`TargetConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown register '{name}'")]
    UnknownRegister { name: String },

    #[error("word size must be positive, got {word_size}")]
    InvalidWordSize { word_size: i32 },

    #[error("integer slot width must be two words ({expected} bytes), got {found}")]
    InvalidIntSlot { expected: i32, found: i32 },

    #[error("register {register} is used both as the {first} and the {second} register")]
    RegisterConflict {
        register: Register,
        first: &'static str,
        second: &'static str,
    },
}

impl ConfigError {
    /// Convert to a Diagnostic for API boundary.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            ConfigError::UnknownRegister { .. } => "C001",
            ConfigError::InvalidWordSize { .. } => "C002",
            ConfigError::InvalidIntSlot { .. } => "C003",
            ConfigError::RegisterConflict { .. } => "C004",
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            span: Span::default(),
            help: Vec::new(),
            code: Some(code.to_string()),
        }
    }
}

/// Register assignment, frame shape and label conventions of the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// Bytes in one machine word.
    pub word_size: i32,
    /// Bytes an integer occupies on the stack: a payload word plus a tag word.
    pub int_slot_width: i32,

    pub stack_pointer: Register,
    /// Holds the receiver of the executing method.
    pub this_pointer: Register,
    /// Holds the tag word stored alongside every integer payload.
    pub int_tag: Register,
    pub zero: Register,
    pub return_address: Register,
    pub scratch: [Register; 2],
    /// Selects the system service for `syscall`.
    pub syscall_selector: Register,
    pub exit_service: i32,

    pub entry_label: String,
    /// Runtime routine called once before the main statement runs.
    pub runtime_init: String,
    pub method_label_prefix: String,
    pub class_label_prefix: String,
    /// Classes the runtime predeclares; each gets a placeholder label.
    pub root_classes: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            word_size: 4,
            int_slot_width: 8,
            stack_pointer: Register::Sp,
            this_pointer: Register::S2,
            int_tag: Register::S5,
            zero: Register::Zero,
            return_address: Register::Ra,
            scratch: [Register::T0, Register::T1],
            syscall_selector: Register::V0,
            exit_service: 10,
            entry_label: "main".to_string(),
            runtime_init: "vm_init".to_string(),
            method_label_prefix: "fcn".to_string(),
            class_label_prefix: "CLASS".to_string(),
            root_classes: vec!["String".to_string(), "Object".to_string()],
        }
    }
}

impl TargetConfig {
    /// Check the internal consistency of the convention.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.word_size <= 0 {
            return Err(ConfigError::InvalidWordSize {
                word_size: self.word_size,
            });
        }
        if self.int_slot_width != 2 * self.word_size {
            return Err(ConfigError::InvalidIntSlot {
                expected: 2 * self.word_size,
                found: self.int_slot_width,
            });
        }

        // Registers with a role of their own. The zero register comes last so
        // a clash with it names the other role first.
        let roles = [
            (self.stack_pointer, "stack pointer"),
            (self.this_pointer, "receiver"),
            (self.int_tag, "integer tag"),
            (self.return_address, "return address"),
            (self.scratch[0], "first scratch"),
            (self.scratch[1], "second scratch"),
            (self.zero, "zero"),
        ];
        for (i, &(register, first)) in roles.iter().enumerate() {
            if let Some(&(_, second)) = roles[i + 1..].iter().find(|(r, _)| *r == register) {
                return Err(ConfigError::RegisterConflict {
                    register,
                    first,
                    second,
                });
            }
        }
        Ok(())
    }

    /// Bytes a value of `ty` occupies when pushed.
    pub fn slot_width(&self, ty: &Type<'_>) -> i32 {
        match ty.slot_kind() {
            SlotKind::Void => 0,
            SlotKind::Integer => self.int_slot_width,
            SlotKind::Reference => self.word_size,
        }
    }

    /// Globally unique entry label of a user method.
    pub fn method_label(&self, unique_id: u32, name: &str) -> String {
        format!("{}_{}_{}", self.method_label_prefix, unique_id, name)
    }

    pub fn class_label(&self, class: &str) -> String {
        format!("{}_{}", self.class_label_prefix, class)
    }

    /// Bytes the method prologue pushes: saved return address and receiver.
    pub fn frame_header_size(&self) -> i32 {
        2 * self.word_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(TargetConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_slot_widths() {
        let config = TargetConfig::default();
        let elem = Type::Int;
        assert_eq!(config.slot_width(&Type::Void), 0);
        assert_eq!(config.slot_width(&Type::Int), 8);
        assert_eq!(config.slot_width(&Type::Boolean), 4);
        assert_eq!(config.slot_width(&Type::Null), 4);
        assert_eq!(config.slot_width(&Type::Class("Object")), 4);
        assert_eq!(config.slot_width(&Type::Array(&elem)), 4);
    }

    #[test]
    fn test_labels() {
        let config = TargetConfig::default();
        assert_eq!(config.method_label(7, "run"), "fcn_7_run");
        assert_eq!(config.class_label("Object"), "CLASS_Object");
    }

    #[test]
    fn test_register_parsing() {
        assert_eq!("s2".parse::<Register>(), Ok(Register::S2));
        assert_eq!("$ra".parse::<Register>(), Ok(Register::Ra));
        assert_eq!(Register::S5.to_string(), "$s5");
        assert!(matches!(
            "s9".parse::<Register>(),
            Err(ConfigError::UnknownRegister { .. })
        ));
    }

    #[test]
    fn test_rejects_register_conflict() {
        let config = TargetConfig {
            int_tag: Register::S2,
            ..TargetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::RegisterConflict {
                register: Register::S2,
                first: "receiver",
                second: "integer tag",
            })
        );
    }

    #[test]
    fn test_rejects_zero_register_in_a_role() {
        let config = TargetConfig {
            this_pointer: Register::Zero,
            ..TargetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::RegisterConflict {
                register: Register::Zero,
                first: "receiver",
                second: "zero",
            })
        );

        let config = TargetConfig {
            int_tag: Register::Zero,
            ..TargetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RegisterConflict { first: "integer tag", second: "zero", .. })
        ));
    }

    #[test]
    fn test_rejects_bad_slot_width() {
        let config = TargetConfig {
            int_slot_width: 12,
            ..TargetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidIntSlot {
                expected: 8,
                found: 12
            })
        );

        let config = TargetConfig {
            word_size: 0,
            ..TargetConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWordSize { word_size: 0 })
        );
    }
}
