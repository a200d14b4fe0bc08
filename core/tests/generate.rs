//! Reading tree dumps and generating code for them.

use bumpalo::Bump;
use indoc::indoc;
use mjc_core::asm::AsmBuffer;
use mjc_core::ast::DeclId;
use mjc_core::{CodeGenerator, CodegenError, FrameOffsets, Register, TargetConfig, read_program};
use pretty_assertions::assert_eq;

fn generate(source: &str, config: &TargetConfig) -> (AsmBuffer, FrameOffsets) {
    let arena = Bump::new();
    let program = read_program(&arena, source).unwrap();
    CodeGenerator::compile(config, AsmBuffer::new(), program).unwrap()
}

/// Lines between the label of `method` and its `jr`, inclusive.
fn method_lines(buffer: &AsmBuffer, label: &str) -> Vec<String> {
    let texts = buffer.texts();
    let start = texts
        .iter()
        .position(|line| *line == format!("{}:", label))
        .unwrap();
    let end = start + texts[start..].iter().position(|l| l.starts_with("jr ")).unwrap();
    texts[start..=end].to_vec()
}

#[test]
fn test_formals_are_addressed_from_current_height() {
    let source = indoc! {"
        program main { }
        class Calc {
          method add#2(a#3: int @ 16, b#4: int @ 8): int this @ 24 {
            var sum#5: int = a#3 + b#4;
          }
        }
    "};
    let (buffer, offsets) = generate(source, &TargetConfig::default());

    assert_eq!(
        method_lines(&buffer, "fcn_2_add"),
        vec![
            "fcn_2_add:",
            "subu $sp,$sp,8",
            "sw $ra,4($sp)",
            "sw $s2,($sp)",
            "lw $s2,28($sp)",
            // a: height 4 + offset 16
            "lw $t0,20($sp)",
            "subu $sp,$sp,8",
            "sw $s5,4($sp)",
            "sw $t0,($sp)",
            // b: height 12 + offset 8
            "lw $t0,20($sp)",
            "subu $sp,$sp,8",
            "sw $s5,4($sp)",
            "sw $t0,($sp)",
            "lw $t0,($sp)",
            "lw $t1,8($sp)",
            "addu $t0,$t0,$t1",
            "addu $sp,$sp,8",
            "sw $t0,($sp)",
            "lw $ra,12($sp)",
            "lw $s2,8($sp)",
            "addu $sp,$sp,20",
            "jr $ra",
        ]
    );
    assert_eq!(offsets.get(DeclId(5)), Some(-12));
}

#[test]
fn test_nested_blocks_in_main() {
    let source = indoc! {"
        program
        main {
          var x#1: int = 5;
          {
            var y#2: int = x#1 - 2;
          }
        }
    "};
    let (buffer, offsets) = generate(source, &TargetConfig::default());

    assert_eq!(
        buffer.texts(),
        vec![
            ".text",
            ".globl main",
            "main:",
            "# initialize registers, etc.",
            "jal vm_init",
            // x = 5
            "subu $sp,$sp,8",
            "sw $s5,4($sp)",
            "li $t0,5",
            "sw $t0,($sp)",
            // y = x - 2
            "lw $t0,($sp)",
            "subu $sp,$sp,8",
            "sw $s5,4($sp)",
            "sw $t0,($sp)",
            "subu $sp,$sp,8",
            "sw $s5,4($sp)",
            "li $t0,2",
            "sw $t0,($sp)",
            "lw $t0,($sp)",
            "lw $t1,8($sp)",
            "subu $t0,$t1,$t0",
            "addu $sp,$sp,8",
            "sw $t0,($sp)",
            // inner block, then main block
            "addu $sp,$sp,8",
            "addu $sp,$sp,8",
            "# exit program",
            "li $v0,10",
            "syscall",
            "CLASS_String:",
            "CLASS_Object:",
        ]
    );
    assert_eq!(offsets.sorted(), vec![(DeclId(1), -8), (DeclId(2), -16)]);
}

#[test]
fn test_main_is_balanced() {
    let source = indoc! {r#"
        program
        main {
          var s#1: String = "hello" @ strLit_0;
          var n#2: int = s#1.$length(): int + 1;
          new Main.run#7(n#2, s#1): void;
        }
        class Main {
          method run#7(n#3: int @ 8, s#4: String @ 4): void this @ 12 { }
        }
    "#};
    let (buffer, _) = generate(source, &TargetConfig::default());

    let texts = buffer.texts();
    let body_start = texts.iter().position(|l| l == "jal vm_init").unwrap() + 1;
    let body_end = texts.iter().position(|l| l == "# exit program").unwrap();

    // The callee pops receiver and arguments, and every call leaves exactly
    // its result in their place, so count those effects alongside the
    // explicit adjustments.
    let pushed_args = 4 + 4 + 8 + 4; // s for `length`, then receiver, n and s for `run`
    let returned = 8; // `length` result
    let emitted = buffer.stack_growth_since(body_start, Register::Sp)
        - buffer.stack_growth_since(body_end, Register::Sp);
    assert_eq!(emitted - pushed_args + returned, 0);
}

#[test]
fn test_every_method_pops_its_frame_and_receiver() {
    let source = indoc! {"
        program main { }
        class Shapes extends Object {
          field area#1: int @ 4;
          method a#1(): void this @ 0 { var x#2: int = area#1; }
          method b#2(k#3: int @ 4): int this @ 8 {
            var y#4: int = k#3 + area#1;
            { var z#5: Shapes = this; }
          }
          method c#3(): Shapes this @ 0 { var w#6: Shapes = super; }
        }
    "};
    let config = TargetConfig::default();
    let (buffer, offsets) = generate(source, &config);

    for label in ["fcn_1_a", "fcn_2_b", "fcn_3_c"] {
        let texts = buffer.texts();
        let start = texts
            .iter()
            .position(|line| *line == format!("{}:", label))
            .unwrap();
        // Net effect of the whole method: only the receiver word is gone.
        let growth = buffer.stack_growth_since(start, Register::Sp)
            - buffer.stack_growth_since(start + method_lines(&buffer, label).len(), Register::Sp);
        assert_eq!(growth, -config.word_size, "method {}", label);
    }
    assert_eq!(offsets.get(DeclId(5)), Some(-16));
    assert_eq!(offsets.get(DeclId(6)), Some(-8));
}

fn generate_err(source: &str) -> CodegenError {
    let arena = Bump::new();
    let program = read_program(&arena, source).unwrap();
    let Err(err) = CodeGenerator::compile(&TargetConfig::default(), AsmBuffer::new(), program)
    else {
        panic!("expected generation to fail");
    };
    err
}

#[test]
fn test_huge_receiver_offset_is_rejected() {
    let source = indoc! {"
        program main { }
        class Main {
          method m#1(): void this @ 2147483647 { }
        }
    "};
    assert!(matches!(
        generate_err(source),
        CodegenError::OffsetOverflow { offset: i32::MAX, .. }
    ));
}

#[test]
fn test_locals_do_not_outlive_their_scope() {
    let source = "program main { { var x#1: int = 1; } var y#2: int = x#1; }";
    let err = generate_err(source);
    assert!(matches!(err, CodegenError::LocalOutOfScope { .. }), "{:?}", err);
    assert_eq!(err.span().map(|s| s.str_of(source)), Some("x#1"));

    let source = indoc! {"
        program main { }
        class Main {
          method a#1(): void this @ 0 { var x#1: int = 1; }
          method b#2(): void this @ 0 { var y#2: int = x#1; }
        }
    "};
    assert!(matches!(
        generate_err(source),
        CodegenError::LocalOutOfScope { .. }
    ));
}
