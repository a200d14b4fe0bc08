use indoc::indoc;
use mjc::{
    CompileOptions, DeclId, Error, LocalOffset, Register, TargetConfig, compile,
    compile_with_options,
};
use pretty_assertions::assert_eq;

const COUNTER: &str = indoc! {"
    program
    main {
      new Main.run#1(): void;
    }
    class Main {
      field count#1: int @ 8;
      method run#1(): void this @ 4 {
        var x#2: int = count#1 + 1;
      }
    }
"};

#[test]
fn test_compile_listing() {
    let compilation = compile(COUNTER, &TargetConfig::default()).unwrap();

    let expected = indoc! {"
        \t.text
        \t.globl main
        main:
        \t# initialize registers, etc.
        \tjal vm_init
        \tsubu $sp,$sp,4
        \tsw $zero,($sp)
        \tjal fcn_1_run
        \t# exit program
        \tli $v0,10
        \tsyscall
        \t.globl fcn_1_run
        fcn_1_run:
        \tsubu $sp,$sp,8
        \tsw $ra,4($sp)
        \tsw $s2,($sp)
        \tlw $s2,8($sp)
        \tlw $t0,8($s2)
        \tsubu $sp,$sp,8
        \tsw $s5,4($sp)
        \tsw $t0,($sp)
        \tsubu $sp,$sp,8
        \tsw $s5,4($sp)
        \tli $t0,1
        \tsw $t0,($sp)
        \tlw $t0,($sp)
        \tlw $t1,8($sp)
        \taddu $t0,$t0,$t1
        \taddu $sp,$sp,8
        \tsw $t0,($sp)
        \tlw $ra,12($sp)
        \tlw $s2,8($sp)
        \taddu $sp,$sp,20
        \tjr $ra
        CLASS_String:
        CLASS_Object:
    "};
    assert_eq!(compilation.assembly, expected);
    assert_eq!(
        compilation.offsets,
        vec![LocalOffset {
            name: "x".to_string(),
            id: DeclId(2),
            offset: -12,
        }]
    );
    assert_eq!(compilation.offset_of("x"), Some(-12));
    assert_eq!(compilation.offset_of_id(DeclId(2)), Some(-12));
    assert_eq!(compilation.offset_of("count"), None);
}

#[test]
fn test_source_positions() {
    let source = "program main { var x#1: int = 7; }";
    let options = CompileOptions {
        source_positions: true,
    };
    let compilation = compile_with_options(source, &TargetConfig::default(), options).unwrap();

    let lines: Vec<&str> = compilation.assembly.lines().collect();
    assert!(lines.contains(&"\tli $t0,7\t# @30..31"), "{:#?}", lines);
    assert!(lines.contains(&"\t# exit program"));
}

#[test]
fn test_custom_registers() {
    let config = TargetConfig {
        this_pointer: Register::S3,
        int_tag: Register::S6,
        ..TargetConfig::default()
    };
    let compilation = compile(COUNTER, &config).unwrap();

    assert!(compilation.assembly.contains("\tsw $s3,($sp)\n"));
    assert!(compilation.assembly.contains("\tlw $t0,8($s3)\n"));
    assert!(compilation.assembly.contains("\tsw $s6,4($sp)\n"));
    assert!(!compilation.assembly.contains("$s2"));
    assert!(!compilation.assembly.contains("$s5"));
}

#[test]
fn test_read_errors_become_diagnostics() {
    let source = "program main { var x#1: int = y#2; }";
    let Err(Error::Compilation {
        diagnostics,
        source: kept,
    }) = compile(source, &TargetConfig::default())
    else {
        panic!("expected a compilation error");
    };
    assert_eq!(kept, source);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.as_deref(), Some("R004"));
    assert_eq!(diagnostics[0].span.str_of(source), "y#2");
}

#[test]
fn test_generation_errors_become_diagnostics() {
    let source = indoc! {"
        program main { }
        class A {
          method f#1(): void this @ 0 {
            var s#1: A = this;
            var n#2: int = 1 + s#1;
          }
        }
    "};
    let Err(Error::Compilation { diagnostics, .. }) = compile(source, &TargetConfig::default())
    else {
        panic!("expected a compilation error");
    };
    assert_eq!(diagnostics[0].code.as_deref(), Some("G003"));
    assert_eq!(diagnostics[0].span.str_of(source), "s#1");
}

#[test]
fn test_invalid_config_is_rejected_before_reading() {
    let config = TargetConfig {
        int_slot_width: 4,
        ..TargetConfig::default()
    };
    let err = compile("not even a tree", &config).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    assert_eq!(
        err.to_string(),
        "Invalid target configuration: integer slot width must be two words (8 bytes), got 4"
    );
}
