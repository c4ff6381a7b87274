#![cfg(test)]

use super::frame::{plan, Frame};
use super::*;
use crate::irgen::generate_ir;
use crate::parse;
use crate::utils::{CompileError, ErrorKind};

fn asm(ir: &str) -> String {
    let program = load_ir(ir).unwrap();
    generate_asm(&program).unwrap()
}

fn asm_err(ir: &str) -> ErrorKind {
    let program = load_ir(ir).unwrap();
    generate_asm(&program)
        .unwrap_err()
        .downcast::<CompileError>()
        .unwrap()
        .kind
}

fn frame_of(ir: &str) -> Frame {
    let program = load_ir(ir).unwrap();
    let func = *program
        .func_layout()
        .iter()
        .find(|&&f| program.func(f).layout().entry_bb().is_some())
        .unwrap();
    plan(program.func(func)).unwrap()
}

fn compile(source: &str) -> String {
    let ir = generate_ir(&parse(source).unwrap()).unwrap();
    asm(&ir)
}

#[test]
fn return_zero() {
    let out = asm("fun @main(): i32 {\n%entry:\n  ret 0\n}\n");
    assert_eq!(
        out,
        "  .text\n  .globl main\nmain:\n.Lmain.entry:\n  li a0, 0\n  ret\n\n"
    );
}

#[test]
fn invalid_ir_is_reported() {
    let err = load_ir("fun @main(): i32 {\n%entry:\n  ret %undefined\n}\n")
        .err()
        .unwrap();
    let err = err.downcast::<CompileError>().unwrap();
    assert!(matches!(err.kind, ErrorKind::InvalidIr(_)));
}

#[test]
fn straight_line_frame() {
    let ir = r#"fun @main(): i32 {
%entry:
  @x = alloc i32
  store 1, @x
  %0 = load @x
  %1 = add %0, 2
  %2 = mul %1, %1
  ret %2
}
"#;
    assert_eq!(
        frame_of(ir),
        Frame {
            slots: 16,
            saved: 0,
            saves_ra: false
        }
    );

    let expected = [
        "  .text",
        "  .globl main",
        "main:",
        "  addi sp, sp, -16",
        ".Lmain.entry:",
        "  li t0, 1",
        "  sw t0, 0(sp)",
        "  lw t0, 0(sp)",
        "  sw t0, 4(sp)",
        "  lw t0, 4(sp)",
        "  addi t0, t0, 2",
        "  sw t0, 8(sp)",
        "  lw t0, 8(sp)",
        "  lw t1, 8(sp)",
        "  mul t0, t0, t1",
        "  sw t0, 12(sp)",
        "  lw a0, 12(sp)",
        "  addi sp, sp, 16",
        "  ret",
        "",
    ];
    assert_eq!(asm(ir).lines().collect::<Vec<_>>(), expected);
}

#[test]
fn arrays_take_their_full_size() {
    let ir = r#"fun @main(): i32 {
%entry:
  @a = alloc [[i32, 3], 2]
  ret 0
}
"#;
    assert_eq!(frame_of(ir).slots, 24);
}

#[test]
fn calls_save_ra_and_parameters() {
    let ir = r#"decl @g(i32): i32

fun @f(%a: i32, %b: i32): i32 {
%entry:
  %0 = call @g(%a)
  %1 = add %0, %b
  ret %1
}
"#;
    let frame = frame_of(ir);
    assert_eq!(
        frame,
        Frame {
            slots: 8,
            saved: 0b11,
            saves_ra: true
        }
    );
    assert_eq!(frame.size(), 20);

    let expected = [
        "  .text",
        "  .globl f",
        "f:",
        "  addi sp, sp, -20",
        "  sw ra, 16(sp)",
        "  sw s0, 8(sp)",
        "  sw s1, 12(sp)",
        ".Lf.entry:",
        "  mv s0, a0",
        "  mv s1, a1",
        "  mv a0, s0",
        "  call g",
        "  sw a0, 0(sp)",
        "  mv a0, s0",
        "  mv a1, s1",
        "  lw t0, 0(sp)",
        "  add t0, t0, a1",
        "  sw t0, 4(sp)",
        "  lw a0, 4(sp)",
        "  lw s0, 8(sp)",
        "  lw s1, 12(sp)",
        "  lw ra, 16(sp)",
        "  addi sp, sp, 20",
        "  ret",
        "",
    ];
    assert_eq!(asm(ir).lines().collect::<Vec<_>>(), expected);
}

#[test]
fn void_calls_keep_no_result() {
    let ir = r#"decl @putint(i32)

fun @main(): i32 {
%entry:
  call @putint(42)
  ret 0
}
"#;
    let frame = frame_of(ir);
    assert_eq!(frame.slots, 0);
    assert_eq!(frame.size(), 4);
    let out = asm(ir);
    assert!(out.contains("  li a0, 42\n  call putint\n"));
    assert!(!out.contains("putint:"));
}

#[test]
fn element_addresses() {
    let ir = r#"fun @main(): i32 {
%entry:
  @a = alloc [i32, 4]
  %0 = getelemptr @a, 2
  store 7, %0
  %1 = getelemptr @a, 1
  %2 = load %1
  ret %2
}
"#;
    assert_eq!(frame_of(ir).size(), 28);
    let out = asm(ir);
    assert!(out.contains("  addi t0, sp, 0\n  addi t0, t0, 8\n  sw t0, 16(sp)\n"));
    assert!(out.contains("  li t0, 7\n  lw t1, 16(sp)\n  sw t0, 0(t1)\n"));
    assert!(out.contains("  addi t0, t0, 4\n  sw t0, 20(sp)\n"));
    assert!(out.contains("  lw t0, 20(sp)\n  lw t0, 0(t0)\n  sw t0, 24(sp)\n"));
}

#[test]
fn dynamic_indices_scale_by_element_size() {
    let ir = r#"fun @f(%i: i32): i32 {
%entry:
  @a = alloc [i32, 4]
  @m = alloc [[i32, 3], 2]
  %0 = getelemptr @a, %i
  %1 = getelemptr @m, %i
  %2 = load %0
  ret %2
}
"#;
    let out = asm(ir);
    assert!(out.contains("  mv t1, a0\n  slli t1, t1, 2\n  addi t0, sp, 0\n  add t0, t0, t1\n"));
    assert!(out.contains("  mv t1, a0\n  li t0, 12\n  mul t1, t1, t0\n  addi t0, sp, 16\n"));
}

#[test]
fn comparisons_and_immediates() {
    let ir = r#"fun @f(%x: i32): i32 {
%entry:
  %0 = eq %x, 0
  %1 = ne %x, 0
  %2 = le %x, 5
  %3 = lt %x, 10
  %4 = sub %x, 3
  %5 = ge %x, %0
  ret %5
}
"#;
    let out = asm(ir);
    assert!(out.contains("  seqz t0, a0\n  sw t0, 0(sp)\n"));
    assert!(out.contains("  snez t0, a0\n  sw t0, 4(sp)\n"));
    assert!(out.contains("  li t1, 5\n  sgt t0, a0, t1\n  seqz t0, t0\n"));
    assert!(out.contains("  slti t0, a0, 10\n"));
    assert!(out.contains("  addi t0, a0, -3\n"));
    assert!(out.contains("  lw t1, 0(sp)\n  slt t0, a0, t1\n  seqz t0, t0\n"));
}

#[test]
fn branches_use_function_scoped_labels() {
    let ir = r#"fun @main(): i32 {
%entry:
  br 1, %then, %end
%then:
  jump %end
%end:
  ret 0
}
"#;
    let out = asm(ir);
    assert!(out.contains("  li t0, 1\n  bnez t0, .Lmain.then\n  j .Lmain.end\n"));
    assert!(out.contains(".Lmain.then:\n  j .Lmain.end\n.Lmain.end:\n"));
}

#[test]
fn global_data() {
    let ir = r#"global @x_0 = alloc i32, 5
global @a_0 = alloc [i32, 4], zeroinit
global @b_0 = alloc [i32, 3], {1, 2, 0}

fun @main(): i32 {
%entry:
  %0 = load @x_0
  %1 = getelemptr @b_0, 1
  store %0, %1
  ret %0
}
"#;
    let out = asm(ir);
    let data = "  .data\n  .globl x_0\nx_0:\n  .word 5\n\n  .globl a_0\na_0:\n  .zero 16\n\n  .globl b_0\nb_0:\n  .word 1\n  .word 2\n  .word 0\n\n";
    assert!(out.starts_with(data));
    assert!(out.contains("  la t0, x_0\n  lw t0, 0(t0)\n  sw t0, 0(sp)\n"));
    assert!(out.contains("  la t0, b_0\n  addi t0, t0, 4\n  sw t0, 4(sp)\n"));
}

#[test]
fn oversized_frames_are_rejected() {
    let ok = "fun @main(): i32 {\n%entry:\n  @a = alloc [i32, 511]\n  ret 0\n}\n";
    assert_eq!(frame_of(ok).size(), 2044);

    let big = "fun @main(): i32 {\n%entry:\n  @a = alloc [i32, 600]\n  ret 0\n}\n";
    assert_eq!(
        asm_err(big),
        ErrorKind::FrameTooLarge("main".to_string(), 2400)
    );

    // 4 GiB would wrap to an empty slot in 32 bits
    let huge = "fun @main(): i32 {\n%entry:\n  @a = alloc [i32, 1073741824]\n  ret 0\n}\n";
    assert_eq!(
        asm_err(huge),
        ErrorKind::FrameTooLarge("main".to_string(), 1 << 32)
    );

    let ir = generate_ir(
        &parse("int main() { int a[1073741824]; a[0] = 1; return a[0]; }").unwrap(),
    )
    .unwrap();
    assert!(matches!(
        asm_err(&ir),
        ErrorKind::FrameTooLarge(name, size) if name == "main" && size > (1 << 32)
    ));
}

#[test]
fn register_limits() {
    let params = (0..9)
        .map(|i| format!("%p{}: i32", i))
        .collect::<Vec<_>>()
        .join(", ");
    let ir = format!("fun @f({}) {{\n%entry:\n  ret\n}}\n", params);
    assert_eq!(asm_err(&ir), ErrorKind::TooManyParams("f".to_string(), 9));

    let ir = format!(
        "decl @h({})\n\nfun @main(): i32 {{\n%entry:\n  call @h({})\n  ret 0\n}}\n",
        vec!["i32"; 9].join(", "),
        vec!["0"; 9].join(", ")
    );
    assert_eq!(
        asm_err(&ir),
        ErrorKind::TooManyArguments("h".to_string(), 9)
    );
}

#[test]
fn whole_programs() {
    let sources = [
        r#"
int fib(int n) {
  if (n <= 1) return n;
  return fib(n - 1) + fib(n - 2);
}
int main() { putint(fib(10)); return 0; }
"#,
        r#"
int g[2][3] = {{1, 2, 3}, {4}};
int sum(int a[][3], int n) {
  int i = 0, s = 0;
  while (i < n) {
    int j = 0;
    while (j < 3) {
      if (a[i][j] == 0) { j = j + 1; continue; }
      s = s + a[i][j];
      j = j + 1;
    }
    i = i + 1;
  }
  return s;
}
int main() { return sum(g, 2); }
"#,
        r#"
void fill(int a[], int n, int v) {
  int i = 0;
  while (1) {
    if (i >= n) break;
    a[i] = v;
    i = i + 1;
  }
}
int main() {
  int arr[10];
  fill(arr, 10, getint());
  putarray(10, arr);
  return arr[9] && !arr[0] || -arr[1];
}
"#,
    ];
    for source in sources {
        let out = compile(source);
        assert!(out.contains("  .globl main\nmain:\n"));
        assert!(out.ends_with("  ret\n\n"));
    }

    let out = compile(sources[0]);
    assert!(out.contains("  call fib\n"));
    assert!(out.contains("  call putint\n"));
    // `n` is copied to the stack before the first call
    assert!(!out.contains("  mv s0, a0\n"));
    assert!(!out.contains("  sw s0, "));

    let out = compile(sources[1]);
    assert!(out.contains("g_0:\n  .word 1\n  .word 2\n  .word 3\n  .word 4\n  .word 0\n  .word 0\n"));
}

#[test]
fn only_arguments_read_after_a_call_are_parked() {
    let ir = r#"decl @g(): i32

fun @f(%a: i32, %b: i32): i32 {
%entry:
  @p = alloc i32
  store %a, @p
  %0 = call @g()
  %1 = add %0, %b
  ret %1
}
"#;
    let frame = frame_of(ir);
    assert_eq!(
        frame,
        Frame {
            slots: 12,
            saved: 0b10,
            saves_ra: true
        }
    );
    assert_eq!(frame.saved_regs().collect::<Vec<_>>(), [(1, 12)]);

    let out = asm(ir);
    assert!(out.contains("  sw s1, 12(sp)\n"));
    assert!(out.contains("  mv s1, a1\n  call g\n  sw a0, 4(sp)\n  mv a1, s1\n"));
    assert!(!out.contains("s0"));
    assert!(out.contains("  add t0, t0, a1\n"));

    let copied = r#"decl @g(): i32

fun @f(%a: i32): i32 {
%entry:
  @p = alloc i32
  store %a, @p
  %0 = call @g()
  ret %0
}
"#;
    assert_eq!(frame_of(copied).saved, 0);
    assert_eq!(frame_of(copied).size(), 12);
}

#[test]
fn labels_are_unique_across_functions() {
    let out = compile(
        r#"
int f() { while (0) {} return 0; }
int f_while() { if (1) return 1; return 0; }
int main() { return f() + f_while(); }
"#,
    );
    let labels: Vec<_> = out.lines().filter(|l| l.starts_with(".L")).collect();
    let unique: std::collections::HashSet<_> = labels.iter().collect();
    assert_eq!(labels.len(), unique.len(), "{:?}", labels);
    assert!(labels.contains(&".Lf.while_entry:"));
    assert!(labels.contains(&".Lf_while.entry:"));
}
