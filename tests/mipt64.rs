use mipt_emu::isa::mipt64::{LR, RZ, SP};
use mipt_emu::{BufferConsole, Emulator, MachineConfig, Profile, Trap};
use pretty_assertions::assert_eq;

const STACK_TOP: u64 = 1 << 21;

fn emulator(src: &str, input: &str) -> Emulator<BufferConsole> {
    Emulator::from_source(
        Profile::Mipt64,
        src,
        MachineConfig::default(),
        BufferConsole::buffered(input),
    )
    .expect("program assembles")
}

fn run(src: &str, input: &str) -> (i32, String) {
    let mut emu = emulator(src, input);
    let status = emu.run().expect("program halts");
    (status, emu.console().output())
}

#[test]
fn reads_increments_and_prints() {
    let src = "
main:
    svc r1, rz, 100
    add r1, r1, 1
    svc r1, rz, 102
    add r2, rz, 10
    svc r2, rz, 105
    svc r0, rz, 0
end main
";
    assert_eq!(run(src, "41"), (0, "42\n".to_string()));
    assert_eq!(run(src, "-9000000000"), (0, "-8999999999\n".to_string()));
}

#[test]
fn branch_and_link_forms() {
    let src = "
main:
    add r5, rz, twice
    add r1, rz, 3
    bl twice
    bl rz, twice
    bl r5, rz, 0, 0
    svc r1, rz, 102
    halt r0, 0
twice:
    add r1, r1, r1, 0, 0
    add pc, lr, 0
end main
";
    let mut emu = emulator(src, "");
    assert_eq!(emu.run().unwrap(), 0);
    assert_eq!(emu.console().output(), "24");
    assert_eq!(emu.machine.reg(LR).unwrap(), 40);
    assert_eq!(emu.machine.reg(SP).unwrap(), STACK_TOP);
}

#[test]
fn backward_relative_branch() {
    let src = "
main:
    bl pc, start
back:
    svc r1, rz, 102
    halt r0, 0
start:
    add r1, rz, 7
    bl back
end main
";
    assert_eq!(run(src, "").1, "7");
}

#[test]
fn conditional_move_into_pc_loops() {
    let src = "
main:
    add r1, rz, 3
loop:
    svc r1, rz, 102
    sub r1, r1, 1
    cmp r1, rz, 0
    cgt pc, rz, loop
    halt r0, 0
end main
";
    assert_eq!(run(src, ""), (0, "321".to_string()));
}

#[test]
fn pc_based_conditional_move_is_absolute() {
    let src = "
main:
    add r1, rz, 3
loop:
    svc r1, rz, 102
    sub r1, r1, 1
    cmp r1, rz, 0
    cgt pc, pc, loop
    halt r0, 0
end main
";
    assert_eq!(run(src, ""), (0, "321".to_string()));
}

#[test]
fn pc_plus_pc_jumps_to_the_literal() {
    let src = "
main:
    add r1, rz, 1
    add pc, pc, skip
    halt r0, 1
    halt r0, 2
skip:
    svc r1, rz, 102
    halt r0, 0
end main
";
    assert_eq!(run(src, ""), (0, "1".to_string()));

    // other bases still add
    let src = "
main:
    add r2, rz, 16
    add pc, r2, 16
    halt r0, 1
    halt r0, 2
    halt r0, 3
end main
";
    assert_eq!(run(src, "").0, 3);
}

#[test]
fn conditional_moves() {
    let table = [
        ("ceq", [false, true, false]),
        ("cne", [true, false, true]),
        ("clt", [true, false, false]),
        ("cle", [true, true, false]),
        ("cgt", [false, false, true]),
        ("cge", [false, true, true]),
    ];
    for (cmov, expect) in table {
        for ((a, b), taken) in [(1, 2), (2, 2), (3, 2)].into_iter().zip(expect) {
            let src = format!(
                "add r1, rz, {a}\nadd r2, rz, {b}\ncmp r1, r2\n{cmov} r3, rz, 1\nsvc r3, rz, 102\nhalt r0, 0\n"
            );
            let want = if taken { "1" } else { "0" };
            assert_eq!(run(&src, "").1, want, "{cmov} with {a} vs {b}");
        }
    }
}

#[test]
fn stack_through_sp_base() {
    let src = "
    add r1, rz, 11
    st r1, sp, 8
    add r1, rz, 22
    st r1, sp, 8
    ld r2, sp, 8
    ld r3, sp, 8
    halt r0, 0
";
    let mut emu = emulator(src, "");
    emu.run().unwrap();
    assert_eq!(emu.machine.reg(2).unwrap(), 22);
    assert_eq!(emu.machine.reg(3).unwrap(), 11);
    assert_eq!(emu.machine.reg(SP).unwrap(), STACK_TOP);
    assert_eq!(emu.memory.peek(STACK_TOP - 8), Some(11));
    assert_eq!(emu.memory.peek(STACK_TOP - 16), Some(22));
}

#[test]
fn sp_store_moves_by_the_operand() {
    let mut emu = emulator("add r1, rz, 5\nst r1, sp, 8\nhalt r0, 0\n", "");
    emu.run().unwrap();
    assert_eq!(emu.machine.reg(SP).unwrap(), STACK_TOP - 8);
    assert_eq!(emu.memory.peek(STACK_TOP - 8), Some(5));

    let src = "
    add r1, rz, 7
    st r1, sp, 24
    ld r2, sp, 24
    halt r0, 0
";
    let mut emu = emulator(src, "");
    emu.run().unwrap();
    assert_eq!(emu.machine.reg(2).unwrap(), 7);
    assert_eq!(emu.machine.reg(SP).unwrap(), STACK_TOP);
    assert_eq!(emu.memory.peek(STACK_TOP - 24), Some(7));
}

#[test]
fn memory_through_labels_and_scaled_index() {
    let src = "
main:
    ld r1, rz, value
    add r1, r1, 1
    st r1, rz, value
    ld r2, rz, value
    add r6, rz, table
    add r4, rz, 2
    ld r5, r6, r4, 3, 0
    ld r7, r6, 8
    halt r0, 0
value: word 99
table: word 10
    word 20
    word 30
end main
";
    let mut emu = emulator(src, "");
    emu.run().unwrap();
    let regs: Vec<u64> = [2, 5, 7].iter().map(|&r| emu.machine.reg(r).unwrap()).collect();
    assert_eq!(regs, vec![100, 30, 20]);
    assert_eq!(emu.memory.peek(72), Some(100));
}

#[test]
fn signed_division_and_remainder() {
    let src = "
    sub r1, rz, 7
    div r2, r1, 3
    mod r3, r1, 3
    mul r4, r1, r1, 0, 0
    svc r2, rz, 102
    svc r3, rz, 102
    svc r4, rz, 102
    halt r0, 0
";
    assert_eq!(run(src, "").1, "-2-149");
}

#[test]
fn divide_by_zero_traps() {
    let mut emu = emulator("add r1, rz, 5\ndiv r1, r1, 0\nhalt r0, 0\n", "");
    assert!(matches!(emu.run(), Err(Trap::Arithmetic { pc: 8, .. })));
}

#[test]
fn shift_amounts_are_masked() {
    let src = "
    add r1, rz, 1
    shl r2, r1, 64
    shl r3, r1, 63
    shr r4, r3, 63
    nand r5, r1, 1
    halt r0, 0
";
    let mut emu = emulator(src, "");
    emu.run().unwrap();
    let regs: Vec<u64> = (2..6).map(|r| emu.machine.reg(r).unwrap()).collect();
    assert_eq!(regs, vec![1, 1 << 63, 1, !1]);
}

#[test]
fn zero_register_discards_writes() {
    let src = "
    add rz, rz, 5
    svc rz, rz, 102
    halt r0, 0
";
    let mut emu = emulator(src, "");
    emu.run().unwrap();
    assert_eq!(emu.console().output(), "0");
    assert_eq!(emu.machine.reg(RZ).unwrap(), 0);
}

#[test]
fn doubles_in_single_registers() {
    let src = "
main:
    ld r1, rz, a
    ld r2, rz, b
    addd r3, r1, r2, 0, 0
    svc r3, rz, 103
    add r1, rz, 7
    itod r2, r1
    dtoi r5, r2, 2
    svc r5, rz, 102
    cmpd r3, r2
    clt r6, rz, 1
    halt r0, 0
a: double 1.5
b: double 2.25
end main
";
    let mut emu = emulator(src, "");
    emu.run().unwrap();
    assert_eq!(emu.console().output(), "3.759");
    assert_eq!(emu.machine.reg(6).unwrap(), 1);
}

#[test]
fn load_outside_memory_traps() {
    let mut emu = emulator("ld r1, rz, 65535\nhalt r0, 0\n", "");
    assert!(emu.run().is_ok());

    let mut emu = emulator("add r2, rz, 1\nshl r2, r2, 21\nld r1, r2, 0\nhalt r0, 0\n", "");
    assert!(matches!(
        emu.run(),
        Err(Trap::OutOfBounds { pc: 16, addr: 0x20_0000, .. })
    ));
}
