use super::Cpu;
use super::CpuState;
use super::Flags;
use crate::error::Error;
use crate::instruction::InterruptOp;

/// Loads `program` at 0x0100 of a flat 64 KiB memory and returns a CPU in its power on state.
fn load(program: &[u8]) -> (Cpu, Vec<u8>) {
    let mut mem = vec![0; 0x10000];
    mem[0x100..0x100 + program.len()].copy_from_slice(program);
    (Cpu::power_on(), mem)
}

fn step(cpu: &mut Cpu, mem: &mut Vec<u8>) -> u32 {
    cpu.step(mem).unwrap()
}

#[test]
fn nop_and_call_costs() {
    let (mut cpu, mut mem) = load(&[0x00, 0xCD, 0x00, 0x20]);
    assert_eq!(step(&mut cpu, &mut mem), 4);
    assert_eq!(cpu.pc, 0x0101);
    assert_eq!(step(&mut cpu, &mut mem), 24);
    assert_eq!(cpu.pc, 0x2000);
    assert_eq!(cpu.sp, 0xFFFC);
    assert_eq!(mem[0xFFFD], 0x01);
    assert_eq!(mem[0xFFFC], 0x04);
}

#[test]
fn conditional_relative_jumps() {
    let (mut cpu, mut mem) = load(&[0xAF, 0x28, 0x02, 0x00, 0x00, 0x20, 0xFE]);
    assert_eq!(step(&mut cpu, &mut mem), 4);
    assert!(cpu.zero_flag());
    // Taken
    assert_eq!(step(&mut cpu, &mut mem), 12);
    assert_eq!(cpu.pc, 0x0105);
    // Not taken
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert_eq!(cpu.pc, 0x0107);
}

#[test]
fn add_sets_every_flag() {
    let (mut cpu, mut mem) = load(&[0x3E, 0x3A, 0xC6, 0xC6]);
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert_eq!(cpu.a, 0);
    assert_eq!(cpu.f.as_byte(), 0xB0);
}

#[test]
fn adc_and_sbc_use_the_carry() {
    // The power on flags have carry set and A = 0x01
    let (mut cpu, mut mem) = load(&[0xCE, 0xFE, 0xDE, 0x00]);
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.zero_flag() && cpu.half_carry_flag() && cpu.carry_flag());
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.a, 0xFF);
    assert!(cpu.subtraction_flag() && cpu.half_carry_flag() && cpu.carry_flag());
    assert!(!cpu.zero_flag());
}

#[test]
fn decimal_adjust() {
    let (mut cpu, mut mem) = load(&[0x3E, 0x15, 0xC6, 0x27, 0x27, 0xD6, 0x15, 0x27]);
    (0..3).for_each(|_| _ = step(&mut cpu, &mut mem));
    assert_eq!(cpu.a, 0x42);
    assert!(!cpu.carry_flag());
    (0..2).for_each(|_| _ = step(&mut cpu, &mut mem));
    assert_eq!(cpu.a, 0x27);
}

#[test]
fn inc_and_dec_half_carry() {
    let (mut cpu, mut mem) = load(&[0x06, 0x0F, 0x04, 0x05, 0x0E, 0x01, 0x0D]);
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 4);
    assert_eq!(cpu.b, 0x10);
    assert!(cpu.half_carry_flag() && !cpu.subtraction_flag() && !cpu.zero_flag());
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.b, 0x0F);
    assert!(cpu.half_carry_flag() && cpu.subtraction_flag());
    step(&mut cpu, &mut mem);
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.c, 0);
    assert!(cpu.zero_flag() && !cpu.half_carry_flag());
    // The carry from the power on flags is untouched
    assert!(cpu.carry_flag());
}

#[test]
fn flag_low_nibble_reads_zero() {
    let (mut cpu, mut mem) = load(&[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
    assert_eq!(step(&mut cpu, &mut mem), 12);
    assert_eq!(step(&mut cpu, &mut mem), 16);
    assert_eq!(step(&mut cpu, &mut mem), 12);
    assert_eq!(cpu.a, 0x12);
    assert_eq!(cpu.f.as_byte(), 0xF0);
    assert_eq!(cpu.af(), 0x12F0);
}

#[test]
fn interrupt_enable_is_delayed() {
    let (mut cpu, mut mem) = load(&[0xFB, 0x00, 0xF3, 0x00, 0x00]);
    cpu.ime = false;
    step(&mut cpu, &mut mem);
    assert!(!cpu.ime);
    step(&mut cpu, &mut mem);
    assert!(cpu.ime);
    step(&mut cpu, &mut mem);
    assert!(cpu.ime);
    step(&mut cpu, &mut mem);
    assert!(!cpu.ime);
}

#[test]
fn halt_with_interrupts_enabled() {
    let (mut cpu, mut mem) = load(&[0x76, 0x00]);
    assert_eq!(step(&mut cpu, &mut mem), 4);
    assert!(cpu.is_halted());
    assert_eq!(cpu.pc, 0x0101);
    assert_eq!(step(&mut cpu, &mut mem), 4);
    assert_eq!(cpu.pc, 0x0101);
}

#[test]
fn halt_bug_repeats_the_next_byte() {
    let (mut cpu, mut mem) = load(&[0x76, 0x3C, 0x00]);
    cpu.ime = false;
    step(&mut cpu, &mut mem);
    assert!(!cpu.is_halted());
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.pc, 0x0101);
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.pc, 0x0102);
    assert_eq!(cpu.a, 0x03);
}

#[test]
fn halt_bug_reads_the_op_code_as_its_operand() {
    // HALT; LD A, 0x14 runs as LD A, 0x3E followed by INC D
    let (mut cpu, mut mem) = load(&[0x76, 0x3E, 0x14, 0x00]);
    cpu.ime = false;
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert_eq!(cpu.a, 0x3E);
    assert_eq!(cpu.pc, 0x0102);
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.d, 0x01);
    assert_eq!(cpu.pc, 0x0103);
    // The bug only bites once
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.pc, 0x0104);
}

#[test_log::test]
fn unused_op_codes_are_errors() {
    let (mut cpu, mut mem) = load(&[0xD3]);
    let err = cpu.step(&mut mem).unwrap_err();
    assert!(matches!(
        err,
        Error::UnimplementedOpcode {
            opcode: 0xD3,
            pc: 0x0100,
            ..
        }
    ));
    assert!(err.to_string().contains("A=0x01"));
    assert_eq!(cpu.pc, 0x0100);
}

#[test]
fn servicing_an_interrupt() {
    let (mut cpu, mut mem) = load(&[]);
    mem[0xFF0F] = 0x05;
    cpu.pc = 0x1234;
    cpu.state = CpuState::Halted;
    assert_eq!(cpu.service_interrupt(InterruptOp::VBlank, &mut mem), 5);
    assert_eq!(cpu.pc, 0x0040);
    assert_eq!(mem[0xFF0F], 0x04);
    assert!(!cpu.ime);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.sp, 0xFFFC);
    assert_eq!(mem[0xFFFD], 0x12);
    assert_eq!(mem[0xFFFC], 0x34);
}

#[test]
fn prefixed_bit_ops() {
    let (mut cpu, mut mem) = load(&[
        0x26, 0xC0, 0x2E, 0x00, 0xCB, 0x7C, 0xCB, 0x46, 0xCB, 0xDE, 0xCB, 0x37,
    ]);
    step(&mut cpu, &mut mem);
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert!(!cpu.zero_flag() && cpu.half_carry_flag() && !cpu.subtraction_flag());
    assert_eq!(step(&mut cpu, &mut mem), 12);
    assert!(cpu.zero_flag());
    assert_eq!(step(&mut cpu, &mut mem), 16);
    assert_eq!(mem[0xC000], 0x08);
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert_eq!(cpu.a, 0x10);
    assert_eq!(cpu.pc, 0x010C);
}

#[test]
fn accumulator_rotates_clear_zero() {
    let (mut cpu, mut mem) = load(&[0x3E, 0x80, 0x07, 0x3E, 0x00, 0xCB, 0x07, 0x17]);
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 4);
    assert_eq!(cpu.a, 0x01);
    assert!(cpu.carry_flag() && !cpu.zero_flag());
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert!(cpu.zero_flag() && !cpu.carry_flag());
    // RLA with a clear carry on zero still leaves Z clear
    step(&mut cpu, &mut mem);
    assert_eq!(cpu.a, 0);
    assert!(!cpu.zero_flag());
}

#[test]
fn stack_pointer_offsets() {
    let (mut cpu, mut mem) = load(&[0xE8, 0x08, 0xF8, 0xFF]);
    cpu.sp = 0xFFF8;
    assert_eq!(step(&mut cpu, &mut mem), 16);
    assert_eq!(cpu.sp, 0x0000);
    assert!(cpu.half_carry_flag() && cpu.carry_flag() && !cpu.zero_flag());
    assert_eq!(step(&mut cpu, &mut mem), 12);
    assert_eq!(cpu.hl(), 0xFFFF);
    assert!(!cpu.half_carry_flag() && !cpu.carry_flag());
}

#[test]
fn memory_loads() {
    let (mut cpu, mut mem) = load(&[
        0x08, 0x00, 0xC1, 0x3E, 0x42, 0xE0, 0x80, 0x3E, 0x00, 0xF0, 0x80, 0x21, 0x00, 0xC0, 0x22,
        0x32,
    ]);
    assert_eq!(step(&mut cpu, &mut mem), 20);
    assert_eq!(mem[0xC100], 0xFE);
    assert_eq!(mem[0xC101], 0xFF);
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 12);
    assert_eq!(mem[0xFF80], 0x42);
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 12);
    assert_eq!(cpu.a, 0x42);
    step(&mut cpu, &mut mem);
    assert_eq!(step(&mut cpu, &mut mem), 8);
    assert_eq!(mem[0xC000], 0x42);
    assert_eq!(cpu.hl(), 0xC001);
    step(&mut cpu, &mut mem);
    assert_eq!(mem[0xC001], 0x42);
    assert_eq!(cpu.hl(), 0xC000);
}

#[test]
fn restart_and_return() {
    let (mut cpu, mut mem) = load(&[0xFF]);
    mem[0x38] = 0xC9;
    assert_eq!(step(&mut cpu, &mut mem), 16);
    assert_eq!(cpu.pc, 0x0038);
    assert_eq!(step(&mut cpu, &mut mem), 16);
    assert_eq!(cpu.pc, 0x0101);
    assert_eq!(cpu.sp, 0xFFFE);
}

/// Base costs for every primary op code. Conditionals hold their not-taken cost, and the unused
/// slots (and the 0xCB prefix) are zero.
#[rustfmt::skip]
const PRIMARY_CYCLES: [u8; 0x100] = [
//  0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    4, 12,  8,  8,  4,  4,  8,  4, 20,  8,  8,  8,  4,  4,  8,  4, // 0x00
    4, 12,  8,  8,  4,  4,  8,  4, 12,  8,  8,  8,  4,  4,  8,  4, // 0x10
    8, 12,  8,  8,  4,  4,  8,  4,  8,  8,  8,  8,  4,  4,  8,  4, // 0x20
    8, 12,  8,  8, 12, 12, 12,  4,  8,  8,  8,  8,  4,  4,  8,  4, // 0x30
    4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 0x40
    4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 0x50
    4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 0x60
    8,  8,  8,  8,  8,  8,  4,  8,  4,  4,  4,  4,  4,  4,  8,  4, // 0x70
    4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 0x80
    4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 0x90
    4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 0xA0
    4,  4,  4,  4,  4,  4,  8,  4,  4,  4,  4,  4,  4,  4,  8,  4, // 0xB0
    8, 12, 12, 16, 12, 16,  8, 16,  8, 16, 12,  0, 12, 24,  8, 16, // 0xC0
    8, 12, 12,  0, 12, 16,  8, 16,  8, 16, 12,  0, 12,  0,  8, 16, // 0xD0
   12, 12,  8,  0,  0, 16,  8, 16, 16,  4, 16,  0,  0,  0,  8, 16, // 0xE0
   12, 12,  8,  4,  0, 16,  8, 16, 12,  8, 16,  4,  0,  0,  8, 16, // 0xF0
];

/// The conditional op codes and their cost when the condition holds.
const TAKEN_CYCLES: [(u8, u32); 16] = [
    (0x20, 12), (0x28, 12), (0x30, 12), (0x38, 12),
    (0xC0, 20), (0xC8, 20), (0xD0, 20), (0xD8, 20),
    (0xC2, 16), (0xCA, 16), (0xD2, 16), (0xDA, 16),
    (0xC4, 24), (0xCC, 24), (0xD4, 24), (0xDC, 24),
];

#[test]
fn every_op_code_costs_its_documented_cycles() {
    let mut checked = 0;
    for op in 0..=u8::MAX {
        let base = PRIMARY_CYCLES[op as usize];
        if base == 0 {
            continue;
        }
        // With every flag clear NZ and NC hold, with every flag set Z and C do
        for flags in [0x00, 0xF0] {
            let (mut cpu, mut mem) = load(&[op, 0x00, 0x00]);
            cpu.f = Flags::from(flags);
            let taken = TAKEN_CYCLES
                .iter()
                .find(|(code, _)| *code == op)
                .filter(|_| (op & 0x08 != 0) == (flags != 0))
                .map(|(_, cycles)| *cycles);
            let expected = taken.unwrap_or(base as u32);
            assert_eq!(
                step(&mut cpu, &mut mem),
                expected,
                "0x{op:0>2X} with flags 0x{flags:0>2X}"
            );
        }
        checked += 1;
    }
    assert_eq!(checked, 0x100 - 12);

    for op in 0..=u8::MAX {
        let (mut cpu, mut mem) = load(&[0xCB, op]);
        let expected = match (op & 0x07, op >> 6) {
            (6, 1) => 12,
            (6, _) => 16,
            _ => 8,
        };
        assert_eq!(step(&mut cpu, &mut mem), expected, "0xCB 0x{op:0>2X}");
    }
}
