use std::ops::Index;
use std::ops::IndexMut;

use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use tracing::trace;

use crate::error::Error;
use crate::error::Result;
use crate::instruction::ArithmeticOp;
use crate::instruction::BitOp;
use crate::instruction::BitOpInner;
use crate::instruction::BitShiftOp;
use crate::instruction::ControlOp;
use crate::instruction::HalfRegister;
use crate::instruction::Instruction;
use crate::instruction::InterruptOp;
use crate::instruction::JumpOp;
use crate::instruction::LoadOp;
use crate::instruction::PairPointer;
use crate::instruction::RegOrPointer;
use crate::instruction::SomeByte;
use crate::instruction::StackReg;
use crate::instruction::WideReg;
use crate::lookup::parse_instruction;
use crate::mem::MemoryLike;

#[cfg(test)]
mod cpu_tests;

/// The number of cycles spent pushing the PC and jumping to a vector when an interrupt is
/// serviced.
pub const INTERRUPT_DISPATCH_CYCLES: u32 = 5;

/// The number of cycles a halted CPU burns per step.
pub const HALTED_STEP_CYCLES: u32 = 4;

#[derive(
    Debug, Default, Hash, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize,
)]
#[display(
    "CPU {{ A=0x{:0>2X} F={} B=0x{:0>2X} C=0x{:0>2X} D=0x{:0>2X} E=0x{:0>2X} H=0x{:0>2X} L=0x{:0>2X} SP=0x{:0>4X} PC=0x{:0>4X} IME={} State={} }}",
    a,
    f,
    b,
    c,
    d,
    e,
    h,
    l,
    sp,
    pc,
    ime,
    state
)]
pub struct Cpu {
    pub a: u8,
    pub f: Flags,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    /// The SP register
    pub sp: u16,
    /// The PC register
    pub pc: u16,
    pub ime: bool,
    /// EI and DI do not take effect right away. These count down the steps until they do.
    enable_delay: u8,
    disable_delay: u8,
    pub state: CpuState,
    /// Set when HALT runs with interrupts disabled. The next fetch does not move the PC past
    /// the op code.
    halt_bug: bool,
}

#[derive(
    Debug, Default, Hash, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize,
)]
pub enum CpuState {
    #[default]
    Running,
    Halted,
}

/// The four flags that make up the top nibble of F.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, derive_more::Display, Serialize, Deserialize,
)]
#[display("Flags(Z={} N={} H={} C={})", *z as u8, *n as u8, *h as u8, *c as u8)]
pub struct Flags {
    pub z: bool,
    /// Set by subtractions, read only by DAA.
    pub n: bool,
    /// Carry out of bit 3 (bit 11 for 16-bit adds).
    pub h: bool,
    pub c: bool,
}

impl Flags {
    const Z: u8 = 0x80;
    const N: u8 = 0x40;
    const H: u8 = 0x20;
    const C: u8 = 0x10;

    pub fn set_from_byte(&mut self, val: u8) {
        *self = val.into();
    }

    /// The F register. The bottom nibble always reads as zero.
    pub fn as_byte(&self) -> u8 {
        [
            (self.z, Self::Z),
            (self.n, Self::N),
            (self.h, Self::H),
            (self.c, Self::C),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(0, |f, (_, mask)| f | mask)
    }

    /// Rotates and shifts clear N and H and set Z from their result.
    fn after_shift(&mut self, zero: bool, carry: bool) {
        *self = Flags {
            z: zero,
            n: false,
            h: false,
            c: carry,
        };
    }

    /// AND, OR and XOR clear N and C. AND alone sets H.
    fn after_logic(&mut self, result: u8, half: bool) {
        *self = Flags {
            z: result == 0,
            n: false,
            h: half,
            c: false,
        };
    }
}

impl From<u8> for Flags {
    fn from(f: u8) -> Self {
        Self {
            z: f & Flags::Z != 0,
            n: f & Flags::N != 0,
            h: f & Flags::H != 0,
            c: f & Flags::C != 0,
        }
    }
}

/// Whether bit `B` of `byte` is set. An index past bit 7 is a compile error.
pub const fn check_bit_const<const B: u8>(byte: u8) -> bool {
    const { assert!(B < 8, "bit index out of range") };
    byte & (1 << B) != 0
}

/// 8-bit add with an optional carry in. Covers ADD and ADC.
fn add8(a: u8, b: u8, carry: bool, flags: &mut Flags) -> u8 {
    let carry = carry as u8;
    let wide = a as u16 + b as u16 + carry as u16;
    *flags = Flags {
        z: wide as u8 == 0,
        n: false,
        h: (a & 0x0F) + (b & 0x0F) + carry > 0x0F,
        c: wide > 0xFF,
    };
    wide as u8
}

/// 8-bit subtract with an optional borrow in. Covers SUB, SBC and CP.
fn sub8(a: u8, b: u8, borrow: bool, flags: &mut Flags) -> u8 {
    let borrow = borrow as u8;
    let result = a.wrapping_sub(b).wrapping_sub(borrow);
    *flags = Flags {
        z: result == 0,
        n: true,
        h: (a & 0x0F) < (b & 0x0F) + borrow,
        c: (a as u16) < b as u16 + borrow as u16,
    };
    result
}

/// DAA. Uses N to tell which kind of operation left A in its current state.
fn decimal_adjust(a: u8, flags: &mut Flags) -> u8 {
    let mut correction = 0;
    let mut carry = flags.c;
    if flags.h || (!flags.n && a & 0x0F > 0x09) {
        correction |= 0x06;
    }
    if flags.c || (!flags.n && a > 0x99) {
        correction |= 0x60;
        carry = true;
    }
    let adjusted = if flags.n {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    flags.z = adjusted == 0;
    flags.h = false;
    flags.c = carry;
    adjusted
}

/// SP plus a signed offset, as used by `ADD SP, e8` and `LD HL, SP + e8`. The carries come from
/// the low byte as if the offset were unsigned.
fn offset_sp(sp: u16, offset: i8, flags: &mut Flags) -> u16 {
    let low = offset as u8 as u16;
    *flags = Flags {
        z: false,
        n: false,
        h: (sp & 0x0F) + (low & 0x0F) > 0x0F,
        c: (sp & 0xFF) + low > 0xFF,
    };
    sp.wrapping_add_signed(offset as i16)
}

impl Cpu {
    /// A CPU with every register cleared, as the boot image expects it.
    pub fn new() -> Self {
        Self::default()
    }

    /// The register file as it is left by the boot image.
    pub fn power_on() -> Self {
        let mut cpu = Self {
            a: 0x01,
            f: Flags::from(0xB0),
            sp: 0xFFFE,
            pc: 0x0100,
            ime: true,
            ..Self::default()
        };
        cpu.write_bc(0x0013);
        cpu.write_de(0x00D8);
        cpu.write_hl(0x014D);
        cpu
    }

    pub fn zero_flag(&self) -> bool {
        self.f.z
    }

    pub fn subtraction_flag(&self) -> bool {
        self.f.n
    }

    pub fn half_carry_flag(&self) -> bool {
        self.f.h
    }

    pub fn carry_flag(&self) -> bool {
        self.f.c
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, CpuState::Halted)
    }

    /// Decodes the instruction that the PC points at without running it.
    pub fn read_op(&self, mem: &impl MemoryLike) -> Instruction {
        parse_instruction(mem, self.pc)
    }

    /// Runs a single instruction and returns the number of cycles it took. A halted CPU does
    /// nothing for four cycles.
    ///
    /// An op code without defined behavior is reported and returned as an error. The PC is left
    /// on the offending byte.
    pub fn step(&mut self, mem: &mut impl MemoryLike) -> Result<u32> {
        if self.is_halted() {
            return Ok(HALTED_STEP_CYCLES);
        }
        let op = if self.halt_bug {
            let view = RepeatedFetch {
                mem: &*mem,
                pc: self.pc,
            };
            parse_instruction(&view, self.pc.wrapping_sub(1))
        } else {
            self.read_op(&*mem)
        };
        if let Instruction::Unused(opcode) = op {
            let registers = self.to_string();
            error!("Unimplemented op code 0x{opcode:0>2X} @ 0x{:0>4X}: {registers}", self.pc);
            return Err(Error::UnimplementedOpcode {
                opcode,
                pc: self.pc,
                registers,
            });
        }
        trace!("0x{:0>4X}: {op}", self.pc);
        let cycles = op.cycles(self) as u32;
        self.execute(op, mem);
        self.tick_ime_delays();
        Ok(cycles)
    }

    /// Executes an already decoded instruction. This moves the PC past the instruction first, so
    /// jumps and calls see the address of the following instruction.
    pub fn execute(&mut self, instr: Instruction, mem: &mut impl MemoryLike) {
        let mut len = instr.size() as u16;
        if std::mem::take(&mut self.halt_bug) {
            len = len.saturating_sub(1);
        }
        self.pc = self.pc.wrapping_add(len);
        match instr {
            Instruction::Load(op) => self.load(op, mem),
            Instruction::BitShift(op) => self.shift(op, mem),
            Instruction::ControlOp(ControlOp::Halt) => self.halt(),
            Instruction::ControlOp(ControlOp::Nop | ControlOp::Stop) => {}
            Instruction::Bit(op) => self.bit(op, mem),
            Instruction::Jump(op) => self.jump(op, mem),
            Instruction::Arithmetic(op) => self.arithmetic(op, mem),
            Instruction::Daa => self.a = decimal_adjust(self.a, &mut self.f),
            Instruction::Scf => {
                self.f.n = false;
                self.f.h = false;
                self.f.c = true;
            }
            Instruction::Cpl => {
                self.a = !self.a;
                self.f.n = true;
                self.f.h = true;
            }
            Instruction::Ccf => {
                self.f.n = false;
                self.f.h = false;
                self.f.c = !self.f.c;
            }
            Instruction::Di => self.disable_delay = 2,
            Instruction::Ei => self.enable_delay = 2,
            Instruction::Unused(_) => {}
        }
    }

    /// Pushes the PC and jumps to the interrupt's vector. Clears only that source's request bit,
    /// disables interrupts, and wakes the CPU if it was halted.
    pub fn service_interrupt(&mut self, op: InterruptOp, mem: &mut impl MemoryLike) -> u32 {
        trace!("Servicing {op} interrupt from 0x{:0>4X}", self.pc);
        mem.clear_interrupt_req(op);
        self.ime = false;
        self.enable_delay = 0;
        self.disable_delay = 0;
        self.state = CpuState::Running;
        self.push(mem, self.pc);
        self.pc = op.vector();
        INTERRUPT_DISPATCH_CYCLES
    }

    /// Counts down pending EI/DI requests. Called at the end of each step so a request lands
    /// after the instruction that follows it.
    fn tick_ime_delays(&mut self) {
        fn tick(delay: &mut u8) -> bool {
            match *delay {
                0 => false,
                _ => {
                    *delay -= 1;
                    *delay == 0
                }
            }
        }
        if tick(&mut self.enable_delay) {
            self.ime = true;
        }
        if tick(&mut self.disable_delay) {
            self.ime = false;
        }
    }

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f.as_byte()])
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    /// HL, which doubles as the pointer for every `(HL)` operand.
    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub(crate) fn write_af(&mut self, val: u16) {
        let [a, f] = val.to_be_bytes();
        self.a = a;
        self.f.set_from_byte(f);
    }

    pub(crate) fn write_bc(&mut self, val: u16) {
        [self.b, self.c] = val.to_be_bytes();
    }

    pub(crate) fn write_de(&mut self, val: u16) {
        [self.d, self.e] = val.to_be_bytes();
    }

    pub(crate) fn write_hl(&mut self, val: u16) {
        [self.h, self.l] = val.to_be_bytes();
    }

    fn wide(&self, reg: WideReg) -> u16 {
        match reg {
            WideReg::BC => self.bc(),
            WideReg::DE => self.de(),
            WideReg::HL => self.hl(),
            WideReg::SP => self.sp,
        }
    }

    fn set_wide(&mut self, reg: WideReg, val: u16) {
        match reg {
            WideReg::BC => self.write_bc(val),
            WideReg::DE => self.write_de(val),
            WideReg::HL => self.write_hl(val),
            WideReg::SP => self.sp = val,
        }
    }

    /// Reads a register, or the byte HL points at.
    pub fn operand(&self, mem: &impl MemoryLike, target: RegOrPointer) -> u8 {
        match target {
            RegOrPointer::Reg(reg) => self[reg],
            RegOrPointer::Pointer => mem.read_byte(self.hl()),
        }
    }

    fn byte_value(&self, mem: &impl MemoryLike, byte: SomeByte) -> u8 {
        match byte {
            SomeByte::Immediate(byte) => byte,
            SomeByte::Operand(target) => self.operand(mem, target),
        }
    }

    fn set_operand(&mut self, target: RegOrPointer, mem: &mut impl MemoryLike, val: u8) {
        match target {
            RegOrPointer::Reg(reg) => self[reg] = val,
            RegOrPointer::Pointer => mem.write_byte(self.hl(), val),
        }
    }

    /// Read-modify-write of an operand. Returns the new value.
    fn modify(
        &mut self,
        target: RegOrPointer,
        mem: &mut impl MemoryLike,
        update: impl FnOnce(u8) -> u8,
    ) -> u8 {
        let val = update(self.operand(mem, target));
        self.set_operand(target, mem, val);
        val
    }

    fn push(&mut self, mem: &mut impl MemoryLike, val: u16) {
        for byte in val.to_be_bytes() {
            self.sp = self.sp.wrapping_sub(1);
            mem.write_byte(self.sp, byte);
        }
    }

    fn pop(&mut self, mem: &mut impl MemoryLike) -> u16 {
        let lo = mem.read_byte(self.sp);
        let hi = mem.read_byte(self.sp.wrapping_add(1));
        self.sp = self.sp.wrapping_add(2);
        u16::from_le_bytes([lo, hi])
    }

    fn call(&mut self, mem: &mut impl MemoryLike, dest: u16) {
        self.push(mem, self.pc);
        self.pc = dest;
    }

    fn arithmetic(&mut self, op: ArithmeticOp, mem: &mut impl MemoryLike) {
        match op {
            ArithmeticOp::Add(byte) => {
                let rhs = self.byte_value(mem, byte);
                self.a = add8(self.a, rhs, false, &mut self.f);
            }
            ArithmeticOp::Adc(byte) => {
                let rhs = self.byte_value(mem, byte);
                self.a = add8(self.a, rhs, self.f.c, &mut self.f);
            }
            ArithmeticOp::Sub(byte) => {
                let rhs = self.byte_value(mem, byte);
                self.a = sub8(self.a, rhs, false, &mut self.f);
            }
            ArithmeticOp::Sbc(byte) => {
                let rhs = self.byte_value(mem, byte);
                self.a = sub8(self.a, rhs, self.f.c, &mut self.f);
            }
            ArithmeticOp::Cp(byte) => {
                let rhs = self.byte_value(mem, byte);
                sub8(self.a, rhs, false, &mut self.f);
            }
            ArithmeticOp::And(byte) => {
                self.a &= self.byte_value(mem, byte);
                self.f.after_logic(self.a, true);
            }
            ArithmeticOp::Xor(byte) => {
                self.a ^= self.byte_value(mem, byte);
                self.f.after_logic(self.a, false);
            }
            ArithmeticOp::Or(byte) => {
                self.a |= self.byte_value(mem, byte);
                self.f.after_logic(self.a, false);
            }
            // INC and DEC leave C alone
            ArithmeticOp::Inc(target) => {
                let val = self.modify(target, mem, |byte| byte.wrapping_add(1));
                self.f.z = val == 0;
                self.f.n = false;
                self.f.h = val & 0x0F == 0x00;
            }
            ArithmeticOp::Dec(target) => {
                let val = self.modify(target, mem, |byte| byte.wrapping_sub(1));
                self.f.z = val == 0;
                self.f.n = true;
                self.f.h = val & 0x0F == 0x0F;
            }
            // The 16-bit INC and DEC touch no flags at all
            ArithmeticOp::Inc16(reg) => self.set_wide(reg, self.wide(reg).wrapping_add(1)),
            ArithmeticOp::Dec16(reg) => self.set_wide(reg, self.wide(reg).wrapping_sub(1)),
            ArithmeticOp::Add16(reg) => {
                let (hl, rhs) = (self.hl(), self.wide(reg));
                let (sum, carry) = hl.overflowing_add(rhs);
                self.f.n = false;
                self.f.h = (hl & 0x0FFF) + (rhs & 0x0FFF) > 0x0FFF;
                self.f.c = carry;
                self.write_hl(sum);
            }
            ArithmeticOp::AddSp(offset) => self.sp = offset_sp(self.sp, offset, &mut self.f),
        }
    }

    fn jump(&mut self, op: JumpOp, mem: &mut impl MemoryLike) {
        match op {
            JumpOp::Relative(offset) => self.pc = self.pc.wrapping_add_signed(offset as i16),
            JumpOp::ConditionalRelative(cond, offset) if cond.passed(self) => {
                self.pc = self.pc.wrapping_add_signed(offset as i16)
            }
            JumpOp::Absolute(dest) => self.pc = dest,
            JumpOp::ConditionalAbsolute(cond, dest) if cond.passed(self) => self.pc = dest,
            JumpOp::AbsoluteHl => self.pc = self.hl(),
            JumpOp::Call(dest) => self.call(mem, dest),
            JumpOp::ConditionalCall(cond, dest) if cond.passed(self) => self.call(mem, dest),
            JumpOp::Return => self.pc = self.pop(mem),
            JumpOp::ConditionalReturn(cond) if cond.passed(self) => self.pc = self.pop(mem),
            JumpOp::ReturnFromInterrupt => {
                self.pc = self.pop(mem);
                self.ime = true;
            }
            JumpOp::Rst(vector) => self.call(mem, vector as u16),
            // Conditions that did not pass
            JumpOp::ConditionalRelative(..)
            | JumpOp::ConditionalAbsolute(..)
            | JumpOp::ConditionalCall(..)
            | JumpOp::ConditionalReturn(_) => {}
        }
    }

    /// With IME set the CPU sleeps until an interrupt is serviced. Without it, HALT falls through
    /// and the next op code is read twice.
    fn halt(&mut self) {
        if self.ime {
            self.state = CpuState::Halted;
        } else {
            self.halt_bug = true;
        }
    }

    fn bit(&mut self, op: BitOp, mem: &mut impl MemoryLike) {
        let BitOp { bit, reg, op } = op;
        debug_assert!(bit < 8);
        let mask = 1 << bit;
        match op {
            BitOpInner::Bit => {
                self.f.z = self.operand(mem, reg) & mask == 0;
                self.f.n = false;
                self.f.h = true;
            }
            BitOpInner::Res => {
                self.modify(reg, mem, |byte| byte & !mask);
            }
            BitOpInner::Set => {
                self.modify(reg, mem, |byte| byte | mask);
            }
        }
    }

    fn shift(&mut self, op: BitShiftOp, mem: &mut impl MemoryLike) {
        let carry_in = self.f.c;
        match op.target() {
            // The accumulator forms always clear Z
            None => {
                let (byte, carry) = op.apply(self.a, carry_in);
                self.a = byte;
                self.f.after_shift(false, carry);
            }
            Some(target) => {
                let (byte, carry) = op.apply(self.operand(mem, target), carry_in);
                self.set_operand(target, mem, byte);
                self.f.after_shift(byte == 0, carry);
            }
        }
    }

    fn load(&mut self, op: LoadOp, mem: &mut impl MemoryLike) {
        let high = |offset: u8| 0xFF00 | offset as u16;
        match op {
            LoadOp::Basic { dest, src } => {
                let byte = self.operand(mem, src);
                self.set_operand(dest, mem, byte);
            }
            LoadOp::Immediate(target, val) => self.set_operand(target, mem, val),
            LoadOp::Immediate16(reg, val) => self.set_wide(reg, val),
            LoadOp::LoadFromPair(pair) => {
                let addr = self.pair_address(pair);
                self.a = mem.read_byte(addr);
            }
            LoadOp::StoreToPair(pair) => {
                let addr = self.pair_address(pair);
                mem.write_byte(addr, self.a);
            }
            LoadOp::StoreSp(addr) => {
                let [lo, hi] = self.sp.to_le_bytes();
                mem.write_byte(addr, lo);
                mem.write_byte(addr.wrapping_add(1), hi);
            }
            LoadOp::SpFromHl => self.sp = self.hl(),
            LoadOp::HlFromSpOffset(offset) => {
                let addr = offset_sp(self.sp, offset, &mut self.f);
                self.write_hl(addr);
            }
            LoadOp::Pop(reg) => {
                let val = self.pop(mem);
                match reg {
                    StackReg::BC => self.write_bc(val),
                    StackReg::DE => self.write_de(val),
                    StackReg::HL => self.write_hl(val),
                    StackReg::AF => self.write_af(val),
                }
            }
            LoadOp::Push(reg) => {
                let val = match reg {
                    StackReg::BC => self.bc(),
                    StackReg::DE => self.de(),
                    StackReg::HL => self.hl(),
                    StackReg::AF => self.af(),
                };
                self.push(mem, val);
            }
            LoadOp::StoreHigh(offset) => mem.write_byte(high(offset), self.a),
            LoadOp::LoadHigh(offset) => self.a = mem.read_byte(high(offset)),
            LoadOp::StoreHighC => mem.write_byte(high(self.c), self.a),
            LoadOp::LoadHighC => self.a = mem.read_byte(high(self.c)),
            LoadOp::StoreA { ptr } => mem.write_byte(ptr, self.a),
            LoadOp::LoadA { ptr } => self.a = mem.read_byte(ptr),
        }
    }

    /// The address for an accumulator load through a pair. The HL forms step HL afterwards.
    fn pair_address(&mut self, pair: PairPointer) -> u16 {
        let hl = self.hl();
        match pair {
            PairPointer::BC => self.bc(),
            PairPointer::DE => self.de(),
            PairPointer::Hli => {
                self.write_hl(hl.wrapping_add(1));
                hl
            }
            PairPointer::Hld => {
                self.write_hl(hl.wrapping_sub(1));
                hl
            }
        }
    }
}

/// Memory as the fetch after the halt bug sees it. The PC fails to move past the op code, so the
/// op code byte is read a second time as the first operand. Decoding through this view from
/// `pc - 1` lines the operands up that way.
struct RepeatedFetch<'a, M> {
    mem: &'a M,
    pc: u16,
}

impl<M: MemoryLike> MemoryLike for RepeatedFetch<'_, M> {
    fn read_byte(&self, addr: u16) -> u8 {
        if addr == self.pc.wrapping_sub(1) {
            self.mem.read_byte(self.pc)
        } else {
            self.mem.read_byte(addr)
        }
    }

    // Decoding never writes
    fn write_byte(&mut self, _: u16, _: u8) {}
}

impl Index<HalfRegister> for Cpu {
    type Output = u8;

    fn index(&self, reg: HalfRegister) -> &u8 {
        match reg {
            HalfRegister::A => &self.a,
            HalfRegister::B => &self.b,
            HalfRegister::C => &self.c,
            HalfRegister::D => &self.d,
            HalfRegister::E => &self.e,
            HalfRegister::H => &self.h,
            HalfRegister::L => &self.l,
        }
    }
}

impl IndexMut<HalfRegister> for Cpu {
    fn index_mut(&mut self, reg: HalfRegister) -> &mut u8 {
        match reg {
            HalfRegister::A => &mut self.a,
            HalfRegister::B => &mut self.b,
            HalfRegister::C => &mut self.c,
            HalfRegister::D => &mut self.d,
            HalfRegister::E => &mut self.e,
            HalfRegister::H => &mut self.h,
            HalfRegister::L => &mut self.l,
        }
    }
}
