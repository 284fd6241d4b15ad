use serde::Deserialize;
use serde::Serialize;

use crate::cpu::check_bit_const;
use crate::mem::MemoryMap;

use super::DIV;
use super::TAC;
use super::TIMA;
use super::TMA;

/// The number of cycles between increments of DIV.
pub const DIVIDER_PERIOD: u32 = 256;

/// The number of cycles per TIMA increment, indexed by the bottom two bits of TAC.
const TIMER_PERIODS: [u32; 4] = [1024, 16, 64, 256];

/// The free running cycle counters behind DIV and TIMA. The registers themselves live in the
/// memory map; these only carry the cycles that have not yet added up to an increment.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timers {
    pub divider_cycles: u32,
    pub timer_cycles: u32,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances both counters. Returns `true` if TIMA overflowed, in which case the caller needs
    /// to request the timer interrupt.
    pub fn tick(&mut self, cycles: u32, mem: &mut MemoryMap) -> bool {
        // Writing DIV clears the whole internal counter, not just the visible byte
        if mem.take_div_reset() {
            self.divider_cycles = 0;
        }
        self.divider_cycles += cycles;
        while self.divider_cycles >= DIVIDER_PERIOD {
            self.divider_cycles -= DIVIDER_PERIOD;
            mem[DIV] = mem[DIV].wrapping_add(1);
        }

        let control = mem[TAC];
        if !check_bit_const::<2>(control) {
            return false;
        }
        let period = TIMER_PERIODS[(control & 0b11) as usize];
        self.timer_cycles += cycles;
        let mut overflowed = false;
        while self.timer_cycles >= period {
            self.timer_cycles -= period;
            match mem[TIMA].checked_add(1) {
                Some(val) => mem[TIMA] = val,
                None => {
                    mem[TIMA] = mem[TMA];
                    overflowed = true;
                }
            }
        }
        overflowed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mem::MemoryLike;

    #[test]
    fn divider_register() {
        let mut mem = MemoryMap::construct();
        let mut timers = Timers::new();
        mem[DIV] = 0;
        assert!(!timers.tick(255, &mut mem));
        assert_eq!(mem[DIV], 0);
        assert!(!timers.tick(1, &mut mem));
        assert_eq!(mem[DIV], 1);
        assert_eq!(timers.divider_cycles, 0);
        // Counts are carried across calls that straddle a boundary
        timers.tick(300, &mut mem);
        assert_eq!(mem[DIV], 2);
        assert_eq!(timers.divider_cycles, 44);
    }

    #[test]
    fn div_write_restarts_the_divider() {
        let mut mem = MemoryMap::construct();
        let mut timers = Timers::new();
        mem[DIV] = 0;
        timers.tick(200, &mut mem);
        mem.write_byte(DIV, 0x55);
        assert_eq!(mem[DIV], 0);
        timers.tick(100, &mut mem);
        assert_eq!(mem[DIV], 0);
        assert_eq!(timers.divider_cycles, 100);
        timers.tick(156, &mut mem);
        assert_eq!(mem[DIV], 1);
    }

    #[test]
    fn timer_disabled() {
        let mut mem = MemoryMap::construct();
        let mut timers = Timers::new();
        mem[TAC] = 0b011;
        mem[TIMA] = 0;
        timers.tick(4096, &mut mem);
        assert_eq!(mem[TIMA], 0);
        assert_eq!(timers.timer_cycles, 0);
    }

    #[test]
    fn timer_rates() {
        for (control, period) in [(0b100, 1024), (0b101, 16), (0b110, 64), (0b111, 256)] {
            let mut mem = MemoryMap::construct();
            let mut timers = Timers::new();
            mem[TAC] = control;
            mem[TIMA] = 0;
            timers.tick(period - 4, &mut mem);
            assert_eq!(mem[TIMA], 0);
            timers.tick(4, &mut mem);
            assert_eq!(mem[TIMA], 1);
        }
    }

    #[test]
    fn timer_overflow_reloads_modulo() {
        let mut mem = MemoryMap::construct();
        let mut timers = Timers::new();
        mem[TAC] = 0b101;
        mem[TMA] = 0xAB;
        mem[TIMA] = 0xFF;
        assert!(!timers.tick(12, &mut mem));
        assert!(timers.tick(4, &mut mem));
        assert_eq!(mem[TIMA], 0xAB);
    }
}
