//! The `FxNN` family: timers, key wait, index arithmetic, BCD and block
//! register transfer.

use std::fmt;

use log::debug;

use crate::error::Fault;
use crate::instruction::Flow;
use crate::state::{Chip8State, FONT_ADDR, FONT_HEIGHT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MiscOp {
    /// `Vx = DT`
    GetDelay,
    /// Block until a key is down, then `Vx = key`
    WaitKey,
    /// `DT = Vx`
    SetDelay,
    /// `ST = Vx`
    SetSound,
    /// `I += Vx`
    AddIndex,
    /// `I = address of glyph Vx`
    FontGlyph,
    /// Decimal digits of `Vx` to `[I], [I+1], [I+2]`
    StoreBcd,
    /// `V0..=Vx` to `[I..=I+x]`
    StoreRegisters,
    /// `[I..=I+x]` to `V0..=Vx`
    LoadRegisters,
}

impl MiscOp {
    /// Selects the operation from the low byte of an `FxNN` word.
    pub fn from_byte(kk: u8) -> Option<Self> {
        match kk {
            0x07 => Some(MiscOp::GetDelay),
            0x0A => Some(MiscOp::WaitKey),
            0x15 => Some(MiscOp::SetDelay),
            0x18 => Some(MiscOp::SetSound),
            0x1E => Some(MiscOp::AddIndex),
            0x29 => Some(MiscOp::FontGlyph),
            0x33 => Some(MiscOp::StoreBcd),
            0x55 => Some(MiscOp::StoreRegisters),
            0x65 => Some(MiscOp::LoadRegisters),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            MiscOp::GetDelay => 0x07,
            MiscOp::WaitKey => 0x0A,
            MiscOp::SetDelay => 0x15,
            MiscOp::SetSound => 0x18,
            MiscOp::AddIndex => 0x1E,
            MiscOp::FontGlyph => 0x29,
            MiscOp::StoreBcd => 0x33,
            MiscOp::StoreRegisters => 0x55,
            MiscOp::LoadRegisters => 0x65,
        }
    }

    /// Runs the operation against register `x`. Memory ranges are checked
    /// before anything is written, so a fault leaves the state untouched.
    pub fn execute(self, state: &mut Chip8State, x: usize) -> Result<Flow, Fault> {
        let vx = state.registers.read(x);
        let index = usize::from(state.index);

        match self {
            MiscOp::GetDelay => state.registers.write(x, state.delay_timer),
            MiscOp::WaitKey => match state.keypad.first_pressed() {
                Some(key) => {
                    debug!("key {:X} pressed, stored in V{:X}", key.index(), x);
                    state.registers.write(x, key.index());
                }
                None => return Ok(Flow::WaitForKey),
            },
            MiscOp::SetDelay => state.delay_timer = vx,
            MiscOp::SetSound => state.sound_timer = vx,
            MiscOp::AddIndex => state.index = state.index.wrapping_add(u16::from(vx)),
            MiscOp::FontGlyph => {
                state.index = FONT_ADDR as u16 + u16::from(vx) * FONT_HEIGHT;
            }
            MiscOp::StoreBcd => {
                let digits = [vx / 100, (vx / 10) % 10, vx % 10];
                state.memory.slice_mut(index, 3)?.copy_from_slice(&digits);
            }
            MiscOp::StoreRegisters => {
                let registers = &state.registers.as_slice()[..=x];
                state
                    .memory
                    .slice_mut(index, registers.len())?
                    .copy_from_slice(registers);
            }
            MiscOp::LoadRegisters => {
                let bytes = state.memory.slice(index, x + 1)?;
                state.registers.as_mut_slice()[..=x].copy_from_slice(bytes);
            }
        }
        Ok(Flow::Next)
    }

    fn mnemonic(self) -> &'static str {
        match self {
            MiscOp::GetDelay => "LD Vx, DT",
            MiscOp::WaitKey => "LD Vx, K",
            MiscOp::SetDelay => "LD DT, Vx",
            MiscOp::SetSound => "LD ST, Vx",
            MiscOp::AddIndex => "ADD I, Vx",
            MiscOp::FontGlyph => "LD F, Vx",
            MiscOp::StoreBcd => "LD B, Vx",
            MiscOp::StoreRegisters => "LD [I], Vx",
            MiscOp::LoadRegisters => "LD Vx, [I]",
        }
    }

    /// Disassembly with `Vx` spelled out for register `x`.
    pub fn describe(self, x: usize) -> String {
        self.mnemonic().replace("Vx", &format!("V{x:X}"))
    }
}

impl fmt::Display for MiscOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
