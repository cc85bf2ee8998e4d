use std::fmt;

use log::debug;
use rand::Rng;

use crate::alu::AluOp;
use crate::bits::DecodedInstruction;
use crate::cpu::wrap_address;
use crate::error::Fault;
use crate::misc::MiscOp;
use crate::state::{Address, Chip8State, Key, STACK_DEPTH};

/// How the program counter moves once an instruction has run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Advance by one instruction.
    Next,
    /// Advance by two instructions.
    Skip,
    /// Continue at the given address.
    Jump(Address),
    /// Stay on this instruction until a key is down.
    WaitForKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `1nnn`
    Jump(Address),
    /// `2nnn`
    Call(Address),
    /// `3xkk`
    SkipEqImmediate { x: usize, kk: u8 },
    /// `4xkk`
    SkipNeImmediate { x: usize, kk: u8 },
    /// `5xy_`
    SkipEqRegister { x: usize, y: usize },
    /// `6xkk`
    LoadImmediate { x: usize, kk: u8 },
    /// `7xkk`, no flag
    AddImmediate { x: usize, kk: u8 },
    /// `8xyN`
    Alu { op: AluOp, x: usize, y: usize },
    /// `9xy_`
    SkipNeRegister { x: usize, y: usize },
    /// `Annn`
    SetIndex(Address),
    /// `Bnnn`
    JumpOffset(Address),
    /// `Cxkk`
    Random { x: usize, kk: u8 },
    /// `Dxyn`
    Draw { x: usize, y: usize, n: u8 },
    /// `Ex9E`
    SkipKeyPressed { x: usize },
    /// `ExA1`
    SkipKeyNotPressed { x: usize },
    /// `FxNN`
    Misc { op: MiscOp, x: usize },
}

/// Decodes a raw instruction word. Returns `None` for words that name no
/// instruction.
pub fn decode(raw: u16) -> Option<Instruction> {
    let decoded = DecodedInstruction::new(raw);
    let DecodedInstruction {
        x, y, n, kk, nnn, ..
    } = decoded;

    let instruction = match decoded.opcode {
        0x0 => match raw {
            0x00E0 => Instruction::ClearScreen,
            0x00EE => Instruction::Return,
            _ => return None,
        },
        0x1 => Instruction::Jump(nnn),
        0x2 => Instruction::Call(nnn),
        0x3 => Instruction::SkipEqImmediate { x, kk },
        0x4 => Instruction::SkipNeImmediate { x, kk },
        0x5 => Instruction::SkipEqRegister { x, y },
        0x6 => Instruction::LoadImmediate { x, kk },
        0x7 => Instruction::AddImmediate { x, kk },
        0x8 => Instruction::Alu {
            op: AluOp::from_nibble(n)?,
            x,
            y,
        },
        0x9 => Instruction::SkipNeRegister { x, y },
        0xA => Instruction::SetIndex(nnn),
        0xB => Instruction::JumpOffset(nnn),
        0xC => Instruction::Random { x, kk },
        0xD => Instruction::Draw { x, y, n },
        0xE => match kk {
            0x9E => Instruction::SkipKeyPressed { x },
            0xA1 => Instruction::SkipKeyNotPressed { x },
            _ => return None,
        },
        0xF => Instruction::Misc {
            op: MiscOp::from_byte(kk)?,
            x,
        },
        _ => unreachable!("opcode family is a single nibble"),
    };
    Some(instruction)
}

fn skip_if(condition: bool) -> Flow {
    if condition { Flow::Skip } else { Flow::Next }
}

impl Instruction {
    /// True for the instructions that change the framebuffer.
    pub fn touches_display(&self) -> bool {
        matches!(self, Instruction::ClearScreen | Instruction::Draw { .. })
    }

    /// Executes against `state`, which must still have `pc` pointing at this
    /// instruction. The program counter itself is left to the caller, guided
    /// by the returned [`Flow`].
    pub fn execute<R: Rng>(&self, state: &mut Chip8State, rng: &mut R) -> Result<Flow, Fault> {
        let regs = &mut state.registers;
        let flow = match *self {
            Instruction::ClearScreen => {
                state.display.clear();
                Flow::Next
            }
            Instruction::Return => {
                let return_address = state
                    .stack
                    .pop()
                    .ok_or(Fault::StackUnderflow { address: state.pc })?;
                debug!("return from {:#05X} to {:#05X}", state.pc, return_address);
                Flow::Jump(return_address)
            }
            Instruction::Jump(nnn) => Flow::Jump(nnn),
            Instruction::Call(nnn) => {
                if state.stack.len() >= STACK_DEPTH {
                    return Err(Fault::StackOverflow { address: state.pc });
                }
                state.stack.push(wrap_address(usize::from(state.pc) + 2));
                debug!(
                    "call {:#05X} from {:#05X}, depth {}",
                    nnn,
                    state.pc,
                    state.stack.len()
                );
                Flow::Jump(nnn)
            }
            Instruction::SkipEqImmediate { x, kk } => skip_if(regs.read(x) == kk),
            Instruction::SkipNeImmediate { x, kk } => skip_if(regs.read(x) != kk),
            Instruction::SkipEqRegister { x, y } => skip_if(regs.read(x) == regs.read(y)),
            Instruction::SkipNeRegister { x, y } => skip_if(regs.read(x) != regs.read(y)),
            Instruction::LoadImmediate { x, kk } => {
                regs.write(x, kk);
                Flow::Next
            }
            Instruction::AddImmediate { x, kk } => {
                regs.write(x, regs.read(x).wrapping_add(kk));
                Flow::Next
            }
            Instruction::Alu { op, x, y } => {
                op.execute(regs, x, y);
                Flow::Next
            }
            Instruction::SetIndex(nnn) => {
                state.index = nnn;
                Flow::Next
            }
            Instruction::JumpOffset(nnn) => Flow::Jump(nnn + u16::from(regs.read(0))),
            Instruction::Random { x, kk } => {
                regs.write(x, rng.random::<u8>() & kk);
                Flow::Next
            }
            Instruction::Draw { x, y, n } => {
                let origin_x = usize::from(regs.read(x));
                let origin_y = usize::from(regs.read(y));
                let rows = state
                    .memory
                    .slice(usize::from(state.index), usize::from(n))?;
                let collision = state.display.draw_sprite(origin_x, origin_y, rows);
                regs.set_flag(collision);
                Flow::Next
            }
            Instruction::SkipKeyPressed { x } => {
                skip_if(state.keypad.is_key_pressed(Key::from_nibble(regs.read(x))))
            }
            Instruction::SkipKeyNotPressed { x } => {
                skip_if(!state.keypad.is_key_pressed(Key::from_nibble(regs.read(x))))
            }
            Instruction::Misc { op, x } => op.execute(state, x)?,
        };
        Ok(flow)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::ClearScreen => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump(nnn) => write!(f, "JP {nnn:#05X}"),
            Instruction::Call(nnn) => write!(f, "CALL {nnn:#05X}"),
            Instruction::SkipEqImmediate { x, kk } => write!(f, "SE V{x:X}, {kk:#04X}"),
            Instruction::SkipNeImmediate { x, kk } => write!(f, "SNE V{x:X}, {kk:#04X}"),
            Instruction::SkipEqRegister { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            Instruction::SkipNeRegister { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            Instruction::LoadImmediate { x, kk } => write!(f, "LD V{x:X}, {kk:#04X}"),
            Instruction::AddImmediate { x, kk } => write!(f, "ADD V{x:X}, {kk:#04X}"),
            Instruction::Alu {
                op: op @ (AluOp::ShiftRight | AluOp::ShiftLeft),
                x,
                ..
            } => write!(f, "{op} V{x:X}"),
            Instruction::Alu { op, x, y } => write!(f, "{op} V{x:X}, V{y:X}"),
            Instruction::SetIndex(nnn) => write!(f, "LD I, {nnn:#05X}"),
            Instruction::JumpOffset(nnn) => write!(f, "JP V0, {nnn:#05X}"),
            Instruction::Random { x, kk } => write!(f, "RND V{x:X}, {kk:#04X}"),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            Instruction::SkipKeyPressed { x } => write!(f, "SKP V{x:X}"),
            Instruction::SkipKeyNotPressed { x } => write!(f, "SKNP V{x:X}"),
            Instruction::Misc { op, x } => f.write_str(&op.describe(x)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MEM_SIZE;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(8)
    }

    #[test]
    fn decodes_every_family() {
        assert_eq!(decode(0x00E0), Some(Instruction::ClearScreen));
        assert_eq!(decode(0x00EE), Some(Instruction::Return));
        assert_eq!(decode(0x1ABC), Some(Instruction::Jump(0xABC)));
        assert_eq!(decode(0x2345), Some(Instruction::Call(0x345)));
        assert_eq!(
            decode(0x3A42),
            Some(Instruction::SkipEqImmediate { x: 0xA, kk: 0x42 })
        );
        assert_eq!(
            decode(0x4A42),
            Some(Instruction::SkipNeImmediate { x: 0xA, kk: 0x42 })
        );
        assert_eq!(
            decode(0x5120),
            Some(Instruction::SkipEqRegister { x: 1, y: 2 })
        );
        assert_eq!(decode(0x6005), Some(Instruction::LoadImmediate { x: 0, kk: 5 }));
        assert_eq!(decode(0x7003), Some(Instruction::AddImmediate { x: 0, kk: 3 }));
        assert_eq!(
            decode(0x8014),
            Some(Instruction::Alu {
                op: AluOp::Add,
                x: 0,
                y: 1
            })
        );
        assert_eq!(
            decode(0x9120),
            Some(Instruction::SkipNeRegister { x: 1, y: 2 })
        );
        assert_eq!(decode(0xA123), Some(Instruction::SetIndex(0x123)));
        assert_eq!(decode(0xB123), Some(Instruction::JumpOffset(0x123)));
        assert_eq!(decode(0xC30F), Some(Instruction::Random { x: 3, kk: 0x0F }));
        assert_eq!(decode(0xD125), Some(Instruction::Draw { x: 1, y: 2, n: 5 }));
        assert_eq!(decode(0xE59E), Some(Instruction::SkipKeyPressed { x: 5 }));
        assert_eq!(decode(0xE5A1), Some(Instruction::SkipKeyNotPressed { x: 5 }));
        assert_eq!(
            decode(0xF633),
            Some(Instruction::Misc {
                op: MiscOp::StoreBcd,
                x: 6
            })
        );
    }

    #[test]
    fn rejects_unassigned_words() {
        for raw in [0x0000, 0x0123, 0x00E1, 0x8008, 0x800F, 0xE000, 0xE59F, 0xF000, 0xF5FF] {
            assert_eq!(decode(raw), None, "{raw:#06X}");
        }
    }

    #[test]
    fn disassembly() {
        let text = |raw| decode(raw).unwrap().to_string();
        assert_eq!(text(0x00E0), "CLS");
        assert_eq!(text(0x1228), "JP 0x228");
        assert_eq!(text(0x6A0C), "LD VA, 0x0C");
        assert_eq!(text(0x8AB5), "SUB VA, VB");
        assert_eq!(text(0x8A06), "SHR VA");
        assert_eq!(text(0xD015), "DRW V0, V1, 5");
        assert_eq!(text(0xFA65), "LD VA, [I]");
        assert_eq!(text(0xE3A1), "SKNP V3");
    }

    #[test]
    fn skips_compare_literal_values() {
        let mut state = Chip8State::new();
        state.registers.write(2, 5);
        let run = |state: &mut Chip8State, raw| decode(raw).unwrap().execute(state, &mut rng());

        assert_eq!(run(&mut state, 0x3205), Ok(Flow::Skip));
        assert_eq!(run(&mut state, 0x3206), Ok(Flow::Next));
        assert_eq!(run(&mut state, 0x4206), Ok(Flow::Skip));
        assert_eq!(run(&mut state, 0x4205), Ok(Flow::Next));

        state.registers.write(3, 5);
        assert_eq!(run(&mut state, 0x5230), Ok(Flow::Skip));
        assert_eq!(run(&mut state, 0x9230), Ok(Flow::Next));
        state.registers.write(3, 6);
        assert_eq!(run(&mut state, 0x5230), Ok(Flow::Next));
        assert_eq!(run(&mut state, 0x9230), Ok(Flow::Skip));
    }

    #[test]
    fn key_skips_follow_keypad() {
        let mut state = Chip8State::new();
        state.registers.write(1, 0x7);
        let mut rng = rng();

        let pressed = Instruction::SkipKeyPressed { x: 1 };
        let released = Instruction::SkipKeyNotPressed { x: 1 };
        assert_eq!(pressed.execute(&mut state, &mut rng), Ok(Flow::Next));
        assert_eq!(released.execute(&mut state, &mut rng), Ok(Flow::Skip));

        state.keypad.press_key(Key::Key7);
        assert_eq!(pressed.execute(&mut state, &mut rng), Ok(Flow::Skip));
        assert_eq!(released.execute(&mut state, &mut rng), Ok(Flow::Next));
    }

    #[test]
    fn random_is_masked() {
        let mut state = Chip8State::new();
        let mut rng = rng();
        for _ in 0..64 {
            Instruction::Random { x: 4, kk: 0x0F }
                .execute(&mut state, &mut rng)
                .unwrap();
            assert_eq!(state.registers.read(4) & 0xF0, 0);
        }
        Instruction::Random { x: 4, kk: 0x00 }
            .execute(&mut state, &mut rng)
            .unwrap();
        assert_eq!(state.registers.read(4), 0);
    }

    #[test]
    fn random_is_reproducible_with_the_same_seed() {
        let draw = |seed| {
            let mut state = Chip8State::new();
            let mut rng = StdRng::seed_from_u64(seed);
            (0..8)
                .map(|_| {
                    Instruction::Random { x: 0, kk: 0xFF }
                        .execute(&mut state, &mut rng)
                        .unwrap();
                    state.registers.read(0)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(1234), draw(1234));
    }

    #[test]
    fn draw_sets_and_clears_collision_flag() {
        let mut state = Chip8State::new();
        let mut rng = rng();
        state.index = 0;
        state.registers.write(0, 8);
        state.registers.write(1, 4);
        state.registers.write(0xF, 0x55);

        let draw = Instruction::Draw { x: 0, y: 1, n: 5 };
        assert_eq!(draw.execute(&mut state, &mut rng), Ok(Flow::Next));
        assert_eq!(state.registers.read(0xF), 0);
        assert!(state.display.pixel(8, 4));
        assert!(!state.display.pixel(9, 5));

        draw.execute(&mut state, &mut rng).unwrap();
        assert_eq!(state.registers.read(0xF), 1);
        assert!(state.display.is_blank());
    }

    #[test]
    fn draw_past_end_of_memory_faults() {
        let mut state = Chip8State::new();
        state.index = (MEM_SIZE - 2) as u16;
        let result = Instruction::Draw { x: 0, y: 0, n: 3 }.execute(&mut state, &mut rng());
        assert!(matches!(result, Err(Fault::MemoryOutOfBounds { .. })));
        assert!(state.display.is_blank());
    }

    #[test]
    fn call_depth_is_bounded() {
        let mut state = Chip8State::new();
        let mut rng = rng();
        for _ in 0..STACK_DEPTH {
            assert_eq!(
                Instruction::Call(0x300).execute(&mut state, &mut rng),
                Ok(Flow::Jump(0x300))
            );
        }
        assert_eq!(
            Instruction::Call(0x300).execute(&mut state, &mut rng),
            Err(Fault::StackOverflow { address: 0x200 })
        );
        assert_eq!(state.stack.len(), STACK_DEPTH);
    }

    #[test]
    fn return_on_empty_stack_faults() {
        let mut state = Chip8State::new();
        assert_eq!(
            Instruction::Return.execute(&mut state, &mut rng()),
            Err(Fault::StackUnderflow { address: 0x200 })
        );
    }
}
