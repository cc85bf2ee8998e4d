//! The fetch-decode-execute step.

use log::{trace, warn};
use rand::Rng;

use crate::error::Fault;
use crate::instruction::{Flow, decode};
use crate::state::{Address, Chip8State, INSTRUCTION_WIDTH, MEM_SIZE};

/// What a successful step asks of the run loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// An instruction ran; keep going.
    Continue,
    /// An instruction ran and changed the framebuffer.
    Redraw,
    /// The machine is blocked on `Fx0A`. The program counter was not moved;
    /// step again once the keypad changes.
    WaitingForKey,
}

/// Program counter arithmetic stays inside the 4 KiB address space.
pub fn wrap_address(address: usize) -> Address {
    (address % MEM_SIZE) as Address
}

/// Fetches the word at the program counter, executes it and moves the
/// program counter as the instruction's [`Flow`] asks.
///
/// On `Err` the state is exactly as it was before the call and `pc` still
/// names the offending instruction.
pub fn step<R: Rng>(state: &mut Chip8State, rng: &mut R) -> Result<Step, Fault> {
    let address = state.pc;
    let result = execute_at(state, address, rng);
    if let Err(fault) = &result {
        warn!("{fault}");
    }
    result
}

fn execute_at<R: Rng>(
    state: &mut Chip8State,
    address: Address,
    rng: &mut R,
) -> Result<Step, Fault> {
    let word = state
        .memory
        .word(usize::from(address))
        .map_err(|_| Fault::ProgramCounterOutOfBounds {
            address: usize::from(address),
        })?;
    let instruction = decode(word).ok_or(Fault::UnknownOpcode { address, word })?;
    trace!("{address:#05X}: {word:04X}  {instruction}");

    let advance = |width: Address| wrap_address(usize::from(address) + usize::from(width));
    let (pc, outcome) = match instruction.execute(state, rng)? {
        Flow::Next => (advance(INSTRUCTION_WIDTH), Step::Continue),
        Flow::Skip => (advance(2 * INSTRUCTION_WIDTH), Step::Continue),
        Flow::Jump(target) => (wrap_address(usize::from(target)), Step::Continue),
        Flow::WaitForKey => (address, Step::WaitingForKey),
    };
    state.pc = pc;

    if instruction.touches_display() {
        Ok(Step::Redraw)
    } else {
        Ok(outcome)
    }
}
