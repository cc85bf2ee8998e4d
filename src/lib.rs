//! Interpreter core for the CHIP-8 virtual machine.
//!
//! [`Chip8State`] owns all machine state. [`step`] executes one instruction
//! against it; timing, input, rendering and program loading from disk belong
//! to the caller.

pub mod alu;
pub mod bits;
pub mod cpu;
pub mod display;
pub mod error;
pub mod instruction;
pub mod misc;
pub mod state;

pub use cpu::{Step, step};
pub use display::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer};
pub use error::Fault;
pub use instruction::{Instruction, decode};
pub use state::{Chip8State, Key, Keypad, Memory, RegisterBank};
