/// Faults raised while loading a program or executing a single step.
///
/// A step that faults leaves the machine untouched, so the program counter
/// still names the instruction that could not run. Loading a program that
/// does not fit leaves memory untouched as well.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("unknown opcode {word:#06X} at {address:#05X}")]
    UnknownOpcode { address: u16, word: u16 },

    #[error("stack underflow: return at {address:#05X} with an empty call stack")]
    StackUnderflow { address: u16 },

    #[error("stack overflow: call at {address:#05X} exceeds the nesting limit")]
    StackOverflow { address: u16 },

    #[error("memory access out of bounds at {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("program counter out of bounds: {address:#06X}")]
    ProgramCounterOutOfBounds { address: usize },

    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },
}
