use bitvec::{BitArr, array::BitArray};

use crate::display::Framebuffer;
use crate::error::Fault;

pub type Timer = u8;
pub type Address = u16;
pub type CallStack = Vec<Address>;

pub const MEM_SIZE: usize = 4096;
pub const FONT_ADDR: usize = 0x000;
pub const FONT_HEIGHT: u16 = 5;
pub const PC_START_ADDR: Address = 0x200;
pub const NUM_REGISTERS: usize = 16;
pub const NUM_KEYS: usize = 16;
pub const STACK_DEPTH: usize = 16;
pub const INSTRUCTION_WIDTH: Address = 2;

/// Index of the flag register.
pub const VF: usize = 0xF;

const FONT_DATA: [u8; 16 * FONT_HEIGHT as usize] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// 4 KiB of byte-addressed RAM. The hex font occupies the first 80 bytes.
#[derive(Clone)]
pub struct Memory {
    data: [u8; MEM_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        let mut data = [0; MEM_SIZE];
        data[FONT_ADDR..FONT_ADDR + FONT_DATA.len()].copy_from_slice(&FONT_DATA);
        Memory { data }
    }

    pub fn read(&self, addr: usize) -> Result<u8, Fault> {
        self.data
            .get(addr)
            .copied()
            .ok_or(Fault::MemoryOutOfBounds { address: addr })
    }

    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), Fault> {
        let cell = self
            .data
            .get_mut(addr)
            .ok_or(Fault::MemoryOutOfBounds { address: addr })?;
        *cell = value;
        Ok(())
    }

    /// Borrows `len` bytes starting at `addr`, or faults naming the first
    /// address past the end of memory.
    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8], Fault> {
        self.data
            .get(addr..addr + len)
            .ok_or(Fault::MemoryOutOfBounds {
                address: addr.max(MEM_SIZE),
            })
    }

    pub fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], Fault> {
        self.data
            .get_mut(addr..addr + len)
            .ok_or(Fault::MemoryOutOfBounds {
                address: addr.max(MEM_SIZE),
            })
    }

    /// Reads the big-endian instruction word at `addr`.
    pub fn word(&self, addr: usize) -> Result<u16, Fault> {
        let bytes = self.slice(addr, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Fault> {
        let start = usize::from(PC_START_ADDR);
        let max = MEM_SIZE - start;
        if rom.len() > max {
            return Err(Fault::RomTooLarge {
                size: rom.len(),
                max,
            });
        }
        self.data[start..start + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8; MEM_SIZE] {
        &self.data
    }
}

/// The sixteen 8-bit V registers. `VF` doubles as the flag output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterBank {
    registers: [u8; NUM_REGISTERS],
}

impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: usize) -> u8 {
        self.registers[reg & 0x0F]
    }

    pub fn write(&mut self, reg: usize, value: u8) {
        self.registers[reg & 0x0F] = value;
    }

    pub fn set_flag(&mut self, flag: bool) {
        self.registers[VF] = u8::from(flag);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.registers
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.registers
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
}

impl Key {
    const ALL: [Key; NUM_KEYS] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
        Key::KeyA,
        Key::KeyB,
        Key::KeyC,
        Key::KeyD,
        Key::KeyE,
        Key::KeyF,
    ];

    /// Maps the low nibble of `value` onto a key; the high nibble is ignored.
    pub fn from_nibble(value: u8) -> Key {
        Self::ALL[usize::from(value & 0x0F)]
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Pressed state of the 16-key hex keypad, written by the input collaborator.
#[derive(Clone)]
pub struct Keypad {
    keys: BitArr!(for NUM_KEYS),
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            keys: BitArray::ZERO,
        }
    }

    pub fn press_key(&mut self, key: Key) {
        self.keys.set(usize::from(key.index()), true);
    }

    pub fn release_key(&mut self, key: Key) {
        self.keys.set(usize::from(key.index()), false);
    }

    pub fn release_all(&mut self) {
        self.keys.fill(false);
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys[usize::from(key.index())]
    }

    /// Lowest-numbered key currently held down.
    pub fn first_pressed(&self) -> Option<Key> {
        self.keys[..NUM_KEYS]
            .first_one()
            .map(|i| Key::from_nibble(i as u8))
    }
}

/// Complete machine state, owned by the run loop and threaded through
/// [`crate::cpu::step`] by exclusive reference.
#[derive(Clone)]
pub struct Chip8State {
    pub memory: Memory,
    pub registers: RegisterBank,
    pub pc: Address,
    pub index: Address,
    pub stack: CallStack,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    pub display: Framebuffer,
    pub keypad: Keypad,
}

impl Default for Chip8State {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8State {
    pub fn new() -> Self {
        Chip8State {
            memory: Memory::new(),
            registers: RegisterBank::new(),
            pc: PC_START_ADDR,
            index: 0,
            stack: Vec::with_capacity(STACK_DEPTH),
            delay_timer: 0,
            sound_timer: 0,
            display: Framebuffer::new(),
            keypad: Keypad::new(),
        }
    }

    /// Builds a fresh machine with `rom` loaded at the program start address.
    pub fn with_rom(rom: &[u8]) -> Result<Self, Fault> {
        let mut state = Self::new();
        state.memory.load_rom(rom)?;
        Ok(state)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// One 60 Hz tick of the delay and sound timers. Called by the timing
    /// driver; instruction execution never decrements the timers itself.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }
}
