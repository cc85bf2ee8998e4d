//! Operand extraction for 16-bit instruction words.
//!
//! Every function here is total over `u16`: there is no such thing as an
//! undecodable word at this layer. Deciding whether a combination of fields
//! names a real instruction is the decoder's job.

/// Returns the nibble at `pos`, counting from the most significant nibble.
///
/// # Panics
/// If `pos > 3`.
pub fn nibble(word: u16, pos: u8) -> u8 {
    assert!(pos <= 3, "nibble position out of range: {pos}");
    let shift = 4 * (3 - u32::from(pos));
    ((word >> shift) & 0x0F) as u8
}

/// Opcode family selector.
pub fn family(word: u16) -> u8 {
    nibble(word, 0)
}

pub fn x(word: u16) -> usize {
    usize::from(nibble(word, 1))
}

pub fn y(word: u16) -> usize {
    usize::from(nibble(word, 2))
}

pub fn n(word: u16) -> u8 {
    nibble(word, 3)
}

/// Low byte, the 8-bit immediate `kk`.
pub fn low_byte(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Low twelve bits, the address immediate `nnn`.
pub fn low_twelve(word: u16) -> u16 {
    word & 0x0FFF
}

/// All operand fields of a word, extracted once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// First nibble. Represents the operation code.
    pub opcode: u8,
    /// Second nibble. Used to look up one of the 16 registers.
    pub x: usize,
    /// Third nibble. Used to look up one of the 16 registers.
    pub y: usize,
    /// Fourth nibble. A 4-bit number.
    pub n: u8,
    /// The second byte (third and fourth nibbles). An 8-bit immediate number.
    pub kk: u8,
    /// The second, third, and fourth nibbles. A 12-bit immediate address.
    pub nnn: u16,
}

impl DecodedInstruction {
    pub fn new(raw: u16) -> Self {
        DecodedInstruction {
            opcode: family(raw),
            x: x(raw),
            y: y(raw),
            n: n(raw),
            kk: low_byte(raw),
            nnn: low_twelve(raw),
        }
    }
}
