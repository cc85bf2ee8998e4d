//! Register-to-register operations of the `8xyN` family.

use std::fmt;

use crate::state::RegisterBank;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    /// `Vx = Vy`
    Assign,
    Or,
    And,
    Xor,
    /// `Vx += Vy`, VF = carry
    Add,
    /// `Vx -= Vy`, VF = not borrow
    Sub,
    /// `Vx >>= 1`, VF = shifted-out bit
    ShiftRight,
    /// `Vx = Vy - Vx`, VF = not borrow
    SubReverse,
    /// `Vx <<= 1`, VF = shifted-out bit
    ShiftLeft,
}

/// Outcome of an ALU operation: the new `Vx`, plus the flag to store in VF
/// if the operation defines one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flag: Option<bool>,
}

impl AluOp {
    /// Selects the operation from the low nibble of an `8xyN` word.
    pub fn from_nibble(n: u8) -> Option<Self> {
        match n {
            0x0 => Some(AluOp::Assign),
            0x1 => Some(AluOp::Or),
            0x2 => Some(AluOp::And),
            0x3 => Some(AluOp::Xor),
            0x4 => Some(AluOp::Add),
            0x5 => Some(AluOp::Sub),
            0x6 => Some(AluOp::ShiftRight),
            0x7 => Some(AluOp::SubReverse),
            0xE => Some(AluOp::ShiftLeft),
            _ => None,
        }
    }

    pub fn nibble(self) -> u8 {
        match self {
            AluOp::Assign => 0x0,
            AluOp::Or => 0x1,
            AluOp::And => 0x2,
            AluOp::Xor => 0x3,
            AluOp::Add => 0x4,
            AluOp::Sub => 0x5,
            AluOp::ShiftRight => 0x6,
            AluOp::SubReverse => 0x7,
            AluOp::ShiftLeft => 0xE,
        }
    }

    /// Computes the operation on the values of `Vx` and `Vy`.
    pub fn eval(self, vx: u8, vy: u8) -> AluResult {
        let (value, flag) = match self {
            AluOp::Assign => (vy, None),
            AluOp::Or => (vx | vy, None),
            AluOp::And => (vx & vy, None),
            AluOp::Xor => (vx ^ vy, None),
            AluOp::Add => {
                let (sum, carry) = vx.overflowing_add(vy);
                (sum, Some(carry))
            }
            AluOp::Sub => (vx.wrapping_sub(vy), Some(vx > vy)),
            AluOp::ShiftRight => (vx >> 1, Some(vx & 0x01 == 1)),
            AluOp::SubReverse => (vy.wrapping_sub(vx), Some(vy > vx)),
            AluOp::ShiftLeft => (vx << 1, Some(vx & 0x80 != 0)),
        };
        AluResult { value, flag }
    }

    /// Applies the operation to the register file. The result is written
    /// before the flag, so `x = 0xF` ends up holding the flag.
    pub fn execute(self, registers: &mut RegisterBank, x: usize, y: usize) {
        let result = self.eval(registers.read(x), registers.read(y));
        registers.write(x, result.value);
        if let Some(flag) = result.flag {
            registers.set_flag(flag);
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Assign => "LD",
            AluOp::Or => "OR",
            AluOp::And => "AND",
            AluOp::Xor => "XOR",
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::ShiftRight => "SHR",
            AluOp::SubReverse => "SUBN",
            AluOp::ShiftLeft => "SHL",
        }
    }
}

impl fmt::Display for AluOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VF;

    fn result(value: u8, flag: bool) -> AluResult {
        AluResult {
            value,
            flag: Some(flag),
        }
    }

    #[test]
    fn nibble_mapping_covers_known_keys_only() {
        for n in 0..=0xF {
            match AluOp::from_nibble(n) {
                Some(op) => assert_eq!(op.nibble(), n),
                None => assert!(matches!(n, 0x8..=0xD | 0xF)),
            }
        }
    }

    #[test]
    fn bitwise_ops_leave_flag_alone() {
        for op in [AluOp::Assign, AluOp::Or, AluOp::And, AluOp::Xor] {
            assert_eq!(op.eval(0b1100, 0b1010).flag, None);
        }
        assert_eq!(AluOp::Assign.eval(1, 2).value, 2);
        assert_eq!(AluOp::Or.eval(0b1100, 0b1010).value, 0b1110);
        assert_eq!(AluOp::And.eval(0b1100, 0b1010).value, 0b1000);
        assert_eq!(AluOp::Xor.eval(0b1100, 0b1010).value, 0b0110);
    }

    #[test]
    fn add_wraps_and_reports_carry() {
        assert_eq!(AluOp::Add.eval(250, 10), result(4, true));
        assert_eq!(AluOp::Add.eval(200, 55), result(255, false));
    }

    #[test]
    fn sub_flag_is_strictly_greater() {
        assert_eq!(AluOp::Sub.eval(10, 3), result(7, true));
        assert_eq!(AluOp::Sub.eval(3, 10), result(249, false));
        assert_eq!(AluOp::Sub.eval(5, 5), result(0, false));
        assert_eq!(AluOp::SubReverse.eval(3, 10), result(7, true));
        assert_eq!(AluOp::SubReverse.eval(10, 3), result(249, false));
    }

    #[test]
    fn shifts_flag_the_pre_shift_bit() {
        assert_eq!(AluOp::ShiftRight.eval(0b0000_0011, 0xFF), result(0b0000_0001, true));
        assert_eq!(AluOp::ShiftRight.eval(0b1000_0000, 0xFF), result(0b0100_0000, false));
        assert_eq!(AluOp::ShiftLeft.eval(0b1000_0001, 0), result(0b0000_0010, true));
        assert_eq!(AluOp::ShiftLeft.eval(0b0100_0000, 0), result(0b1000_0000, false));
    }

    #[test]
    fn execute_writes_value_then_flag() {
        let mut regs = RegisterBank::new();
        regs.write(0, 250);
        regs.write(1, 10);
        regs.write(VF, 0x77);
        AluOp::Add.execute(&mut regs, 0, 1);
        assert_eq!(regs.read(0), 4);
        assert_eq!(regs.read(VF), 1);

        regs.write(VF, 0x77);
        AluOp::Or.execute(&mut regs, 0, 1);
        assert_eq!(regs.read(VF), 0x77);

        regs.write(VF, 0x80);
        AluOp::ShiftLeft.execute(&mut regs, VF, 0);
        assert_eq!(regs.read(VF), 1);
    }
}
