//! Addressing modes.
//!
//! A mode is the shape of an instruction's operand list: the ordered sequence
//! of argument kinds. The encoder and the CPU decoder agree on the byte
//! layout per mode; the back-patcher additionally needs to know where the
//! address bytes sit inside the operands.

use std::fmt;

/// The kind of a single argument, as seen by mode resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// `$r` — a register.
    Register,
    /// An immediate byte (literal or label-byte reference).
    Immediate,
    /// `%addr` or `@label` — a 16-bit address.
    Address,
    /// `(zp)` — an indirect zero-page pointer.
    Indirect,
}

/// An addressing mode: one of the recognised argument-kind tuples.
///
/// Naming follows the operand order in source: `A` register, `K` immediate,
/// `P` address, `I` indirect. `Apb` and `Pab` share a byte layout (P then the
/// register pair) but differ in meaning; likewise `Apk`/`Pak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    O,
    A,
    K,
    P,
    Ab,
    Ak,
    Ap,
    Ka,
    Kk,
    Pa,
    Pk,
    Abc,
    Abk,
    Apb,
    Apk,
    Aib,
    Aik,
    Pab,
    Pak,
}

impl Mode {
    /// Resolve an ordered argument-kind sequence to a mode.
    ///
    /// Returns `None` if no instruction shape matches the sequence.
    pub fn from_args(kinds: &[ArgKind]) -> Option<Mode> {
        use ArgKind::{Address, Immediate, Indirect, Register};

        Some(match kinds {
            [] => Mode::O,
            [Register] => Mode::A,
            [Immediate] => Mode::K,
            [Address] => Mode::P,
            [Register, Register] => Mode::Ab,
            [Register, Immediate] => Mode::Ak,
            [Register, Address] => Mode::Ap,
            [Immediate, Register] => Mode::Ka,
            [Immediate, Immediate] => Mode::Kk,
            [Address, Register] => Mode::Pa,
            [Address, Immediate] => Mode::Pk,
            [Register, Register, Register] => Mode::Abc,
            [Register, Register, Immediate] => Mode::Abk,
            [Register, Address, Register] => Mode::Apb,
            [Register, Address, Immediate] => Mode::Apk,
            [Register, Indirect, Register] => Mode::Aib,
            [Register, Indirect, Immediate] => Mode::Aik,
            [Address, Register, Register] => Mode::Pab,
            [Address, Register, Immediate] => Mode::Pak,
            _ => return None,
        })
    }

    /// Number of operand bytes following the opcode byte.
    pub fn operand_len(self) -> u16 {
        match self {
            Mode::O => 0,
            Mode::A | Mode::K | Mode::Ab => 1,
            Mode::Ak | Mode::Ka | Mode::Kk | Mode::P | Mode::Abc | Mode::Abk | Mode::Aib => 2,
            Mode::Ap | Mode::Pa | Mode::Pk | Mode::Apb | Mode::Pab | Mode::Aik => 3,
            Mode::Apk | Mode::Pak => 4,
        }
    }

    /// Offset of the address low byte within the operand bytes, for modes
    /// that carry an address. The high byte follows immediately.
    pub fn addr_offset(self) -> Option<u16> {
        match self {
            Mode::P | Mode::Pa | Mode::Pk | Mode::Apb | Mode::Pab | Mode::Apk | Mode::Pak => {
                Some(0)
            }
            Mode::Ap => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::O => "O",
            Mode::A => "A",
            Mode::K => "K",
            Mode::P => "P",
            Mode::Ab => "AB",
            Mode::Ak => "AK",
            Mode::Ap => "AP",
            Mode::Ka => "KA",
            Mode::Kk => "KK",
            Mode::Pa => "PA",
            Mode::Pk => "PK",
            Mode::Abc => "ABC",
            Mode::Abk => "ABK",
            Mode::Apb => "APB",
            Mode::Apk => "APK",
            Mode::Aib => "AIB",
            Mode::Aik => "AIK",
            Mode::Pab => "PAB",
            Mode::Pak => "PAK",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArgKind::{Address, Immediate, Indirect, Register};

    #[test]
    fn resolves_all_tuples() {
        assert_eq!(Mode::from_args(&[]), Some(Mode::O));
        assert_eq!(Mode::from_args(&[Register]), Some(Mode::A));
        assert_eq!(Mode::from_args(&[Immediate]), Some(Mode::K));
        assert_eq!(Mode::from_args(&[Address]), Some(Mode::P));
        assert_eq!(Mode::from_args(&[Register, Address]), Some(Mode::Ap));
        assert_eq!(
            Mode::from_args(&[Register, Indirect, Immediate]),
            Some(Mode::Aik)
        );
        assert_eq!(
            Mode::from_args(&[Address, Register, Register]),
            Some(Mode::Pab)
        );
    }

    #[test]
    fn rejects_unknown_tuples() {
        assert_eq!(Mode::from_args(&[Indirect]), None);
        assert_eq!(Mode::from_args(&[Address, Address]), None);
        assert_eq!(Mode::from_args(&[Register, Register, Address]), None);
        assert_eq!(
            Mode::from_args(&[Register, Register, Register, Register]),
            None
        );
    }

    #[test]
    fn operand_lengths_match_layouts() {
        assert_eq!(Mode::O.operand_len(), 0);
        assert_eq!(Mode::Ab.operand_len(), 1);
        assert_eq!(Mode::Aib.operand_len(), 2); // packed pair + indirect byte
        assert_eq!(Mode::Apb.operand_len(), 3); // address + packed pair
        assert_eq!(Mode::Pak.operand_len(), 4); // address + register + immediate
    }

    #[test]
    fn address_offsets() {
        assert_eq!(Mode::P.addr_offset(), Some(0));
        assert_eq!(Mode::Ap.addr_offset(), Some(1));
        assert_eq!(Mode::Apb.addr_offset(), Some(0)); // emitted address-first
        assert_eq!(Mode::Ab.addr_offset(), None);
    }
}
