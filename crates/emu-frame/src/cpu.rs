//! FRAME CPU: fetch-decode-execute over the shared opcode table.
//!
//! One `step()` is one instruction. Operand bytes are consumed through the
//! same byte reader as the opcode, so a fetch crossing the input register
//! sees the live value like any other read.
//!
//! Register 0 always reads 0; register 16 is the stack pointer. Zero and
//! Negative track every register and memory write; `equ`/`lss`/`chy`/`not`
//! overwrite Zero afterwards as the condition flag.

use frame_asm::{Mode, Opcode};
use frame_core::Bus;
use thiserror::Error;

use crate::flags::{Status, C, I, Z};
use crate::memory::{IRQ_VECTOR, STACK_PAGE};

/// Number of registers: R0 (zero), R1-R15, R16 (stack pointer).
pub const NUM_REGS: usize = 17;

/// Index of the stack pointer register.
pub const SP: usize = 16;

/// Encoded register byte for the stack pointer in single-register slots.
const SP_BYTE: u8 = 0x10;

/// Outcome of one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Instruction completed, carry on.
    Normal,
    /// `hlt` - the scheduler should pause.
    Halt,
    /// `hlt $r` / `hlt k` - reserved syscall with its number.
    Syscall(u8),
}

/// A fatal CPU fault. Execution stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("invalid opcode {opcode:#04x} at {pc:#06x}")]
    InvalidOpcode { opcode: u8, pc: u16 },
}

/// The FRAME CPU.
#[derive(Debug)]
pub struct Cpu {
    regs: [u8; NUM_REGS],
    pc: u16,
    status: Status,
}

impl Cpu {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: [0; NUM_REGS],
            pc: 0,
            status: Status::new(),
        }
    }

    /// Reset registers, flags, and PC to zero.
    pub fn reset(&mut self) {
        self.regs = [0; NUM_REGS];
        self.pc = 0;
        self.status = Status::new();
    }

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Read a register. R0 always reads 0.
    #[must_use]
    pub fn reg(&self, index: usize) -> u8 {
        self.regs[index]
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Is the interrupt-enable flag set?
    #[must_use]
    pub fn interrupts_enabled(&self) -> bool {
        self.status.is_set(I)
    }

    /// Write a register. Writes to R0 are discarded but still update the
    /// flags from the resulting value (0, so Zero is set).
    fn write_reg(&mut self, index: usize, value: u8) {
        let stored = if index == 0 { 0 } else { value };
        self.regs[index] = stored;
        self.status.update_nz(stored);
    }

    /// Write a memory byte and update Z/N from the value.
    fn write_mem<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u8) {
        bus.write(addr, value);
        self.status.update_nz(value);
    }

    // -----------------------------------------------------------------------
    // Operand fetching
    // -----------------------------------------------------------------------

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let byte = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    /// Decode a single-register operand byte: the full index, with `$s`
    /// encoded as `0x10`.
    fn reg_index(byte: u8) -> usize {
        if byte == SP_BYTE {
            SP
        } else {
            usize::from(byte & 0x0F)
        }
    }

    fn fetch_reg<B: Bus>(&mut self, bus: &mut B) -> usize {
        let byte = self.fetch(bus);
        Self::reg_index(byte)
    }

    /// Decode a packed register pair: low nibble first, high nibble second.
    fn fetch_pair<B: Bus>(&mut self, bus: &mut B) -> (usize, usize) {
        let byte = self.fetch(bus);
        (usize::from(byte & 0x0F), usize::from(byte >> 4))
    }

    fn fetch_addr<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Read the 16-bit base pointer at zero-page `zp` (high byte wraps
    /// within the page) and offset it.
    fn indirect_addr<B: Bus>(&mut self, bus: &mut B, zp: u8, offset: u8) -> u16 {
        let lo = bus.read(u16::from(zp));
        let hi = bus.read(u16::from(zp.wrapping_add(1)));
        let base = u16::from(lo) | (u16::from(hi) << 8);
        base.wrapping_add(u16::from(offset))
    }

    // -----------------------------------------------------------------------
    // Stack
    // -----------------------------------------------------------------------

    /// Push a byte: write at `$0100 + SP`, then increment SP. The pointer
    /// wraps within the stack page.
    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        let sp = self.regs[SP];
        self.write_mem(bus, STACK_PAGE + u16::from(sp), value);
        self.regs[SP] = sp.wrapping_add(1);
    }

    /// Pop a byte: decrement SP, then read at `$0100 + SP`.
    fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let sp = self.regs[SP].wrapping_sub(1);
        self.regs[SP] = sp;
        bus.read(STACK_PAGE + u16::from(sp))
    }

    /// Push a 16-bit value MSB first, so the LSB sits on top and pops in
    /// low-then-high order.
    fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, (value & 0xFF) as u8);
    }

    fn pop_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.pop(bus);
        let hi = self.pop(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    // -----------------------------------------------------------------------
    // Interrupt entry
    // -----------------------------------------------------------------------

    /// Force a call through the IRQ vector: push the current PC, then load
    /// PC from `$FFFC/$FFFD`. Does not touch the interrupt-enable flag.
    pub fn irq<B: Bus>(&mut self, bus: &mut B) {
        self.push_word(bus, self.pc);
        let lo = bus.read(IRQ_VECTOR);
        let hi = bus.read(IRQ_VECTOR.wrapping_add(1));
        self.pc = u16::from(lo) | (u16::from(hi) << 8);
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Execute one instruction.
    ///
    /// # Errors
    ///
    /// Returns `CpuError::InvalidOpcode` for a byte outside the opcode
    /// table; the PC reported is the address the byte was fetched from.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<Step, CpuError> {
        let at = self.pc;
        let byte = self.fetch(bus);
        let Some(opcode) = Opcode::from_byte(byte) else {
            return Err(CpuError::InvalidOpcode { opcode: byte, pc: at });
        };

        match opcode {
            Opcode::HltO => return Ok(Step::Halt),
            Opcode::HltA => {
                let r = self.fetch_reg(bus);
                return Ok(Step::Syscall(self.regs[r]));
            }
            Opcode::HltK => {
                let k = self.fetch(bus);
                return Ok(Step::Syscall(k));
            }

            Opcode::MovAb => {
                let (a, b) = self.fetch_pair(bus);
                self.write_reg(a, self.regs[b]);
            }
            Opcode::MovAk => {
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                self.write_reg(a, k);
            }
            Opcode::MovAp => {
                let a = self.fetch_reg(bus);
                let addr = self.fetch_addr(bus);
                let value = bus.read(addr);
                self.write_reg(a, value);
            }
            Opcode::MovPa => {
                let addr = self.fetch_addr(bus);
                let a = self.fetch_reg(bus);
                self.write_mem(bus, addr, self.regs[a]);
            }
            Opcode::MovPk => {
                let addr = self.fetch_addr(bus);
                let k = self.fetch(bus);
                self.write_mem(bus, addr, k);
            }
            Opcode::MovApb => {
                let addr = self.fetch_addr(bus);
                let (a, b) = self.fetch_pair(bus);
                let value = bus.read(addr.wrapping_add(u16::from(self.regs[b])));
                self.write_reg(a, value);
            }
            Opcode::MovApk => {
                let addr = self.fetch_addr(bus);
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                let value = bus.read(addr.wrapping_add(u16::from(k)));
                self.write_reg(a, value);
            }
            Opcode::MovPab => {
                let addr = self.fetch_addr(bus);
                let (a, b) = self.fetch_pair(bus);
                let dest = addr.wrapping_add(u16::from(self.regs[a]));
                self.write_mem(bus, dest, self.regs[b]);
            }
            Opcode::MovPak => {
                let addr = self.fetch_addr(bus);
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                let dest = addr.wrapping_add(u16::from(self.regs[a]));
                self.write_mem(bus, dest, k);
            }
            Opcode::MovAib => {
                let (a, b) = self.fetch_pair(bus);
                let zp = self.fetch(bus);
                let addr = self.indirect_addr(bus, zp, self.regs[b]);
                let value = bus.read(addr);
                self.write_reg(a, value);
            }
            Opcode::MovAik => {
                let a = self.fetch_reg(bus);
                let zp = self.fetch(bus);
                let k = self.fetch(bus);
                let addr = self.indirect_addr(bus, zp, k);
                let value = bus.read(addr);
                self.write_reg(a, value);
            }

            Opcode::JmpP | Opcode::JmpPa | Opcode::JmpPk => {
                let target = self.branch_target(bus, opcode.mode());
                self.pc = target;
            }
            Opcode::BrtP | Opcode::BrtPa | Opcode::BrtPk => {
                let target = self.branch_target(bus, opcode.mode());
                if self.status.is_set(Z) {
                    self.pc = target;
                }
            }
            Opcode::BrfP | Opcode::BrfPa | Opcode::BrfPk => {
                let target = self.branch_target(bus, opcode.mode());
                if !self.status.is_set(Z) {
                    self.pc = target;
                }
            }

            Opcode::EquAb => {
                let (a, b) = self.fetch_pair(bus);
                let equal = self.regs[a] == self.regs[b];
                self.status.set_if(Z, equal);
            }
            Opcode::EquAk => {
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                let equal = self.regs[a] == k;
                self.status.set_if(Z, equal);
            }
            Opcode::EquKa => {
                let k = self.fetch(bus);
                let a = self.fetch_reg(bus);
                let equal = k == self.regs[a];
                self.status.set_if(Z, equal);
            }
            Opcode::EquKk => {
                let k1 = self.fetch(bus);
                let k2 = self.fetch(bus);
                self.status.set_if(Z, k1 == k2);
            }
            Opcode::LssAb => {
                let (a, b) = self.fetch_pair(bus);
                let less = self.regs[a] < self.regs[b];
                self.status.set_if(Z, less);
            }
            Opcode::LssAk => {
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                let less = self.regs[a] < k;
                self.status.set_if(Z, less);
            }
            Opcode::LssKa => {
                let k = self.fetch(bus);
                let a = self.fetch_reg(bus);
                let less = k < self.regs[a];
                self.status.set_if(Z, less);
            }
            Opcode::LssKk => {
                let k1 = self.fetch(bus);
                let k2 = self.fetch(bus);
                self.status.set_if(Z, k1 < k2);
            }

            Opcode::AndAb | Opcode::OrAb | Opcode::XorAb => {
                let (a, b) = self.fetch_pair(bus);
                let value = Self::bitwise(opcode, self.regs[a], self.regs[b]);
                self.write_reg(a, value);
            }
            Opcode::AndAk | Opcode::OrAk | Opcode::XorAk => {
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                let value = Self::bitwise(opcode, self.regs[a], k);
                self.write_reg(a, value);
            }
            Opcode::AndAbc | Opcode::OrAbc | Opcode::XorAbc => {
                let (a, b) = self.fetch_pair(bus);
                let c = self.fetch_reg(bus);
                let value = Self::bitwise(opcode, self.regs[b], self.regs[c]);
                self.write_reg(a, value);
            }
            Opcode::AndAbk | Opcode::OrAbk | Opcode::XorAbk => {
                let (a, b) = self.fetch_pair(bus);
                let k = self.fetch(bus);
                let value = Self::bitwise(opcode, self.regs[b], k);
                self.write_reg(a, value);
            }

            Opcode::NotO => {
                let z = !self.status.is_set(Z);
                self.status.set_if(Z, z);
            }
            Opcode::NotA => {
                // Invert Zero and copy the result into the register. The
                // register write recomputes Z from the stored value, so the
                // condition flag is restated afterwards.
                let a = self.fetch_reg(bus);
                let z = !self.status.is_set(Z);
                self.write_reg(a, u8::from(z));
                self.status.set_if(Z, z);
            }
            Opcode::NotAb => {
                let (a, b) = self.fetch_pair(bus);
                self.write_reg(a, !self.regs[b]);
            }
            Opcode::NotAk => {
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                self.write_reg(a, !k);
            }

            Opcode::LshA => {
                let a = self.fetch_reg(bus);
                let value = self.regs[a];
                self.status.set_if(C, value & 0x80 != 0);
                self.write_reg(a, value << 1);
            }
            Opcode::RshA => {
                let a = self.fetch_reg(bus);
                let value = self.regs[a];
                self.status.set_if(C, value & 0x01 != 0);
                self.write_reg(a, value >> 1);
            }
            Opcode::RolA => {
                let a = self.fetch_reg(bus);
                let value = self.regs[a];
                let carry_in = u8::from(self.status.is_set(C));
                self.status.set_if(C, value & 0x80 != 0);
                self.write_reg(a, (value << 1) | carry_in);
            }
            Opcode::RorA => {
                let a = self.fetch_reg(bus);
                let value = self.regs[a];
                let carry_in = u8::from(self.status.is_set(C));
                self.status.set_if(C, value & 0x01 != 0);
                self.write_reg(a, (value >> 1) | (carry_in << 7));
            }

            Opcode::AddAb => {
                let (a, b) = self.fetch_pair(bus);
                self.add(a, self.regs[a], self.regs[b]);
            }
            Opcode::AddAk => {
                let a = self.fetch_reg(bus);
                let k = self.fetch(bus);
                self.add(a, self.regs[a], k);
            }
            Opcode::AddAbc => {
                let (a, b) = self.fetch_pair(bus);
                let c = self.fetch_reg(bus);
                self.add(a, self.regs[b], self.regs[c]);
            }
            Opcode::AddAbk => {
                let (a, b) = self.fetch_pair(bus);
                let k = self.fetch(bus);
                self.add(a, self.regs[b], k);
            }

            Opcode::IncA => {
                let a = self.fetch_reg(bus);
                self.write_reg(a, self.regs[a].wrapping_add(1));
            }
            Opcode::DecA => {
                let a = self.fetch_reg(bus);
                self.write_reg(a, self.regs[a].wrapping_sub(1));
            }

            Opcode::CallP => {
                let target = self.fetch_addr(bus);
                self.push_word(bus, self.pc);
                self.pc = target;
            }
            Opcode::RetO => {
                self.pc = self.pop_word(bus);
            }

            Opcode::PushA => {
                let a = self.fetch_reg(bus);
                self.push(bus, self.regs[a]);
            }
            Opcode::PushK => {
                let k = self.fetch(bus);
                self.push(bus, k);
            }
            Opcode::PopO => {
                let _ = self.pop(bus);
            }
            Opcode::PopA => {
                let a = self.fetch_reg(bus);
                let value = self.pop(bus);
                self.write_reg(a, value);
            }

            Opcode::SeiO => self.status.set(I),
            Opcode::SeiA => {
                let a = self.fetch_reg(bus);
                let enable = self.regs[a] != 0;
                self.status.set_if(I, enable);
            }
            Opcode::SeiK => {
                let k = self.fetch(bus);
                self.status.set_if(I, k != 0);
            }

            Opcode::ChyO => {
                let carry = self.status.is_set(C);
                self.status.set_if(Z, carry);
            }
        }

        Ok(Step::Normal)
    }

    /// Fetch the operands of a jump/branch and compute the target. The
    /// operands are always consumed, branch taken or not.
    fn branch_target<B: Bus>(&mut self, bus: &mut B, mode: Mode) -> u16 {
        let addr = self.fetch_addr(bus);
        match mode {
            Mode::P => addr,
            Mode::Pa => {
                let a = self.fetch_reg(bus);
                addr.wrapping_add(u16::from(self.regs[a]))
            }
            Mode::Pk => {
                let k = self.fetch(bus);
                addr.wrapping_add(u16::from(k))
            }
            _ => unreachable!("jumps only decode P, PA, PK"),
        }
    }

    fn bitwise(opcode: Opcode, lhs: u8, rhs: u8) -> u8 {
        use frame_asm::Mnemonic;
        match opcode.mnemonic() {
            Mnemonic::And => lhs & rhs,
            Mnemonic::Or => lhs | rhs,
            Mnemonic::Xor => lhs ^ rhs,
            _ => unreachable!("bitwise dispatch only sees and/or/xor"),
        }
    }

    /// 8-bit add: Carry on unsigned overflow, result wraps.
    fn add(&mut self, dest: usize, lhs: u8, rhs: u8) {
        let sum = u16::from(lhs) + u16::from(rhs);
        self.status.set_if(C, sum > 0xFF);
        self.write_reg(dest, (sum & 0xFF) as u8);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
