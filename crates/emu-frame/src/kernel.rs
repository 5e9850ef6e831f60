//! The FRAME kernel.
//!
//! A fixed assembly program in the `$E000-$E6FF` region, assembled once at
//! machine construction and copied back into memory on every reset. Its
//! exported labels and defines are seeded into user-program assembly so
//! guest code can `call @ktxt_putch` and friends by name.

use std::collections::HashMap;

use frame_asm::{AsmError, Assembler, TokenKind};

use crate::memory::{Memory, KERNEL_BASE, KERNEL_END};

/// The kernel source, embedded in the binary.
pub const KERNEL_SOURCE: &str = include_str!("kernel.asm");

/// The assembled kernel image and its exported symbols.
pub struct Kernel {
    image: Vec<u8>,
    labels: HashMap<String, u16>,
    defines: HashMap<String, TokenKind>,
}

impl Kernel {
    /// Assemble the kernel. Failure here is fatal at startup.
    ///
    /// # Errors
    ///
    /// Returns the assembler error; there is no fallback kernel.
    pub fn assemble() -> Result<Self, AsmError> {
        let program = Assembler::new().assemble(KERNEL_SOURCE)?;
        // Local loop labels stay private; everything else is the kernel API.
        let mut labels = program.labels;
        labels.retain(|name, _| !name.starts_with('_'));
        let image = program.image[usize::from(KERNEL_BASE)..usize::from(KERNEL_END)].to_vec();
        Ok(Self {
            image,
            labels,
            defines: program.defines,
        })
    }

    /// Exported labels (routine entry points).
    #[must_use]
    pub fn labels(&self) -> &HashMap<String, u16> {
        &self.labels
    }

    /// Exported defines (register conventions, memory-map names).
    #[must_use]
    pub fn defines(&self) -> &HashMap<String, TokenKind> {
        &self.defines
    }

    /// Copy the kernel image into the kernel region.
    pub fn install(&self, memory: &mut Memory) {
        memory.load(KERNEL_BASE, &self.image);
    }
}
