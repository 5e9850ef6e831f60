//! FRAME fantasy console emulator.
//!
//! A small deterministic 8-bit machine: 64 KiB of memory, 16 general
//! registers plus a stack pointer, a 64×64 one-bit framebuffer driven by an
//! 8×8 text mode, memory-mapped input, and a periodic interrupt. Programs
//! are built with the `frame-asm` assembler; the kernel in `kernel.asm`
//! provides text helpers that user code calls by name.

mod bus;
pub mod capture;
mod config;
mod cpu;
mod flags;
pub mod font;
mod frame;
mod input;
mod kernel;
pub mod keyboard_map;
mod memory;
mod video;

pub use bus::FrameBus;
pub use config::FrameConfig;
pub use cpu::{Cpu, CpuError, Step, NUM_REGS, SP};
pub use flags::{Status, C, I, N, Z};
pub use frame::{Frame, MachineError, RunState, SyscallHandler};
pub use input::{Button, InputState};
pub use kernel::{Kernel, KERNEL_SOURCE};
pub use memory::{
    Memory, FONT_BASE, FRAMEBUFFER, FRAMEBUFFER_LEN, INPUT_REG, IRQ_VECTOR, KERNEL_BASE,
    KERNEL_END, MEMORY_SIZE, RESET_VECTOR, STACK_PAGE, TEXT_BUFFER, TEXT_CURSOR, USER_BASE,
    USER_END,
};
pub use video::{BufferSurface, TextRenderer, DISPLAY_SIZE};
