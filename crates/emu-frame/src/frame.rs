//! The FRAME console.
//!
//! Owns the CPU, bus, renderer, and host surface, and implements the
//! scheduler state machine. The host drives it in batches: every tick
//! interval, `run_batch()` executes up to the configured quantum of cycles.
//! Interrupts are injected only at cycle boundaries, once per interrupt
//! period, and only while the guest keeps the interrupt-enable flag set.
//! Each interrupt renders the text buffer before the vectored call.

use frame_asm::{AsmError, Assembler, Program};
use frame_core::{Bus as _, Observable, Surface, Tickable, Value};
use thiserror::Error;

use crate::bus::FrameBus;
use crate::config::FrameConfig;
use crate::cpu::{Cpu, CpuError, Step, SP};
use crate::flags::{C, I, N, Z};
use crate::font;
use crate::input::Button;
use crate::kernel::Kernel;
use crate::memory::{Memory, FONT_BASE, IRQ_VECTOR, RESET_VECTOR, USER_END};
use crate::video::TextRenderer;

/// A fatal machine setup error.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("kernel assembly failed: {0}")]
    Kernel(#[from] AsmError),
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not ticking; `run` starts from the reset vector.
    Stopped,
    /// Ticking.
    Running,
    /// Ticking suspended; `pause` resumes where it left off.
    Paused,
}

/// Handler for the reserved `hlt $r` / `hlt k` syscall forms.
///
/// Returns true if the machine should pause. The default handler ignores
/// the syscall number and pauses, making the forms behave like plain `hlt`.
pub trait SyscallHandler {
    fn syscall(&mut self, number: u8) -> bool;
}

struct PauseOnSyscall;

impl SyscallHandler for PauseOnSyscall {
    fn syscall(&mut self, _number: u8) -> bool {
        true
    }
}

/// The FRAME console.
pub struct Frame<S: Surface> {
    cpu: Cpu,
    bus: FrameBus,
    renderer: TextRenderer,
    surface: S,
    kernel: Kernel,
    syscalls: Box<dyn SyscallHandler>,
    config: FrameConfig,
    state: RunState,
    /// Cycles executed since `run` (or the last program load).
    cycles: u64,
    last_error: Option<CpuError>,
}

impl<S: Surface> Frame<S> {
    /// Build a console: assembles the kernel and installs it along with the
    /// font.
    ///
    /// # Errors
    ///
    /// Fails if the kernel source does not assemble.
    pub fn new(config: FrameConfig, surface: S) -> Result<Self, MachineError> {
        let kernel = Kernel::assemble()?;
        let mut frame = Self {
            cpu: Cpu::new(),
            bus: FrameBus::new(Memory::new()),
            renderer: TextRenderer::new(),
            surface,
            kernel,
            syscalls: Box::new(PauseOnSyscall),
            config,
            state: RunState::Stopped,
            cycles: 0,
            last_error: None,
        };
        frame.install_system();
        Ok(frame)
    }

    /// Copy the kernel image and font into their memory regions.
    fn install_system(&mut self) {
        self.kernel.install(&mut self.bus.memory);
        self.bus.memory.load(FONT_BASE, font::FONT);
    }

    /// An assembler seeded with the kernel's labels and defines.
    #[must_use]
    pub fn assembler(&self) -> Assembler {
        Assembler::with_symbols(self.kernel.labels().clone(), self.kernel.defines().clone())
    }

    /// Load a compiled program.
    ///
    /// VM state is reset to zero; the user region and the IRQ vector are
    /// copied from the image; kernel and font are re-installed; the reset
    /// vector is overwritten with the program's entry point.
    pub fn load_program(&mut self, program: &Program) {
        self.bus.memory.clear();
        self.cpu.reset();
        self.bus.input.clear();
        self.cycles = 0;
        self.state = RunState::Stopped;
        self.last_error = None;

        self.bus.memory.load(0, &program.image[..usize::from(USER_END)]);
        self.bus
            .memory
            .write(IRQ_VECTOR, program.image[usize::from(IRQ_VECTOR)]);
        self.bus
            .memory
            .write(IRQ_VECTOR + 1, program.image[usize::from(IRQ_VECTOR) + 1]);
        self.install_system();
        self.bus.memory.write_word(RESET_VECTOR, program.start);
        log::debug!("loaded program, entry point {:#06x}", program.start);
    }

    /// Start running from the reset vector, with a fresh cycle counter.
    pub fn run(&mut self) {
        self.cycles = 0;
        self.last_error = None;
        let entry = self.bus.memory.read_word(RESET_VECTOR);
        self.cpu.set_pc(entry);
        self.state = RunState::Running;
        log::debug!("run from {entry:#06x}");
    }

    /// Halt the ticker.
    pub fn stop(&mut self) {
        self.state = RunState::Stopped;
    }

    /// Toggle between running and paused. A stopped machine stays stopped.
    pub fn pause(&mut self) {
        self.state = match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
            RunState::Stopped => RunState::Stopped,
        };
    }

    /// Execute exactly one cycle, delivering a due interrupt.
    ///
    /// Stepping works while paused (single-step debugging); a stopped
    /// machine stays stopped until `run`.
    pub fn step(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        self.cycle();
    }

    /// Execute up to one quantum of cycles. Returns the number executed
    /// (short if the guest halts or faults mid-batch).
    pub fn run_batch(&mut self) -> u32 {
        let mut executed = 0;
        for _ in 0..self.config.cycles_per_tick {
            if self.state != RunState::Running {
                break;
            }
            self.cycle();
            executed += 1;
        }
        executed
    }

    fn cycle(&mut self) {
        if self.last_error.is_some() {
            return;
        }
        match self.cpu.step(&mut self.bus) {
            Ok(Step::Normal) => {}
            Ok(Step::Halt) => {
                self.state = RunState::Paused;
                log::debug!("hlt at {:#06x}", self.cpu.pc());
            }
            Ok(Step::Syscall(number)) => {
                if self.syscalls.syscall(number) {
                    self.state = RunState::Paused;
                }
            }
            Err(error) => {
                log::error!("{error}");
                self.last_error = Some(error);
                self.state = RunState::Stopped;
                return;
            }
        }
        self.cycles += 1;
        if self.cycles % u64::from(self.config.cycles_per_interrupt) == 0
            && self.cpu.interrupts_enabled()
        {
            self.interrupt();
        }
    }

    /// Deliver one interrupt: render the text buffer, then force the
    /// vectored call. The interrupt-enable flag is left for the guest.
    fn interrupt(&mut self) {
        self.renderer.render(&mut self.bus.memory, &mut self.surface);
        self.cpu.irq(&mut self.bus);
    }

    /// Replace the syscall handler.
    pub fn set_syscall_handler(&mut self, handler: Box<dyn SyscallHandler>) {
        self.syscalls = handler;
    }

    pub fn press_button(&mut self, button: Button) {
        self.bus.input.press(button);
    }

    pub fn release_button(&mut self, button: Button) {
        self.bus.input.release(button);
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &FrameBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut FrameBus {
        &mut self.bus
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn last_error(&self) -> Option<CpuError> {
        self.last_error
    }

    /// The framebuffer region of memory (64×64 bytes, row-major).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.bus.memory.framebuffer()
    }
}

impl<S: Surface> Tickable for Frame<S> {
    fn tick(&mut self) {
        self.cycle();
    }
}

impl<S: Surface> Observable for Frame<S> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            return match rest {
                "pc" => Some(self.cpu.pc().into()),
                "sp" => Some(self.cpu.reg(SP).into()),
                "flags.c" => Some(self.cpu.status().is_set(C).into()),
                "flags.i" => Some(self.cpu.status().is_set(I).into()),
                "flags.z" => Some(self.cpu.status().is_set(Z).into()),
                "flags.n" => Some(self.cpu.status().is_set(N).into()),
                _ => {
                    let index: usize = rest.strip_prefix('r')?.parse().ok()?;
                    if index < 16 {
                        Some(self.cpu.reg(index).into())
                    } else {
                        None
                    }
                }
            };
        }
        if let Some(rest) = path.strip_prefix("memory.") {
            let addr = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))
            {
                u16::from_str_radix(hex, 16).ok()?
            } else {
                rest.parse().ok()?
            };
            return Some(self.bus.peek(addr).into());
        }
        match path {
            "cycles" => Some(self.cycles.into()),
            "frames" => Some(self.renderer.frames().into()),
            "state" => Some(
                match self.state {
                    RunState::Stopped => "stopped",
                    RunState::Running => "running",
                    RunState::Paused => "paused",
                }
                .into(),
            ),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.pc",
            "cpu.sp",
            "cpu.r<0-15>",
            "cpu.flags.c",
            "cpu.flags.i",
            "cpu.flags.z",
            "cpu.flags.n",
            "memory.<address>",
            "cycles",
            "frames",
            "state",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::BufferSurface;

    fn make_frame() -> Frame<BufferSurface> {
        Frame::new(FrameConfig::default(), BufferSurface::new()).expect("kernel assembles")
    }

    fn load_and_run(frame: &mut Frame<BufferSurface>, source: &str) {
        let program = frame.assembler().assemble(source).expect("assembles");
        frame.load_program(&program);
        frame.run();
    }

    /// Run batches until the machine leaves the running state.
    fn run_to_halt(frame: &mut Frame<BufferSurface>) {
        for _ in 0..1000 {
            if frame.state() != RunState::Running {
                return;
            }
            frame.run_batch();
        }
        panic!("program did not halt");
    }

    #[test]
    fn hlt_pauses_the_scheduler() {
        let mut frame = make_frame();
        load_and_run(&mut frame, ".addr 0x200\n@main\nmov $1, 0x2A\nhlt\n");
        run_to_halt(&mut frame);
        assert_eq!(frame.state(), RunState::Paused);
        assert_eq!(frame.cpu().reg(1), 0x2A);
    }

    #[test]
    fn run_starts_at_the_reset_vector() {
        let mut frame = make_frame();
        let program = frame
            .assembler()
            .assemble(".addr 0x240\n@main\nhlt\n")
            .expect("assembles");
        frame.load_program(&program);
        assert_eq!(frame.bus().memory.read_word(RESET_VECTOR), 0x240);
        frame.run();
        assert_eq!(frame.cpu().pc(), 0x240);
    }

    #[test]
    fn invalid_opcode_stops_and_surfaces_the_error() {
        let mut frame = make_frame();
        let program = frame
            .assembler()
            .assemble(".addr 0x200\n@main\n.byte 0xC3\n")
            .expect("assembles");
        frame.load_program(&program);
        frame.run();
        frame.run_batch();
        assert_eq!(frame.state(), RunState::Stopped);
        assert_eq!(
            frame.last_error(),
            Some(CpuError::InvalidOpcode {
                opcode: 0xC3,
                pc: 0x200
            })
        );
    }

    #[test]
    fn pause_toggles_only_when_not_stopped() {
        let mut frame = make_frame();
        assert_eq!(frame.state(), RunState::Stopped);
        frame.pause();
        assert_eq!(frame.state(), RunState::Stopped);

        load_and_run(&mut frame, ".addr 0x200\n@main\njmp @main\n");
        assert_eq!(frame.state(), RunState::Running);
        frame.pause();
        assert_eq!(frame.state(), RunState::Paused);
        frame.run_batch();
        assert_eq!(frame.cycles(), 0, "paused machine does not tick");
        frame.pause();
        assert_eq!(frame.state(), RunState::Running);
    }

    #[test]
    fn custom_syscall_handler_sees_the_number() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Recorder(Rc<RefCell<Vec<u8>>>);
        impl SyscallHandler for Recorder {
            fn syscall(&mut self, number: u8) -> bool {
                self.0.borrow_mut().push(number);
                number == 0
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut frame = make_frame();
        frame.set_syscall_handler(Box::new(Recorder(Rc::clone(&seen))));
        load_and_run(&mut frame, ".addr 0x200\n@main\nhlt 7\nhlt 0\n");
        run_to_halt(&mut frame);
        assert_eq!(*seen.borrow(), vec![7, 0]);
        assert_eq!(frame.state(), RunState::Paused);
    }

    #[test]
    fn observable_queries() {
        let mut frame = make_frame();
        load_and_run(&mut frame, ".addr 0x200\n@main\nmov $3, 0x55\nhlt\n");
        run_to_halt(&mut frame);
        assert_eq!(frame.query("cpu.r3"), Some(Value::U8(0x55)));
        assert_eq!(frame.query("cpu.pc"), Some(Value::U16(0x204)));
        assert_eq!(frame.query("state"), Some(Value::String("paused".into())));
        assert_eq!(frame.query("memory.0x0200"), Some(Value::U8(0x04)));
        assert_eq!(frame.query("cpu.nope"), None);
    }
}
