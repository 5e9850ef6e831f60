//! Console timing configuration.

use std::time::Duration;

/// Scheduler timing for a FRAME console.
///
/// The reference console runs 240 cycles per ~16.777 ms tick and raises an
/// interrupt every 960 cycles (once per four ticks) while the
/// interrupt-enable flag is set.
#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    /// CPU cycles executed per scheduler tick.
    pub cycles_per_tick: u32,
    /// Cycle period of the interrupt.
    pub cycles_per_interrupt: u32,
    /// Wall-clock interval between ticks.
    pub tick_interval: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            cycles_per_tick: 240,
            cycles_per_interrupt: 960,
            tick_interval: Duration::from_micros(16_777),
        }
    }
}
