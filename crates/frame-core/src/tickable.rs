//! Trait for components advanced one cycle at a time.

/// A component that can be advanced cycle by cycle.
///
/// One tick is one unit of forward progress (for the FRAME machine, one
/// fetched and executed instruction). The scheduler owns the pacing; a
/// component only knows how to advance.
pub trait Tickable {
    /// Advance the component by one cycle.
    fn tick(&mut self);

    /// Advance the component by multiple cycles.
    ///
    /// Default implementation calls `tick()` in a loop. Components may
    /// override for efficiency, but must produce identical results.
    fn tick_n(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }
}
