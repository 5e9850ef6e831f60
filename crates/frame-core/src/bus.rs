//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// The CPU accesses the address space through this trait. The bus handles
/// address decoding, including memory-mapped I/O registers whose value is
/// produced at read time rather than stored.
pub trait Bus {
    /// Read a byte from the given address.
    ///
    /// Memory-mapped registers return their live value; callers must not
    /// cache reads.
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, addr: u16, value: u8);

    /// Read a byte without side effects.
    ///
    /// Returns the backing memory byte even for addresses that `read()`
    /// intercepts. Used by the renderer and the analyser.
    fn peek(&self, addr: u16) -> u8;
}
