use std::fmt::Debug;

use crate::error::Result;

/// Anything that can sit on the bus.
///
/// Offsets are relative to the start of the window the device is mapped at.
/// Both calls return the number of bytes actually transferred, which may be
/// fewer than the buffer holds.
pub trait Device: Debug {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize>;
    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize>;

    /// Restores power-on state.
    fn reset(&mut self) {}
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        (**self).write(offset, buf)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Unconnected window: reads as zero, swallows writes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Nop;

impl Nop {
    pub fn new() -> Self {
        Nop
    }
}

impl Device for Nop {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        tracing::trace!("[NOP] read {:#06X} len={}", offset, buf.len());
        buf.fill(0);
        Ok(buf.len())
    }

    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        tracing::trace!("[NOP] ignored write {:#06X} len={}", offset, buf.len());
        Ok(buf.len())
    }
}

/// Read-only register that always reads back the same byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    value: u8,
}

impl Constant {
    pub fn new(value: u8) -> Self {
        Constant { value }
    }

    pub fn value(&self) -> u8 {
        self.value
    }
}

impl Device for Constant {
    fn read(&mut self, _offset: u32, buf: &mut [u8]) -> Result<usize> {
        buf.fill(self.value);
        Ok(buf.len())
    }

    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        tracing::trace!("[CONST] ignored write {:#06X} len={}", offset, buf.len());
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nop_reads_zero() {
        let mut nop = Nop::new();
        let mut buf = [0xAA; 4];
        assert_eq!(nop.read(0x10, &mut buf).unwrap(), 4);
        assert_eq!(buf, [0; 4]);
        assert_eq!(nop.write(0x10, &[1, 2, 3]).unwrap(), 3);
    }

    #[test]
    fn test_constant() {
        let mut version = Constant::new(0xA0);
        version.write(0, &[0x00, 0x00]).unwrap();
        let mut buf = [0; 2];
        assert_eq!(version.read(0, &mut buf).unwrap(), 2);
        assert_eq!(buf, [0xA0, 0xA0]);
    }

    #[test]
    fn test_boxed_device_forwards() {
        let mut dev: Box<dyn Device> = Box::new(Constant::new(0x5A));
        let mut buf = [0; 1];
        dev.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0x5A]);
    }
}
