use crate::{device::Device, error::Result};

/// Folds a large window onto a smaller device by taking offsets modulo
/// `period`. The inner device does its own bounds checking.
#[derive(Debug)]
pub struct Mirror<D> {
    period: u32,
    inner: D,
}

impl<D: Device> Mirror<D> {
    /// Panics if `period` is zero.
    pub fn new(period: u32, inner: D) -> Self {
        assert!(period > 0, "mirror period must be positive");
        Mirror { period, inner }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Device> Device for Mirror<D> {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(offset % self.period, buf)
    }

    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        self.inner.write(offset % self.period, buf)
    }

    fn reset(&mut self) {
        self.inner.reset()
    }
}
