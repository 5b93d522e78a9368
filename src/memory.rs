use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    device::Device,
    error::{Error, Result},
};

/// Flat, bounds-checked RAM.
///
/// Bounds are checked against the buffer, not against the window it is mapped
/// at; whoever maps it is responsible for matching the two.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Ram {
            data: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Ram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ram({:#X} bytes)", self.data.len())
    }
}

impl Device for Ram {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(Error::AccessViolation(offset));
        }

        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(Error::AccessViolation(offset));
        }

        let n = buf.len().min(self.data.len() - start);
        self.data[start..start + n].copy_from_slice(&buf[..n]);
        if n < buf.len() {
            tracing::warn!(
                "[RAM] short write at {:#06X}: {} of {} bytes",
                offset,
                n,
                buf.len()
            );
            return Err(Error::ShortWrite {
                written: n,
                requested: buf.len(),
            });
        }
        Ok(n)
    }

    fn reset(&mut self) {
        self.data.fill(0);
    }
}
