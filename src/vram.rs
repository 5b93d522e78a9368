use crate::error::{Error, Result};

pub const VRAM_SIZE: usize = 0x20000;

/// Video RAM as seen from the VDP's address register.
#[derive(Clone)]
pub struct Vram {
    data: Box<[u8]>,
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Vram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vram").field("size", &self.data.len()).finish()
    }
}

impl Vram {
    pub fn new() -> Self {
        Vram {
            data: vec![0; VRAM_SIZE].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn read(&self, addr: u32, buf: &mut [u8]) -> Result<usize> {
        let start = addr as usize;
        if start >= self.data.len() {
            return Err(Error::AccessViolation(addr));
        }

        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    pub fn write(&mut self, addr: u32, buf: &[u8]) -> Result<usize> {
        let start = addr as usize;
        if start >= self.data.len() {
            return Err(Error::AccessViolation(addr));
        }

        let n = buf.len().min(self.data.len() - start);
        self.data[start..start + n].copy_from_slice(&buf[..n]);
        if n < buf.len() {
            return Err(Error::ShortWrite {
                written: n,
                requested: buf.len(),
            });
        }
        Ok(n)
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}
