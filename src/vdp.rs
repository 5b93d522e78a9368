// Port layout as presented by the bus (offsets into the VDP window):
// +-------------+--------------------------------------------+
// | Offset      | Port                                       |
// +-------------+--------------------------------------------+
// | 0x00, 0x02  | Data                                       |
// | 0x04, 0x06  | Control (write) / Status (2-byte read)     |
// +-------------+--------------------------------------------+
//
// Control words:
//   10RRRRRR DDDDDDDD          register R <- D (when no pair is pending)
//   CCAAAAAA AAAAAAAA          1st word: CD1-CD0, A13-A0
//   ........ CCCC..AA          2nd word: CD5-CD2, A15-A14
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    device::Device,
    error::{Error, Result, Unsupported},
    utils::hexdump,
    vram::Vram,
};

pub const REGISTER_COUNT: usize = 24;
pub const STATUS_POWER_ON: u16 = 0x34FF;

const REGISTER_SELECT_MASK: u8 = 0xC0;
const REGISTER_SELECT: u8 = 0x80;
const CODE_WRITE: u16 = 0x01;
const CODE_TARGET_MASK: u16 = 0x0E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Port {
    Data,
    Control,
}

impl Port {
    fn decode(offset: u32) -> Result<Port> {
        match offset {
            0x00 | 0x02 => Ok(Port::Data),
            0x04 | 0x06 => Ok(Port::Control),
            _ => Err(Error::AccessViolation(offset)),
        }
    }
}

/// Register/port state of the YM7101 without any VRAM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdpSnapshot {
    pub registers: [u8; REGISTER_COUNT],
    pub status: u16,
    pub address: u16,
    pub code: u16,
    pub write_pending: bool,
}

/// Video Display Processor (YM7101), modelled as registers, VRAM and the
/// control-port state machine. Nothing is rendered.
#[derive(Debug, Clone)]
pub struct Vdp {
    registers: [u8; REGISTER_COUNT],
    status: u16,
    vram: Vram,
    address: u16,
    code: u16,
    write_pending: bool,
}

impl Default for Vdp {
    fn default() -> Self {
        Self::new()
    }
}

impl Vdp {
    pub fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            status: STATUS_POWER_ON,
            vram: Vram::new(),
            address: 0,
            code: 0,
            write_pending: false,
        }
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn write_pending(&self) -> bool {
        self.write_pending
    }

    pub fn vram(&self) -> &Vram {
        &self.vram
    }

    pub fn snapshot(&self) -> VdpSnapshot {
        VdpSnapshot {
            registers: self.registers,
            status: self.status,
            address: self.address,
            code: self.code,
            write_pending: self.write_pending,
        }
    }

    pub fn vram_dump(&self, start: u32, end: u32) -> String {
        hexdump(self.vram.as_slice(), start, end)
    }

    fn read_status(&mut self, buf: &mut [u8]) -> usize {
        buf.copy_from_slice(&self.status.to_be_bytes());
        self.write_pending = false;
        2
    }

    fn write_word(&mut self, offset: u32, word: [u8; 2]) -> Result<()> {
        match Port::decode(offset)? {
            Port::Control => self.write_control(word),
            Port::Data => self.write_data(word),
        }
    }

    fn write_control(&mut self, [first, second]: [u8; 2]) -> Result<()> {
        if self.write_pending {
            self.code = (self.code & 0x03) | ((second as u16 >> 2) & 0x3C);
            self.address = (self.address & 0x3FFF) | ((second as u16 & 0x03) << 14);
            self.write_pending = false;
            debug!(
                "[VDP] control pair complete: code={:02X} address={:04X}",
                self.code, self.address
            );
            return Ok(());
        }

        if first & REGISTER_SELECT_MASK == REGISTER_SELECT {
            let index = first & 0x3F;
            let Some(register) = self.registers.get_mut(index as usize) else {
                warn!("[VDP] write to missing register {}", index);
                return Err(Error::UnsupportedOperation(Unsupported::Register { index }));
            };
            *register = second;
            debug!("[VDP] R{:02} <- {:02X}", index, second);
            return Ok(());
        }

        self.code = (self.code & !0x03) | (first >> 6) as u16;
        self.address = (self.address & 0xC000) | ((first as u16 & 0x3F) << 8) | second as u16;
        self.write_pending = true;
        Ok(())
    }

    fn write_data(&mut self, word: [u8; 2]) -> Result<()> {
        if self.code & CODE_WRITE == 0 {
            warn!("[VDP] data write with read code {:02X}", self.code);
            return Err(Error::UnsupportedOperation(Unsupported::ReadMode {
                code: self.code,
            }));
        }
        self.write_pending = false;

        if self.code & CODE_TARGET_MASK != 0 {
            warn!("[VDP] unsupported write target, code {:02X}", self.code);
            return Err(Error::UnsupportedOperation(Unsupported::Target {
                code: self.code,
            }));
        }

        self.vram.write(self.address as u32, &word)?;
        Ok(())
    }
}

impl Device for Vdp {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        match (Port::decode(offset)?, buf.len()) {
            (Port::Control, 2) => Ok(self.read_status(buf)),
            _ => Err(Error::AccessViolation(offset)),
        }
    }

    /// Writes are taken two bytes at a time, each pair dispatched by its own
    /// address. A lone byte is seen by the chip on both halves of the bus.
    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        let mut consumed = 0;
        for chunk in buf.chunks(2) {
            let word = [chunk[0], chunk[chunk.len() - 1]];
            self.write_word(offset + consumed as u32, word)?;
            consumed += chunk.len();
        }
        Ok(consumed)
    }

    fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.status = STATUS_POWER_ON;
        self.vram.clear();
        self.address = 0;
        self.code = 0;
        self.write_pending = false;
    }
}

impl fmt::Display for Vdp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SR: {:04X}", self.status)?;
        for (i, pair) in self.registers.chunks(2).enumerate() {
            writeln!(
                f,
                "R{:02}: {:02X} R{:02}: {:02X}",
                i * 2,
                pair[0],
                i * 2 + 1,
                pair[1]
            )?;
        }
        Ok(())
    }
}
