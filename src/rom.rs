// Cartridge header layout:
// +---------------+-------+-----------------------------------+
// | Range         | Width | Field                             |
// +---------------+-------+-----------------------------------+
// | 0x100 - 0x10F | 16    | Console name                      |
// | 0x110 - 0x11F | 16    | Copyright / release date          |
// | 0x120 - 0x14F | 48    | Domestic title                    |
// | 0x150 - 0x17F | 48    | Overseas title                    |
// | 0x180 - 0x181 | 2     | Product type                      |
// | 0x182 - 0x18D | 12    | Product code / version            |
// | 0x18E - 0x18F | 2     | Checksum (big-endian)             |
// | 0x1A0 - 0x1A7 | 8     | ROM start / end (big-endian)      |
// | 0x1A8 - 0x1AF | 8     | RAM start / end (big-endian)      |
// | 0x1F0 - 0x1F2 | 3     | Region codes                      |
// +---------------+-------+-----------------------------------+
use std::{
    fmt,
    fs::File,
    io::{self, Read},
    ops::Range,
    path::Path,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    device::Device,
    error::{Error, Result},
};

const CONSOLE: Range<usize> = 0x100..0x110;
const COPYRIGHT: Range<usize> = 0x110..0x120;
const DOMESTIC_TITLE: Range<usize> = 0x120..0x150;
const OVERSEAS_TITLE: Range<usize> = 0x150..0x180;
const PRODUCT_TYPE: Range<usize> = 0x180..0x182;
const PRODUCT_CODE: Range<usize> = 0x182..0x18E;
const CHECKSUM: Range<usize> = 0x18E..0x190;
const PROGRAM_START: Range<usize> = 0x1A0..0x1A4;
const PROGRAM_END: Range<usize> = 0x1A4..0x1A8;
const RAM_START: Range<usize> = 0x1A8..0x1AC;
const RAM_END: Range<usize> = 0x1AC..0x1B0;
const REGIONS: Range<usize> = 0x1F0..0x1F3;

/// First byte covered by the checksum; everything before it is header.
pub const CHECKSUM_START: usize = 0x200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Europe,
    Japan,
    Asia,
    Brazil,
    France,
    HongKong,
}

impl Region {
    pub const fn from_code(code: u8) -> Option<Region> {
        match code {
            b'E' => Some(Region::Europe),
            b'J' => Some(Region::Japan),
            b'A' => Some(Region::Asia),
            b'B' | 0x04 => Some(Region::Brazil),
            b'F' => Some(Region::France),
            0x08 => Some(Region::HongKong),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Region::Europe => "europe",
            Region::Japan => "japan",
            Region::Asia => "asia",
            Region::Brazil => "brazil",
            Region::France => "france",
            Region::HongKong => "hong kong",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collapses runs of spaces: a space is kept only when the byte after it is
/// not also a space. Every other byte is kept as is.
pub fn space_collapse(b: &[u8]) -> String {
    b.iter()
        .enumerate()
        .filter(|&(i, &byte)| byte != b' ' || b.get(i + 1) != Some(&b' '))
        .map(|(_, &byte)| byte as char)
        .collect()
}

/// Decodes region bytes in order, skipping anything unknown.
pub fn decode_regions(codes: &[u8]) -> Vec<Region> {
    codes.iter().filter_map(|&c| Region::from_code(c)).collect()
}

/// Every header field, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub console: String,
    pub copyright: String,
    pub domestic_title: String,
    pub overseas_title: String,
    pub product_type: String,
    pub product_code: String,
    pub checksum: u16,
    pub program_start: u32,
    pub program_end: u32,
    pub ram_start: u32,
    pub ram_end: u32,
    pub regions: Vec<Region>,
}

/// Cartridge image.
///
/// Header fields are decoded from the data on every call, so patches written
/// through the bus show up immediately. Fields that lie past the end of a
/// short image decode as empty strings or zero.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    pub fn new(data: Vec<u8>) -> Self {
        Rom { data }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Rom { data })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening ROM {}", path.display()))?;
        let rom = Self::from_reader(file)
            .with_context(|| format!("reading ROM {}", path.display()))?;
        tracing::info!("Loaded ROM {} ({} bytes)", path.display(), rom.len());
        Ok(rom)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn field(&self, range: Range<usize>) -> &[u8] {
        let end = range.end.min(self.data.len());
        let start = range.start.min(end);
        &self.data[start..end]
    }

    fn text(&self, range: Range<usize>) -> String {
        space_collapse(self.field(range))
    }

    fn ascii(&self, range: Range<usize>) -> String {
        self.field(range).iter().map(|&b| b as char).collect()
    }

    fn be_u32(&self, range: Range<usize>) -> u32 {
        let mut word = [0u8; 4];
        let field = self.field(range);
        word[..field.len()].copy_from_slice(field);
        u32::from_be_bytes(word)
    }

    pub fn console(&self) -> String {
        self.text(CONSOLE)
    }

    pub fn copyright(&self) -> String {
        self.text(COPYRIGHT)
    }

    pub fn title(&self) -> String {
        self.domestic_title()
    }

    pub fn domestic_title(&self) -> String {
        self.text(DOMESTIC_TITLE)
    }

    pub fn overseas_title(&self) -> String {
        self.text(OVERSEAS_TITLE)
    }

    pub fn product_type(&self) -> String {
        self.ascii(PRODUCT_TYPE)
    }

    pub fn product_code(&self) -> String {
        self.ascii(PRODUCT_CODE)
    }

    pub fn checksum(&self) -> u16 {
        let mut word = [0u8; 2];
        let field = self.field(CHECKSUM);
        word[..field.len()].copy_from_slice(field);
        u16::from_be_bytes(word)
    }

    pub fn program_start(&self) -> u32 {
        self.be_u32(PROGRAM_START)
    }

    pub fn program_end(&self) -> u32 {
        self.be_u32(PROGRAM_END)
    }

    pub fn ram_start(&self) -> u32 {
        self.be_u32(RAM_START)
    }

    pub fn ram_end(&self) -> u32 {
        self.be_u32(RAM_END)
    }

    pub fn regions(&self) -> Vec<Region> {
        decode_regions(self.field(REGIONS))
    }

    pub fn header(&self) -> Header {
        Header {
            console: self.console(),
            copyright: self.copyright(),
            domestic_title: self.domestic_title(),
            overseas_title: self.overseas_title(),
            product_type: self.product_type(),
            product_code: self.product_code(),
            checksum: self.checksum(),
            program_start: self.program_start(),
            program_end: self.program_end(),
            ram_start: self.ram_start(),
            ram_end: self.ram_end(),
            regions: self.regions(),
        }
    }

    /// Wrapping sum of the big-endian words from 0x200 up to the last full
    /// word.
    pub fn compute_checksum(&self) -> u16 {
        self.data
            .get(CHECKSUM_START..)
            .unwrap_or(&[])
            .chunks_exact(2)
            .fold(0u16, |sum, word| {
                sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]))
            })
    }

    pub fn validate_checksum(&self) -> Result<()> {
        let expected = self.checksum();
        let actual = self.compute_checksum();
        if expected != actual {
            tracing::warn!(
                "[ROM] checksum mismatch for {:?}: header {:04X}, computed {:04X}",
                self.title(),
                expected,
                actual
            );
            return Err(Error::InvalidChecksum { expected, actual });
        }
        Ok(())
    }
}

impl fmt::Debug for Rom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rom")
            .field("title", &self.title())
            .field("len", &self.data.len())
            .finish()
    }
}

impl fmt::Display for Rom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

impl Device for Rom {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(Error::EndOfData(offset));
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

        tracing::debug!("[ROM] patching {} bytes at {:#08X}", buf.len(), offset);
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
}
