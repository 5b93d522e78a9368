use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    device::Device,
    error::{Error, Result},
};

/// Inclusive address window.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AddressRange {
    start: u32,
    end: u32,
}

impl AddressRange {
    /// Panics if `start > end`.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(
            start <= end,
            "address range start 0x{:06X} is past end 0x{:06X}",
            start,
            end
        );
        AddressRange { start, end }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len(&self) -> u64 {
        (self.end - self.start) as u64 + 1
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.start <= addr && addr <= self.end
    }

    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}-0x{:06X}", self.start, self.end)
    }
}

#[derive(Debug)]
struct Mapping {
    range: AddressRange,
    device: Box<dyn Device>,
}

/// Routes absolute addresses to the device owning them.
///
/// Mappings never overlap and are kept sorted by start address. An access is
/// handed to exactly one device; one that runs past the end of its mapping is
/// not continued into the next.
#[derive(Debug, Default)]
pub struct Mapper {
    mappings: Vec<Mapping>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, device: Box<dyn Device>, start: u32, end: u32) -> Result<()> {
        let range = AddressRange::new(start, end);
        if let Some(existing) = self.mappings.iter().find(|m| m.range.overlaps(&range)) {
            tracing::warn!(
                "[BUS] {} overlaps existing mapping {}",
                range,
                existing.range
            );
            return Err(Error::RangeOverlap { start, end });
        }

        let index = self.mappings.partition_point(|m| m.range.start < start);
        tracing::debug!("[BUS] mapped {} -> {:?}", range, device);
        self.mappings.insert(index, Mapping { range, device });
        Ok(())
    }

    /// Removes the mapping that starts exactly at `start`.
    pub fn unmap(&mut self, start: u32) -> Option<Box<dyn Device>> {
        let index = self
            .mappings
            .binary_search_by_key(&start, |m| m.range.start)
            .ok()?;
        let mapping = self.mappings.remove(index);
        tracing::debug!("[BUS] unmapped {}", mapping.range);
        Some(mapping.device)
    }

    pub fn ranges(&self) -> impl Iterator<Item = AddressRange> + '_ {
        self.mappings.iter().map(|m| m.range)
    }

    pub fn reset(&mut self) {
        for mapping in &mut self.mappings {
            mapping.device.reset();
        }
    }

    fn lookup(&mut self, addr: u32) -> Result<&mut Mapping> {
        // last mapping starting at or below addr is the only candidate
        let index = self.mappings.partition_point(|m| m.range.start <= addr);
        match index.checked_sub(1).map(|i| &mut self.mappings[i]) {
            Some(mapping) if mapping.range.contains(addr) => Ok(mapping),
            _ => {
                tracing::trace!("[BUS] unmapped access at {:#08X}", addr);
                Err(Error::AccessViolation(addr))
            }
        }
    }

    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<usize> {
        let mapping = self.lookup(addr)?;
        let offset = addr - mapping.range.start;
        mapping.device.read(offset, buf)
    }

    pub fn write(&mut self, addr: u32, buf: &[u8]) -> Result<usize> {
        let mapping = self.lookup(addr)?;
        let offset = addr - mapping.range.start;
        mapping.device.write(offset, buf)
    }
}

impl fmt::Display for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mapping in &self.mappings {
            writeln!(f, "{} {:?}", mapping.range, mapping.device)?;
        }
        Ok(())
    }
}
