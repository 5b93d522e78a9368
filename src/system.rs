// Memory map:
// +---------------------+------------------------------------------+
// | Range               | Description                              |
// +---------------------+------------------------------------------+
// | 0x000000 - 0x3FFFFF | Cartridge ROM                            |
// | 0xA00000 - 0xA0FFFF | Z80 address space (not emulated)         |
// | 0xA10000 - 0xA10001 | Version register                         |
// | 0xA10002 - 0xA1001F | I/O ports                                |
// | 0xA11100 - 0xA11101 | Z80 bus request                          |
// | 0xA11200 - 0xA11201 | Z80 reset                                |
// | 0xA14000 - 0xA14003 | TMSS                                     |
// | 0xC00000 - 0xC0000F | VDP                                      |
// | 0xE00000 - 0xFFFFFF | 64 KiB work RAM, mirrored                |
// +---------------------+------------------------------------------+
use serde::{Deserialize, Serialize};

use crate::{
    bus::Mapper,
    device::{Constant, Device, Nop},
    error::{Error, Result},
    memory::Ram,
    mirror::Mirror,
    rom::Rom,
    trace::{TraceSink, TraceWriter, Tracer},
    vdp::Vdp,
};

pub const CARTRIDGE_START: u32 = 0x000000;
pub const CARTRIDGE_END: u32 = 0x3FFFFF;
pub const Z80_START: u32 = 0xA00000;
pub const Z80_END: u32 = 0xA0FFFF;
pub const VERSION_START: u32 = 0xA10000;
pub const VERSION_END: u32 = 0xA10001;
pub const IO_START: u32 = 0xA10002;
pub const IO_END: u32 = 0xA1001F;
pub const Z80_BUSREQ_START: u32 = 0xA11100;
pub const Z80_BUSREQ_END: u32 = 0xA11101;
pub const Z80_RESET_START: u32 = 0xA11200;
pub const Z80_RESET_END: u32 = 0xA11201;
pub const TMSS_START: u32 = 0xA14000;
pub const TMSS_END: u32 = 0xA14003;
pub const VDP_START: u32 = 0xC00000;
pub const VDP_END: u32 = 0xC0000F;
pub const RAM_START: u32 = 0xE00000;
pub const RAM_END: u32 = 0xFFFFFF;
pub const RAM_SIZE: u32 = 0x10000;

/// Overseas, NTSC, no expansion unit.
pub const DEFAULT_VERSION: u8 = 0xA0;

/// Initial stack pointer and program counter, from the first two long words
/// of the cartridge.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Vectors {
    pub stack_pointer: u32,
    pub program_counter: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Step {
    Continue,
    Halt,
}

/// The CPU core driving the bus. It owns its own registers and instruction
/// semantics; the system only hands it the reset vectors and the bus.
pub trait Executor {
    fn reset(&mut self, vectors: Vectors);
    fn step(&mut self, bus: &mut Mapper) -> Result<Step>;
}

pub struct System {
    bus: Mapper,
    trace: TraceWriter,
    vectors: Option<Vectors>,
}

impl System {
    pub fn new() -> Self {
        SystemBuilder::new().build()
    }

    pub fn bus(&mut self) -> &mut Mapper {
        &mut self.bus
    }

    pub fn vectors(&self) -> Option<Vectors> {
        self.vectors
    }

    pub fn load(&mut self, rom: Rom) -> Result<()> {
        self.vectors = None;
        self.trace.line(format_args!("reset"));
        self.bus.reset();

        let title = rom.title();
        if self.bus.unmap(CARTRIDGE_START).is_some() {
            tracing::info!("Replacing cartridge with {:?}", title);
        }
        self.bus.map(Box::new(rom), CARTRIDGE_START, CARTRIDGE_END)?;
        self.trace.line(format_args!("load: {}", title));

        let mut words = [0u8; 8];
        let n = self.bus.read(CARTRIDGE_START, &mut words)?;
        if n < words.len() {
            return Err(Error::EndOfData(CARTRIDGE_START + n as u32));
        }
        let vectors = Vectors {
            stack_pointer: u32::from_be_bytes([words[0], words[1], words[2], words[3]]),
            program_counter: u32::from_be_bytes([words[4], words[5], words[6], words[7]]),
        };
        self.trace.line(format_args!(
            "init: sp=0x{:08X} pc=0x{:08X}",
            vectors.stack_pointer, vectors.program_counter
        ));
        tracing::info!(
            "Loaded {:?}: SP={:08X} PC={:08X}",
            title,
            vectors.stack_pointer,
            vectors.program_counter
        );

        self.vectors = Some(vectors);
        Ok(())
    }

    /// Steps `cpu` until it halts. The first error from the CPU or the bus
    /// stops the run and is returned.
    pub fn run<E: Executor>(&mut self, cpu: &mut E) -> Result<()> {
        let vectors = self.vectors.ok_or(Error::NoCartridge)?;
        cpu.reset(vectors);
        self.trace.line(format_args!("run"));

        let mut steps: u64 = 0;
        loop {
            match cpu.step(&mut self.bus) {
                Ok(Step::Continue) => steps += 1,
                Ok(Step::Halt) => {
                    self.trace.line(format_args!("halt"));
                    tracing::info!("Halted after {} steps", steps);
                    return Ok(());
                }
                Err(e) => {
                    self.trace.line(format_args!("error: {}", e));
                    tracing::error!("Stopped after {} steps: {}", steps, e);
                    return Err(e);
                }
            }
        }
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SystemBuilder {
    sink: Option<TraceSink>,
    trace_vdp: bool,
    trace_ram: bool,
    version: u8,
}

impl Default for SystemBuilder {
    fn default() -> Self {
        Self {
            sink: None,
            trace_vdp: true,
            trace_ram: false,
            version: DEFAULT_VERSION,
        }
    }
}

impl SystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace_sink(&mut self, sink: TraceSink) -> &mut Self {
        self.sink = Some(sink);
        self
    }

    pub fn trace_vdp(&mut self, enabled: bool) -> &mut Self {
        self.trace_vdp = enabled;
        self
    }

    pub fn trace_ram(&mut self, enabled: bool) -> &mut Self {
        self.trace_ram = enabled;
        self
    }

    pub fn version(&mut self, version: u8) -> &mut Self {
        self.version = version;
        self
    }

    fn traced(&self, enabled: bool, label: &str, device: Box<dyn Device>) -> Box<dyn Device> {
        if enabled {
            Box::new(Tracer::new(label, self.writer(), device))
        } else {
            device
        }
    }

    fn writer(&self) -> TraceWriter {
        match &self.sink {
            Some(sink) => TraceWriter::new(sink.clone()),
            None => TraceWriter::disabled(),
        }
    }

    pub fn build(&self) -> System {
        tracing::info!("Initializing system, version register {:02X}", self.version);
        let mut bus = Mapper::new();

        let ram = Box::new(Mirror::new(RAM_SIZE, Ram::new(RAM_SIZE as usize)));
        let io = Box::new(Ram::new((IO_END - IO_START + 1) as usize));
        let vdp = Box::new(Vdp::new());

        install(&mut bus, Box::new(Nop::new()), Z80_START, Z80_END);
        install(&mut bus, Box::new(Constant::new(self.version)), VERSION_START, VERSION_END);
        install(&mut bus, io, IO_START, IO_END);
        install(&mut bus, Box::new(Nop::new()), Z80_BUSREQ_START, Z80_BUSREQ_END);
        install(&mut bus, Box::new(Nop::new()), Z80_RESET_START, Z80_RESET_END);
        install(&mut bus, Box::new(Nop::new()), TMSS_START, TMSS_END);
        install(&mut bus, self.traced(self.trace_vdp, "vdp", vdp), VDP_START, VDP_END);
        install(&mut bus, self.traced(self.trace_ram, "ram", ram), RAM_START, RAM_END);

        System {
            bus,
            trace: self.writer(),
            vectors: None,
        }
    }
}

fn install(bus: &mut Mapper, device: Box<dyn Device>, start: u32, end: u32) {
    // the system map is fixed, so an overlap is a programming error
    if let Err(e) = bus.map(device, start, end) {
        panic!("invalid system memory map: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map() {
        let system = System::new();
        let ranges: Vec<(u32, u32)> = system.bus.ranges().map(|r| (r.start(), r.end())).collect();
        assert_eq!(
            ranges,
            vec![
                (Z80_START, Z80_END),
                (VERSION_START, VERSION_END),
                (IO_START, IO_END),
                (Z80_BUSREQ_START, Z80_BUSREQ_END),
                (Z80_RESET_START, Z80_RESET_END),
                (TMSS_START, TMSS_END),
                (VDP_START, VDP_END),
                (RAM_START, RAM_END),
            ]
        );
    }

    #[test]
    fn test_version_register() {
        let mut system = SystemBuilder::new().version(0x80).build();
        let mut buf = [0; 2];
        system.bus().read(VERSION_START, &mut buf).unwrap();
        assert_eq!(buf, [0x80, 0x80]);
    }

    #[test]
    fn test_load_requires_vectors() {
        let mut system = System::new();
        assert!(matches!(
            system.load(Rom::new(vec![0; 6])),
            Err(Error::EndOfData(6))
        ));
        assert_eq!(system.vectors(), None);
    }
}
