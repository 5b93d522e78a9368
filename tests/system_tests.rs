use std::{cell::RefCell, rc::Rc};

use genesis::{
    system::{RAM_END, RAM_START, VDP_START},
    Error, Executor, Mapper, Rom, Step, System, SystemBuilder, Unsupported, Vectors,
};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    genesis::init_tracing();
}

const VDP_DATA: u32 = VDP_START;
const VDP_CONTROL: u32 = VDP_START + 4;

fn rom_image(sp: u32, pc: u32) -> Rom {
    let mut data = vec![0u8; 0x400];
    data[0..4].copy_from_slice(&sp.to_be_bytes());
    data[4..8].copy_from_slice(&pc.to_be_bytes());
    data[0x100..0x200].fill(b' ');
    data[0x100..0x110].copy_from_slice(b"SEGA GENESIS    ");
    data[0x120..0x12A].copy_from_slice(b"TEST  CART");
    Rom::new(data)
}

#[derive(Debug, Clone)]
enum Op {
    Read(u32, usize),
    Write(u32, Vec<u8>),
}

/// Stand-in CPU: performs one scripted bus access per step.
#[derive(Default)]
struct Script {
    ops: Vec<Op>,
    next: usize,
    vectors: Option<Vectors>,
    reads: Vec<Vec<u8>>,
}

impl Script {
    fn new(ops: Vec<Op>) -> Self {
        Script {
            ops,
            ..Default::default()
        }
    }
}

impl Executor for Script {
    fn reset(&mut self, vectors: Vectors) {
        self.vectors = Some(vectors);
        self.next = 0;
    }

    fn step(&mut self, bus: &mut Mapper) -> genesis::Result<Step> {
        let Some(op) = self.ops.get(self.next).cloned() else {
            return Ok(Step::Halt);
        };
        self.next += 1;
        match op {
            Op::Read(addr, len) => {
                let mut buf = vec![0; len];
                let n = bus.read(addr, &mut buf)?;
                buf.truncate(n);
                self.reads.push(buf);
            }
            Op::Write(addr, bytes) => {
                bus.write(addr, &bytes)?;
            }
        }
        Ok(Step::Continue)
    }
}

#[test]
fn test_ram_mirroring() {
    let mut system = System::new();
    let bus = system.bus();

    let mut addr = RAM_START;
    while addr <= RAM_END - 3 {
        bus.write(addr, &addr.to_be_bytes())
            .unwrap_or_else(|e| panic!("error writing to 0x{:08X}: {}", addr, e));

        let mirrored = 0xFF0000 + ((addr - RAM_START) % 0x10000);
        let mut b = [0u8; 4];
        bus.read(mirrored, &mut b)
            .unwrap_or_else(|e| panic!("error reading at 0x{:08X}: {}", mirrored, e));
        assert_eq!(u32::from_be_bytes(b), addr, "mirrored read at 0x{:08X}", mirrored);

        addr += 4;
    }
}

#[test]
fn test_load_reads_vectors() {
    let mut system = System::new();
    assert_eq!(system.vectors(), None);

    system.load(rom_image(0x00FFFE00, 0x00000200)).unwrap();
    assert_eq!(
        system.vectors(),
        Some(Vectors {
            stack_pointer: 0x00FFFE00,
            program_counter: 0x00000200,
        })
    );

    let mut buf = [0; 4];
    system.bus().read(0x100, &mut buf).unwrap();
    assert_eq!(&buf, b"SEGA");
}

#[test]
fn test_reload_resets_devices() {
    let mut system = System::new();
    system.load(rom_image(0, 0x200)).unwrap();
    system.bus().write(0xFF0000, &[0xAA, 0xBB]).unwrap();

    system.load(rom_image(0x1000, 0x400)).unwrap();
    let mut buf = [0xFF; 2];
    system.bus().read(0xFF0000, &mut buf).unwrap();
    assert_eq!(buf, [0, 0]);
    assert_eq!(system.vectors().map(|v| v.program_counter), Some(0x400));
}

#[test]
fn test_rom_window_end_of_data() {
    let mut system = System::new();
    system.load(rom_image(0, 0)).unwrap();

    let mut buf = [0; 2];
    assert!(matches!(
        system.bus().read(0x3FFFFE, &mut buf),
        Err(Error::EndOfData(0x3FFFFE))
    ));
    assert!(matches!(
        system.bus().read(0x400000, &mut buf),
        Err(Error::AccessViolation(0x400000))
    ));
}

#[test]
fn test_run_without_cartridge() {
    let mut system = System::new();
    let mut cpu = Script::new(vec![]);
    assert!(matches!(system.run(&mut cpu), Err(Error::NoCartridge)));
    assert!(cpu.vectors.is_none());
}

#[test]
fn test_run_drives_vdp() {
    let mut system = System::new();
    system.load(rom_image(0x00FF8000, 0x200)).unwrap();

    let mut cpu = Script::new(vec![
        Op::Write(VDP_CONTROL, vec![0x81, 0x74]),
        // VRAM write at 0xC000
        Op::Write(VDP_CONTROL, vec![0x40, 0x00]),
        Op::Write(VDP_CONTROL, vec![0x00, 0x03]),
        Op::Write(VDP_DATA, vec![0x12, 0x34]),
        Op::Read(VDP_CONTROL, 2),
        Op::Read(0xA10000, 2),
    ]);
    system.run(&mut cpu).unwrap();

    assert_eq!(cpu.vectors.map(|v| v.stack_pointer), Some(0x00FF8000));
    assert_eq!(cpu.reads, vec![vec![0x34, 0xFF], vec![0xA0, 0xA0]]);
}

#[test]
fn test_run_stops_at_first_error() {
    let mut system = System::new();
    system.load(rom_image(0, 0x200)).unwrap();

    let mut cpu = Script::new(vec![
        Op::Write(0xFF0000, vec![1]),
        Op::Write(0x800000, vec![1]),
        Op::Write(0xFF0001, vec![2]),
    ]);
    assert!(matches!(
        system.run(&mut cpu),
        Err(Error::AccessViolation(0x800000))
    ));
    assert_eq!(cpu.next, 2);

    let mut buf = [0; 2];
    system.bus().read(0xFF0000, &mut buf).unwrap();
    assert_eq!(buf, [1, 0]);
}

#[test]
fn test_run_surfaces_vdp_errors() {
    let mut system = System::new();
    system.load(rom_image(0, 0x200)).unwrap();

    let mut cpu = Script::new(vec![Op::Write(VDP_DATA, vec![0x00, 0x00])]);
    assert!(matches!(
        system.run(&mut cpu),
        Err(Error::UnsupportedOperation(Unsupported::ReadMode { .. }))
    ));
}

struct Failing;

impl Executor for Failing {
    fn reset(&mut self, _vectors: Vectors) {}

    fn step(&mut self, _bus: &mut Mapper) -> genesis::Result<Step> {
        Err(anyhow::anyhow!("illegal instruction 0x4AFC").into())
    }
}

#[test]
fn test_run_surfaces_executor_errors() {
    let mut system = System::new();
    system.load(rom_image(0, 0x200)).unwrap();
    let err = system.run(&mut Failing).unwrap_err();
    assert!(matches!(err, Error::Executor(_)));
    assert_eq!(err.to_string(), "illegal instruction 0x4AFC");
}

#[test]
fn test_trace_output() {
    let sink = Rc::new(RefCell::new(Vec::<u8>::new()));
    let mut system = SystemBuilder::new()
        .trace_sink(sink.clone())
        .trace_ram(true)
        .build();
    system.load(rom_image(0x00FFFE00, 0x200)).unwrap();

    let mut cpu = Script::new(vec![
        Op::Write(VDP_CONTROL, vec![0x80, 0x04]),
        Op::Write(0xFF0010, vec![0xCA, 0xFE]),
        Op::Read(VDP_CONTROL, 2),
    ]);
    system.run(&mut cpu).unwrap();

    let out = String::from_utf8(sink.borrow().clone()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "reset",
            "load: TEST CART ",
            "init: sp=0x00FFFE00 pc=0x00000200",
            "run",
            "vdp: write 0x000004 [80 04]",
            "ram: write 0x1F0010 [CA FE]",
            "vdp: read 0x000004 len=2",
            "halt",
        ]
    );
}

#[test]
fn test_untraced_system_is_silent() {
    let sink = Rc::new(RefCell::new(Vec::<u8>::new()));
    let mut system = SystemBuilder::new()
        .trace_sink(sink.clone())
        .trace_vdp(false)
        .build();
    system.bus().write(VDP_CONTROL, &[0x80, 0x04]).unwrap();
    assert!(sink.borrow().is_empty());
}

#[test]
fn test_header_through_loader() {
    let rom = Rom::from_reader(&rom_image(0, 0).data()[..]).unwrap();
    assert_eq!(rom.console(), "SEGA GENESIS ");
    assert_eq!(rom.title(), "TEST CART ");

    let header = serde_json::to_string(&rom.header()).unwrap();
    assert!(header.contains("\"domestic_title\":\"TEST CART \""));
}
