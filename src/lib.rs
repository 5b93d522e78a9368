pub mod bus;
pub mod device;
pub mod error;
pub mod memory;
pub mod mirror;
pub mod rom;
pub mod system;
pub mod trace;
pub mod utils;
pub mod vdp;
pub mod vram;

pub use bus::{AddressRange, Mapper};
pub use device::{Constant, Device, Nop};
pub use error::{Error, Result, Unsupported};
pub use memory::Ram;
pub use mirror::Mirror;
pub use rom::{Header, Region, Rom};
pub use system::{Executor, Step, System, SystemBuilder, Vectors};
pub use trace::{TraceSink, TraceWriter, Tracer};
pub use utils::{hex_bytes, hexdump};
pub use vdp::{Vdp, VdpSnapshot};
pub use vram::Vram;

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `tracing` subscriber filtered by `RUST_LOG` (default
/// `warn`). Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
