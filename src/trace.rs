use std::{cell::RefCell, fmt, io::Write, rc::Rc};

use derivative::Derivative;

use crate::{device::Device, error::Result, utils::hex_bytes};

/// Shared, append-only text stream for trace lines.
pub type TraceSink = Rc<RefCell<dyn Write>>;

/// Writes trace lines to an optional sink.
///
/// Failing to write a line never fails the caller, and a writer without a sink
/// does nothing.
#[derive(Derivative, Clone, Default)]
#[derivative(Debug)]
pub struct TraceWriter {
    #[derivative(Debug = "ignore")]
    sink: Option<TraceSink>,
}

impl TraceWriter {
    pub fn new(sink: TraceSink) -> Self {
        TraceWriter { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        TraceWriter { sink: None }
    }

    pub fn line(&self, args: fmt::Arguments<'_>) {
        let Some(sink) = &self.sink else {
            return;
        };

        // A sink that is already borrowed (re-entrant trace) drops the line.
        let Ok(mut sink) = sink.try_borrow_mut() else {
            return;
        };
        if let Err(e) = writeln!(sink, "{}", args) {
            tracing::debug!("trace sink write failed: {}", e);
        }
    }
}

/// Logs every access with a label, then forwards it untouched.
#[derive(Debug)]
pub struct Tracer<D> {
    label: String,
    writer: TraceWriter,
    inner: D,
}

impl<D: Device> Tracer<D> {
    pub fn new(label: impl Into<String>, writer: TraceWriter, inner: D) -> Self {
        Tracer {
            label: label.into(),
            writer,
            inner,
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: Device> Device for Tracer<D> {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        tracing::trace!(label = %self.label, addr = offset, len = buf.len(), "read");
        self.writer.line(format_args!(
            "{}: read 0x{:06X} len={}",
            self.label,
            offset,
            buf.len()
        ));
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        tracing::trace!(label = %self.label, addr = offset, len = buf.len(), "write");
        self.writer.line(format_args!(
            "{}: write 0x{:06X} [{}]",
            self.label,
            offset,
            hex_bytes(buf)
        ));
        self.inner.write(offset, buf)
    }

    fn reset(&mut self) {
        self.inner.reset()
    }
}
