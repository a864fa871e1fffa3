//! `tracing` output to the browser console.

use std::io;

use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

/// Directive used when the page does not pass one.
pub const DEFAULT_DIRECTIVE: &str = "sandbox_app=info,sandbox_renderer=info,wgpu=warn";

/// Buffers one formatted event and hands it to `console.log` on drop.
#[derive(Debug, Default)]
pub struct ConsoleWriter {
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let line = String::from_utf8_lossy(&self.buffer);
            web_sys::console::log_1(&line.trim_end().into());
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = io::Write::flush(self);
    }
}

/// [`MakeWriter`] producing a [`ConsoleWriter`] per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::default()
    }
}

/// Install the console subscriber. Later calls are ignored.
pub fn init(directive: Option<&str>) {
    let filter = EnvFilter::try_new(directive.unwrap_or(DEFAULT_DIRECTIVE))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Console)
        .with_ansi(false)
        .without_time()
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("Console logging installed");
    }
}
