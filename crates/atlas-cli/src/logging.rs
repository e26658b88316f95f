use atlas_core::output::SharedWriter;
use atlas_tui::SpinnerRegistry;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ATLAS_LOG";
pub const LOG_FILE_ENV: &str = "ATLAS_LOG_FILE";
const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    Discard,
}

/// The alternate screen owns the terminal while watching, so logs there go
/// to a file or nowhere.
pub fn log_target(watching: bool, log_file: Option<PathBuf>) -> LogTarget {
    match log_file {
        Some(path) => LogTarget::File(path),
        None if watching => LogTarget::Discard,
        None => LogTarget::Stderr,
    }
}

/// Log writer that wipes a live spinner line before each record.
#[derive(Debug, Clone)]
pub struct SpinnerAwareWriter {
    out: SharedWriter,
    registry: SpinnerRegistry,
}

impl SpinnerAwareWriter {
    pub fn new(out: SharedWriter, registry: SpinnerRegistry) -> Self {
        Self { out, registry }
    }
}

impl io::Write for SpinnerAwareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.registry.write_above(&self.out, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SpinnerAwareWriter {
    type Writer = SpinnerAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn init_logging(
    target: &LogTarget,
    stderr: SharedWriter,
    registry: SpinnerRegistry,
) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let writer = match target {
        LogTarget::Stderr => BoxMakeWriter::new(SpinnerAwareWriter::new(stderr, registry)),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        LogTarget::Discard => BoxMakeWriter::new(io::sink),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init();
    Ok(())
}
