//! Logger setup for the command-line tool.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;

/// Copies every log line to stderr and, when set, to a log file.
struct TeeWriter {
    file: Option<File>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install the global logger. Lines are bare messages; `RUST_LOG`
/// overrides the default filter. A `log_file` is truncated first.
pub fn init(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Some(
                File::create(path)
                    .with_context(|| format!("Failed to create log file {}", path.display()))?,
            )
        }
        None => None,
    };

    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .target(env_logger::Target::Pipe(Box::new(TeeWriter { file })))
        .try_init()
        .context("Logger already initialized")?;
    Ok(())
}
