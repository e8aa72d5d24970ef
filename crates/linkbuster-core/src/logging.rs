//! Logging init: file under XDG state dir, or graceful fallback to stderr.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,linkbuster=debug,linkbuster_core=debug";

/// Where log output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// Per-event writer: a clone of the log file, or stderr if cloning failed.
enum EventWriter {
    File(fs::File),
    Stderr,
}

impl io::Write for EventWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            EventWriter::File(f) => f.write(buf),
            EventWriter::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            EventWriter::File(f) => f.flush(),
            EventWriter::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct LogFile(fs::File);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(EventWriter::File)
            .unwrap_or(EventWriter::Stderr)
    }
}

/// `RUST_LOG` if set and valid, else the default filter.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `~/.local/state/linkbuster/linkbuster.log`
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("linkbuster")?;
    Ok(xdg_dirs.get_state_home().join("linkbuster.log"))
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber, writing to the log file when it can be
/// opened and to stderr otherwise. Safe to call more than once; only the
/// first call installs anything.
pub fn init() -> LogTarget {
    let opened = log_file_path().and_then(|p| Ok((open_log_file(&p)?, p)));
    let (writer, target) = match opened {
        Ok((file, path)) => (BoxMakeWriter::new(LogFile(file)), LogTarget::File(path)),
        Err(_) => (BoxMakeWriter::new(io::stderr), LogTarget::Stderr),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_ok();

    if installed {
        match &target {
            LogTarget::File(path) => {
                tracing::info!("linkbuster logging initialized at {}", path.display())
            }
            LogTarget::Stderr => tracing::info!("log file unavailable, logging to stderr"),
        }
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn log_file_lives_in_linkbuster_state_dir() {
        if let Ok(path) = log_file_path() {
            assert!(path.ends_with("linkbuster/linkbuster.log"));
        }
    }

    #[test]
    fn open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("x.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
