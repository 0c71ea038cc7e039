//! Logger setup for the command-line tool.

use std::io::Write;

use env_logger::{fmt::Formatter, Builder, Target};
use log::{Level, LevelFilter};

use crate::error::{Error, Result};

/// Install a compact stderr logger. `RUST_LOG` overrides the default level.
pub fn init_logger(verbose: bool) -> Result<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(|buf: &mut Formatter, record| writeln!(buf, "{} {}", level_tag(record.level()), record.args()))
        .target(Target::Stderr);

    builder
        .try_init()
        .map_err(|e| Error::config(format!("logger init failed: {e}")))
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(Level::Warn), "WARN");
        assert_eq!(level_tag(Level::Debug), "DEBUG");
    }
}
