// SPDX-License-Identifier: MIT

use std::io::Write;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

impl LogLevel {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => LogLevel::Quiet,
            (false, true) => LogLevel::Verbose,
            (false, false) => LogLevel::Normal,
        }
    }

    pub fn filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Quiet => log::LevelFilter::Warn,
            LogLevel::Normal => log::LevelFilter::Info,
            LogLevel::Verbose => log::LevelFilter::Debug,
        }
    }
}

/// Installs the `[cfggen]`-prefixed logger. `RUST_LOG` still wins when set.
pub fn init_logger(level: LogLevel) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.filter().as_str()),
    )
    .format(|buf, record| {
        if record.level() <= log::Level::Warn {
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[cfggen] {style}{}{style:#}: {}",
                record.level(),
                record.args()
            )
        } else {
            writeln!(buf, "[cfggen] {}", record.args())
        }
    })
    .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_filters() {
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
        assert_eq!(LogLevel::from_flags(false, true).filter(), log::LevelFilter::Debug);
        assert_eq!(LogLevel::from_flags(false, false).filter(), log::LevelFilter::Info);
        assert_eq!(LogLevel::Quiet.filter(), log::LevelFilter::Warn);
    }
}
