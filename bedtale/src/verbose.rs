//! -v/-q flag pair mapped onto a tracing level filter, info by default.

use tracing::{level_filters::LevelFilter, Level};

#[derive(clap::Args, Debug, Clone)]
pub struct Verbosity {
    /// More output per occurrence
    #[clap(long, short = 'v', parse(from_occurrences), global = true)]
    verbose: i8,

    /// Less output per occurrence
    #[clap(
        long,
        short = 'q',
        parse(from_occurrences),
        global = true,
        conflicts_with = "verbose"
    )]
    quiet: i8,
}

impl Verbosity {
    pub fn log_level_filter(&self) -> LevelFilter {
        match 2i8.saturating_add(self.verbose).saturating_sub(self.quiet) {
            i8::MIN..=-1 => LevelFilter::OFF,
            0 => LevelFilter::from_level(Level::ERROR),
            1 => LevelFilter::from_level(Level::WARN),
            2 => LevelFilter::from_level(Level::INFO),
            3 => LevelFilter::from_level(Level::DEBUG),
            _ => LevelFilter::from_level(Level::TRACE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Verbosity;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn defaults_to_info() {
        let flags = Verbosity { verbose: 0, quiet: 0 };

        assert_eq!(flags.log_level_filter(), LevelFilter::INFO);
    }

    #[test]
    fn quiet_walks_down_to_off() {
        let flags = Verbosity { verbose: 0, quiet: 3 };

        assert_eq!(flags.log_level_filter(), LevelFilter::OFF);
    }

    #[test]
    fn verbose_walks_up_to_trace() {
        let flags = Verbosity { verbose: 5, quiet: 0 };

        assert_eq!(flags.log_level_filter(), LevelFilter::TRACE);
    }
}
