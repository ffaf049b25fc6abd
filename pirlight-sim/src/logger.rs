//! Logger that stamps each line with virtual time instead of wall time.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use pirlight_control_lib::sim::SimClock;

struct VirtualTimeLogger {
    clock: SimClock,
    level: LevelFilter,
}

impl Log for VirtualTimeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            println!("{}", format_line(&self.clock, record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

fn format_line(clock: &SimClock, level: log::Level, args: &std::fmt::Arguments<'_>) -> String {
    let now = clock.now_duration();
    format!("[{:>9.3}s] {level:<5} {args}", now.as_secs_f64())
}

/// Install the virtual-time logger as the global logger
pub fn init(clock: SimClock, level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(VirtualTimeLogger { clock, level }))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_line_is_stamped_with_virtual_time() {
        let clock = SimClock::new();
        clock.advance(Duration::from_millis(12_340));
        let line = format_line(&clock, log::Level::Info, &format_args!("Light faded in (on)"));
        assert_eq!(line, "[   12.340s] INFO  Light faded in (on)");
    }
}
