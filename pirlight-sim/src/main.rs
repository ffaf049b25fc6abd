use clap::Parser;
use std::fs;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use pirlight_control_lib::sim::{RecordingOutput, ScriptedSensor, SimClock, SimDelay};
use pirlight_control_lib::{ControllerConfig, ExitReason, MotionLightController};

mod logger;

/// 13-bit PWM, as on the ESP32 LEDC
const SIM_MAX_DUTY: u16 = 8191;

/// Run the PIR motion light controller against scripted motion in virtual time.
///
/// Nothing sleeps: a 10 minute scenario completes instantly, with log lines
/// stamped by the virtual clock.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Motion window in seconds, e.g. `5..12`. Repeatable.
    #[arg(short, long = "motion", value_parser = parse_window)]
    motions: Vec<Range<Duration>>,

    /// Virtual seconds to run before the stop signal is raised.
    #[arg(short, long, default_value = "60", value_parser = parse_duration)]
    duration: Duration,

    /// Controller configuration as JSON (missing fields take defaults).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the motion timeout (ms).
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Override the sensor stabilization time (s).
    #[arg(short, long)]
    stabilization_secs: Option<u32>,

    /// Drive a light that gets brighter with higher duty.
    #[arg(long)]
    non_inverted: bool,

    /// Log every confirmed motion and each gamma table build.
    #[arg(short, long)]
    verbose: bool,
}

/// Parse non-negative (fractional) seconds
fn parse_secs(v: &str) -> Result<Duration, String> {
    v.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| format!("invalid seconds '{v}'"))
}

/// Parse a positive run length in (fractional) seconds
fn parse_duration(v: &str) -> Result<Duration, String> {
    let duration = parse_secs(v)?;
    if duration.is_zero() {
        return Err("duration must be positive".to_string());
    }
    Ok(duration)
}

/// Parse `START..END` in (fractional) seconds
fn parse_window(s: &str) -> Result<Range<Duration>, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{s}'"))?;
    let (start, end) = (parse_secs(start)?, parse_secs(end)?);
    if end <= start {
        return Err(format!("window '{s}' ends before it starts"));
    }
    Ok(start..end)
}

fn load_config(args: &Args) -> Result<ControllerConfig, String> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
            serde_json::from_str(&json)
                .map_err(|e| format!("Invalid config {}: {e}", path.display()))?
        }
        None => ControllerConfig::default(),
    };
    if let Some(timeout_ms) = args.timeout_ms {
        config.motion_timeout_ms = timeout_ms;
    }
    if let Some(secs) = args.stabilization_secs {
        config.stabilization_secs = secs;
    }
    if args.non_inverted {
        config.inverted_output = false;
    }
    Ok(config)
}

fn main() {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    let clock = SimClock::new();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = logger::init(clock.clone(), level) {
        eprintln!("Failed to install logger: {e}");
        std::process::exit(1);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let delay = SimDelay::new(clock.clone())
        .with_stop_at(args.duration, stop.clone());
    let sensor = ScriptedSensor::new(clock.clone(), args.motions.clone());
    let output = RecordingOutput::new(SIM_MAX_DUTY);
    let duty_log = output.log();

    let mut controller = MotionLightController::new(sensor.clone(), output, clock.clone(), delay, config);
    let reason = controller.run(&stop);

    let stats = controller.stats();
    println!();
    let exit = match &reason {
        ExitReason::Interrupted => "interrupted".to_string(),
        ExitReason::Faulted(fault) => format!("fault: {fault}"),
    };
    println!("Exit:            {exit}");
    println!("Virtual time:    {:.3}s", clock.now_duration().as_secs_f64());
    println!("Ticks:           {} ({} with motion)", stats.ticks, stats.motion_ticks);
    println!("Fades:           {} in, {} out", stats.fade_ins, stats.fade_outs);
    println!("Sensor reads:    {}", sensor.reads());
    println!("Duty writes:     {}", duty_log.len());
    println!(
        "Final state:     {} (duty {})",
        controller.state(),
        duty_log.last().map_or_else(|| "-".to_string(), |d| d.to_string())
    );

    if matches!(reason, ExitReason::Faulted(_)) {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        assert_eq!(
            parse_window("5..12").unwrap(),
            Duration::from_secs(5)..Duration::from_secs(12)
        );
        assert_eq!(
            parse_window(" 0.5 .. 1.25 ").unwrap(),
            Duration::from_millis(500)..Duration::from_millis(1250)
        );
    }

    #[test]
    fn test_parse_window_rejects_bad_input() {
        assert!(parse_window("5").is_err());
        assert!(parse_window("5..x").is_err());
        assert!(parse_window("12..5").is_err());
        assert!(parse_window("-1..5").is_err());
        assert!(parse_window("0..1e30").is_err());
        assert!(parse_window("0..inf").is_err());
        assert!(parse_window("NaN..5").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("0.25").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("-3").is_err());
        assert!(parse_duration("1e30").is_err());
    }
}
