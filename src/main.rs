//! # gcode-motion
//!
//! Run G-code from a file or serve it over TCP.
//!
//! # Usage
//!
//! ```bash
//! # Print the planned segments of a file
//! gcode-motion -c machine.toml -N part.gcode
//!
//! # Dry run, looping the file three times
//! gcode-motion -c machine.toml -n --loop=3 part.gcode
//!
//! # Accept G-code on port 4444
//! gcode-motion -c machine.toml -n -p 4444
//! ```

use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use gcode_motion::config::load_config;
use gcode_motion::queue::{MotionQueue, NullQueue, TraceQueue};
use gcode_motion::session::{run_file, serve, SessionEnd};
use gcode_motion::MachineControl;

/// G-code interpreter and motion pipeline
#[derive(Parser, Debug)]
#[command(name = "gcode-motion")]
#[command(version)]
#[command(about = "Interpret G-code from a file or a TCP port and drive the motion queue")]
struct Args {
    /// Machine configuration (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// G-code file to run
    #[arg(value_name = "GCODE", conflicts_with = "port")]
    file: Option<PathBuf>,

    /// Listen for G-code on this TCP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind the listener to
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind_addr: IpAddr,

    /// Run the file COUNT times, or forever without COUNT
    #[arg(long = "loop", value_name = "COUNT", num_args = 0..=1, require_equals = true)]
    loop_count: Option<Option<u32>>,

    /// Override the configured speed factor (> 0)
    #[arg(short = 'f', long)]
    speed_factor: Option<f32>,

    /// Dry run: plan but discard all motion
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Simulation: print every instruction to stdout
    #[arg(short = 'N', long)]
    simulation: bool,

    /// Wait for each instruction to finish before reading on
    #[arg(short = 'S', long)]
    synchronous: bool,

    /// Verbose logging, including planned segments
    #[arg(short = 'P', long)]
    verbose: bool,

    /// Reject moves until G28 ran
    #[arg(long)]
    homing_required: bool,

    /// Ignore soft limits
    #[arg(long)]
    disable_range_check: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing(&args);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut cmd = Args::command();
    if args.file.is_none() && args.port.is_none() {
        cmd.error(ErrorKind::MissingRequiredArgument, "expected a G-code file or --port")
            .exit();
    }
    if args.loop_count.is_some() && args.file.is_none() {
        cmd.error(ErrorKind::ArgumentConflict, "--loop only applies to a G-code file")
            .exit();
    }
    if args.speed_factor.is_some_and(|f| !(f > 0.0)) {
        cmd.error(ErrorKind::ValueValidation, "speed factor must be > 0")
            .exit();
    }

    info!("gcode-motion v{} starting...", env!("CARGO_PKG_VERSION"));
    let mut config = load_config(&args.config)?;
    if let Some(factor) = args.speed_factor {
        config.speed_factor = factor;
    }
    config.require_homing |= args.homing_required;
    config.range_check &= !args.disable_range_check;
    config.synchronous |= args.synchronous;
    config.debug_print |= args.verbose;

    // Bind before anything moves so a busy port fails early.
    let listener = match args.port {
        Some(port) => Some(TcpListener::bind((args.bind_addr, port))?),
        None => None,
    };

    let queue: Arc<dyn MotionQueue> = if args.simulation {
        config.disable_endstops();
        let motor_count = config.motor_mapping()?.motor_count();
        Arc::new(TraceQueue::new(std::io::stdout(), motor_count))
    } else if args.dry_run {
        config.disable_endstops();
        Arc::new(NullQueue::new())
    } else {
        error!("no step/dir pin provider available on this host; use -n or -N");
        return Ok(ExitCode::FAILURE);
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        let queue = Arc::clone(&queue);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            cancel.store(true, Ordering::SeqCst);
            queue.shutdown(false);
        })?;
    }

    let mut machine = MachineControl::new(config, queue.as_ref())?;
    let result = match (&args.file, &listener) {
        (Some(path), _) => {
            let loops = match args.loop_count {
                None => Some(1),
                Some(count) => count,
            };
            run_file(path, loops, &mut machine, &cancel).map(|_: SessionEnd| ())
        }
        (None, Some(listener)) => serve(listener, &mut machine, &cancel),
        (None, None) => Ok(()),
    };

    let caught_signal = cancel.load(Ordering::SeqCst);
    if caught_signal {
        info!("Caught signal; motion stopped");
    }
    queue.shutdown(!caught_signal);

    match result {
        // A signal interrupting a blocked enqueue surfaces as a queue error.
        Err(_) if caught_signal => Ok(ExitCode::from(2)),
        Err(e) => Err(e.into()),
        Ok(()) if caught_signal => Ok(ExitCode::from(2)),
        Ok(()) => {
            info!("gcode-motion shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
