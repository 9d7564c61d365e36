use clap::Parser;
use embassy_executor::{Executor, Spawner};
use sawppy_core::mk_static;
use sawppy_core::utils::controllers::{
    AckermannSolver, DecoderConfig, FrameChannel, PulseDecoder, PulseFrame, PulseItem, RcChannel,
    SimulatedCapture, SolverConfig, TimeoutPolicy,
};
use sawppy_core::utils::math::kinematics::{SAWPPY_WHEELS, WheelPosition};
use sawppy_core::utils::math::pulse::PulseCalibration;
use sawppy_core::utils::messages::{CommandChannel, JoystickChannel, VelocityCommand, WheelChannel};
use sawppy_core::utils::{Duration, Instant, Ticker, ak};
use serde::Deserialize;
use static_cell::StaticCell;
use std::path::PathBuf;
use tracing::{error, info};

/// Steering, throttle and two auxiliary switches.
const AXES: usize = 4;
const WHEELS: usize = 6;

/// RC frame period of a 50 Hz receiver.
const FRAME_PERIOD_US: u32 = 20_000;

const DEFAULT_CHANNELS: [RcChannel; AXES] = [
    RcChannel::new(0, 4),
    RcChannel::new(1, 5),
    RcChannel::new(2, 18),
    RcChannel::new(3, 19),
];

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON configuration file
    #[clap(long)]
    config: Option<PathBuf>,
    /// RC axis whose receiver output is left disconnected
    #[clap(long)]
    dead_axis: Option<usize>,
    /// Forward speed at full throttle (m/s)
    #[clap(long, default_value_t = 0.5)]
    max_speed: f32,
    /// Yaw rate at full steering (rad/s)
    #[clap(long, default_value_t = 1.0)]
    max_turn: f32,
    /// Command a stop instead of holding the last motion when commands time out
    #[clap(long)]
    stop_on_timeout: bool,
    /// Stop sending velocity commands after this many seconds
    #[clap(long)]
    teleop_secs: Option<u64>,
}

/// Everything a configuration file may override.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoverConfig {
    decoder: DecoderConfig,
    solver: SolverConfig,
    channels: Option<[RcChannel; AXES]>,
    wheels: Option<[WheelPosition; WHEELS]>,
}

impl RoverConfig {
    fn load(opts: &Opts) -> Result<Self, String> {
        let mut config = match &opts.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("reading {}: {}", path.display(), e))?;
                serde_json::from_str(&text).map_err(|e| format!("parsing {}: {}", path.display(), e))?
            }
            None => RoverConfig::default(),
        };
        if opts.stop_on_timeout {
            config.solver.timeout_policy = TimeoutPolicy::Stop;
        }
        Ok(config)
    }
}

/// Settings handed from the command line to the spawned tasks.
struct Teleop {
    max_speed: f32,
    max_turn: f32,
    until: Option<Instant>,
}

#[embassy_executor::task]
async fn decoder_task(mut decoder: PulseDecoder<'static, SimulatedCapture<'static>, AXES>) -> ! {
    decoder.run().await
}

#[embassy_executor::task]
async fn solver_task(mut solver: AckermannSolver<'static, WHEELS>) -> ! {
    solver.run().await
}

/// One receiver frame period carrying a pulse of `width_us`.
///
/// Capture items hold 16-bit durations, so both phases saturate.
fn receiver_pulse(width_us: f32) -> PulseItem {
    let width = (width_us as u32).min(u16::MAX as u32);
    let low = FRAME_PERIOD_US.saturating_sub(width).min(u16::MAX as u32);
    PulseItem::pulse(width as u16, low as u16)
}

/// Plays the RC receiver: each live axis sweeps slowly through its range.
#[embassy_executor::task]
async fn receiver_task(
    frames: &'static [FrameChannel; AXES],
    calibration: PulseCalibration,
    dead_axis: Option<usize>,
) -> ! {
    let start = Instant::now();
    let (min, max) = (calibration.min_us as f32, calibration.max_us as f32);
    let mid = (min + max) / 2.0;
    let half = (max - min) / 2.0;
    let mut ticker = Ticker::every(Duration::from_micros(FRAME_PERIOD_US as u64));
    loop {
        let t = start.elapsed().as_millis() as f32 / 1000.0;
        for (axis, channel) in frames.iter().enumerate() {
            if Some(axis) == dead_axis {
                continue;
            }
            let phase = t * (0.2 + 0.1 * axis as f32) * core::f32::consts::TAU;
            let mut frame = PulseFrame::new();
            let _ = frame.push(receiver_pulse(mid + half * phase.sin()));
            channel.publish(frame);
        }
        ticker.next().await;
    }
}

/// Stand-in for the command translation layer: throttle and steering to a twist.
#[embassy_executor::task]
async fn teleop_task(
    joystick: &'static JoystickChannel<AXES>,
    commands: &'static CommandChannel,
    teleop: Teleop,
) {
    let mut ticker = Ticker::every(Duration::from_millis(50));
    loop {
        if teleop.until.is_some_and(|until| Instant::now() >= until) {
            info!("teleop finished, no further velocity commands");
            return;
        }
        if let Some(snapshot) = joystick.peek() {
            commands.publish(VelocityCommand::planar(
                snapshot.axes[1] * teleop.max_speed,
                snapshot.axes[0] * teleop.max_turn,
            ));
        }
        ticker.next().await;
    }
}

/// Stand-in for the actuation layer: log what the wheels are told to do.
#[embassy_executor::task]
async fn actuator_task(wheels: &'static WheelChannel<WHEELS>) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(500));
    loop {
        match wheels.peek() {
            Some(cmd) => {
                for (i, w) in cmd.wheels.iter().enumerate() {
                    info!(wheel = i, steer_deg = w.steer.to_degrees(), speed = w.speed, "wheel");
                }
            }
            None => info!("no wheel command yet"),
        }
        ticker.next().await;
    }
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    config: RoverConfig,
    opts: Opts,
) {
    let frames = &*mk_static!(
        [FrameChannel; AXES],
        [const { FrameChannel::drain() }; AXES]
    );
    let joystick = &*mk_static!(JoystickChannel<AXES>, JoystickChannel::<AXES>::peek_only());
    let commands = &*mk_static!(CommandChannel, CommandChannel::drain());
    let wheels = &*mk_static!(WheelChannel<WHEELS>, WheelChannel::<WHEELS>::peek_only());

    let wiring = config.channels.unwrap_or(DEFAULT_CHANNELS);
    let captures: [SimulatedCapture<'static>; AXES] =
        core::array::from_fn(|axis| SimulatedCapture::new(wiring[axis], &frames[axis]));

    let decoder = match PulseDecoder::new(captures, Some(joystick), config.decoder) {
        Ok(decoder) => decoder,
        Err(e) => {
            error!("RC decoder failed to start: {}", e);
            std::process::exit(1);
        }
    };
    let solver = match AckermannSolver::new(
        ak::new(config.wheels.unwrap_or(SAWPPY_WHEELS)),
        Some(commands),
        Some(wheels),
        config.solver,
    ) {
        Ok(solver) => solver,
        Err(e) => {
            error!("Ackermann solver failed to start: {}", e);
            std::process::exit(1);
        }
    };

    let teleop = Teleop {
        max_speed: opts.max_speed,
        max_turn: opts.max_turn,
        until: opts
            .teleop_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs)),
    };

    spawner.spawn(decoder_task(decoder)).unwrap();
    spawner.spawn(solver_task(solver)).unwrap();
    spawner
        .spawn(receiver_task(frames, config.decoder.calibration, opts.dead_axis))
        .unwrap();
    spawner.spawn(teleop_task(joystick, commands, teleop)).unwrap();
    spawner.spawn(actuator_task(wheels)).unwrap();
    info!("mock rover running");
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let config = match RoverConfig::load(&opts) {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, config, opts)).unwrap();
    });
}
