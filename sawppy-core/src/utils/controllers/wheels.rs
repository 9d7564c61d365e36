//! Wheel command solver task.
//!
//! Waits on the velocity command channel, converts each command into per-wheel
//! steering and speed with [`AckermannKinematics`], and overwrites the wheel
//! channel. When commands stop arriving the last wheel command stays in
//! effect (or, with [`TimeoutPolicy::Stop`], a single stop is published).

use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use super::{check_timeout, ConfigError};
use crate::utils::{
    math::kinematics::AckermannKinematics,
    messages::{CommandChannel, VelocityCommand, WheelChannel, WheelCommand},
    sync::LossMonitor,
};

/// What the solver does when no command arrives in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Publish nothing; downstream keeps the last wheel command.
    #[default]
    HoldLast,
    /// Publish one all-stop wheel command per loss episode.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Longest wait for a velocity command (ms)
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
}

fn default_command_timeout_ms() -> u64 {
    1000
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout("command", self.command_timeout_ms)
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

/// Result of one solver cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// A command was solved and a wheel command published.
    Published,
    /// The command was unusable and nothing was published.
    Rejected,
    /// No command arrived. `first` marks the start of a loss episode.
    TimedOut { first: bool },
}

/// Ackermann solver bound to its input and output channels.
pub struct AckermannSolver<'a, const WHEELS: usize> {
    kinematics: AckermannKinematics<WHEELS>,
    commands: &'a CommandChannel,
    wheels: &'a WheelChannel<WHEELS>,
    timeout: Duration,
    policy: TimeoutPolicy,
    output: WheelCommand<WHEELS>,
    link: LossMonitor,
}

impl<'a, const WHEELS: usize> AckermannSolver<'a, WHEELS> {
    /// Bind the solver to its channels.
    ///
    /// Both channels are required; a missing one is a configuration error.
    pub fn new(
        kinematics: AckermannKinematics<WHEELS>,
        commands: Option<&'a CommandChannel>,
        wheels: Option<&'a WheelChannel<WHEELS>>,
        config: SolverConfig,
    ) -> Result<Self, ConfigError> {
        let commands = commands.ok_or(ConfigError::MissingChannel("velocity command"))?;
        let wheels = wheels.ok_or(ConfigError::MissingChannel("wheel"))?;
        config.validate()?;

        Ok(Self {
            kinematics,
            commands,
            wheels,
            timeout: Duration::from_millis(config.command_timeout_ms),
            policy: config.timeout_policy,
            output: WheelCommand::new(Instant::now()),
            link: LossMonitor::new(),
        })
    }

    /// Most recent wheel command produced by this solver.
    pub fn last_output(&self) -> &WheelCommand<WHEELS> {
        &self.output
    }

    /// Wait for one command (or the timeout) and act on it.
    pub async fn step(&mut self) -> Cycle {
        match self.commands.consume(self.timeout).await {
            Ok(cmd) => {
                if self.link.received() {
                    tracing::info!("velocity commands resumed");
                }
                self.handle(&cmd)
            }
            Err(_) => self.handle_timeout(),
        }
    }

    /// Solve `cmd` and publish the resulting wheel command.
    pub fn handle(
        &mut self,
        cmd: &VelocityCommand,
    ) -> Cycle {
        if !cmd.is_finite() {
            tracing::warn!(?cmd, "non-finite velocity command dropped");
            return Cycle::Rejected;
        }
        if cmd.has_out_of_plane() {
            tracing::warn!("velocity commanded along unsupported axes is ignored");
        }

        let mut next = self.output;
        self.kinematics.apply(cmd, &mut next);
        if !next.is_finite() {
            tracing::warn!(?cmd, wheels = ?next.wheels, "non-finite wheel solution dropped");
            return Cycle::Rejected;
        }
        next.timestamp = Instant::now();
        self.output = next;
        self.wheels.publish(self.output);
        tracing::debug!(
            linear = cmd.linear.x,
            angular = cmd.angular.z,
            wheels = ?self.output.wheels,
            "wheel command"
        );
        Cycle::Published
    }

    fn handle_timeout(&mut self) -> Cycle {
        let first = self.link.missed();
        if first {
            tracing::error!("timed out waiting for velocity command, continuing to wait");
            if self.policy == TimeoutPolicy::Stop {
                self.output.reset();
                self.output.timestamp = Instant::now();
                self.wheels.publish(self.output);
            }
        }
        Cycle::TimedOut { first }
    }

    /// Solve forever.
    pub async fn run(&mut self) -> ! {
        tracing::info!(wheels = WHEELS, "Ackermann solver running");
        loop {
            self.step().await;
        }
    }
}
