//! One-shot receiver actions for `avrctl send`.

use std::sync::Arc;
use std::time::Duration;

use clap::{Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use avr_core::names;
use avr_protocol::{Command, CursorControl, MonitorOutput};
use avr_session::{ReceiverControl, Session};

use crate::error::{CliError, Result};

/// How long to wait for the receiver to report state a toggle depends on.
pub const STATE_TIMEOUT: Duration = Duration::from_secs(2);

/// A single action to perform on the receiver.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// Turn the main zone on
    On,
    /// Turn the main zone off
    Off,
    /// Toggle main zone power
    Toggle,
    /// Set the volume on the device scale (0-98, half steps)
    Volume {
        level: f64,
    },
    /// Raise the volume one step
    VolumeUp,
    /// Lower the volume one step
    VolumeDown,
    /// Mute the main zone
    Mute,
    /// Unmute the main zone
    Unmute,
    /// Toggle mute
    MuteToggle,
    /// Select an input source (e.g. DVD, SAT/CBL, TUNER)
    Source {
        name: String,
    },
    /// Select a surround mode (e.g. STEREO, "DOLBY DIGITAL")
    SoundMode {
        name: String,
    },
    /// Send a menu navigation key
    Cursor {
        #[arg(value_enum)]
        direction: Direction,
    },
    /// Select the HDMI monitor output
    Monitor {
        #[arg(value_enum)]
        output: Output,
    },
    /// Send a raw protocol frame (e.g. "PSBAS UP")
    Raw {
        frame: String,
    },
}

/// Menu navigation keys.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Return,
    Menu,
    Info,
}

impl From<Direction> for CursorControl {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::Up,
            Direction::Down => Self::Down,
            Direction::Left => Self::Left,
            Direction::Right => Self::Right,
            Direction::Enter => Self::Enter,
            Direction::Return => Self::Return,
            Direction::Menu => Self::Menu,
            Direction::Info => Self::Info,
        }
    }
}

/// HDMI monitor outputs.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    #[value(name = "1")]
    Monitor1,
    #[value(name = "2")]
    Monitor2,
    Auto,
}

impl From<Output> for MonitorOutput {
    fn from(output: Output) -> Self {
        match output {
            Output::Monitor1 => Self::Monitor1,
            Output::Monitor2 => Self::Monitor2,
            Output::Auto => Self::Auto,
        }
    }
}

impl Action {
    /// Attribute the action decides from, if it is a toggle.
    pub fn depends_on(&self) -> Option<&'static str> {
        match self {
            Self::Toggle => Some(names::MAIN_ZONE_POWER),
            Self::MuteToggle => Some(names::MAIN_ZONE_MUTE),
            _ => None,
        }
    }

    /// Performs the action through `control`.
    ///
    /// # Errors
    ///
    /// - `CliError::InvalidAction` if a raw frame is malformed
    /// - `CliError::Session` if the command cannot be built or written
    pub async fn execute(&self, control: &ReceiverControl) -> Result<()> {
        match self {
            Self::On => control.turn_on().await?,
            Self::Off => control.turn_off().await?,
            Self::Toggle => control.toggle_power().await?,
            Self::Volume { level } => control.set_volume(*level).await?,
            Self::VolumeUp => control.volume_up().await?,
            Self::VolumeDown => control.volume_down().await?,
            Self::Mute => control.mute().await?,
            Self::Unmute => control.unmute().await?,
            Self::MuteToggle => control.toggle_mute().await?,
            Self::Source { name } => control.select_source(name).await?,
            Self::SoundMode { name } => control.set_sound_mode(name).await?,
            Self::Cursor { direction } => control.cursor((*direction).into()).await?,
            Self::Monitor { output } => control.monitor_output((*output).into()).await?,
            Self::Raw { frame } => {
                let command =
                    Command::raw(frame).map_err(|e| CliError::InvalidAction(e.to_string()))?;
                control.session().send_command(&command).await?;
            }
        }
        Ok(())
    }
}

/// Connects, performs one action, then disconnects.
///
/// Toggles need the receiver's current state, so for those the session
/// listens, queries and waits up to `state_timeout` for the relevant
/// attribute before acting. Without an answer the toggle falls back to
/// treating the attribute as off.
///
/// # Errors
///
/// Returns connect and send failures.
pub async fn perform(
    session: Arc<Session>,
    action: &Action,
    state_timeout: Duration,
) -> Result<()> {
    let reported = match action.depends_on() {
        Some(attribute) => {
            let (tx, rx) = mpsc::channel(1);
            session.on_change(attribute, move |_| {
                let _ = tx.try_send(());
            })?;
            Some(rx)
        }
        None => None,
    };

    session.connect().await?;
    let control = ReceiverControl::new(Arc::clone(&session));

    let listener = Arc::clone(&session);
    let listening = tokio::spawn(async move { listener.listen().await });

    let result: Result<()> = async {
        if let Some(mut reported) = reported {
            control.refresh().await?;
            if tokio::time::timeout(state_timeout, reported.recv()).await.is_err() {
                warn!("Receiver did not report its state in time");
            }
        }
        action.execute(&control).await
    }
    .await;

    session.disconnect().await;
    match listening.await {
        Ok(Err(e)) => debug!(error = %e, "Listen ended with error"),
        Err(e) => warn!(error = %e, "Listen task failed"),
        Ok(Ok(())) => {}
    }

    result
}
