//! Receiver control facade.
//!
//! Maps device actions onto command frames and answers state queries
//! from the attribute store. Toggles decide from the last reported state,
//! so they are only as fresh as the receiver's most recent status line.

use std::sync::Arc;

use avr_core::{db_to_level, names};
use avr_protocol::{Command, CursorControl, MonitorOutput, SOUND_MODES, SOURCES};
use tracing::debug;

use crate::error::Result;
use crate::session::Session;

/// High-level control over one receiver.
#[derive(Clone)]
pub struct ReceiverControl {
    session: Arc<Session>,
}

impl ReceiverControl {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// The underlying session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ========================================================================
    // Power
    // ========================================================================

    pub async fn turn_on(&self) -> Result<()> {
        self.send(Command::main_zone_on()).await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.send(Command::main_zone_off()).await
    }

    /// Wakes the whole unit from standby.
    pub async fn power_on(&self) -> Result<()> {
        self.send(Command::power_on()).await
    }

    /// Puts the whole unit into standby.
    pub async fn power_standby(&self) -> Result<()> {
        self.send(Command::power_standby()).await
    }

    /// Switches the main zone off if it is on, on otherwise.
    pub async fn toggle_power(&self) -> Result<()> {
        if self.is_on() {
            self.turn_off().await
        } else {
            self.turn_on().await
        }
    }

    // ========================================================================
    // Volume
    // ========================================================================

    /// Sets the volume on the device scale (0.0..=98.0, half steps).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Protocol` if the level is out of range.
    pub async fn set_volume(&self, level: f64) -> Result<()> {
        self.send(Command::set_volume(level)?).await
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.send(Command::volume_up()).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.send(Command::volume_down()).await
    }

    pub async fn mute(&self) -> Result<()> {
        self.send(Command::mute(true)).await
    }

    pub async fn unmute(&self) -> Result<()> {
        self.send(Command::mute(false)).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.send(Command::mute(!self.is_muted())).await
    }

    // ========================================================================
    // Source, Sound Mode, Navigation
    // ========================================================================

    /// Selects an input by protocol name.
    ///
    /// Names outside `SOURCES` are sent as given; receivers with renamed
    /// inputs accept more than the common list.
    pub async fn select_source(&self, source: &str) -> Result<()> {
        self.send(Command::select_source(source)?).await
    }

    pub async fn set_sound_mode(&self, mode: &str) -> Result<()> {
        self.send(Command::sound_mode(mode)?).await
    }

    pub async fn cursor(&self, control: CursorControl) -> Result<()> {
        self.send(Command::cursor(control)).await
    }

    pub async fn monitor_output(&self, output: MonitorOutput) -> Result<()> {
        self.send(Command::monitor_output(output)).await
    }

    /// Asks the receiver to report every tracked attribute.
    pub async fn refresh(&self) -> Result<()> {
        for command in Command::status_queries() {
            self.send(command).await?;
        }
        Ok(())
    }

    async fn send(&self, command: Command) -> Result<()> {
        debug!(command = %command, "Receiver action");
        self.session.send_command(&command).await
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    /// True if the main zone last reported `ON`.
    pub fn is_on(&self) -> bool {
        self.text(names::MAIN_ZONE_POWER).as_deref() == Some("ON")
    }

    /// True if the main zone last reported mute on.
    pub fn is_muted(&self) -> bool {
        self.text(names::MAIN_ZONE_MUTE).as_deref() == Some("on")
    }

    /// Last reported volume in dB.
    pub fn volume_db(&self) -> Option<f64> {
        self.session
            .store()
            .get_attribute(names::MAIN_ZONE_VOLUME)
            .and_then(|value| value.as_number())
    }

    /// Last reported volume on the device scale.
    pub fn volume_level(&self) -> Option<f64> {
        self.volume_db().map(db_to_level)
    }

    pub fn source(&self) -> Option<String> {
        self.text(names::MAIN_ZONE_INPUT)
    }

    pub fn sound_mode(&self) -> Option<String> {
        self.text(names::MAIN_ZONE_SURROUND_MODE)
    }

    /// Surround modes offered for selection.
    pub fn sound_mode_list(&self) -> &'static [&'static str] {
        &SOUND_MODES
    }

    /// Common input names.
    pub fn source_list(&self) -> &'static [&'static str] {
        &SOURCES
    }

    fn text(&self, name: &str) -> Option<String> {
        self.session
            .store()
            .get_attribute(name)
            .and_then(|value| value.as_text().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::store::AttributeStore;
    use crate::SessionError;
    use avr_core::AttributeValue;
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};

    async fn control() -> (ReceiverControl, DuplexStream) {
        let session = Arc::new(Session::new(
            SessionConfig::new("127.0.0.1"),
            Arc::new(AttributeStore::new()),
        ));
        let (client, device) = duplex(1024);
        let (reader, writer) = tokio::io::split(client);
        session.attach(reader, writer).await;
        (ReceiverControl::new(session), device)
    }

    async fn read_frames(device: &mut DuplexStream, count: usize) -> Vec<String> {
        let mut frames = Vec::new();
        let mut current = Vec::new();
        while frames.len() < count {
            let byte = device.read_u8().await.unwrap();
            if byte == b'\r' {
                frames.push(String::from_utf8(std::mem::take(&mut current)).unwrap());
            } else {
                current.push(byte);
            }
        }
        frames
    }

    fn report(control: &ReceiverControl, name: &str, value: AttributeValue) {
        control.session().store().set_attribute(name, value);
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_simple_actions_map_to_frames() {
        let (control, mut device) = control().await;

        control.turn_on().await.unwrap();
        control.turn_off().await.unwrap();
        control.power_on().await.unwrap();
        control.power_standby().await.unwrap();
        control.volume_up().await.unwrap();
        control.volume_down().await.unwrap();
        control.mute().await.unwrap();
        control.unmute().await.unwrap();

        assert_eq!(
            read_frames(&mut device, 8).await,
            vec!["ZMON", "ZMOFF", "PWON", "PWSTANDBY", "MVUP", "MVDOWN", "MUON", "MUOFF"]
        );
    }

    #[tokio::test]
    async fn test_set_volume_encodes_half_steps() {
        let (control, mut device) = control().await;

        control.set_volume(10.5).await.unwrap();
        control.set_volume(11.0).await.unwrap();
        control.set_volume(5.0).await.unwrap();

        assert_eq!(read_frames(&mut device, 3).await, vec!["MV105", "MV11", "MV05"]);
    }

    #[tokio::test]
    async fn test_set_volume_out_of_range_sends_nothing() {
        let (control, _device) = control().await;
        let result = control.set_volume(120.0).await;
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_navigation_and_outputs() {
        let (control, mut device) = control().await;

        control.cursor(CursorControl::Up).await.unwrap();
        control.cursor(CursorControl::Menu).await.unwrap();
        control.monitor_output(MonitorOutput::Auto).await.unwrap();
        control.select_source("SAT/CBL").await.unwrap();
        control.set_sound_mode("PURE DIRECT").await.unwrap();

        assert_eq!(
            read_frames(&mut device, 5).await,
            vec!["MNCUP", "MNMEN ON", "VSMONIAUTO", "SISAT/CBL", "MSPURE DIRECT"]
        );
    }

    #[tokio::test]
    async fn test_injection_is_rejected() {
        let (control, _device) = control().await;
        let result = control.select_source("DVD\rZMOFF").await;
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_refresh_queries_every_attribute() {
        let (control, mut device) = control().await;

        control.refresh().await.unwrap();

        assert_eq!(
            read_frames(&mut device, 6).await,
            vec!["PW?", "ZM?", "MV?", "MU?", "SI?", "MS?"]
        );
    }

    // ------------------------------------------------------------------------
    // Toggles and Queries
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_toggles_follow_reported_state() {
        let (control, mut device) = control().await;

        // Nothing reported yet: treated as off and unmuted
        control.toggle_power().await.unwrap();
        control.toggle_mute().await.unwrap();

        report(&control, names::MAIN_ZONE_POWER, "ON".into());
        report(&control, names::MAIN_ZONE_MUTE, "on".into());
        control.toggle_power().await.unwrap();
        control.toggle_mute().await.unwrap();

        assert_eq!(
            read_frames(&mut device, 4).await,
            vec!["ZMON", "MUON", "ZMOFF", "MUOFF"]
        );
    }

    #[tokio::test]
    async fn test_state_queries() {
        let (control, _device) = control().await;
        assert!(!control.is_on());
        assert_eq!(control.volume_db(), None);
        assert_eq!(control.source(), None);

        report(&control, names::MAIN_ZONE_VOLUME, AttributeValue::Number(-69.5));
        report(&control, names::MAIN_ZONE_INPUT, "DVD".into());
        report(&control, names::MAIN_ZONE_SURROUND_MODE, "STEREO".into());

        assert_eq!(control.volume_db(), Some(-69.5));
        assert_eq!(control.volume_level(), Some(10.5));
        assert_eq!(control.source().as_deref(), Some("DVD"));
        assert_eq!(control.sound_mode().as_deref(), Some("STEREO"));
        assert!(control.sound_mode_list().contains(&"STEREO"));
        assert!(control.source_list().contains(&"DVD"));
    }
}
