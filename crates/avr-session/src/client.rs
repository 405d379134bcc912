//! Reconnecting client: the reconnect policy `Session` leaves to callers.
//!
//! The loop:
//! 1. Connect with exponential backoff until it succeeds or is cancelled
//! 2. Optionally ask the receiver for its current state
//! 3. Listen until the connection is lost or the client is cancelled
//! 4. On a retryable loss, wait out the backoff and go back to 1
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::receiver::ReceiverControl;
use crate::session::Session;

// ============================================================================
// Configuration
// ============================================================================

/// Backoff between connection attempts.
///
/// # Example
///
/// ```rust
/// use avr_session::ReconnectConfig;
/// use std::time::Duration;
///
/// let config = ReconnectConfig {
///     initial_delay: Duration::from_millis(500),
///     ..Default::default()
/// };
/// assert_eq!(config.next_delay(config.initial_delay), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,

    /// Maximum delay between attempts.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry).
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Delay to use after waiting `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }
}

// ============================================================================
// Reconnecting Client
// ============================================================================

/// Keeps a session connected and listening until cancelled.
///
/// # Example
///
/// ```rust,ignore
/// use avr_session::{AttributeStore, ReconnectingClient, Session, SessionConfig};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// let session = Arc::new(Session::new(
///     SessionConfig::new("192.168.1.20"),
///     Arc::new(AttributeStore::new()),
/// ));
/// session.on_change("MainZoneVolume", |v| println!("volume {v}"))?;
///
/// let cancel_token = CancellationToken::new();
/// let client = ReconnectingClient::new(session, Default::default(), cancel_token.clone());
/// tokio::spawn(async move { client.run().await });
/// ```
pub struct ReconnectingClient {
    session: Arc<Session>,
    config: ReconnectConfig,
    query_on_connect: bool,
    cancel_token: CancellationToken,
}

impl ReconnectingClient {
    /// Creates a client that sends status queries after every connect.
    #[must_use]
    pub fn new(
        session: Arc<Session>,
        config: ReconnectConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            session,
            config,
            query_on_connect: true,
            cancel_token,
        }
    }

    /// Enables or disables the status queries sent after each connect.
    #[must_use]
    pub fn with_query_on_connect(mut self, enabled: bool) -> Self {
        self.query_on_connect = enabled;
        self
    }

    /// The managed session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Runs until cancelled or until listening fails with a
    /// non-retryable error.
    ///
    /// # Errors
    ///
    /// Returns the listen error if it is not retryable.
    pub async fn run(&self) -> Result<()> {
        let address = self.session.config().address();
        info!(address = %address, "Receiver client starting");

        // Shared by failed connects and lost sessions; reset only once a
        // session has stayed up for `initial_delay`.
        let mut delay = self.config.initial_delay;

        loop {
            if self.cancel_token.is_cancelled() {
                break;
            }

            if !self.connect_with_retry(&mut delay).await {
                break;
            }
            let connected_at = Instant::now();

            if self.query_on_connect {
                let control = ReceiverControl::new(Arc::clone(&self.session));
                if let Err(e) = control.refresh().await {
                    warn!(error = %e, "Failed to query receiver state");
                }
            }

            match self.listen_until_cancelled().await {
                Ok(()) => break,
                Err(e) if e.is_retryable() => {
                    if connected_at.elapsed() >= self.config.initial_delay {
                        delay = self.config.initial_delay;
                        warn!(address = %address, error = %e, "Connection lost, reconnecting");
                    } else {
                        debug!(
                            address = %address,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Connection dropped right after connect, backing off"
                        );
                    }
                }
                Err(e) => return Err(e),
            }

            if !self.backoff(&mut delay).await {
                break;
            }
        }

        self.session.disconnect().await;
        info!(address = %address, "Receiver client shutting down");
        Ok(())
    }

    /// Connects, backing off between failed attempts.
    ///
    /// Returns false if cancelled before a connection was made.
    async fn connect_with_retry(&self, delay: &mut Duration) -> bool {
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);
            debug!(attempt, "Attempting to connect to receiver");

            let connecting = self.session.connect();
            let result = tokio::select! {
                result = connecting => result,
                _ = self.cancel_token.cancelled() => return false,
            };

            match result {
                Ok(()) => {
                    debug!(attempt, "Connection successful");
                    return true;
                }
                Err(e) if attempt == 1 => {
                    warn!(error = %e, "Receiver unreachable, will retry");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Connection attempt failed");
                }
            }

            if !self.backoff(delay).await {
                return false;
            }
        }
    }

    /// Sleeps for `delay`, then grows it. Returns false if cancelled first.
    async fn backoff(&self, delay: &mut Duration) -> bool {
        tokio::select! {
            _ = sleep(*delay) => {
                *delay = self.config.next_delay(*delay);
                true
            }
            _ = self.cancel_token.cancelled() => {
                info!("Connection retry cancelled");
                false
            }
        }
    }

    /// Listens until the session ends; on cancel, disconnects and waits
    /// for the listen loop to wind down.
    async fn listen_until_cancelled(&self) -> Result<()> {
        let listen = self.session.listen();
        tokio::pin!(listen);

        tokio::select! {
            result = &mut listen => result,
            _ = self.cancel_token.cancelled() => {
                self.session.disconnect().await;
                listen.await
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
