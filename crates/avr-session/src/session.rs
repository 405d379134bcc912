//! Connection manager: one telnet session with one receiver.
//!
//! A `Session` owns the transport exclusively. `connect` dials the receiver
//! and installs a fresh transport, replacing any previous one wholesale.
//! `listen` drives the read loop and the dispatcher until the session is
//! disconnected or the connection is lost. `disconnect` stops both and
//! closes the transport.
//!
//! ```text
//!            listen()                          spawned
//!   ┌───────────────────────┐  mpsc(1)  ┌────────────────────┐
//!   │ FrameReader           │──────────▶│ Dispatcher         │──▶ AttributeStore
//!   │ select!(reader token) │           │ select!(dispatcher │        │
//!   └───────────────────────┘           │         token)     │        ▼
//!                                       └────────────────────┘    handlers
//!   send_command() ──▶ CommandWriter (async mutex) ──▶ transport
//! ```
//!
//! The session never reconnects by itself. It reports whether an error is
//! retryable and leaves the policy to `ReconnectingClient`.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use avr_core::{AttributeValue, ConnectionState};
use avr_protocol::Command;

use crate::dispatcher::Dispatcher;
use crate::error::{Result, SessionError};
use crate::reader::FrameReader;
use crate::store::AttributeStore;
use crate::writer::CommandWriter;

/// Telnet control port.
pub const DEFAULT_CONTROL_PORT: u16 = 23;

/// Upper bound for dialing the receiver.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP keep-alive idle time and probe interval.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(5);

/// Type-erased read half of the transport.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

// ============================================================================
// Configuration
// ============================================================================

/// Where and how to reach the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Receiver hostname or IP address.
    pub host: String,

    /// Control port.
    pub port: u16,

    /// Maximum time to wait for the TCP connection.
    pub connect_timeout: Duration,

    /// Keep-alive idle time and probe interval.
    pub keepalive_interval: Duration,
}

impl SessionConfig {
    /// Creates a configuration with default port and timeouts.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_CONTROL_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: DEFAULT_KEEPALIVE,
        }
    }

    /// `host:port`, for logs and errors.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Cancellation tokens for one transport's worth of activities.
#[derive(Clone, Default)]
struct ShutdownSignal {
    dispatcher: CancellationToken,
    reader: CancellationToken,
}

/// A receiver session.
///
/// Shared as `Arc<Session>` between the listening task, command callers
/// and the reconnect loop.
pub struct Session {
    config: SessionConfig,
    store: Arc<AttributeStore>,
    writer: CommandWriter,
    reader: tokio::sync::Mutex<Option<FrameReader<BoxedReader>>>,
    shutdown: Mutex<ShutdownSignal>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Session {
    /// Creates a disconnected session.
    pub fn new(config: SessionConfig, store: Arc<AttributeStore>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            store,
            writer: CommandWriter::new(),
            reader: tokio::sync::Mutex::new(None),
            shutdown: Mutex::new(ShutdownSignal::default()),
            state_tx,
        }
    }

    /// Creates a session and connects it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ConnectTimeout` or `SessionError::Connect` if
    /// the receiver cannot be reached.
    pub async fn open(config: SessionConfig, store: Arc<AttributeStore>) -> Result<Self> {
        let session = Self::new(config, store);
        session.connect().await?;
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Dials the receiver and installs the new transport.
    ///
    /// Any previous transport is closed first. On failure no transport is
    /// installed and the state becomes `Error`.
    ///
    /// # Errors
    ///
    /// - `SessionError::ConnectTimeout` if dialing exceeds the connect timeout
    /// - `SessionError::Connect` if dialing or socket setup fails
    pub async fn connect(&self) -> Result<()> {
        self.set_state(ConnectionState::Connecting);
        self.close_transport().await;

        let stream = match self.dial().await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_state(ConnectionState::Error);
                return Err(e);
            }
        };

        let (reader, writer) = stream.into_split();
        self.attach(reader, writer).await;

        info!(address = %self.config.address(), "Connected to receiver");
        Ok(())
    }

    /// Installs an already-open transport.
    ///
    /// Used by `connect` after dialing; also lets callers run a session
    /// over any byte stream.
    pub async fn attach<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.close_transport().await;

        // A listen still running on the old transport must not outlive it
        let previous = std::mem::take(&mut *self.shutdown.lock());
        previous.dispatcher.cancel();
        previous.reader.cancel();

        let reader: BoxedReader = Box::new(reader);
        *self.reader.lock().await = Some(FrameReader::new(reader));
        self.writer.attach(Box::new(writer)).await;

        self.set_state(ConnectionState::Connected);
    }

    /// Reads and dispatches frames until disconnected or the connection drops.
    ///
    /// Seals the attribute store before the first read. Returns `Ok(())`
    /// after `disconnect`.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` if no transport is installed or
    ///   another `listen` already owns it
    /// - `SessionError::ConnectionLost` (retryable) on read failure, end of
    ///   stream or an empty frame; the transport is closed before returning
    pub async fn listen(&self) -> Result<()> {
        let mut reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or(SessionError::NotConnected)?;

        self.store.seal();

        let signal = self.shutdown.lock().clone();
        let (frame_tx, frame_rx) = mpsc::channel(1);
        let dispatcher = Dispatcher::new(Arc::clone(&self.store));
        let dispatch_task = tokio::spawn(dispatcher.run(frame_rx, signal.dispatcher.clone()));

        debug!(address = %self.config.address(), "Listening");

        let result = read_loop(&mut reader, &frame_tx, &signal.reader).await;

        // Let the dispatcher drain the frame already handed over
        drop(frame_tx);
        if let Err(e) = dispatch_task.await {
            warn!(error = %e, "Dispatcher task failed");
        }

        if let Err(e) = &result {
            warn!(
                address = %self.config.address(),
                error = %e,
                retryable = e.is_retryable(),
                "Listen ended"
            );
            drop(reader);
            self.close_transport().await;
            self.set_state(ConnectionState::Error);
        }

        result
    }

    /// Stops listening and closes the transport. Idempotent.
    ///
    /// Order: dispatcher, reader, transport. A handler that is already
    /// running finishes first.
    pub async fn disconnect(&self) {
        let signal = self.shutdown.lock().clone();
        signal.dispatcher.cancel();
        signal.reader.cancel();

        self.close_transport().await;
        self.set_state(ConnectionState::Disconnected);

        debug!(address = %self.config.address(), "Disconnected");
    }

    async fn dial(&self) -> Result<TcpStream> {
        let address = self.config.address();
        debug!(address = %address, "Connecting to receiver");

        let connecting = TcpStream::connect((self.config.host.as_str(), self.config.port));
        let stream = timeout(self.config.connect_timeout, connecting)
            .await
            .map_err(|_| SessionError::ConnectTimeout {
                address: address.clone(),
                timeout: self.config.connect_timeout,
            })?
            .map_err(|source| SessionError::Connect {
                address: address.clone(),
                source,
            })?;

        enable_keepalive(&stream, self.config.keepalive_interval)
            .map_err(|source| SessionError::Connect { address, source })?;

        Ok(stream)
    }

    async fn close_transport(&self) {
        self.reader.lock().await.take();

        if let Some(mut writer) = self.writer.detach().await {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "Transport already closed");
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    // ------------------------------------------------------------------------
    // Commands and Observation
    // ------------------------------------------------------------------------

    /// Writes one command frame.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` without an open transport
    /// - `SessionError::Io` if the write fails
    pub async fn send_command(&self, command: &Command) -> Result<()> {
        self.writer.send(command).await
    }

    /// Registers a change handler for `name`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RegistrationClosed` once `listen` has started.
    pub fn on_change<F>(&self, name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&AttributeValue) + Send + Sync + 'static,
    {
        self.store.add_handler(name, handler)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribes to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The attribute store this session writes.
    pub fn store(&self) -> &Arc<AttributeStore> {
        &self.store
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// Forwards frames to the dispatcher until shutdown or a read failure.
async fn read_loop(
    reader: &mut FrameReader<BoxedReader>,
    frames: &mpsc::Sender<String>,
    shutdown: &CancellationToken,
) -> Result<()> {
    loop {
        let frame = tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            frame = reader.read_frame() => frame?,
        };

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            sent = frames.send(frame) => {
                if sent.is_err() {
                    // Dispatcher stopped; shutdown is in progress
                    return Ok(());
                }
            }
        }
    }
}

fn enable_keepalive(stream: &TcpStream, interval: Duration) -> io::Result<()> {
    let keepalive = TcpKeepalive::new()
        .with_time(interval)
        .with_interval(interval);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

// ============================================================================
// Tests
// ============================================================================
