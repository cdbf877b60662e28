use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mosaic_transport::{Transport, TransportEndpoint, TransportError};
use tracing::{debug, error, info, warn};

use crate::error::{LinkError, Result};

/// Default pause between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

const TIMER_THREAD_NAME: &str = "mosaic-reconnect";

/// Lifecycle of the receiver connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Wait between a failure and the next attempt; also the spacing of
    /// repeated attempts.
    pub reconnect_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Owns the transport and keeps it connected.
///
/// Any open, read, or liveness failure moves the manager to
/// [`ConnectionState::Reconnecting`] and arms a single background timer that
/// retries the same endpoint every `reconnect_delay` until it succeeds or the
/// manager shuts down. At most one timer is armed at a time.
///
/// Each successful open bumps [`session`](Self::session), which lets readers
/// discard partial data buffered from the previous connection.
///
/// Lock order is transport, then control. The session only changes while the
/// transport lock is held, so a read is always tagged with the session of the
/// handle it came from.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Mutex<Box<dyn Transport>>,
    control: Mutex<Control>,
    endpoint: TransportEndpoint,
    config: ReconnectConfig,
    session: AtomicU64,
    attempts: AtomicU64,
}

struct Control {
    state: ConnectionState,
    timer: Option<Timer>,
    stopped: bool,
}

/// Dropping `cancel` wakes the timer thread and ends it.
struct Timer {
    cancel: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionManager {
    /// Wrap a transport that has not been opened yet.
    pub fn new(transport: Box<dyn Transport>, config: ReconnectConfig) -> Self {
        let endpoint = transport.endpoint().clone();
        Self {
            shared: Arc::new(Shared {
                transport: Mutex::new(transport),
                control: Mutex::new(Control {
                    state: ConnectionState::Disconnected,
                    timer: None,
                    stopped: false,
                }),
                endpoint,
                config,
                session: AtomicU64::new(0),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Open the transport.
    ///
    /// On failure the manager enters `Reconnecting` and retries in the
    /// background; the returned state tells which branch was taken. While
    /// already connected or connecting, or while a retry is pending, this only
    /// reports the current state.
    pub fn connect(&self) -> ConnectionState {
        {
            let mut control = lock(&self.shared.control);
            let busy = matches!(
                control.state,
                ConnectionState::Connected | ConnectionState::Connecting
            );
            if control.stopped || busy || control.timer.is_some() {
                return control.state;
            }
            control.state = ConnectionState::Connecting;
        }

        match self.shared.open_session(ConnectionState::Connecting) {
            Ok(true) => {
                info!(endpoint = %self.shared.endpoint, "receiver connected");
                ConnectionState::Connected
            }
            Ok(false) => self.state(),
            Err(err) => {
                warn!(
                    endpoint = %self.shared.endpoint,
                    error = %err,
                    retry_in = ?self.shared.config.reconnect_delay,
                    "connect failed"
                );
                self.demote();
                self.state()
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.shared.control).state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn endpoint(&self) -> &TransportEndpoint {
        &self.shared.endpoint
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.shared.config
    }

    /// Number of successful opens so far.
    pub fn session(&self) -> u64 {
        self.shared.session.load(Ordering::SeqCst)
    }

    /// Number of retries made by the reconnect timer, successful or not.
    /// The open done by [`connect`](Self::connect) is not counted.
    pub fn reconnect_attempts(&self) -> u64 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Read whatever is available into `buf`.
    ///
    /// Returns the byte count together with the session the bytes belong to.
    /// The count is 0 when nothing arrived or when not connected. A read error
    /// or lost liveness demotes the connection and also yields 0; the caller
    /// just keeps polling.
    pub fn read(&self, buf: &mut [u8]) -> (usize, u64) {
        let mut transport = lock(&self.shared.transport);
        let (state, session) = self.shared.snapshot();
        if state != ConnectionState::Connected {
            return (0, session);
        }

        let result = if transport.is_alive() {
            transport.read(buf)
        } else {
            Err(TransportError::Closed)
        };

        match result {
            Ok(n) => (n, session),
            Err(err) => {
                warn!(endpoint = %self.shared.endpoint, error = %err, "receiver link lost");
                transport.close();
                drop(transport);
                self.demote();
                (0, session)
            }
        }
    }

    /// Write raw bytes to the receiver.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut transport = lock(&self.shared.transport);
        let (state, _) = self.shared.snapshot();
        if state != ConnectionState::Connected {
            return Err(LinkError::NotConnected(state));
        }

        match transport.write(data) {
            Ok(n) => Ok(n),
            Err(err) => {
                warn!(endpoint = %self.shared.endpoint, error = %err, "write failed");
                transport.close();
                drop(transport);
                self.demote();
                Err(err.into())
            }
        }
    }

    /// Cancel any pending reconnection and close the transport.
    ///
    /// Idempotent. After shutdown the manager stays `Disconnected`; a later
    /// [`connect`](Self::connect) is a no-op.
    pub fn shutdown(&self) {
        let timer = {
            let mut control = lock(&self.shared.control);
            if control.stopped {
                return;
            }
            control.stopped = true;
            control.state = ConnectionState::Disconnected;
            control.timer.take()
        };

        if let Some(Timer { cancel, handle }) = timer {
            drop(cancel);
            if handle.join().is_err() {
                error!("reconnect timer panicked");
            }
        }

        self.shared.close_transport();
        info!(endpoint = %self.shared.endpoint, "receiver disconnected");
    }

    /// Move to `Reconnecting` and make sure a timer is armed.
    fn demote(&self) {
        let mut control = lock(&self.shared.control);
        if control.stopped {
            return;
        }
        control.state = ConnectionState::Reconnecting;
        if control.timer.is_some() {
            return;
        }

        let (cancel, wakeup) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(TIMER_THREAD_NAME.into())
            .spawn(move || reconnect_loop(&shared, &wakeup));
        match spawned {
            Ok(handle) => {
                debug!(delay = ?self.shared.config.reconnect_delay, "reconnect timer armed");
                control.timer = Some(Timer { cancel, handle });
            }
            Err(err) => error!(error = %err, "failed to start reconnect timer"),
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.shared.endpoint)
            .field("state", &self.state())
            .field("session", &self.session())
            .finish()
    }
}

impl Shared {
    fn snapshot(&self) -> (ConnectionState, u64) {
        let control = lock(&self.control);
        (control.state, self.session.load(Ordering::SeqCst))
    }

    /// Open the transport if the manager is still in `expected`, then publish
    /// the new session.
    ///
    /// Returns `Ok(false)` when someone else already moved the state on or the
    /// manager was stopped; the transport is left as that party wants it.
    fn open_session(
        &self,
        expected: ConnectionState,
    ) -> std::result::Result<bool, TransportError> {
        let mut transport = lock(&self.transport);
        if self.snapshot().0 != expected {
            return Ok(false);
        }
        transport.open()?;

        let timer = {
            let mut control = lock(&self.control);
            if control.stopped || control.state != expected {
                transport.close();
                return Ok(false);
            }
            control.state = ConnectionState::Connected;
            self.session.fetch_add(1, Ordering::SeqCst);
            control.timer.take()
        };
        drop(transport);
        // A timer that opens the link drops its own handle here, which
        // detaches the thread.
        drop(timer);
        Ok(true)
    }

    fn close_transport(&self) {
        lock(&self.transport).close();
    }
}

/// Body of the timer thread: wait, retry, repeat until connected or cancelled.
fn reconnect_loop(shared: &Shared, wakeup: &mpsc::Receiver<()>) {
    loop {
        match wakeup.recv_timeout(shared.config.reconnect_delay) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        if lock(&shared.control).stopped {
            return;
        }

        shared.attempts.fetch_add(1, Ordering::SeqCst);
        match shared.open_session(ConnectionState::Reconnecting) {
            Ok(true) => {
                info!(endpoint = %shared.endpoint, "receiver reconnected");
                return;
            }
            Ok(false) => return,
            Err(err) => {
                debug!(endpoint = %shared.endpoint, error = %err, "reconnect attempt failed");
            }
        }
    }
}
