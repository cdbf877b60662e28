use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mosaic_frame::{DecodedMessage, DecoderConfig, FrameDecoder};
use tracing::{debug, info, trace};

use crate::connection::ConnectionManager;
use crate::filter::EnablementFilter;
use crate::registry::CallbackRegistry;

/// Default size of a single transport read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Default pause when a poll produced no bytes.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(5);

/// Tuning for the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub read_chunk_size: usize,
    pub idle_interval: Duration,
    pub decoder: DecoderConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            decoder: DecoderConfig::default(),
        }
    }
}

/// Counters kept by the dispatch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub bytes_read: u64,
    pub frames_valid: u64,
    pub frames_invalid: u64,
    /// Valid frames whose identifier is disabled.
    pub frames_filtered: u64,
    /// Enabled frames with no registered handler.
    pub frames_unhandled: u64,
    /// Frames handed to at least one handler.
    pub frames_dispatched: u64,
}

/// Reads from the connection, decodes, filters, and fans out to handlers.
///
/// Invalid frames are counted and dropped. Valid frames go to the registry
/// only if the filter enables their identifier. After every reconnection the
/// decoder buffer is cleared so a half frame from the old link is never glued
/// to bytes from the new one.
pub struct Dispatcher {
    manager: Arc<ConnectionManager>,
    registry: Arc<CallbackRegistry>,
    filter: EnablementFilter,
    decoder: FrameDecoder,
    config: DispatcherConfig,
    stats: DispatchStats,
    session: u64,
    chunk: Vec<u8>,
}

impl Dispatcher {
    pub fn new(
        manager: Arc<ConnectionManager>,
        registry: Arc<CallbackRegistry>,
        filter: EnablementFilter,
    ) -> Self {
        Self::with_config(manager, registry, filter, DispatcherConfig::default())
    }

    pub fn with_config(
        manager: Arc<ConnectionManager>,
        registry: Arc<CallbackRegistry>,
        filter: EnablementFilter,
        config: DispatcherConfig,
    ) -> Self {
        let session = manager.session();
        Self {
            manager,
            registry,
            filter,
            decoder: FrameDecoder::with_config(config.decoder),
            chunk: vec![0; config.read_chunk_size.max(1)],
            config,
            stats: DispatchStats::default(),
            session,
        }
    }

    /// Read once and dispatch every frame that read completed.
    ///
    /// Returns the number of bytes read; 0 means nothing arrived or the link
    /// is down.
    pub fn poll_once(&mut self) -> usize {
        let (n, session) = self.manager.read(&mut self.chunk);
        if session != self.session {
            if self.decoder.buffered_len() > 0 {
                debug!(
                    dropped = self.decoder.buffered_len(),
                    "discarding partial frame from previous connection"
                );
            }
            self.decoder.clear();
            self.session = session;
        }

        if n == 0 {
            return 0;
        }
        self.stats.bytes_read += n as u64;
        self.decoder.extend(&self.chunk[..n]);

        while let Some(message) = self.decoder.next_message() {
            self.handle(&message);
        }
        n
    }

    /// Poll until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(endpoint = %self.manager.endpoint(), "dispatch loop started");
        while running.load(Ordering::SeqCst) {
            if self.poll_once() == 0 {
                thread::sleep(self.config.idle_interval);
            }
        }
        info!(
            bytes = self.stats.bytes_read,
            dispatched = self.stats.frames_dispatched,
            invalid = self.stats.frames_invalid,
            "dispatch loop stopped"
        );
    }

    fn handle(&mut self, message: &DecodedMessage) {
        if !message.is_valid() {
            self.stats.frames_invalid += 1;
            debug!(
                identifier = %message.identifier,
                encoding = message.encoding.as_str(),
                "dropping invalid frame"
            );
            return;
        }
        self.stats.frames_valid += 1;

        if !self.filter.is_enabled(&message.identifier) {
            self.stats.frames_filtered += 1;
            trace!(identifier = %message.identifier, "identifier disabled");
            return;
        }

        if self.registry.dispatch(message) == 0 {
            self.stats.frames_unhandled += 1;
            trace!(identifier = %message.identifier, "no handler registered");
        } else {
            self.stats.frames_dispatched += 1;
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn filter(&self) -> &EnablementFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut EnablementFilter {
        &mut self.filter
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }
}
