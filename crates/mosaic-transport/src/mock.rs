//! Scripted transport for exercising the layers above without hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::endpoint::TransportEndpoint;
use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Mock transport for tests.
///
/// Clones share state, so a test keeps one handle to script the device while
/// the connection layer owns another.
#[derive(Clone)]
pub struct MockTransport {
    endpoint: TransportEndpoint,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    open: bool,
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    failing_opens: usize,
    fail_next_read: bool,
    open_calls: usize,
}

impl MockTransport {
    /// Create a closed mock transport.
    pub fn new() -> Self {
        Self {
            endpoint: TransportEndpoint::Serial {
                port_path: "mock".to_string(),
                baud_rate: crate::endpoint::DEFAULT_BAUD_RATE,
            },
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue bytes for subsequent reads.
    pub fn inject_read(&self, data: &[u8]) {
        self.state().read_buffer.extend(data);
    }

    /// Make the next `count` open attempts fail.
    pub fn fail_opens(&self, count: usize) {
        self.state().failing_opens = count;
    }

    /// Make the next read fail with an I/O error and drop the handle.
    pub fn fail_next_read(&self) {
        self.state().fail_next_read = true;
    }

    /// All bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state().write_buffer.clone()
    }

    /// Number of times `open` was called.
    pub fn open_calls(&self) -> usize {
        self.state().open_calls
    }

    /// Whether the mock currently reports itself open.
    pub fn is_open(&self) -> bool {
        self.state().open
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<()> {
        let mut state = self.state();
        state.open_calls += 1;
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            state.open = false;
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "mock device absent",
            )));
        }
        state.open = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        if state.fail_next_read {
            state.fail_next_read = false;
            state.open = false;
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock device unplugged",
            )));
        }
        let n = state.read_buffer.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.read_buffer.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.state();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        state.write_buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn is_alive(&self) -> bool {
        self.state().open
    }

    fn close(&mut self) {
        self.state().open = false;
    }

    fn endpoint(&self) -> &TransportEndpoint {
        &self.endpoint
    }
}
