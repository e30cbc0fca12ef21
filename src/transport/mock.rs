//! Mock transport for tests and demos
//!
//! Provides a controllable in-memory link without real hardware. Two modes:
//!
//! - **Scripted**: responses are queued ahead of time and released into the
//!   receive buffer when the engine writes a request, matching half-duplex
//!   request/response timing.
//! - **Paired**: [`MockLink::pair`] builds two cross-wired endpoints, so a
//!   master and a slave engine can talk to each other in-process.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::traits::{Direction, LinkStats, SerialLink};
use crate::error::Result;

type ByteQueue = Arc<Mutex<VecDeque<u8>>>;

/// Mock serial link
#[derive(Debug, Clone)]
pub struct MockLink {
    name: String,
    /// Inbound bytes waiting to be read
    rx: ByteQueue,
    /// When paired, writes land in the peer's receive buffer
    peer_rx: Option<ByteQueue>,
    /// Scripted responses, released one per write
    responses: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Every frame written to the link
    history: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Direction transitions in order of occurrence
    directions: Arc<Mutex<Vec<Direction>>>,
    stats: Arc<Mutex<LinkStats>>,
    /// Artificial delay before a scripted response becomes readable
    response_latency: Duration,
}

impl MockLink {
    /// Create a scripted mock link
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rx: Arc::new(Mutex::new(VecDeque::new())),
            peer_rx: None,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            directions: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(LinkStats::default())),
            response_latency: Duration::ZERO,
        }
    }

    /// Create two cross-wired endpoints sharing one virtual line
    pub fn pair(name_a: impl Into<String>, name_b: impl Into<String>) -> (Self, Self) {
        let mut a = Self::new(name_a);
        let mut b = Self::new(name_b);
        a.peer_rx = Some(Arc::clone(&b.rx));
        b.peer_rx = Some(Arc::clone(&a.rx));
        (a, b)
    }

    /// Delay scripted responses by `latency`
    pub fn with_response_latency(mut self, latency: Duration) -> Self {
        self.response_latency = latency;
        self
    }

    /// Queue a response to be released by the next write
    pub async fn queue_response(&self, response: Vec<u8>) {
        self.responses.lock().await.push_back(response);
    }

    /// Queue multiple responses
    pub async fn queue_responses(&self, responses: Vec<Vec<u8>>) {
        let mut queue = self.responses.lock().await;
        for response in responses {
            queue.push_back(response);
        }
    }

    /// Put bytes straight into the receive buffer, bypassing the
    /// write-triggered release (models stale line noise)
    pub async fn preload_rx(&self, bytes: &[u8]) {
        self.rx.lock().await.extend(bytes.iter().copied());
    }

    /// All frames written to this link, oldest first
    pub async fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.history.lock().await.clone()
    }

    /// Direction transitions in order of occurrence
    pub async fn direction_log(&self) -> Vec<Direction> {
        self.directions.lock().await.clone()
    }

    /// Clear history and counters
    pub async fn clear(&self) {
        self.history.lock().await.clear();
        self.directions.lock().await.clear();
        self.stats.lock().await.reset();
    }
}

#[async_trait]
impl SerialLink for MockLink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        trace!(link = %self.name, tx = %hex::encode(data), "mock write");
        self.history.lock().await.push(data.to_vec());
        self.stats.lock().await.record_write(data.len());

        if let Some(peer_rx) = &self.peer_rx {
            peer_rx.lock().await.extend(data.iter().copied());
            return Ok(());
        }

        if let Some(response) = self.responses.lock().await.pop_front() {
            if !self.response_latency.is_zero() {
                tokio::time::sleep(self.response_latency).await;
            }
            debug!(link = %self.name, rx = %hex::encode(&response), "mock releasing response");
            self.rx.lock().await.extend(response.iter().copied());
        }

        Ok(())
    }

    async fn available(&self) -> usize {
        self.rx.lock().await.len()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut rx = self.rx.lock().await;
        let mut n = 0;
        while n < buf.len() {
            match rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        drop(rx);

        self.stats.lock().await.record_read(n);
        Ok(n)
    }

    async fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.directions.lock().await.push(direction);
        Ok(())
    }

    async fn stats(&self) -> LinkStats {
        self.stats.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_response_released_on_write() {
        let mut link = MockLink::new("mock");
        link.queue_response(vec![0x01, 0x02, 0x03]).await;

        // Nothing readable before the request goes out
        assert_eq!(link.available().await, 0);

        link.write(&[0x10, 0x20]).await.unwrap();
        assert_eq!(link.available().await, 3);

        let mut buf = [0u8; 8];
        let n = link.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x02, 0x03]);

        let history = link.sent_frames().await;
        assert_eq!(history, vec![vec![0x10, 0x20]]);
    }

    #[tokio::test]
    async fn test_paired_links_cross_wire() {
        let (mut a, mut b) = MockLink::pair("a", "b");

        a.write(&[0xAA]).await.unwrap();
        assert_eq!(b.available().await, 1);
        assert_eq!(a.available().await, 0);

        let mut buf = [0u8; 1];
        b.read(&mut buf).await.unwrap();
        assert_eq!(buf[0], 0xAA);

        b.write(&[0xBB, 0xCC]).await.unwrap();
        let mut buf = [0u8; 4];
        let n = a.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0xBB, 0xCC]);
    }

    #[tokio::test]
    async fn test_preload_and_partial_read() {
        let mut link = MockLink::new("mock");
        link.preload_rx(&[1, 2, 3, 4, 5]).await;

        let mut buf = [0u8; 2];
        assert_eq!(link.read(&mut buf).await.unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(link.available().await, 3);
    }

    #[tokio::test]
    async fn test_direction_log() {
        let mut link = MockLink::new("mock");
        link.set_direction(Direction::Transmit).await.unwrap();
        link.set_direction(Direction::Receive).await.unwrap();

        assert_eq!(
            link.direction_log().await,
            vec![Direction::Transmit, Direction::Receive]
        );
    }
}
