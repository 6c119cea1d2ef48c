use futures::Stream;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Size of the pieces file bodies are handed to the transport in.
const PIECE_SIZE: usize = 64 * 1024;

pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Byte-level upload progress shared by every part of one multipart body.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    total: u64,
    sent: AtomicU64,
    /// Last percentage reported, so callbacks only fire on change
    reported: AtomicU8,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                total,
                sent: AtomicU64::new(0),
                reported: AtomicU8::new(0),
                callback,
            }),
        }
    }

    pub fn percent(&self) -> u8 {
        self.inner.reported.load(Ordering::Acquire)
    }

    /// Record `bytes` handed to the transport. Stays below 100 until
    /// [`finish`](Self::finish) since the server has not answered yet.
    pub fn advance(&self, bytes: usize) {
        let sent = self.inner.sent.fetch_add(bytes as u64, Ordering::AcqRel) + bytes as u64;
        let percent = if self.inner.total == 0 {
            0
        } else {
            ((sent.min(self.inner.total) * 100) / self.inner.total).min(99) as u8
        };
        self.report(percent);
    }

    pub fn finish(&self) {
        self.report(100);
    }

    fn report(&self, percent: u8) {
        let previous = self.inner.reported.fetch_max(percent, Ordering::AcqRel);
        if percent > previous {
            if let Some(callback) = &self.inner.callback {
                callback(percent);
            }
        }
    }

    /// Wrap a file body so that every piece pulled by the transport advances
    /// this tracker.
    pub fn stream(
        &self,
        data: Vec<u8>,
    ) -> impl Stream<Item = std::result::Result<Vec<u8>, std::io::Error>> + Send + 'static {
        let pieces: Vec<Vec<u8>> = data.chunks(PIECE_SIZE).map(|c| c.to_vec()).collect();
        let tracker = self.clone();
        futures::stream::iter(pieces.into_iter().map(move |piece| {
            tracker.advance(piece.len());
            Ok(piece)
        }))
    }
}
