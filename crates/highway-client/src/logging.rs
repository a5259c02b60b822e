/// Upload event logging.
///
/// Sessions and the Flash Transfer uploader report structured events
/// through a `TransferLogger`, so callers can route them to `tracing`,
/// collect them in tests, or drop them.

use std::fmt;

/// Structured log entry for one upload.
#[derive(Debug, Clone)]
pub struct TransferLog {
    pub component: &'static str,
    /// Hex of the file digest the upload is keyed by.
    pub transfer_id: String,
    pub event: TransferEvent,
}

/// Upload events that can be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// TCP session connected
    Connected { addr: String },
    /// Flash: cumulative digest vector ready
    DigestVectorBuilt { entries: usize, duration_ms: u64 },
    /// Chunk handed to the transport
    ChunkSent { offset: u64, length: u32 },
    /// Server acknowledged up to `acknowledged`
    ChunkAcked { offset: u64, length: u32, acknowledged: u64 },
    /// Highway response with a non-zero error code
    ServerError { code: u32, offset: u64 },
    /// Flash slice answered with a non-success status
    SliceRejected { start: u64, status: String },
    /// Peer closed before the transfer finished
    ConnectionClosed { acknowledged: u64, total: u64 },
    /// Upload complete
    TransferComplete {
        total_bytes: u64,
        chunks: u32,
        duration_ms: u64,
    },
    /// Error occurred
    Error { message: String },
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { addr } => write!(f, "connected addr={}", addr),
            Self::DigestVectorBuilt { entries, duration_ms } => {
                write!(f, "digest_vector_built entries={} duration_ms={}", entries, duration_ms)
            }
            Self::ChunkSent { offset, length } => {
                write!(f, "chunk_sent offset={} len={}", offset, length)
            }
            Self::ChunkAcked { offset, length, acknowledged } => {
                write!(f, "chunk_acked offset={} len={} acked={}", offset, length, acknowledged)
            }
            Self::ServerError { code, offset } => {
                write!(f, "server_error code={} offset={}", code, offset)
            }
            Self::SliceRejected { start, status } => {
                write!(f, "slice_rejected start={} status={:?}", start, status)
            }
            Self::ConnectionClosed { acknowledged, total } => {
                write!(f, "connection_closed acked={} total={}", acknowledged, total)
            }
            Self::TransferComplete { total_bytes, chunks, duration_ms } => {
                write!(f, "transfer_complete bytes={} chunks={} duration_ms={}", total_bytes, chunks, duration_ms)
            }
            Self::Error { message } => write!(f, "error: {}", message),
        }
    }
}

/// Sink for upload events.
pub trait TransferLogger: Send + Sync {
    fn log(&self, entry: TransferLog);
}

/// Logger that uses the `tracing` crate.
pub struct TracingLogger;

impl TransferLogger for TracingLogger {
    fn log(&self, entry: TransferLog) {
        match &entry.event {
            TransferEvent::ConnectionClosed { .. }
            | TransferEvent::ServerError { .. }
            | TransferEvent::SliceRejected { .. }
            | TransferEvent::Error { .. } => {
                tracing::warn!(
                    component = entry.component,
                    transfer_id = %entry.transfer_id,
                    "{}",
                    entry.event,
                );
            }
            TransferEvent::Connected { .. }
            | TransferEvent::DigestVectorBuilt { .. }
            | TransferEvent::TransferComplete { .. } => {
                tracing::info!(
                    component = entry.component,
                    transfer_id = %entry.transfer_id,
                    "{}",
                    entry.event,
                );
            }
            _ => {
                tracing::debug!(
                    component = entry.component,
                    transfer_id = %entry.transfer_id,
                    "{}",
                    entry.event,
                );
            }
        }
    }
}

/// No-op logger that discards all log entries.
pub struct NullLogger;

impl TransferLogger for NullLogger {
    fn log(&self, _entry: TransferLog) {}
}

/// Logger that keeps every entry in memory.
#[derive(Default)]
pub struct MemoryLogger {
    entries: std::sync::Mutex<Vec<TransferLog>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded so far, in order.
    pub fn entries(&self) -> Vec<TransferLog> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => (**poisoned.get_ref()).clone(),
        }
    }

    pub fn events(&self) -> Vec<TransferEvent> {
        self.entries().into_iter().map(|e| e.event).collect()
    }
}

impl TransferLogger for MemoryLogger {
    fn log(&self, entry: TransferLog) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
