/// Highway over one persistent TCP connection.
///
/// The source is read as a stream of arbitrary-sized buffers; each buffer
/// is re-split into blocks of at most `CHUNK_SIZE` and written as frames
/// without waiting for acknowledgements. Responses are read concurrently
/// through `HighwayCodec`, which reassembles frames split across reads.
/// The upload completes on the first acknowledgement whose range reaches
/// the file size.
/// A close or reset from the server, seen on either half of the socket,
/// resolves through the session's `ClosePolicy`.

use std::io;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use highway_digest::READ_BUF_SIZE;
use highway_wire::{Frame, FrameError, HighwayCodec, Message, RespDataHighwayHead};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::io::ReaderStream;

use super::{build_request_head, ClosePolicy, HighwaySession, HighwayTrans, SessionState};
use crate::chunk::{split_blocks, ChunkDescriptor, UploadReport, CHUNK_SIZE};
use crate::error::UploadError;
use crate::logging::{TracingLogger, TransferEvent, TransferLog, TransferLogger};

const COMPONENT: &str = "highway-tcp";

pub struct TcpSession {
    trans: HighwayTrans,
    close_policy: ClosePolicy,
    logger: Arc<dyn TransferLogger>,
}

/// Writer-side counters, readable while the pump is still in flight.
#[derive(Debug, Default)]
struct Progress {
    chunks: AtomicU32,
    bytes: AtomicU64,
}

impl Progress {
    fn record(&self, end: u64) {
        self.bytes.store(end, Ordering::Relaxed);
        self.chunks.fetch_add(1, Ordering::Relaxed);
    }

    fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    fn chunks(&self) -> u32 {
        self.chunks.load(Ordering::Relaxed)
    }
}

/// How the writer side stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpEnd {
    /// Every source byte was framed and written.
    Finished,
    /// The peer reset or closed the connection under a write.
    PeerClosed,
}

fn is_peer_closed(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

impl TcpSession {
    pub fn new(trans: HighwayTrans) -> Self {
        Self {
            trans,
            close_policy: ClosePolicy::default(),
            logger: Arc::new(TracingLogger),
        }
    }

    pub fn with_close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn TransferLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn trans(&self) -> &HighwayTrans {
        &self.trans
    }

    fn log(&self, event: TransferEvent) {
        emit(self.logger.as_ref(), &self.trans, event);
    }

    async fn run<R>(&self, source: R) -> Result<UploadReport, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        if self.trans.file_size == 0 {
            return Err(UploadError::EmptyFile);
        }
        let started = Instant::now();

        let addr = format!("{}:{}", self.trans.host, self.trans.port);
        let stream = TcpStream::connect(&addr).await?;
        socket2::SockRef::from(&stream).set_nodelay(true)?;
        self.log(TransferEvent::Connected { addr });

        // The write half stays open until the upload resolves; dropping it
        // early would half-close the connection under the server.
        let (reader, writer) = stream.into_split();
        let mut responses = FramedRead::new(reader, HighwayCodec::new());
        let mut sink = FramedWrite::new(writer, HighwayCodec::new());

        let mut state = SessionState::new(self.trans.file_size);
        let progress = Progress::default();
        let mut pump_done = false;

        let pump = pump_chunks(&self.trans, self.logger.as_ref(), source, &mut sink, &progress);
        tokio::pin!(pump);

        loop {
            tokio::select! {
                result = &mut pump, if !pump_done => {
                    // After a peer close, keep reading whatever the server
                    // sent before hanging up.
                    result?;
                    pump_done = true;
                }
                frame = responses.next() => {
                    let frame = match frame {
                        None => {
                            let report = self.report(&state, &progress, started);
                            return self.on_close(&state, report);
                        }
                        Some(Err(FrameError::Io(e))) if is_peer_closed(&e) => {
                            let report = self.report(&state, &progress, started);
                            return self.on_close(&state, report);
                        }
                        Some(frame) => frame?,
                    };
                    let resp = RespDataHighwayHead::decode(&frame.head[..])?;

                    if resp.error_code != 0 {
                        let offset = resp.seg.as_ref().map_or(state.acknowledged, |s| s.data_offset);
                        self.log(TransferEvent::ServerError { code: resp.error_code, offset });
                        return Err(UploadError::Server { code: resp.error_code, offset });
                    }

                    let Some(seg) = resp.seg else { continue };
                    let end = seg.end()?;
                    state.acknowledge(end);
                    self.log(TransferEvent::ChunkAcked {
                        offset: seg.data_offset,
                        length: seg.data_length,
                        acknowledged: state.acknowledged,
                    });

                    // An absent filesize in the ack means the declared one.
                    let target = if seg.filesize == 0 { state.total_size } else { seg.filesize };
                    if end >= target {
                        let report = self.report(&state, &progress, started);
                        self.log(TransferEvent::TransferComplete {
                            total_bytes: report.bytes_acknowledged,
                            chunks: report.chunks,
                            duration_ms: report.duration_ms,
                        });
                        return Ok(report);
                    }
                }
            }
        }
    }

    fn report(&self, state: &SessionState, progress: &Progress, started: Instant) -> UploadReport {
        UploadReport {
            chunks: progress.chunks(),
            bytes_sent: progress.bytes(),
            bytes_acknowledged: state.acknowledged,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn on_close(&self, state: &SessionState, report: UploadReport) -> Result<UploadReport, UploadError> {
        self.log(TransferEvent::ConnectionClosed {
            acknowledged: state.acknowledged,
            total: state.total_size,
        });
        match self.close_policy {
            ClosePolicy::TreatAsSuccess => Ok(report),
            ClosePolicy::RequireAck if state.is_complete() => Ok(report),
            ClosePolicy::RequireAck => Err(UploadError::Unacknowledged {
                acknowledged: state.acknowledged,
                total: state.total_size,
            }),
        }
    }
}

impl HighwaySession for TcpSession {
    async fn upload<R>(&mut self, source: R) -> Result<UploadReport, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let result = self.run(source).await;
        if let Err(e) = &result {
            self.log(TransferEvent::Error { message: e.to_string() });
        }
        result
    }
}

fn emit(logger: &dyn TransferLogger, trans: &HighwayTrans, event: TransferEvent) {
    logger.log(TransferLog {
        component: COMPONENT,
        transfer_id: trans.transfer_id(),
        event,
    });
}

/// Frame every block of `source` into `sink`. Fails if the source yields a
/// different byte count than the declared file size. A write the peer
/// refuses ends the pump without error.
async fn pump_chunks<R, W>(
    trans: &HighwayTrans,
    logger: &dyn TransferLogger,
    source: R,
    sink: &mut FramedWrite<W, HighwayCodec>,
    progress: &Progress,
) -> Result<PumpEnd, UploadError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reads = ReaderStream::with_capacity(source, READ_BUF_SIZE);
    let mut offset = 0u64;

    while let Some(buf) = reads.next().await {
        for block in split_blocks(buf?, CHUNK_SIZE) {
            let chunk = ChunkDescriptor::of(offset, &block);
            let head = build_request_head(trans, &chunk);
            match sink.send(Frame::new(head, block)).await {
                Ok(()) => {}
                Err(FrameError::Io(e)) if is_peer_closed(&e) => return Ok(PumpEnd::PeerClosed),
                Err(e) => return Err(e.into()),
            }

            emit(logger, trans, TransferEvent::ChunkSent {
                offset: chunk.offset,
                length: chunk.length,
            });
            offset = chunk.end();
            progress.record(offset);
        }
    }

    if offset != trans.file_size {
        return Err(UploadError::SizeMismatch {
            declared: trans.file_size,
            actual: offset,
        });
    }
    Ok(PumpEnd::Finished)
}
