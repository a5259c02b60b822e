//! Highway over HTTP: one POST per 1 MiB chunk, strictly sequential.

use std::sync::Arc;
use std::time::Instant;

use highway_digest::read_chunk;
use highway_wire::{decode_frame, encode_frame, Message, RespDataHighwayHead};
use reqwest::header::{ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, USER_AGENT};
use tokio::io::AsyncRead;

use super::{build_request_head, HighwaySession, HighwayTrans, SessionState};
use crate::chunk::{ChunkDescriptor, UploadReport, CHUNK_SIZE};
use crate::error::UploadError;
use crate::logging::{TracingLogger, TransferEvent, TransferLog, TransferLogger};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MSIE 10.0; Windows NT 6.2)";

const COMPONENT: &str = "highway-http";

/// `http://{host}:{port}/cgi-bin/httpconn?htcmd=0x6FF0087&uin={uin}`
pub fn endpoint_for(trans: &HighwayTrans) -> String {
    format!(
        "http://{}:{}/cgi-bin/httpconn?htcmd=0x6FF0087&uin={}",
        trans.host, trans.port, trans.uin
    )
}

pub struct HttpSession {
    trans: HighwayTrans,
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
    logger: Arc<dyn TransferLogger>,
}

impl HttpSession {
    pub fn new(trans: HighwayTrans) -> Self {
        let endpoint = endpoint_for(&trans);
        Self {
            trans,
            client: reqwest::Client::new(),
            endpoint,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Share a client (and its connection pool) across sessions.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn TransferLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn log(&self, event: TransferEvent) {
        self.logger.log(TransferLog {
            component: COMPONENT,
            transfer_id: self.trans.transfer_id(),
            event,
        });
    }

    async fn run<R>(&self, mut source: R) -> Result<UploadReport, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        if self.trans.file_size == 0 {
            return Err(UploadError::EmptyFile);
        }
        let started = Instant::now();
        let mut state = SessionState::new(self.trans.file_size);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut offset = 0u64;
        let mut chunks = 0u32;

        loop {
            let n = read_chunk(&mut source, &mut buf).await?;
            if n == 0 {
                break;
            }
            let block = &buf[..n];
            let chunk = ChunkDescriptor::of(offset, block);
            let frame = encode_frame(&build_request_head(&self.trans, &chunk), block);
            self.log(TransferEvent::ChunkSent {
                offset,
                length: chunk.length,
            });

            let resp = self.post_frame(frame, offset).await?;
            if resp.error_code != 0 {
                self.log(TransferEvent::ServerError {
                    code: resp.error_code,
                    offset,
                });
                return Err(UploadError::Server {
                    code: resp.error_code,
                    offset,
                });
            }

            // A reply without a segment head acknowledges exactly this chunk.
            let acked = match &resp.seg {
                Some(seg) => seg.end()?,
                None => chunk.end(),
            };
            state.acknowledge(acked);
            self.log(TransferEvent::ChunkAcked {
                offset,
                length: chunk.length,
                acknowledged: state.acknowledged,
            });

            offset = chunk.end();
            chunks += 1;
        }

        if offset != self.trans.file_size {
            return Err(UploadError::SizeMismatch {
                declared: self.trans.file_size,
                actual: offset,
            });
        }
        if !state.is_complete() {
            return Err(UploadError::Unacknowledged {
                acknowledged: state.acknowledged,
                total: state.total_size,
            });
        }

        let report = UploadReport {
            chunks,
            bytes_sent: offset,
            bytes_acknowledged: state.acknowledged,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.log(TransferEvent::TransferComplete {
            total_bytes: report.bytes_acknowledged,
            chunks,
            duration_ms: report.duration_ms,
        });
        Ok(report)
    }

    async fn post_frame(&self, frame: Vec<u8>, offset: u64) -> Result<RespDataHighwayHead, UploadError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONNECTION, "keep-alive")
            .header(ACCEPT_ENCODING, "identity")
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_LENGTH, frame.len())
            .body(frame)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::HttpStatus { status, offset });
        }

        let body = response.bytes().await?;
        let (head, _) = decode_frame(&body)?;
        Ok(RespDataHighwayHead::decode(head)?)
    }
}

impl HighwaySession for HttpSession {
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

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn trans() -> HighwayTrans {
        HighwayTrans {
            uin: "10001".into(),
            command_id: 1,
            file_size: 0,
            file_md5: Bytes::new(),
            ticket: Bytes::new(),
            ext: Bytes::new(),
            host: "htdata3.qq.com".into(),
            port: 80,
        }
    }

    #[test]
    fn test_endpoint_format() {
        assert_eq!(
            endpoint_for(&trans()),
            "http://htdata3.qq.com:80/cgi-bin/httpconn?htcmd=0x6FF0087&uin=10001"
        );
        let session = HttpSession::new(trans()).with_endpoint("http://127.0.0.1:9/x");
        assert_eq!(session.endpoint(), "http://127.0.0.1:9/x");
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let mut session = HttpSession::new(trans()).with_logger(Arc::new(crate::logging::NullLogger));
        let err = session.upload(&[][..]).await.unwrap_err();
        assert!(matches!(err, UploadError::EmptyFile));
    }
}
