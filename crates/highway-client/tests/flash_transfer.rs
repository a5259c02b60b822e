/// Integration test: Flash Transfer slice upload against a local axum server.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use highway_client::{build_digest_vector, FlashTransferUploader, MemoryLogger, TransferEvent, UploadError, CHUNK_SIZE};
use highway_wire::{FlashTransferUploadReq, FlashTransferUploadResp, Message};

#[derive(Clone, Default)]
struct MockServer {
    received: Arc<Mutex<Vec<(FlashTransferUploadReq, Option<String>)>>>,
    /// Answer the n-th slice (0-based) with this status instead of "success".
    reject_at: Option<(usize, &'static str)>,
    /// Answer the n-th slice (0-based) with this HTTP status.
    status_at: Option<(usize, StatusCode)>,
}

async fn slice_upload(State(server): State<MockServer>, headers: HeaderMap, body: Bytes) -> Response {
    let req = FlashTransferUploadReq::decode(body).unwrap();
    let accept = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let index = {
        let mut received = server.received.lock().unwrap();
        received.push((req, accept));
        received.len() - 1
    };
    if let Some((at, code)) = server.status_at {
        if at == index {
            return (code, Vec::new()).into_response();
        }
    }
    let status = match server.reject_at {
        Some((at, status)) if at == index => status,
        _ => "success",
    };
    FlashTransferUploadResp {
        status: status.to_owned(),
    }
    .encode_to_vec()
    .into_response()
}

async fn spawn_server(server: MockServer) -> SocketAddr {
    let app = Router::new()
        .route("/sliceupload", post(slice_upload))
        .with_state(server);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn write_file(len: usize) -> (tempfile::NamedTempFile, Vec<u8>) {
    let data: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();
    (f, data)
}

fn uploader(addr: SocketAddr) -> FlashTransferUploader {
    FlashTransferUploader::new().with_endpoint(format!("http://{}/sliceupload", addr))
}

#[tokio::test]
async fn flash_upload_three_slices() {
    let server = MockServer::default();
    let addr = spawn_server(server.clone()).await;
    let (file, data) = write_file(3 * CHUNK_SIZE);

    let report = uploader(addr)
        .upload_file("ukey-abc", 1407, file.path())
        .await
        .unwrap();
    assert_eq!(report.chunks, 3);
    assert_eq!(report.bytes_acknowledged, 3 * CHUNK_SIZE as u64);

    let whole_sha1 = highway_digest::sha1_file(file.path()).await.unwrap();
    let received = server.received.lock().unwrap().clone();
    assert_eq!(received.len(), 3);

    for (i, (req, accept)) in received.iter().enumerate() {
        let start = (i * CHUNK_SIZE) as u64;
        assert_eq!(accept.as_deref(), Some("*/*"));
        assert_eq!(req.tag1, 0);
        assert_eq!(req.app_id, 1407);
        assert_eq!(req.tag3, 2);
        let body = req.body.as_ref().unwrap();
        assert_eq!(body.ukey, "ukey-abc");
        assert_eq!(body.start, start);
        assert_eq!(body.end, start + CHUNK_SIZE as u64 - 1);

        let slice = &data[i * CHUNK_SIZE..(i + 1) * CHUNK_SIZE];
        assert_eq!(&body.body[..], slice);
        assert_eq!(&body.sha1[..], &highway_digest::sha1(slice)[..]);

        let vector = &body.sha1_state.as_ref().unwrap().state;
        assert_eq!(vector.len(), 3);
        assert_eq!(&vector[2][..], &whole_sha1[..]);
    }

    // Every request carries the same vector.
    let vector_of = |i: usize| received[i].0.body.as_ref().map(|b| b.sha1_state.clone());
    assert_eq!(vector_of(0), vector_of(2));
}

#[tokio::test]
async fn flash_upload_partial_last_slice() {
    let server = MockServer::default();
    let addr = spawn_server(server.clone()).await;
    let (file, data) = write_file(CHUNK_SIZE + 10);

    uploader(addr).upload_file("k", 1, file.path()).await.unwrap();

    let received = server.received.lock().unwrap().clone();
    assert_eq!(received.len(), 2);
    let last = received[1].0.body.as_ref().unwrap();
    assert_eq!(last.start, CHUNK_SIZE as u64);
    assert_eq!(last.end, (CHUNK_SIZE + 9) as u64);
    assert_eq!(&last.body[..], &data[CHUNK_SIZE..]);
}

#[tokio::test]
async fn flash_upload_stops_on_rejection() {
    let server = MockServer {
        reject_at: Some((1, "fail")),
        ..Default::default()
    };
    let addr = spawn_server(server.clone()).await;
    let (file, _data) = write_file(3 * CHUNK_SIZE);

    let err = uploader(addr)
        .upload_file("ukey", 1407, file.path())
        .await
        .unwrap_err();

    match err {
        UploadError::Rejected { status, start } => {
            assert_eq!(status, "fail");
            assert_eq!(start, CHUNK_SIZE as u64);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn flash_upload_just_under_one_slice() {
    let server = MockServer::default();
    let addr = spawn_server(server.clone()).await;
    let (file, data) = write_file(CHUNK_SIZE - 1);

    let report = uploader(addr).upload_file("k", 1407, file.path()).await.unwrap();
    assert_eq!(report.chunks, 1);
    assert_eq!(report.bytes_sent, (CHUNK_SIZE - 1) as u64);

    let received = server.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    let body = received[0].0.body.as_ref().unwrap();
    assert_eq!(body.start, 0);
    assert_eq!(body.end, (CHUNK_SIZE - 2) as u64);
    assert_eq!(&body.body[..], &data[..]);

    let vector = &body.sha1_state.as_ref().unwrap().state;
    assert_eq!(vector.len(), 1);
    assert_eq!(&vector[0][..], &highway_digest::sha1(&data)[..]);
}

#[tokio::test]
async fn flash_upload_stops_on_server_status() {
    let server = MockServer {
        status_at: Some((1, StatusCode::INTERNAL_SERVER_ERROR)),
        ..Default::default()
    };
    let addr = spawn_server(server.clone()).await;
    let (file, _data) = write_file(3 * CHUNK_SIZE);

    let err = uploader(addr)
        .upload_file("ukey", 1407, file.path())
        .await
        .unwrap_err();

    match err {
        UploadError::HttpStatus { status, offset } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(offset, CHUNK_SIZE as u64);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn flash_upload_connection_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (file, _data) = write_file(100);

    let err = uploader(addr)
        .upload_file("ukey", 1407, file.path())
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Http(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn flash_logs_are_keyed_by_file_sha1() {
    let server = MockServer {
        reject_at: Some((1, "fail")),
        ..Default::default()
    };
    let addr = spawn_server(server.clone()).await;
    let (file, _data) = write_file(2 * CHUNK_SIZE);
    let whole_sha1 = hex::encode(highway_digest::sha1_file(file.path()).await.unwrap());

    let logger = Arc::new(MemoryLogger::new());
    let ukey = "secret-upload-key";
    uploader(addr)
        .with_logger(logger.clone())
        .upload_file(ukey, 1407, file.path())
        .await
        .unwrap_err();

    let entries = logger.entries();
    assert!(entries
        .iter()
        .any(|e| matches!(e.event, TransferEvent::Error { .. })));
    for entry in &entries {
        assert_eq!(entry.transfer_id, whole_sha1);
        assert!(!entry.transfer_id.contains(ukey));
    }
}

#[tokio::test]
async fn digest_vector_matches_one_pass_builder() {
    let (file, data) = write_file(3 * CHUNK_SIZE + 777);
    let size = data.len() as u64;

    let rereading = build_digest_vector(file.path(), size, CHUNK_SIZE as u64).await.unwrap();
    let one_pass = highway_digest::cumulative_digest_vector(file.path(), CHUNK_SIZE as u64)
        .await
        .unwrap();

    assert_eq!(rereading.len(), 4);
    assert_eq!(rereading, one_pass);
}
