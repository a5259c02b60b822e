mod cli;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use highway_client::{
    FlashTransferUploader, HighwaySession, HighwayTrans, HttpSession, TcpSession, TracingLogger, UploadConfig,
    UploadReport,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{Cli, Mode, Target};

#[derive(Debug, Serialize)]
struct Fingerprints {
    md5: String,
    sha1: String,
    md5_10m: String,
    tri_sha1: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    mode: &'static str,
    file: String,
    size: u64,
    fingerprints: Fingerprints,
    report: UploadReport,
}

async fn fingerprints(path: &Path, size: u64) -> anyhow::Result<(Fingerprints, [u8; 16])> {
    let md5 = highway_digest::md5_file(path).await?;
    let prints = Fingerprints {
        md5: hex::encode(md5),
        sha1: hex::encode(highway_digest::sha1_file(path).await?),
        md5_10m: hex::encode(highway_digest::md5_head_10m(path).await?),
        tri_sha1: hex::encode(highway_digest::tri_sha1_file(path, size).await?),
    };
    Ok((prints, md5))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "highway_client=info,highway_upload=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = cli.target()?;
    let config = UploadConfig::from_env()?;

    let size = tokio::fs::metadata(&cli.file).await?.len();
    let (prints, md5) = fingerprints(&cli.file, size).await?;
    info!(file = %cli.file.display(), size, md5 = %prints.md5, mode = cli.mode.as_str(), "starting upload");

    let logger = Arc::new(TracingLogger);
    let report = match &target {
        Target::Highway(t) => {
            let trans = HighwayTrans {
                uin: t.uin.clone(),
                command_id: t.command_id,
                file_size: size,
                file_md5: Bytes::copy_from_slice(&md5),
                ticket: Bytes::from(t.ticket.clone()),
                ext: Bytes::from(t.ext.clone()),
                host: t.host.clone(),
                port: t.port,
            };
            let path = cli.file.clone();
            if cli.mode == Mode::Tcp {
                let mut session = TcpSession::new(trans)
                    .with_close_policy(config.close_policy)
                    .with_logger(logger);
                session.upload_file(path).await?
            } else {
                let mut session = HttpSession::new(trans)
                    .with_user_agent(config.user_agent.clone())
                    .with_logger(logger);
                session.upload_file(path).await?
            }
        }
        Target::Flash(t) => {
            FlashTransferUploader::new()
                .with_endpoint(config.flash_endpoint.clone())
                .with_chunk_size(config.flash_chunk_size)
                .with_logger(logger)
                .upload_file(&t.ukey, t.app_id, &cli.file)
                .await?
        }
    };

    let summary = Summary {
        mode: cli.mode.as_str(),
        file: cli.file.display().to_string(),
        size,
        fingerprints: prints,
        report,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
