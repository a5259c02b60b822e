//! Command-line arguments.
//!
//! Every option falls back to a `HIGHWAY_*` environment variable, so a
//! `.env` file can carry the session parameters.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};

/// Upload transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Highway over one persistent TCP connection.
    Tcp,
    /// Highway, one HTTP POST per chunk.
    Http,
    /// Flash Transfer slice upload.
    Flash,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Tcp => "tcp",
            Mode::Http => "http",
            Mode::Flash => "flash",
        }
    }
}

/// Hex-encoded byte string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim()).map(HexBytes)
    }
}

/// highway-upload - upload a file over Highway or Flash Transfer.
#[derive(Debug, Parser)]
#[command(
    name = "highway-upload",
    version,
    about = "Upload a file over Highway (TCP/HTTP) or Flash Transfer"
)]
pub struct Cli {
    /// Transport to upload with
    #[arg(value_enum)]
    pub mode: Mode,

    /// File to upload
    pub file: PathBuf,

    /// Highway server host
    #[arg(long, env = "HIGHWAY_HOST", required_if_eq_any = [("mode", "tcp"), ("mode", "http")])]
    pub host: Option<String>,

    /// Highway server port
    #[arg(long, env = "HIGHWAY_PORT", default_value_t = 80)]
    pub port: u16,

    /// Account uin
    #[arg(long, env = "HIGHWAY_UIN", required_if_eq_any = [("mode", "tcp"), ("mode", "http")])]
    pub uin: Option<String>,

    /// Highway command id
    #[arg(long, env = "HIGHWAY_COMMAND_ID", required_if_eq_any = [("mode", "tcp"), ("mode", "http")])]
    pub command_id: Option<u32>,

    /// Session ticket (hex)
    #[arg(
        long,
        env = "HIGHWAY_TICKET",
        hide_env_values = true,
        value_name = "HEX",
        required_if_eq_any = [("mode", "tcp"), ("mode", "http")]
    )]
    pub ticket: Option<HexBytes>,

    /// Extend info (hex)
    #[arg(long, env = "HIGHWAY_EXT", value_name = "HEX")]
    pub ext: Option<HexBytes>,

    /// Flash Transfer upload key
    #[arg(long, env = "HIGHWAY_FLASH_UKEY", hide_env_values = true, required_if_eq("mode", "flash"))]
    pub ukey: Option<String>,

    /// Flash Transfer app id
    #[arg(long, env = "HIGHWAY_FLASH_APP_ID", required_if_eq("mode", "flash"))]
    pub app_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighwayTarget {
    pub host: String,
    pub port: u16,
    pub uin: String,
    pub command_id: u32,
    pub ticket: Vec<u8>,
    pub ext: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashTarget {
    pub ukey: String,
    pub app_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Highway(HighwayTarget),
    Flash(FlashTarget),
}

impl Cli {
    /// Resolve the mode-specific options into an upload target.
    pub fn target(&self) -> anyhow::Result<Target> {
        let missing = |name: &str| anyhow!("--{} is required for {} uploads", name, self.mode.as_str());

        match self.mode {
            Mode::Tcp | Mode::Http => Ok(Target::Highway(HighwayTarget {
                host: self.host.clone().ok_or_else(|| missing("host"))?,
                port: self.port,
                uin: self.uin.clone().ok_or_else(|| missing("uin"))?,
                command_id: self.command_id.ok_or_else(|| missing("command-id"))?,
                ticket: self.ticket.clone().ok_or_else(|| missing("ticket"))?.0,
                ext: self.ext.clone().unwrap_or_default().0,
            })),
            Mode::Flash => Ok(Target::Flash(FlashTarget {
                ukey: self.ukey.clone().ok_or_else(|| missing("ukey"))?,
                app_id: self.app_id.ok_or_else(|| missing("app-id"))?,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_highway_args() {
        let cli = Cli::try_parse_from([
            "highway-upload",
            "tcp",
            "photo.jpg",
            "--host",
            "10.0.0.1",
            "--port",
            "8080",
            "--uin",
            "10001",
            "--command-id",
            "1004",
            "--ticket",
            "0a0b",
        ])
        .unwrap();

        assert_eq!(cli.mode, Mode::Tcp);
        assert_eq!(cli.file, PathBuf::from("photo.jpg"));
        let Target::Highway(t) = cli.target().unwrap() else {
            panic!("expected highway target");
        };
        assert_eq!(t.host, "10.0.0.1");
        assert_eq!(t.port, 8080);
        assert_eq!(t.command_id, 1004);
        assert_eq!(t.ticket, vec![0x0a, 0x0b]);
        assert!(t.ext.is_empty());
    }

    #[test]
    fn test_flash_args() {
        let cli = Cli::try_parse_from([
            "highway-upload",
            "flash",
            "a.bin",
            "--ukey",
            "k",
            "--app-id",
            "1407",
        ])
        .unwrap();
        assert_eq!(cli.mode, Mode::Flash);
        assert_eq!(
            cli.target().unwrap(),
            Target::Flash(FlashTarget {
                ukey: "k".into(),
                app_id: 1407
            })
        );
    }

    #[test]
    fn test_bad_args() {
        assert!(Cli::try_parse_from(["highway-upload", "tcp"]).is_err());
        assert!(Cli::try_parse_from(["highway-upload", "ftp", "a"]).is_err());
        assert!(Cli::try_parse_from(["highway-upload", "http", "a", "--host", "h"]).is_err());
        assert!(Cli::try_parse_from([
            "highway-upload",
            "http",
            "a",
            "--host",
            "h",
            "--uin",
            "1",
            "--command-id",
            "2",
            "--ticket",
            "not-hex",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["highway-upload", "flash", "a", "--ukey", "k"]).is_err());
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!("0A0b".parse::<HexBytes>().unwrap(), HexBytes(vec![0x0a, 0x0b]));
        assert!("abc".parse::<HexBytes>().is_err());
    }
}
