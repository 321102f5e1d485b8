//! The [`CommandSink`] trait and the sinks shipped with the crate.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;

/// The destination that receives resolved command text.
///
/// The sequencer treats send failures as opaque: a failed send aborts the
/// current run with no retry and no rollback of lines already sent.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, line: &str) -> Result<()>;
}

/// A thin TCP connection to a playout server speaking a line-oriented
/// command protocol.
///
/// Each command is written as one line terminated by `\r\n`. Server replies
/// are not consumed; the protocol layer is an external concern.
pub struct AmcpConnection {
    writer: tokio::sync::Mutex<TcpStream>,
    connected: watch::Sender<bool>,
}

impl AmcpConnection {
    /// Connect to the playout server.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Failed to connect to playout server at {host}:{port}"))?;
        let (connected, _rx) = watch::channel(true);
        Ok(Self {
            writer: tokio::sync::Mutex::new(stream),
            connected,
        })
    }

    /// Connectivity-change stream. Flips to `false` after a failed send.
    pub fn on_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

#[async_trait]
impl CommandSink for AmcpConnection {
    async fn send(&self, line: &str) -> Result<()> {
        let mut stream = self.writer.lock().await;
        let result = async {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\r\n").await?;
            stream.flush().await
        }
        .await;
        if result.is_err() {
            self.connected.send_replace(false);
        }
        result.with_context(|| format!("Failed to send command: {line}"))?;
        Ok(())
    }
}

/// A sink that records every command it receives.
///
/// Useful for tests and for dry-running a script without a server.
#[derive(Default)]
pub struct MemorySink {
    sent: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line sent so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandSink for MemorySink {
    async fn send(&self, line: &str) -> Result<()> {
        self.sent.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.send("PLAY 1-1 AMB").await.unwrap();
        sink.send("STOP 1-1").await.unwrap();
        assert_eq!(sink.sent(), vec!["PLAY 1-1 AMB", "STOP 1-1"]);
    }
}
