//! Command stream executor: opens the upgraded exec stream and collects the
//! channel-framed output into independent stdout/stderr buffers.
//!
//! Frame layout on the wire: one channel byte, a big-endian u32 payload
//! length, then the payload. Channel 1 is stdout, channel 2 is stderr. The
//! stream closes when the remote process terminates.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cluster::{ClusterApi, CommandInvocation, ExecStatus, ExecutionResult};
use crate::error::{BridgeError, Result};

pub const CHANNEL_STDOUT: u8 = 1;
pub const CHANNEL_STDERR: u8 = 2;

/// Runs one command invocation over an upgraded exec stream.
///
/// Stateless apart from the deadline; safe to share across concurrent
/// invocations.
#[derive(Debug, Clone, Copy)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Execute the invocation and capture its output.
    ///
    /// The deadline covers stream establishment and the full read; an
    /// expired deadline surfaces as a `Stream` error.
    ///
    /// The exec protocol has no exit-code channel, so a clean close with a
    /// non-empty stderr buffer is reported as `RemoteCommandError`. This
    /// conflates "wrote warnings, exited 0" with "failed"; it is the only
    /// failure signal the protocol offers.
    ///
    /// # Errors
    ///
    /// `Connect` when the stream cannot be established, `Stream` on I/O
    /// failure, malformed framing, or deadline expiry.
    pub async fn execute(
        &self,
        cluster: &dyn ClusterApi,
        invocation: &CommandInvocation,
    ) -> Result<ExecutionResult> {
        let run = async {
            let stream = cluster
                .open_exec_stream(&invocation.target, &invocation.surface, &invocation.argv)
                .await?;
            read_framed_output(stream).await
        };

        let (stdout, stderr) = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                BridgeError::Stream(format!(
                    "deadline of {:?} exceeded for command on {}/{}",
                    self.timeout, invocation.target.name, invocation.surface
                ))
            })??;

        let status = if stderr.is_empty() {
            ExecStatus::Success
        } else {
            ExecStatus::RemoteCommandError
        };

        Ok(ExecutionResult {
            stdout,
            stderr,
            status,
        })
    }
}

/// Demultiplex channel-framed output until the stream closes.
///
/// A close at a frame boundary is a clean termination; anything that cuts a
/// frame short, or an unknown channel byte, is a stream error.
pub(crate) async fn read_framed_output<S>(mut stream: S) -> Result<(Vec<u8>, Vec<u8>)>
where
    S: AsyncRead + Unpin,
{
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    loop {
        let mut channel = [0u8; 1];
        match stream.read_exact(&mut channel).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(BridgeError::Stream(e.to_string())),
        }

        let mut len_bytes = [0u8; 4];
        stream
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| BridgeError::Stream(format!("truncated frame header: {}", e)))?;
        let len = u32::from_be_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; len];
        stream
            .read_exact(&mut payload)
            .await
            .map_err(|e| BridgeError::Stream(format!("truncated frame payload: {}", e)))?;

        match channel[0] {
            CHANNEL_STDOUT => stdout.extend_from_slice(&payload),
            CHANNEL_STDERR => stderr.extend_from_slice(&payload),
            other => {
                return Err(BridgeError::Stream(format!(
                    "unknown output channel: {}",
                    other
                )))
            }
        }
    }

    Ok((stdout, stderr))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn frame(channel: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![channel];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn demux_splits_channels() {
        let mut wire = frame(CHANNEL_STDOUT, b"out1 ");
        wire.extend(frame(CHANNEL_STDERR, b"err1"));
        wire.extend(frame(CHANNEL_STDOUT, b"out2"));

        let (stdout, stderr) = read_framed_output(Cursor::new(wire)).await.unwrap();
        assert_eq!(stdout, b"out1 out2");
        assert_eq!(stderr, b"err1");
    }

    #[tokio::test]
    async fn demux_empty_stream_is_clean_close() {
        let (stdout, stderr) = read_framed_output(Cursor::new(Vec::new())).await.unwrap();
        assert!(stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[tokio::test]
    async fn demux_rejects_unknown_channel() {
        let wire = frame(7, b"mystery");
        let result = read_framed_output(Cursor::new(wire)).await;
        assert!(matches!(result, Err(BridgeError::Stream(_))));
    }

    #[tokio::test]
    async fn demux_rejects_truncated_payload() {
        let mut wire = vec![CHANNEL_STDOUT];
        wire.extend_from_slice(&100u32.to_be_bytes());
        wire.extend_from_slice(b"short");

        let result = read_framed_output(Cursor::new(wire)).await;
        assert!(matches!(result, Err(BridgeError::Stream(_))));
    }

    #[tokio::test]
    async fn demux_handles_zero_length_frames() {
        let mut wire = frame(CHANNEL_STDOUT, b"");
        wire.extend(frame(CHANNEL_STDOUT, b"ok"));

        let (stdout, stderr) = read_framed_output(Cursor::new(wire)).await.unwrap();
        assert_eq!(stdout, b"ok");
        assert!(stderr.is_empty());
    }
}
