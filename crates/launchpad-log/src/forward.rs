//! Forwarding of a child's output stream into an event sink

use crate::sink::EventSink;
use crate::types::StreamType;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Longest line forwarded as one record. Longer lines are split into
/// consecutive records of at most this many bytes.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Read `stream` line by line and write every non-empty line to `sink`.
///
/// Stdout lines are written at INFO and stderr lines at ERROR, prefixed with
/// `[Child Stdout][<pid>]` or `[Child Stderr][<pid>]`. Invalid UTF-8 is
/// replaced rather than aborting the reader. Returns the number of lines
/// forwarded once the stream ends, fails or `cancel` fires.
pub async fn forward_lines<R>(
    stream: R,
    stream_type: StreamType,
    pid: i32,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) -> u64
where
    R: AsyncRead + Unpin,
{
    debug!(pid, stream = %stream_type, "output forwarder started");
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::with_capacity(256);
    let mut forwarded = 0u64;

    loop {
        buf.clear();
        let mut limited = (&mut reader).take(MAX_LINE_BYTES as u64);
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(pid, stream = %stream_type, "output forwarder cancelled");
                break;
            }
            result = limited.read_until(b'\n', &mut buf) => {
                match result {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&buf);
                        let line = text.trim_end_matches(['\n', '\r']);
                        if line.is_empty() {
                            continue;
                        }
                        sink.write(
                            stream_type.level(),
                            &format!("[{}][{}] {}", stream_type.tag(), pid, line),
                        );
                        forwarded += 1;
                    }
                    Err(e) => {
                        warn!(pid, stream = %stream_type, error = %e, "error reading child output");
                        break;
                    }
                }
            }
        }
    }

    debug!(pid, stream = %stream_type, lines = forwarded, "output forwarder finished");
    forwarded
}
