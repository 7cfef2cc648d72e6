// Newline-delimited JSON-RPC over a byte stream (stdio for local MCP clients)

use crate::protocol::{parse_envelope, JsonRpcError, JsonRpcResponse};
use crate::server::McpServer;
use anyhow::Result;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Longest accepted message line
pub const MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

/// Serve requests from stdin, writing responses to stdout
pub async fn serve_stdio(server: &McpServer) -> Result<()> {
    serve_lines(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve one request per line until the reader is exhausted
///
/// Notifications (requests without an id) are handled but not answered.
pub async fn serve_lines<R, W>(server: &McpServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut out = FramedWrite::new(writer, LinesCodec::new());

    while let Some(line) = lines.next().await {
        let response = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match parse_envelope(line.as_bytes()) {
                Ok(request) => {
                    let notification = request.is_notification();
                    let response = server.handle_request(request).await;
                    if notification {
                        continue;
                    }
                    response
                }
                Err(rejected) => rejected,
            },
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                tracing::warn!(max = MAX_LINE_LENGTH, "Discarding oversized MCP message");
                JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error().with_data("message too long"),
                )
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };

        out.send(serde_json::to_string(&response)?).await?;
    }

    tracing::info!("MCP input closed");
    Ok(())
}
