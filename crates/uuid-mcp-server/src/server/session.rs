use crate::server::{
    service::handler::McpService,
    transport::{StdioTransport, TransportError},
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use uuid_mcp_core::{Error, RandSource, protocol::Response};

/// Drives one client session until EOF, shutdown, or a transport failure.
///
/// Frames are handled strictly in order: a response is written and flushed
/// before the next frame is read. Cancelling `shutdown` stops reading at the
/// next frame boundary. The write half is closed on every exit path.
pub async fn run_session<R, W, G>(
    mut transport: StdioTransport<R, W>,
    service: &McpService<G>,
    shutdown: CancellationToken,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    G: RandSource,
{
    let result = loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!("Shutdown requested, closing transport");
                break Ok(());
            }
            frame = transport.recv() => frame,
        };

        let frame = match frame {
            None => {
                tracing::info!("Client closed stdin, ending session");
                break Ok(());
            }
            Some(Ok(frame)) => frame,
            Some(Err(TransportError::FrameTooLarge { limit })) => {
                // FramedRead ends the stream once the decoder has returned
                // an error, so answer once and stop.
                tracing::warn!("Frame exceeds {limit} bytes, ending session");
                let response = Response::error(
                    None,
                    Error::InvalidRequest {
                        reason: format!("message exceeds {limit} bytes"),
                    },
                );
                break transport.send(&response).await;
            }
            Some(Err(err)) => break Err(err),
        };

        if let Some(response) = service.handle_frame(&frame) {
            if let Err(err) = transport.send(&response).await {
                break Err(err);
            }
        }
    };

    let closed = transport.close().await;
    result.and(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};
    use uuid_mcp_core::ThreadRandom;

    async fn read_json<R: tokio::io::AsyncBufRead + Unpin>(
        lines: &mut tokio::io::Lines<R>,
    ) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .expect("response in time")
            .unwrap()
            .expect("a line");
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn answers_requests_in_order_until_eof() {
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);
        let transport = StdioTransport::new(server_in, server_out, 4096);
        let service = McpService::new(ThreadRandom);

        let frames = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2025-03-26"}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "generate_uuid"}}),
        ];
        for frame in &frames {
            client_in
                .write_all(format!("{frame}\n").as_bytes())
                .await
                .unwrap();
        }
        drop(client_in);

        run_session(transport, &service, CancellationToken::new())
            .await
            .unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let init = read_json(&mut lines).await;
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["protocolVersion"], "2025-03-26");
        let list = read_json(&mut lines).await;
        assert_eq!(list["id"], 2);
        assert_eq!(list["result"]["tools"][0]["name"], "generate_uuid");
        let call = read_json(&mut lines).await;
        assert_eq!(call["id"], 3);
        assert_eq!(call["result"]["content"][0]["type"], "text");
        assert_eq!(
            call["result"]["content"][0]["text"].as_str().unwrap().len(),
            36
        );
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (_client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);
        let transport = StdioTransport::new(server_in, server_out, 4096);
        let service = McpService::new(ThreadRandom);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(
            Duration::from_secs(5),
            run_session(transport, &service, shutdown),
        )
        .await
        .expect("session ends promptly")
        .unwrap();

        let mut lines = BufReader::new(client_out).lines();
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_answered_then_session_ends() {
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);
        let transport = StdioTransport::new(server_in, server_out, 32);
        let service = McpService::new(ThreadRandom);

        let big = json!({"jsonrpc": "2.0", "id": 1, "method": "ping", "params": {"pad": "x".repeat(64)}});
        client_in
            .write_all(format!("{big}\n").as_bytes())
            .await
            .unwrap();
        client_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n")
            .await
            .unwrap();

        run_session(transport, &service, CancellationToken::new())
            .await
            .unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let response = read_json(&mut lines).await;
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], -32600);
        // The ping after the overflow is never read.
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_frames_do_not_end_session() {
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);
        let transport = StdioTransport::new(server_in, server_out, 4096);
        let service = McpService::new(ThreadRandom);

        client_in.write_all(b"not json\n\n").await.unwrap();
        client_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        drop(client_in);

        run_session(transport, &service, CancellationToken::new())
            .await
            .unwrap();

        let mut lines = BufReader::new(client_out).lines();
        let parse_error = read_json(&mut lines).await;
        assert_eq!(parse_error["error"]["code"], -32700);
        let pong = read_json(&mut lines).await;
        assert_eq!(pong["id"], 5);
        assert_eq!(pong["result"], json!({}));
    }
}
