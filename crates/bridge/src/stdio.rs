//! Line-delimited JSON transport for one duplex connection.
//!
//! Every input line is one [`DuplexFrame`]; every frame sent back is written
//! as one line. Malformed lines are dropped.

use enhancer_core::DuplexFrame;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::Result;
use crate::duplex::{ContextId, CoordinatorHandle, Port};

/// Pump frames between `reader`/`writer` and `port` until input ends and
/// the far side has sent everything it owes.
///
/// # Errors
/// Returns error if reading or writing fails.
pub async fn serve_lines<R, W>(reader: R, mut writer: W, port: Port) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = port.split();
    let mut tx = Some(tx);
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line(), if tx.is_some() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<DuplexFrame>(line) {
                        Ok(frame) => {
                            if tx.as_ref().is_some_and(|tx| tx.send(frame).is_err()) {
                                tracing::debug!("far side closed; ignoring further input");
                                tx = None;
                            }
                        },
                        Err(e) => tracing::debug!(error = %e, "dropping malformed frame line"),
                    }
                },
                None => {
                    tracing::debug!("input closed");
                    tx = None;
                },
            },
            frame = rx.recv() => match frame {
                Some(frame) => {
                    let json = serde_json::to_string(&frame)?;
                    writer.write_all(format!("{json}\n").as_bytes()).await?;
                    writer.flush().await?;
                },
                None => break,
            },
        }
    }
    Ok(())
}

/// Serve context `ctx` of `coordinator` over stdin/stdout.
///
/// # Errors
/// Returns error if the coordinator has stopped or stdio fails.
pub async fn run_stdio_bridge(coordinator: &CoordinatorHandle, ctx: ContextId) -> Result<()> {
    tracing::info!(ctx, "bridge serving on stdio");
    let port = coordinator.connect(ctx)?;
    let stdin = BufReader::new(tokio::io::stdin());
    serve_lines(stdin, tokio::io::stdout(), port).await.map_err(|e| {
        tracing::error!("bridge stdio error: {}", e);
        e
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, reason = "test code")]

    use std::sync::Arc;

    use super::*;
    use crate::collab::{AppControl, ScriptHost};
    use crate::config::BridgeConfig;
    use crate::duplex::Coordinator;
    use crate::handler::RequestHandler;
    use crate::testing::{RecordingAppControl, RecordingScriptHost};
    use enhancer_storage::{BackendKind, KvStore, MemoryStorageArea};
    use serde_json::{Value, json};

    fn spawn_coordinator() -> CoordinatorHandle {
        let store = Arc::new(KvStore::new(BackendKind::Host(Arc::new(MemoryStorageArea::new()))));
        let handler = RequestHandler::new(
            store,
            Arc::new(RecordingScriptHost::unavailable()) as Arc<dyn ScriptHost>,
            Arc::new(RecordingAppControl::default()) as Arc<dyn AppControl>,
            &BridgeConfig::default(),
        );
        Coordinator::spawn(handler)
    }

    #[tokio::test]
    async fn test_lines_round_trip() {
        let coordinator = spawn_coordinator();
        let port = coordinator.connect(1).unwrap();
        let input = concat!(
            r#"{"channel":"app-bridge","invocation":"1","message":{"action":"query-database","data":{"namespace":["p1"],"query":"set","args":{"key":"theme","value":"dark"}}}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"channel":"app-bridge","invocation":"2","message":{"action":"query-database","data":{"namespace":"p1","query":"get","args":{"key":"theme"}}}}"#,
            "\n",
        );
        let mut output = Vec::new();
        serve_lines(input.as_bytes(), &mut output, port).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            replies,
            vec![
                json!({ "invocation": "1", "message": true }),
                json!({ "invocation": "2", "message": "dark" }),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_finishes() {
        let coordinator = spawn_coordinator();
        let port = coordinator.connect(2).unwrap();
        let mut output = Vec::new();
        serve_lines(&b""[..], &mut output, port).await.unwrap();
        assert!(output.is_empty());
    }
}
