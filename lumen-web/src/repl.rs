//! Terminal chat loop.
//!
//! Reads one message per line, keeps the conversation in a local session,
//! and prints each reply. `exit` (any case) or end of input stops the loop.

use crate::provider::{GenerateRequest, Provider};
use crate::session::SessionStore;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Run the chat loop until `exit` or end of input.
pub async fn run_chat<R, W>(
    provider: &dyn Provider,
    store: &SessionStore,
    session_id: &str,
    system: Option<String>,
    input: R,
    output: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    output
        .write_all(format!("Lumen chat ({})\nType 'exit' to quit\n\n", provider.model()).as_bytes())
        .await?;

    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        let message = line.trim();

        if message.eq_ignore_ascii_case("exit") {
            output.write_all(b"Goodbye\n").await?;
            break;
        }
        if message.is_empty() {
            continue;
        }

        let mut session = store.lock(session_id).await;
        let request = GenerateRequest::new(message)
            .with_history(session.transcript().to_vec())
            .with_system(system.clone());

        match provider.generate(request).await {
            Ok(response) => {
                session.append_exchange(message, response.text.clone());
                output
                    .write_all(format!("Assistant: {}\n\n", response.text).as_bytes())
                    .await?;
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Chat turn failed");
                output
                    .write_all(format!("Error: {}\n\n", e.message).as_bytes())
                    .await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}
