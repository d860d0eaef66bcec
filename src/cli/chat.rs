//! Terminal chat against a running relay server.

use super::output::Output;
use crate::client::{APOLOGY, ChatClient, ChatSession};
use crate::types::{AppError, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

const ASSISTANT: &str = "assistant";
const USER: &str = "you";

/// Whether a line of input ends the chat.
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit" | "/exit" | "/quit")
}

/// Run the interactive loop until EOF or an exit command.
///
/// A failed turn is reported and the loop keeps going, so the user can retry.
pub async fn run(client: &ChatClient, greeting: &str, output: &Output) -> Result<()> {
    let mut session = ChatSession::new(greeting);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    output.info(&format!("Connected to {}", client.endpoint()));
    output.hint("Type 'exit' or press Ctrl-D to leave");
    output.newline();
    output.chat_message(ASSISTANT, greeting);

    loop {
        output.chat_label(USER);
        let line = lines
            .next_line()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read input: {}", e)))?;

        let Some(line) = line else {
            output.newline();
            break;
        };
        if is_exit_command(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        output.chat_label(ASSISTANT);
        match client
            .send_turn(&mut session, &line, |piece| output.stream_piece(piece))
            .await
        {
            Ok(_) => output.newline(),
            Err(e) => {
                // The session now ends with the apology; show whatever is missing from the screen.
                let streamed_any = session
                    .messages()
                    .last()
                    .is_some_and(|m| m.content != APOLOGY);
                if streamed_any {
                    output.stream_piece("\n\n");
                }
                output.stream_piece(APOLOGY);
                output.newline();
                output.error(&e.to_string());
            }
        }
    }

    Ok(())
}
