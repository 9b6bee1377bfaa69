//! Translation of typed lines into client envelopes.

use landlord_server::messaging::ClientMessage;

/// Turns one line of user input into an envelope.
///
/// * `!text` is a chat message
/// * `/command args` is a table command
/// * anything else is a play; an empty line passes
///
/// Returns `None` for input that should not be sent, such as an empty
/// chat or a bare `/`.
pub fn parse_line(line: &str) -> Option<ClientMessage> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(chat) = line.strip_prefix('!') {
        let content = chat.trim();
        return (!content.is_empty()).then(|| ClientMessage::Chat {
            content: content.to_string(),
        });
    }

    if let Some(cmd) = line.strip_prefix('/') {
        let cmd = cmd.trim();
        return (!cmd.is_empty()).then(|| ClientMessage::Cmd { cmd: cmd.to_string() });
    }

    Some(ClientMessage::Play {
        cards: line.trim().to_uppercase(),
    })
}
