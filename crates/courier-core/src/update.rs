//! Inbound update model.
//!
//! These types mirror the subset of the Telegram Bot API objects the
//! dispatcher needs. Unknown fields are ignored during deserialization, so
//! raw provider payloads decode directly.

use serde::{Deserialize, Serialize};

/// One inbound event from the messaging provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic identifier assigned by the provider.
    pub update_id: i64,
    /// The message carried by this update, if any.
    #[serde(default)]
    pub message: Option<Message>,
}

impl Update {
    /// Returns the parsed command if this update carries a command message.
    pub fn command(&self) -> Option<Command> {
        self.message.as_ref().and_then(Message::command)
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A formatting entity inside a message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
}

/// A parsed command: `/name args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name without the leading `/` or any `@botname` suffix.
    pub name: String,
    /// Everything after the command name, leading whitespace removed.
    pub args: String,
}

impl Message {
    /// Returns `true` if the provider marked this message as a command.
    ///
    /// When entities are present the first one must be a `bot_command` at
    /// offset 0. Messages without entities fall back to a `/` prefix check.
    pub fn is_command(&self) -> bool {
        let Some(text) = self.text.as_deref() else {
            return false;
        };
        if !text.starts_with('/') {
            return false;
        }
        match self.entities.first() {
            Some(entity) => entity.kind == "bot_command" && entity.offset == 0,
            None => true,
        }
    }

    /// Parses the command payload, or `None` for non-command messages.
    pub fn command(&self) -> Option<Command> {
        if !self.is_command() {
            return None;
        }
        let text = self.text.as_deref()?;
        let (head, rest) = match self.entities.first() {
            Some(entity) => text.split_at(utf16_to_byte_index(text, entity.length)?),
            None => text.split_once(char::is_whitespace).unwrap_or((text, "")),
        };
        let name = head
            .strip_prefix('/')?
            .split('@')
            .next()
            .unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        Some(Command {
            name: name.to_string(),
            args: rest.trim_start().to_string(),
        })
    }
}

/// Converts a UTF-16 offset, as Telegram reports entity bounds, into a byte
/// index of `text`. `None` if it is out of range or splits a character.
fn utf16_to_byte_index(text: &str, offset: i64) -> Option<usize> {
    let target = usize::try_from(offset).ok()?;
    let mut units = 0;
    for (index, ch) in text.char_indices() {
        if units == target {
            return Some(index);
        }
        if units > target {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == target).then_some(text.len())
}

/// A text message to be sent to a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
}

impl OutgoingMessage {
    /// Creates a plain (non-reply) message.
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to_message_id: None,
        }
    }

    /// Marks the message as a reply to `message_id`.
    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(text: &str) -> Message {
        Message {
            message_id: 1,
            from: None,
            chat: Chat {
                id: 10,
                kind: "private".into(),
            },
            text: Some(text.into()),
            entities: Vec::new(),
        }
    }

    #[test]
    fn test_parse_command_with_args() {
        let cmd = text_message("/echo  hello world").command().unwrap();
        assert_eq!(cmd.name, "echo");
        assert_eq!(cmd.args, "hello world");
    }

    #[test]
    fn test_parse_command_strips_bot_name() {
        let cmd = text_message("/start@courier_bot").command().unwrap();
        assert_eq!(cmd.name, "start");
        assert_eq!(cmd.args, "");
    }

    #[test]
    fn test_plain_text_is_not_command() {
        assert!(text_message("hello /start").command().is_none());
        assert!(text_message("/").command().is_none());
    }

    #[test]
    fn test_entity_must_be_bot_command_at_start() {
        let mut msg = text_message("/start");
        msg.entities.push(MessageEntity {
            kind: "bold".into(),
            offset: 0,
            length: 6,
        });
        assert!(!msg.is_command());

        msg.entities[0].kind = "bot_command".into();
        assert!(msg.is_command());
    }

    fn command_message(text: &str, length: i64) -> Message {
        let mut msg = text_message(text);
        msg.entities.push(MessageEntity {
            kind: "bot_command".into(),
            offset: 0,
            length,
        });
        msg
    }

    #[test]
    fn test_entity_length_bounds_command_name() {
        let cmd = command_message("/start.", 6).command().unwrap();
        assert_eq!(cmd.name, "start");
        assert_eq!(cmd.args, ".");

        let cmd = command_message("/start@courier_bot now", 18).command().unwrap();
        assert_eq!(cmd.name, "start");
        assert_eq!(cmd.args, "now");
    }

    #[test]
    fn test_entity_length_counts_utf16_units() {
        // "é" is one UTF-16 unit but two bytes.
        let cmd = command_message("/café 😀 x", 5).command().unwrap();
        assert_eq!(cmd.name, "café");
        assert_eq!(cmd.args, "😀 x");

        // Ends inside the surrogate pair of the emoji.
        assert!(command_message("/😀", 2).command().is_none());
        assert!(command_message("/start", 40).command().is_none());
    }

    #[test]
    fn test_deserialize_provider_payload() {
        let raw = r#"{
            "update_id": 42,
            "message": {
                "message_id": 7,
                "from": {"id": 99, "is_bot": false, "first_name": "Ada"},
                "chat": {"id": -100, "type": "group"},
                "date": 1700000000,
                "text": "/help topics",
                "entities": [{"type": "bot_command", "offset": 0, "length": 5}]
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 42);
        let cmd = update.command().unwrap();
        assert_eq!(cmd.name, "help");
        assert_eq!(cmd.args, "topics");
        assert_eq!(update.message.unwrap().chat.id, -100);
    }

    #[test]
    fn test_update_without_message_has_no_command() {
        let update: Update = serde_json::from_str(r#"{"update_id": 1}"#).unwrap();
        assert!(update.command().is_none());
    }
}
