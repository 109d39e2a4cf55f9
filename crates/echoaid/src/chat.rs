//! Chatbot session.
//!
//! The transcript is persisted under [`CHAT_HISTORY_KEY`] after every
//! change and removed entirely once empty. Collaborator failures never
//! surface as errors: they become apology lines from the bot.

use std::sync::Arc;

use tracing::{debug, error};

use crate::ai::{AiCollaborator, ChatMessage};
use crate::error::Result;
use crate::storage::{load_json, save_json, KeyValueStore, CHAT_HISTORY_KEY};

/// Message sent on the user's behalf to start a new conversation.
pub const GREETING_PROMPT: &str = "Hello";

/// Bot line recorded when the opening greeting fails.
pub const GREETING_FAILED: &str =
    "Sorry, I am having trouble starting our conversation. Please try again.";

/// Bot line recorded when a reply fails.
pub const REPLY_FAILED: &str =
    "I seem to be having trouble responding. Please try again in a moment.";

/// A conversation with the assistant.
#[derive(Debug)]
pub struct ChatSession {
    store: Arc<dyn KeyValueStore>,
    ai: Arc<dyn AiCollaborator>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Restore the persisted transcript. A corrupted one is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: Arc<dyn KeyValueStore>, ai: Arc<dyn AiCollaborator>) -> Result<Self> {
        let messages: Vec<ChatMessage> =
            load_json(store.as_ref(), CHAT_HISTORY_KEY)?.unwrap_or_default();
        debug!("Loaded chat transcript with {} message(s)", messages.len());
        Ok(Self {
            store,
            ai,
            messages,
        })
    }

    /// The transcript so far.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Open the chat. A brand new conversation starts with the assistant's
    /// greeting; an existing one is left as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the transcript cannot be saved.
    pub async fn open(&mut self) -> Result<()> {
        if !self.messages.is_empty() {
            return Ok(());
        }

        let greeting = match self.ai.chat(&[], GREETING_PROMPT).await {
            Ok(text) => text,
            Err(e) => {
                error!("Chatbot initial message error: {}", e);
                GREETING_FAILED.to_string()
            }
        };
        self.messages.push(ChatMessage::bot(greeting));
        self.persist()
    }

    /// Send a message and return the assistant's reply.
    ///
    /// Blank input is ignored and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transcript cannot be saved.
    pub async fn send(&mut self, input: &str) -> Result<Option<ChatMessage>> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(text));
        self.persist()?;

        let reply = match self.ai.chat(&history, text).await {
            Ok(reply) => ChatMessage::bot(reply),
            Err(e) => {
                error!("Chatbot API error: {}", e);
                ChatMessage::bot(REPLY_FAILED)
            }
        };
        self.messages.push(reply.clone());
        self.persist()?;
        Ok(Some(reply))
    }

    /// Forget the conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&mut self) -> Result<()> {
        self.messages.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if self.messages.is_empty() {
            self.store.remove(CHAT_HISTORY_KEY)?;
            Ok(())
        } else {
            save_json(self.store.as_ref(), CHAT_HISTORY_KEY, &self.messages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockCollaborator, Sender};
    use crate::storage::MemoryStore;

    fn session(ai: MockCollaborator) -> (Arc<MemoryStore>, Arc<MockCollaborator>, ChatSession) {
        let store = Arc::new(MemoryStore::new());
        let ai = Arc::new(ai);
        let chat = ChatSession::load(store.clone(), ai.clone()).unwrap();
        (store, ai, chat)
    }

    #[tokio::test]
    async fn test_open_greets_new_conversation() {
        let (store, ai, mut chat) = session(MockCollaborator::new().with_chat_reply("Hi, I'm Echo."));
        chat.open().await.unwrap();

        assert_eq!(chat.messages(), &[ChatMessage::bot("Hi, I'm Echo.")]);
        assert_eq!(ai.chat_calls(), 1);
        assert!(store.get(CHAT_HISTORY_KEY).unwrap().is_some());

        chat.open().await.unwrap();
        assert_eq!(ai.chat_calls(), 1);
    }

    #[tokio::test]
    async fn test_open_failure_records_apology() {
        let (_, _, mut chat) = session(MockCollaborator::new().with_available(false));
        chat.open().await.unwrap();
        assert_eq!(chat.messages(), &[ChatMessage::bot(GREETING_FAILED)]);
    }

    #[tokio::test]
    async fn test_send_appends_both_lines() {
        let (_, _, mut chat) = session(MockCollaborator::new().with_chat_reply("Boil it first."));
        let reply = chat.send("  Is tap water safe?  ").await.unwrap().unwrap();

        assert_eq!(reply.text, "Boil it first.");
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[0].sender, Sender::User);
        assert_eq!(chat.messages()[0].text, "Is tap water safe?");
    }

    #[tokio::test]
    async fn test_blank_input_ignored() {
        let (_, ai, mut chat) = session(MockCollaborator::new());
        assert!(chat.send("   ").await.unwrap().is_none());
        assert!(chat.messages().is_empty());
        assert_eq!(ai.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_records_apology() {
        let (_, _, mut chat) = session(MockCollaborator::new().with_available(false));
        let reply = chat.send("help").await.unwrap().unwrap();
        assert_eq!(reply.text, REPLY_FAILED);
        assert_eq!(chat.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_transcript_survives_reload() {
        let (store, ai, mut chat) = session(MockCollaborator::new());
        chat.send("hello there").await.unwrap();

        let reloaded = ChatSession::load(store.clone(), ai.clone()).unwrap();
        assert_eq!(reloaded.messages(), chat.messages());
    }

    #[tokio::test]
    async fn test_clear_removes_key() {
        let (store, _, mut chat) = session(MockCollaborator::new());
        chat.send("hello").await.unwrap();
        chat.clear().unwrap();

        assert!(chat.messages().is_empty());
        assert!(store.get(CHAT_HISTORY_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupted_transcript_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.set(CHAT_HISTORY_KEY, "[{\"sender\":\"robot\"}]").unwrap();

        let chat = ChatSession::load(store.clone(), Arc::new(MockCollaborator::new())).unwrap();
        assert!(chat.messages().is_empty());
        assert!(store.get(CHAT_HISTORY_KEY).unwrap().is_none());
    }
}
