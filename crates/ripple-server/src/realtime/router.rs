//! Delivery router — the decision point between live push and web-push
//! fallback for direct messages and read receipts, plus typing relay.
//!
//! Both entry paths (WebSocket events and the HTTP send endpoint) route
//! through this one component, so the two tiers can never drift apart.
//!
//! Ordering guarantee: persistence always completes before any delivery is
//! attempted — a receiver can never observe a message that is not durable.
//! Delivery failures are logged and never roll anything back.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use ripple_core::{MediaAttachment, Profile, UserId};
use ripple_store::{ChatStore, ConversationView, MessageRow, NewMessage, StoreError};

use crate::metrics::{MESSAGES_ROUTED_TOTAL, READ_RECEIPTS_TOTAL, TYPING_FORWARDED_TOTAL};
use crate::platform::webpush::{PushPayload, types::PushData};
use crate::realtime::events::{self, MessagePayload, ServerEvent};
use crate::realtime::push::PushChannel;
use crate::realtime::typing::TypingTracker;
use crate::websocket::presence::PresenceRegistry;

/// Validation limits applied before anything is persisted.
#[derive(Clone, Copy, Debug)]
pub struct SendLimits {
    /// Maximum message text length in characters.
    pub max_content_chars: usize,
    /// Maximum attachments per message.
    pub max_attachments: usize,
}

impl Default for SendLimits {
    fn default() -> Self {
        Self {
            max_content_chars: 4096,
            max_attachments: 10,
        }
    }
}

/// Rejections and failures surfaced by the router.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Message has neither text nor attachments.
    #[error("message is empty")]
    EmptyMessage,
    /// Sender addressed themself.
    #[error("cannot send a message to yourself")]
    SelfMessage,
    /// Text exceeds the configured limit.
    #[error("message too long: {0} chars")]
    ContentTooLong(usize),
    /// Too many attachments.
    #[error("too many attachments: {0}")]
    TooManyAttachments(usize),
    /// The addressed receiver does not exist.
    #[error("unknown receiver: {0}")]
    UnknownReceiver(String),
    /// The underlying write failed — nothing was persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The target of a read-mark action.
#[derive(Debug)]
pub enum ReadTarget<'a> {
    /// Mark a whole conversation read.
    Conversation(&'a str),
    /// Mark a single message read.
    Message(&'a str),
}

/// Result of routing a message.
#[derive(Debug)]
pub struct RoutedMessage {
    /// The persisted message.
    pub message: MessageRow,
    /// The conversation ID.
    pub conversation_id: String,
    /// Whether the receiver's live session got the message.
    pub delivered_live: bool,
    /// Push-channel attempts made for an offline receiver.
    pub push_attempts: usize,
}

/// Result of routing a read receipt.
#[derive(Debug)]
pub struct RoutedRead {
    /// The conversation acted on.
    pub conversation_id: String,
    /// Message read flags flipped (0 on a redundant call).
    pub updated_messages: usize,
}

/// Routes outbound messages, read receipts, and typing indicators.
pub struct DeliveryRouter {
    store: Arc<ChatStore>,
    presence: Arc<PresenceRegistry>,
    push: Arc<PushChannel>,
    typing: TypingTracker,
    limits: SendLimits,
}

impl DeliveryRouter {
    /// Create a router over the shared presence registry and push channel.
    pub fn new(
        store: Arc<ChatStore>,
        presence: Arc<PresenceRegistry>,
        push: Arc<PushChannel>,
        limits: SendLimits,
    ) -> Self {
        Self {
            store,
            presence,
            push,
            typing: TypingTracker::new(),
            limits,
        }
    }

    /// Validate, persist, and deliver a direct message.
    ///
    /// The message and conversation update are durable before any delivery
    /// attempt; a live or push failure still reports success to the sender.
    #[instrument(skip_all, fields(sender = %sender, receiver = %receiver))]
    pub async fn route_message(
        &self,
        sender: &UserId,
        receiver: &UserId,
        content: &str,
        attachments: &[MediaAttachment],
    ) -> Result<RoutedMessage, RouteError> {
        let content = content.trim();
        if sender == receiver {
            return Err(RouteError::SelfMessage);
        }
        if content.is_empty() && attachments.is_empty() {
            return Err(RouteError::EmptyMessage);
        }
        if content.chars().count() > self.limits.max_content_chars {
            return Err(RouteError::ContentTooLong(content.chars().count()));
        }
        if attachments.len() > self.limits.max_attachments {
            return Err(RouteError::TooManyAttachments(attachments.len()));
        }
        if self.store.get_profile(receiver)?.is_none() {
            return Err(RouteError::UnknownReceiver(receiver.to_string()));
        }

        // Durable first. Nothing below may fail the send.
        let outcome = self.store.record_message(&NewMessage {
            sender: sender.as_str(),
            receiver: receiver.as_str(),
            content,
            attachments,
        })?;

        let sender_profile = self.store.get_profile(sender).ok().flatten();

        let mut delivered_live = false;
        let mut push_attempts = 0;

        if self.presence.is_online(receiver).await {
            delivered_live = self
                .deliver_live(receiver, &outcome.message, sender_profile.clone())
                .await;
            counter!(MESSAGES_ROUTED_TOTAL, "path" => "live").increment(1);
        } else {
            push_attempts = self
                .deliver_push(receiver, &outcome, sender_profile.as_ref())
                .await;
            let path = if push_attempts > 0 { "push" } else { "none" };
            counter!(MESSAGES_ROUTED_TOTAL, "path" => path).increment(1);
        }

        // Acknowledge to the sender's own session, when connected.
        let ack = ServerEvent::new(
            events::MESSAGE_SENT,
            serde_json::to_value(MessagePayload::from_row(&outcome.message, None))
                .unwrap_or_default(),
        );
        let _ = self.presence.send_to(sender, &ack).await;

        debug!(
            message_id = %outcome.message.id,
            delivered_live,
            push_attempts,
            "message routed"
        );

        Ok(RoutedMessage {
            conversation_id: outcome.conversation.id.clone(),
            message: outcome.message,
            delivered_live,
            push_attempts,
        })
    }

    /// Push the resolved message and a refreshed conversation snapshot to
    /// the receiver's live session.
    async fn deliver_live(
        &self,
        receiver: &UserId,
        message: &MessageRow,
        sender_profile: Option<Profile>,
    ) -> bool {
        let payload = MessagePayload::from_row(message, sender_profile);
        let event = match serde_json::to_value(&payload) {
            Ok(data) => ServerEvent::new(events::NEW_MESSAGE, data),
            Err(e) => {
                warn!(error = %e, "failed to serialize message payload");
                return false;
            }
        };
        let delivered = self.presence.send_to(receiver, &event).await;

        // Refreshed participant-scoped snapshot for list rendering.
        match self
            .store
            .get_conversation(&message.conversation_id, receiver.as_str())
        {
            Ok((conversation, member)) => {
                if let Some(view) =
                    ConversationView::project(&conversation, &member, receiver.as_str())
                {
                    if let Ok(data) = serde_json::to_value(&view) {
                        let _ = self
                            .presence
                            .send_to(receiver, &ServerEvent::new(events::CONVERSATION_UPDATE, data))
                            .await;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to project conversation view");
            }
        }

        delivered
    }

    /// Hand an offline receiver's copy to the push channel. A muted
    /// conversation suppresses the push entirely.
    async fn deliver_push(
        &self,
        receiver: &UserId,
        outcome: &ripple_store::SendOutcome,
        sender_profile: Option<&Profile>,
    ) -> usize {
        let muted = self
            .store
            .get_conversation(&outcome.conversation.id, receiver.as_str())
            .map(|(_, member)| member.muted)
            .unwrap_or(false);
        if muted {
            debug!(conversation_id = %outcome.conversation.id, "receiver muted conversation, skipping push");
            return 0;
        }

        let title = sender_profile
            .map(|p| p.display_name.clone().unwrap_or_else(|| p.username.clone()))
            .unwrap_or_else(|| "New message".to_owned());
        let payload = PushPayload {
            title,
            body: outcome.conversation.last_message_text.clone(),
            tag: outcome.message.id.clone(),
            data: PushData {
                url: format!("/messages/{}", outcome.conversation.id),
                notification_id: outcome.message.id.clone(),
            },
        };
        self.push.send(receiver.as_str(), &payload).await.attempted
    }

    /// Flip read flags, reset the reader's unread counter, and notify the
    /// other participant's live session. Read state is never pushed offline.
    #[instrument(skip_all, fields(reader = %reader))]
    pub async fn route_read_receipt(
        &self,
        reader: &UserId,
        target: ReadTarget<'_>,
    ) -> Result<RoutedRead, StoreError> {
        let outcome = match target {
            ReadTarget::Conversation(id) => {
                self.store.mark_conversation_read(id, reader.as_str())?
            }
            ReadTarget::Message(id) => self.store.mark_message_read(id, reader.as_str())?,
        };
        counter!(READ_RECEIPTS_TOTAL).increment(1);

        if let Some(other) = outcome.conversation.other_participant(reader.as_str()) {
            let other = UserId::from(other);
            let event = ServerEvent::new(
                events::MESSAGES_READ,
                serde_json::json!({
                    "conversationId": outcome.conversation.id,
                    "readerId": reader.as_str(),
                }),
            );
            // Online-only; no push fallback for read receipts.
            let _ = self.presence.send_to(&other, &event).await;
        }

        Ok(RoutedRead {
            conversation_id: outcome.conversation.id,
            updated_messages: outcome.updated_messages,
        })
    }

    /// Relay a typing indicator. Not persisted, not buffered: forwarded
    /// only when the receiver is online right now, silently dropped
    /// otherwise.
    pub async fn route_typing(&self, sender: &UserId, receiver: &UserId, is_typing: bool) {
        let _ = self.typing.set(sender.as_str(), receiver.as_str(), is_typing);
        if !self.presence.is_online(receiver).await {
            return;
        }
        let event = ServerEvent::new(
            events::USER_TYPING,
            serde_json::json!({ "userId": sender.as_str(), "isTyping": is_typing }),
        );
        if self.presence.send_to(receiver, &event).await {
            counter!(TYPING_FORWARDED_TOTAL).increment(1);
        }
    }

    /// Clear a disconnecting client's typing indicators, sending a final
    /// stopped-typing event to any online watcher.
    pub async fn clear_typing(&self, sender: &UserId) {
        for watcher in self.typing.clear_sender(sender.as_str()) {
            let watcher = UserId::from_string(watcher);
            let event = ServerEvent::new(
                events::USER_TYPING,
                serde_json::json!({ "userId": sender.as_str(), "isTyping": false }),
            );
            let _ = self.presence.send_to(&watcher, &event).await;
        }
    }

    /// The shared push channel (public-key lookup, subscription lifecycle).
    pub fn push_channel(&self) -> &Arc<PushChannel> {
        &self.push
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
