//! High-level transactional [`ChatStore`] API.
//!
//! Composes the repositories into conversation-centric methods. Every write
//! method runs inside a single `SQLite` transaction — callers never observe
//! partial state (a message without its conversation snapshot, an unread
//! bump without the message).
//!
//! INVARIANT: writes touching one conversation are serialized by an
//! in-process per-key mutex (`with_write_lock`); the key is the canonical
//! participant pair for sends (which may create the conversation) and the
//! conversation ID for everything else. Unread counters are updated with
//! storage-side arithmetic, never read-then-write.

use rusqlite::TransactionBehavior;
use tracing::{debug, instrument};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use ripple_core::{MediaAttachment, MessageId, NotificationId, NotificationKind, Profile, UserId};

use crate::errors::{Result, StoreError};
use crate::sqlite::connection::ConnectionPool;
use crate::sqlite::repositories::conversation::{ConversationRepo, canonical_pair};
use crate::sqlite::repositories::message::MessageRepo;
use crate::sqlite::repositories::notification::NotificationRepo;
use crate::sqlite::repositories::push_subscription::{PushSubscriptionRepo, SubscriptionUpsert};
use crate::sqlite::repositories::user::UserRepo;
use crate::sqlite::row_types::{
    ConversationRow, MemberRow, MessageRow, NotificationRow, PushSubscriptionRow,
};

/// A message to record.
pub struct NewMessage<'a> {
    /// Sending user.
    pub sender: &'a str,
    /// Receiving user.
    pub receiver: &'a str,
    /// Text content (may be empty when attachments are present).
    pub content: &'a str,
    /// Attachments in send order.
    pub attachments: &'a [MediaAttachment],
}

/// A notification to record.
pub struct NewNotification<'a> {
    /// Recipient user.
    pub recipient: &'a str,
    /// User whose action produced the notification.
    pub sender: &'a str,
    /// Action kind.
    pub kind: NotificationKind,
    /// Referenced post, when the kind concerns one.
    pub post_id: Option<&'a str>,
    /// Human-readable notification text.
    pub body: &'a str,
}

/// Result of recording a message.
#[derive(Debug)]
pub struct SendOutcome {
    /// The persisted message.
    pub message: MessageRow,
    /// The conversation after the snapshot update.
    pub conversation: ConversationRow,
    /// The receiver's unread count after the increment.
    pub receiver_unread: i64,
    /// Whether this send created the conversation.
    pub conversation_created: bool,
}

/// Result of a read-mark action.
#[derive(Debug)]
pub struct ReadOutcome {
    /// The conversation acted on.
    pub conversation: ConversationRow,
    /// How many message read flags were flipped (0 on a redundant call).
    pub updated_messages: usize,
}

/// High-level store wrapping a connection pool and all repositories.
pub struct ChatStore {
    pool: ConnectionPool,
    write_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl ChatStore {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 32;

    /// Create a new `ChatStore` with the given connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    // ── Users / profiles ────────────────────────────────────────────────

    /// Insert or refresh a profile row (kept in sync by the account system).
    pub fn upsert_user(
        &self,
        id: &UserId,
        username: &str,
        display_name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        UserRepo::upsert(&conn, id.as_str(), username, display_name, avatar)
    }

    /// Resolve the display profile for a user.
    pub fn get_profile(&self, id: &UserId) -> Result<Option<Profile>> {
        let conn = self.pool.get()?;
        Ok(UserRepo::get(&conn, id.as_str())?.map(|row| Profile {
            user_id: UserId::from_string(row.id),
            username: row.username,
            display_name: row.display_name,
            avatar: row.avatar,
        }))
    }

    // ── Messages ────────────────────────────────────────────────────────

    /// Persist a direct message.
    ///
    /// Finds or creates the conversation for the pair, appends the message,
    /// refreshes the last-message snapshot, and bumps the receiver's unread
    /// counter — all in one transaction. Delivery is the caller's concern;
    /// this method completing means the message is durable.
    #[instrument(skip_all, fields(sender = %msg.sender, receiver = %msg.receiver))]
    pub fn record_message(&self, msg: &NewMessage<'_>) -> Result<SendOutcome> {
        let (a, b) = canonical_pair(msg.sender, msg.receiver);
        let lock_key = format!("pair:{a}:{b}");
        let attachments_json = serde_json::to_string(msg.attachments)?;

        self.with_write_lock(&lock_key, || {
            let conn = self.pool.get()?;
            let tx = conn.transaction_behavior_immediate()?;

            let (conversation, created) =
                match ConversationRepo::find_by_pair(&tx, msg.sender, msg.receiver)? {
                    Some(existing) => (existing, false),
                    None => (ConversationRepo::create(&tx, msg.sender, msg.receiver)?, true),
                };

            let row = MessageRow {
                id: MessageId::new().to_string(),
                conversation_id: conversation.id.clone(),
                sender_id: msg.sender.to_owned(),
                receiver_id: msg.receiver.to_owned(),
                content: msg.content.to_owned(),
                attachments: attachments_json.clone(),
                is_read: false,
                created_at: ripple_core::now_rfc3339(),
            };
            MessageRepo::insert(&tx, &row)?;

            let preview = message_preview(msg.content, msg.attachments);
            ConversationRepo::set_last_message(
                &tx,
                &conversation.id,
                &row.id,
                &preview,
                &row.created_at,
            )?;
            ConversationRepo::increment_unread(&tx, &conversation.id, msg.receiver)?;

            let updated = ConversationRepo::get(&tx, &conversation.id)?
                .ok_or_else(|| StoreError::ConversationNotFound(conversation.id.clone()))?;
            let member = ConversationRepo::member(&tx, &conversation.id, msg.receiver)?
                .ok_or_else(|| StoreError::NotAParticipant {
                    user: msg.receiver.to_owned(),
                    conversation: conversation.id.clone(),
                })?;

            tx.commit()?;
            debug!(message_id = %row.id, conversation_id = %updated.id, "message recorded");

            Ok(SendOutcome {
                message: row,
                conversation: updated,
                receiver_unread: member.unread_count,
                conversation_created: created,
            })
        })
    }

    /// Get a message by ID.
    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        let conn = self.pool.get()?;
        MessageRepo::get(&conn, id)
    }

    /// A page of a conversation's messages (newest first) with the total
    /// count, scoped to a participant.
    pub fn messages_page(
        &self,
        conversation_id: &str,
        requester: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<MessageRow>, i64)> {
        let conn = self.pool.get()?;
        let conversation = ConversationRepo::get(&conn, conversation_id)?
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_owned()))?;
        require_participant(&conversation, requester)?;

        let rows = MessageRepo::page_for_conversation(&conn, conversation_id, limit, offset)?;
        let total = MessageRepo::count_for_conversation(&conn, conversation_id)?;
        Ok((rows, total))
    }

    // ── Read marks ──────────────────────────────────────────────────────

    /// Mark every unread incoming message in a conversation as read and
    /// reset the reader's unread counter. Idempotent — a redundant call
    /// flips nothing and the counter stays at zero.
    #[instrument(skip(self))]
    pub fn mark_conversation_read(
        &self,
        conversation_id: &str,
        reader: &str,
    ) -> Result<ReadOutcome> {
        self.with_write_lock(conversation_id, || {
            let conn = self.pool.get()?;
            let tx = conn.transaction_behavior_immediate()?;

            let conversation = ConversationRepo::get(&tx, conversation_id)?
                .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_owned()))?;
            require_participant(&conversation, reader)?;

            let updated = MessageRepo::mark_conversation_read(&tx, conversation_id, reader)?;
            ConversationRepo::reset_unread(&tx, conversation_id, reader)?;

            tx.commit()?;
            Ok(ReadOutcome {
                conversation,
                updated_messages: updated,
            })
        })
    }

    /// Mark a single message as read (reader must be its receiver) and
    /// reset the reader's unread counter on the conversation.
    #[instrument(skip(self))]
    pub fn mark_message_read(&self, message_id: &str, reader: &str) -> Result<ReadOutcome> {
        let conn = self.pool.get()?;
        let message = MessageRepo::get(&conn, message_id)?
            .ok_or_else(|| StoreError::MessageNotFound(message_id.to_owned()))?;
        drop(conn);
        let conversation_id = message.conversation_id.clone();
        if message.receiver_id != reader {
            return Err(StoreError::NotAParticipant {
                user: reader.to_owned(),
                conversation: conversation_id,
            });
        }

        self.with_write_lock(&conversation_id, || {
            let conn = self.pool.get()?;
            let tx = conn.transaction_behavior_immediate()?;

            let conversation = ConversationRepo::get(&tx, &conversation_id)?
                .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.clone()))?;
            let updated = usize::from(MessageRepo::mark_read(&tx, message_id)?);
            ConversationRepo::reset_unread(&tx, &conversation.id, reader)?;

            tx.commit()?;
            Ok(ReadOutcome {
                conversation,
                updated_messages: updated,
            })
        })
    }

    // ── Conversations ───────────────────────────────────────────────────

    /// Get a conversation with the requester's member state.
    pub fn get_conversation(
        &self,
        conversation_id: &str,
        requester: &str,
    ) -> Result<(ConversationRow, MemberRow)> {
        let conn = self.pool.get()?;
        let conversation = ConversationRepo::get(&conn, conversation_id)?
            .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_owned()))?;
        require_participant(&conversation, requester)?;
        let member = ConversationRepo::member(&conn, conversation_id, requester)?.ok_or_else(
            || StoreError::NotAParticipant {
                user: requester.to_owned(),
                conversation: conversation_id.to_owned(),
            },
        )?;
        Ok((conversation, member))
    }

    /// The conversation for a participant pair, if one exists.
    pub fn conversation_for_pair(&self, x: &str, y: &str) -> Result<Option<ConversationRow>> {
        let conn = self.pool.get()?;
        ConversationRepo::find_by_pair(&conn, x, y)
    }

    /// A page of the user's conversations with their member state, pinned
    /// first, then most recently active, with the total count.
    pub fn list_conversations(
        &self,
        user: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<(ConversationRow, MemberRow)>, i64)> {
        let conn = self.pool.get()?;
        let rows = ConversationRepo::list_for_user(&conn, user, limit, offset)?;
        let total = ConversationRepo::count_for_user(&conn, user)?;
        Ok((rows, total))
    }

    /// Flip the requester's pinned flag. Returns the new value. Never
    /// affects the other participant's view.
    pub fn toggle_pinned(&self, conversation_id: &str, user: &str) -> Result<bool> {
        self.with_write_lock(conversation_id, || {
            let conn = self.pool.get()?;
            ensure_conversation_exists(&conn, conversation_id)?;
            ConversationRepo::toggle_pinned(&conn, conversation_id, user)
        })
    }

    /// Flip the requester's muted flag. Returns the new value.
    pub fn toggle_muted(&self, conversation_id: &str, user: &str) -> Result<bool> {
        self.with_write_lock(conversation_id, || {
            let conn = self.pool.get()?;
            ensure_conversation_exists(&conn, conversation_id)?;
            ConversationRepo::toggle_muted(&conn, conversation_id, user)
        })
    }

    /// Delete a conversation outright. Member state and messages cascade.
    /// One participant's deletion removes the document for both.
    #[instrument(skip(self))]
    pub fn delete_conversation(&self, conversation_id: &str, requester: &str) -> Result<()> {
        self.with_write_lock(conversation_id, || {
            let conn = self.pool.get()?;
            let conversation = ConversationRepo::get(&conn, conversation_id)?
                .ok_or_else(|| StoreError::ConversationNotFound(conversation_id.to_owned()))?;
            require_participant(&conversation, requester)?;
            let _ = ConversationRepo::delete(&conn, conversation_id)?;
            Ok(())
        })
    }

    // ── Notifications ───────────────────────────────────────────────────

    /// Record a social-action notification.
    ///
    /// Self-actions (`recipient == sender`) are suppressed and return
    /// `Ok(None)` — the caller simply has nothing to deliver.
    pub fn create_notification(
        &self,
        notification: &NewNotification<'_>,
    ) -> Result<Option<NotificationRow>> {
        if notification.recipient == notification.sender {
            debug!(user = notification.recipient, "self-notification suppressed");
            return Ok(None);
        }
        let row = NotificationRow {
            id: NotificationId::new().to_string(),
            recipient_id: notification.recipient.to_owned(),
            sender_id: notification.sender.to_owned(),
            kind: notification.kind.as_str().to_owned(),
            post_id: notification.post_id.map(str::to_owned),
            body: notification.body.to_owned(),
            is_read: false,
            created_at: ripple_core::now_rfc3339(),
        };
        let conn = self.pool.get()?;
        NotificationRepo::insert(&conn, &row)?;
        Ok(Some(row))
    }

    /// A page of the recipient's notifications (newest first) with the
    /// total count.
    pub fn notifications_page(
        &self,
        recipient: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<NotificationRow>, i64)> {
        let conn = self.pool.get()?;
        let rows = NotificationRepo::page_for_recipient(&conn, recipient, limit, offset)?;
        let total = NotificationRepo::count_for_recipient(&conn, recipient)?;
        Ok((rows, total))
    }

    /// Unread notification count for a recipient.
    pub fn unread_notification_count(&self, recipient: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        NotificationRepo::unread_count(&conn, recipient)
    }

    /// Mark a notification read. A notification belonging to someone else
    /// is reported as not-found rather than leaking its existence.
    pub fn mark_notification_read(&self, id: &str, recipient: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let row = NotificationRepo::get(&conn, id)?
            .filter(|n| n.recipient_id == recipient)
            .ok_or_else(|| StoreError::NotificationNotFound(id.to_owned()))?;
        NotificationRepo::mark_read(&conn, &row.id)
    }

    // ── Push subscriptions ──────────────────────────────────────────────

    /// Register or refresh a push subscription for `(user, endpoint)`.
    pub fn subscribe_push(
        &self,
        user: &str,
        endpoint: &str,
        key_p256dh: &str,
        key_auth: &str,
    ) -> Result<SubscriptionUpsert> {
        let conn = self.pool.get()?;
        PushSubscriptionRepo::upsert(&conn, user, endpoint, key_p256dh, key_auth)
    }

    /// Remove a push subscription. Returns whether a row was removed.
    pub fn unsubscribe_push(&self, user: &str, endpoint: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        PushSubscriptionRepo::remove(&conn, user, endpoint)
    }

    /// All push subscriptions for a user.
    pub fn push_subscriptions(&self, user: &str) -> Result<Vec<PushSubscriptionRow>> {
        let conn = self.pool.get()?;
        PushSubscriptionRepo::for_user(&conn, user)
    }

    // ── Write serialization ─────────────────────────────────────────────

    fn acquire_write_lock(&self, key: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .write_locks
            .lock()
            .map_err(|_| StoreError::Internal("write lock map poisoned".into()))?;

        // Opportunistically prune dead weak refs when the map grows.
        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(key.to_owned(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn with_write_lock<T>(&self, key: &str, f: impl FnMut() -> Result<T>) -> Result<T> {
        let lock = self.acquire_write_lock(key)?;
        let _guard = lock
            .lock()
            .map_err(|_| StoreError::Internal("write lock poisoned".into()))?;
        Self::retry_on_sqlite_busy(f)
    }

    /// Retry an operation on `SQLite` BUSY/LOCKED with linear backoff.
    ///
    /// Backoff: min(attempts * 10, 250) ms. The per-key mutex already
    /// serializes same-conversation writers; this covers cross-key
    /// contention on the shared database file.
    fn retry_on_sqlite_busy<T>(mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;

        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) if is_busy(&err) && attempts < Self::SQLITE_BUSY_MAX_RETRIES => {
                    attempts += 1;
                    let backoff = Duration::from_millis(u64::from((attempts * 10).min(250)));
                    std::thread::sleep(backoff);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Whether an error is a transient `SQLite` BUSY/LOCKED condition.
fn is_busy(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

/// The preview text denormalized onto the conversation row (and reused as
/// the push body). Falls back to a placeholder for media-only messages.
fn message_preview(content: &str, attachments: &[MediaAttachment]) -> String {
    if content.is_empty() && !attachments.is_empty() {
        "[attachment]".to_owned()
    } else {
        content.to_owned()
    }
}

fn require_participant(conversation: &ConversationRow, user: &str) -> Result<()> {
    if conversation.has_participant(user) {
        Ok(())
    } else {
        Err(StoreError::NotAParticipant {
            user: user.to_owned(),
            conversation: conversation.id.clone(),
        })
    }
}

fn ensure_conversation_exists(conn: &rusqlite::Connection, id: &str) -> Result<()> {
    match ConversationRepo::get(conn, id)? {
        Some(_) => Ok(()),
        None => Err(StoreError::ConversationNotFound(id.to_owned())),
    }
}

/// Begin an IMMEDIATE transaction on a pooled connection.
///
/// IMMEDIATE takes the write lock up front so concurrent writers fail fast
/// with BUSY (and get retried) instead of deadlocking at commit.
trait ImmediateTx {
    fn transaction_behavior_immediate(&self) -> rusqlite::Result<rusqlite::Transaction<'_>>;
}

impl ImmediateTx for crate::sqlite::connection::PooledConnection {
    fn transaction_behavior_immediate(&self) -> rusqlite::Result<rusqlite::Transaction<'_>> {
        rusqlite::Transaction::new_unchecked(self, TransactionBehavior::Immediate)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
