//! Thin wrapper around the protocol library's client handle. Every call
//! that crosses the network carries the deadline from §5 of the design via
//! `tokio::time::timeout`; a timeout surfaces as `Error::Transient`.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use wacore::proto_helpers::MessageExt;
use wacore::types::events::Event as WaEvent;
use waproto::whatsapp as wa;
use whatsapp_rust::client::Client as WaClient;

pub const BACKFILL_DEADLINE: Duration = Duration::from_secs(30);
pub const SEND_DEADLINE: Duration = Duration::from_secs(30);
pub const MARK_READ_DEADLINE: Duration = Duration::from_secs(30);
pub const IMAGE_UPLOAD_DEADLINE: Duration = Duration::from_secs(60);
pub const REACTION_DEADLINE: Duration = Duration::from_secs(15);
pub const RESOLVE_NUMBER_DEADLINE: Duration = Duration::from_secs(15);
pub const SYNC_ALL_DEADLINE: Duration = Duration::from_secs(120);

async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| Error::Transient("operation timed out".to_string()))?
}

/// Event forwarded from the library's `on_event` closure into the session
/// manager's own event pump, decoupled from the library's borrow shape so
/// the handler logic can run as a plain owned-value `tokio::spawn`ed task.
pub enum SessionEvent {
    Connected,
    Disconnected,
    StreamReplaced,
    LoggedOut,
    QrCode { code: String },
    PairSuccess,
    Message { msg: Box<wa::Message>, info: MessageInfo },
    HistorySync(HistorySyncBatch),
    PushName { jid: String, name: String },
    ReceiptReadSelf { chat_jid: String },
    OfflineSyncCompleted,
}

#[derive(Debug, Clone)]
pub struct MessageInfo {
    pub id: String,
    pub chat_jid: String,
    pub sender_jid: String,
    pub participant_jid: Option<String>,
    pub is_from_me: bool,
    pub is_group: bool,
    pub push_name: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct HistorySyncBatch {
    pub conversations: Vec<HistorySyncConversation>,
}

#[derive(Debug, Clone)]
pub struct HistorySyncConversation {
    pub chat_jid: String,
    pub unread_count: i64,
    pub messages: Vec<(wa::Message, MessageInfo)>,
}

/// Translates the library's own `wacore::types::message::MessageInfo` into
/// our decoupled, store-agnostic shape (§4.4.2 step 1: sender address is
/// `participant` when present, else `fromMe` ? own device : chat address
/// for non-group, else empty).
fn convert_message_info(info: wacore::types::message::MessageInfo, own_jid: Option<&str>) -> MessageInfo {
    let chat_jid = info.source.chat.to_string();
    let sender_jid = if !info.source.is_group {
        info.source.sender.to_string()
    } else if info.source.is_from_me {
        own_jid.map(|s| s.to_string()).unwrap_or_default()
    } else {
        info.source.sender.to_string()
    };

    MessageInfo {
        id: info.id,
        chat_jid,
        sender_jid,
        participant_jid: info.source.is_group.then(|| info.source.sender.to_string()),
        is_from_me: info.source.is_from_me,
        is_group: info.source.is_group,
        push_name: info.push_name,
        timestamp: info.timestamp.timestamp(),
    }
}

/// Translates the library's own event enum into our decoupled
/// `SessionEvent`. Kept as a free function (rather than a method on
/// `WaHandle`) so it has no dependency on session state and stays testable
/// in isolation.
pub fn translate_event(event: WaEvent, own_jid: Option<&str>) -> Option<SessionEvent> {
    use wacore::types::events::{Event, ReceiptType};
    match event {
        Event::PairingQrCode { code, .. } => Some(SessionEvent::QrCode { code }),
        Event::PairSuccess(_) => Some(SessionEvent::PairSuccess),
        Event::Connected(_) => Some(SessionEvent::Connected),
        Event::Disconnected(_) => Some(SessionEvent::Disconnected),
        Event::StreamReplaced(_) => Some(SessionEvent::StreamReplaced),
        Event::LoggedOut(_) => Some(SessionEvent::LoggedOut),
        Event::Message(msg, info) => {
            let info = convert_message_info(info, own_jid);
            Some(SessionEvent::Message {
                msg: Box::new(msg),
                info,
            })
        }
        Event::HistorySync(data) => Some(SessionEvent::HistorySync(convert_history_sync(*data))),
        Event::PushName(change) => Some(SessionEvent::PushName {
            jid: change.jid.to_string(),
            name: change.new_push_name,
        }),
        Event::Receipt(receipt) if receipt.receipt_type == ReceiptType::ReadSelf => Some(SessionEvent::ReceiptReadSelf {
            chat_jid: receipt.chat.to_string(),
        }),
        Event::OfflineSyncCompleted(_) => Some(SessionEvent::OfflineSyncCompleted),
        _ => None,
    }
}

fn convert_history_sync(data: wa::HistorySync) -> HistorySyncBatch {
    let conversations = data
        .conversations
        .into_iter()
        .map(|conv| {
            let chat_jid = conv.id.clone().unwrap_or_default();
            let unread_count = conv.unread_count.unwrap_or(0) as i64;
            let messages = conv
                .messages
                .into_iter()
                .filter_map(|hs_msg| {
                    let web_msg = hs_msg.message?;
                    let message = web_msg.message?;
                    let key = web_msg.key?;
                    let info = MessageInfo {
                        id: key.id.unwrap_or_default(),
                        chat_jid: key.remote_jid.clone().unwrap_or_else(|| chat_jid.clone()),
                        sender_jid: web_msg.participant.clone().unwrap_or_default(),
                        participant_jid: web_msg.participant.clone(),
                        is_from_me: key.from_me.unwrap_or(false),
                        is_group: web_msg.participant.is_some(),
                        push_name: web_msg.push_name.unwrap_or_default(),
                        timestamp: web_msg.message_timestamp.unwrap_or(0) as i64,
                    };
                    Some((message, info))
                })
                .collect();
            HistorySyncConversation {
                chat_jid,
                unread_count,
                messages,
            }
        })
        .collect();
    HistorySyncBatch { conversations }
}

/// Owns the one `Arc<whatsapp_rust::Client>` for the process. Every method
/// here is a single outbound protocol call guarded by a deadline; nothing
/// here touches the store.
#[derive(Clone)]
pub struct WaHandle {
    client: Arc<WaClient>,
}

impl WaHandle {
    pub fn new(client: Arc<WaClient>) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &Arc<WaClient> {
        &self.client
    }

    pub async fn send_text(&self, chat_jid: &str, text: &str, quoted_raw_id: Option<&str>) -> Result<String> {
        let jid = parse_jid(chat_jid)?;
        let context_info = quoted_raw_id.map(|id| wa::ContextInfo {
            stanza_id: Some(id.to_string()),
            participant: Some(jid.to_string()),
            ..Default::default()
        });
        let message = if let Some(context_info) = context_info {
            wa::Message {
                extended_text_message: Some(Box::new(wa::message::ExtendedTextMessage {
                    text: Some(text.to_string()),
                    context_info: Some(context_info),
                    ..Default::default()
                })),
                ..Default::default()
            }
        } else {
            wa::Message {
                conversation: Some(text.to_string()),
                ..Default::default()
            }
        };

        with_deadline(SEND_DEADLINE, async {
            self.client
                .send_message(jid, message)
                .await
                .map_err(|e| Error::Transient(format!("send failed: {e}")))
        })
        .await
    }

    pub async fn send_image(&self, chat_jid: &str, image: &[u8], caption: Option<&str>) -> Result<String> {
        let jid = parse_jid(chat_jid)?;
        with_deadline(IMAGE_UPLOAD_DEADLINE, async {
            let upload = self
                .client
                .upload(image.to_vec(), whatsapp_rust::download::MediaType::Image)
                .await
                .map_err(|e| Error::Transient(format!("image upload failed: {e}")))?;

            let message = wa::Message {
                image_message: Some(Box::new(wa::message::ImageMessage {
                    mimetype: Some("image/jpeg".to_string()),
                    caption: caption.map(|c| c.to_string()),
                    url: Some(upload.url),
                    direct_path: Some(upload.direct_path),
                    media_key: Some(upload.media_key),
                    file_enc_sha256: Some(upload.file_enc_sha256),
                    file_sha256: Some(upload.file_sha256),
                    file_length: Some(upload.file_length),
                    ..Default::default()
                })),
                ..Default::default()
            };

            self.client
                .send_message(jid, message)
                .await
                .map_err(|e| Error::Transient(format!("send failed: {e}")))
        })
        .await
    }

    pub async fn send_reaction(&self, chat_jid: &str, target_raw_id: &str, target_from_me: bool, emoji: &str) -> Result<()> {
        let jid = parse_jid(chat_jid)?;
        with_deadline(REACTION_DEADLINE, async {
            let message = wa::Message {
                reaction_message: Some(Box::new(wa::message::ReactionMessage {
                    key: Some(Box::new(wa::MessageKey {
                        remote_jid: Some(jid.to_string()),
                        from_me: Some(target_from_me),
                        id: Some(target_raw_id.to_string()),
                        ..Default::default()
                    })),
                    text: Some(emoji.to_string()),
                    ..Default::default()
                })),
                ..Default::default()
            };
            self.client
                .send_message(jid, message)
                .await
                .map(|_| ())
                .map_err(|e| Error::Transient(format!("reaction failed: {e}")))
        })
        .await
    }

    pub async fn mark_read(&self, chat_jid: &str, sender_jid: Option<&str>, raw_ids: Vec<String>) -> Result<()> {
        let chat = parse_jid(chat_jid)?;
        let sender = sender_jid.map(parse_jid).transpose()?;
        with_deadline(MARK_READ_DEADLINE, async {
            self.client
                .mark_as_read(&chat, sender.as_ref(), raw_ids)
                .await
                .map_err(|e| Error::Transient(format!("mark read failed: {e}")))
        })
        .await
    }

    pub async fn resolve_number(&self, number: &str) -> Result<Option<String>> {
        with_deadline(RESOLVE_NUMBER_DEADLINE, async {
            self.client
                .is_on_whatsapp(number)
                .await
                .map(|jid| jid.map(|j| j.to_string()))
                .map_err(|e| Error::Transient(format!("number resolution failed: {e}")))
        })
        .await
    }

    /// Re-decodes the stored protobuf bytes and downloads whichever media
    /// sub-message is present (I5: `raw_encoded` is the only handle used
    /// for later on-demand download).
    pub async fn download_raw(&self, raw_encoded: &[u8]) -> Result<Vec<u8>> {
        let message: wa::Message = prost::Message::decode(raw_encoded)
            .map_err(|e| Error::Invalid(format!("corrupt stored message: {e}")))?;
        let base = message.get_base_message();

        let result = if let Some(img) = &base.image_message {
            self.client.download(img.as_ref()).await
        } else if let Some(vid) = &base.video_message {
            self.client.download(vid.as_ref()).await
        } else if let Some(aud) = &base.audio_message {
            self.client.download(aud.as_ref()).await
        } else if let Some(sticker) = &base.sticker_message {
            self.client.download(sticker.as_ref()).await
        } else if let Some(doc) = &base.document_message {
            self.client.download(doc.as_ref()).await
        } else {
            return Err(Error::NotFound("no media payload in stored message".to_string()));
        };

        result.map_err(|e| Error::Transient(format!("media download failed: {e}")))
    }

    /// Fire-and-forget on-demand history-sync request, anchored on an
    /// existing message-info. The remote peer may silently drop it (§4.5).
    pub async fn request_history(&self, anchor: HistoryAnchor, count: u32) -> Result<()> {
        let chat = parse_jid(&anchor.chat_jid)?;
        with_deadline(BACKFILL_DEADLINE, async {
            self.client
                .build_history_sync_request(&chat, &anchor.raw_id, anchor.from_me, anchor.timestamp, count)
                .await
                .map_err(|e| Error::Transient(format!("history request failed: {e}")))
        })
        .await
    }

    pub async fn group_participants(&self, group_jid: &str) -> Result<Vec<GroupParticipant>> {
        let jid = parse_jid(group_jid)?;
        with_deadline(BACKFILL_DEADLINE, async {
            self.client
                .get_group_info(&jid)
                .await
                .map(|info| {
                    info.participants
                        .into_iter()
                        .map(|p| GroupParticipant {
                            canonical_jid: p.jid.to_string(),
                            lid: p.lid.map(|l| l.to_string()),
                        })
                        .collect()
                })
                .map_err(|e| Error::Transient(format!("group info failed: {e}")))
        })
        .await
    }

    pub async fn contact_display_name(&self, jid: &str) -> Option<String> {
        let jid = parse_jid(jid).ok()?;
        let contact = self.client.store().contacts().get(&jid).await.ok().flatten()?;
        [contact.full_name, contact.first_name, contact.business_name, contact.push_name]
            .into_iter()
            .find(|s| s.as_ref().is_some_and(|s| !s.is_empty()))
            .flatten()
    }

    /// The logged-in device's own address, once paired. `None` before the
    /// first successful pairing.
    pub fn own_jid(&self) -> Option<String> {
        self.client.store().device_jid().map(|j| j.to_string())
    }

    /// Signals available presence so the remote peer releases any messages
    /// that queued up while we were offline (§4.4, `Connected` handling).
    pub async fn mark_available(&self) -> Result<()> {
        self.client
            .send_presence_available()
            .await
            .map_err(|e| Error::Transient(format!("presence update failed: {e}")))
    }

    /// Snapshot of every contact in the library's local cache, used to
    /// hydrate our own contact table once per `Connected` event.
    pub async fn all_contacts(&self) -> Result<Vec<(String, ContactSnapshot)>> {
        let contacts = self
            .client
            .store()
            .contacts()
            .get_all_contacts()
            .await
            .map_err(|e| Error::Transient(format!("contact hydration failed: {e}")))?;
        Ok(contacts
            .into_iter()
            .map(|(jid, c)| {
                (
                    jid.to_string(),
                    ContactSnapshot {
                        full_name: c.full_name.unwrap_or_default(),
                        first_name: c.first_name.unwrap_or_default(),
                        business_name: c.business_name.unwrap_or_default(),
                        push_name: c.push_name.unwrap_or_default(),
                    },
                )
            })
            .collect())
    }

    /// Every group the paired device is currently a member of, with its
    /// display name, used to hydrate chat names once per `Connected` event.
    pub async fn joined_groups(&self) -> Result<Vec<(String, String)>> {
        let groups = self
            .client
            .get_joined_groups()
            .await
            .map_err(|e| Error::Transient(format!("group list failed: {e}")))?;
        Ok(groups.into_iter().map(|g| (g.jid.to_string(), g.name)).collect())
    }

    /// Tears the connection down without clearing paired-device state.
    /// Part of the reconnect policy (§4.4.5): disconnect, sleep, reconnect.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::warn!(error = %e, "disconnect returned an error");
        }
    }

    /// Re-establishes the connection on an already-paired client. Handler
    /// registration happens once at startup (§4.4.5, §9 design notes); this
    /// never rebuilds the client or re-registers event handlers.
    pub async fn reconnect(&self) -> Result<()> {
        self.client
            .connect()
            .await
            .map_err(|e| Error::Transient(format!("reconnect failed: {e}")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactSnapshot {
    pub full_name: String,
    pub first_name: String,
    pub business_name: String,
    pub push_name: String,
}

impl ContactSnapshot {
    /// First non-empty of {fullName, firstName, businessName, pushName}.
    pub fn display_name(&self) -> &str {
        [
            &self.full_name,
            &self.first_name,
            &self.business_name,
            &self.push_name,
        ]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(|s| s.as_str())
        .unwrap_or("")
    }
}

pub struct HistoryAnchor {
    pub chat_jid: String,
    pub raw_id: String,
    pub from_me: bool,
    pub timestamp: i64,
}

pub struct GroupParticipant {
    pub canonical_jid: String,
    pub lid: Option<String>,
}

fn parse_jid(raw: &str) -> Result<wacore_binary::jid::Jid> {
    raw.parse()
        .map_err(|e| Error::Invalid(format!("invalid jid '{raw}': {e}")))
}
