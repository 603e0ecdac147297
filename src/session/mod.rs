//! Session manager (component D). Owns the one protocol client for the
//! process, pumps its event stream into durable state via the store, and
//! runs the reconnect policy. See `client` for the thin wrapper around the
//! protocol library itself.

pub mod client;

pub use client::{HistoryAnchor, MessageInfo, SessionEvent, WaHandle};

use crate::address::{extract_number, string_to_api};
use crate::config::AppConfig;
use crate::content::{ProtoMessage, detect_media_kind, extract_body};
use crate::error::{Error, Result};
use crate::store::Store;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, RwLock};
use wacore::types::events::Event as WaEvent;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

const RECONNECT_SLEEP: Duration = Duration::from_secs(5);
const OFFLINE_STABILIZATION_DELAY: Duration = Duration::from_secs(2);
const RECENT_BACKFILL_CHAT_COUNT: usize = 5;
const RECENT_BACKFILL_MESSAGE_COUNT: u32 = 50;
const RECENT_BACKFILL_STAGGER: Duration = Duration::from_millis(200);
const RECENT_BACKFILL_DEADLINE: Duration = Duration::from_secs(30);
const SENDER_NAME_BACKFILL_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Qr,
    Authenticated,
    Ready,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Qr => "qr",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::Ready => "ready",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub qr_code: Option<String>,
    pub last_connected_at: Option<i64>,
    pub last_disconnected_at: Option<i64>,
}

impl SessionStatus {
    /// Seconds between the last disconnect and the following connect, per
    /// §4.4.6. Informational only.
    pub fn offline_gap_secs(&self) -> Option<i64> {
        match (self.last_connected_at, self.last_disconnected_at) {
            (Some(connected), Some(disconnected)) if connected > disconnected => {
                Some(connected - disconnected)
            }
            _ => None,
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn run_store<T, F>(store: Arc<Store>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store)).await?
}

/// Owns the paired protocol client, the connection-state record, and the
/// reconnect policy. History backfill lives in a separate controller that
/// borrows this manager's store and client handle (§3.5).
pub struct SessionManager {
    store: Arc<Store>,
    status: RwLock<SessionStatus>,
    handle: OnceCell<WaHandle>,
    /// The built bot and its background run task, kept alive for the
    /// daemon's lifetime so the connection/event loop they own is never
    /// dropped out from under the event pump spawned in `start`. The
    /// teacher keeps both alive by holding `bot`/`_handle` as locals in a
    /// run loop that never returns (`gateway.rs`); this crate's `start`
    /// does return, so the same lifetime guarantee is pinned to `self`
    /// instead.
    bot: OnceCell<Bot>,
    run_handle: OnceCell<tokio::task::JoinHandle<()>>,
    reconnect_guard: Mutex<()>,
}

impl SessionManager {
    /// Builds the protocol client, registers the event handler once via
    /// `Bot::builder()` (never repeated — `start` is only called once per
    /// process; reconnects reuse the same client and handler via `reconnect`
    /// below), and spawns the event pump. Keeps both the built `bot` and its
    /// run handle alive on `self` for the life of the process, matching the
    /// teacher's `let _handle = bot.run()...` / `bot.client()` pair, which
    /// it keeps alive by never returning from its own run loop
    /// (`gateway.rs`); this function does return, so the connection is
    /// pinned to `self` instead of to the stack. Returns once the client
    /// has issued its first `connect()`; pairing (QR/success) happens
    /// asynchronously afterward.
    pub async fn start(config: &AppConfig, store: Arc<Store>) -> Result<Arc<Self>> {
        let manager = Arc::new(SessionManager {
            store,
            status: RwLock::new(SessionStatus::default()),
            handle: OnceCell::new(),
            bot: OnceCell::new(),
            run_handle: OnceCell::new(),
            reconnect_guard: Mutex::new(()),
        });

        let protocol_db_path = config.protocol_db_path();
        let backend = Arc::new(
            SqliteStore::new(protocol_db_path.to_string_lossy().as_ref())
                .await
                .map_err(|e| Error::Fatal(format!("failed to open protocol store: {e}")))?,
        );

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SessionEvent>();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event: WaEvent, client| {
                let tx = tx.clone();
                async move {
                    let own_jid = client.store().device_jid().map(|j| j.to_string());
                    if let Some(session_event) = client::translate_event(event, own_jid.as_deref()) {
                        let _ = tx.send(session_event);
                    }
                }
            })
            .build()
            .await
            .map_err(|e| Error::Fatal(format!("failed to build whatsapp client: {e}")))?;

        let client = bot.client().clone();
        let run_handle = bot
            .run()
            .await
            .map_err(|e| Error::Fatal(format!("failed to start whatsapp client: {e}")))?;

        manager
            .handle
            .set(WaHandle::new(client))
            .map_err(|_| Error::Fatal("client handle set twice".to_string()))?;
        manager
            .run_handle
            .set(run_handle)
            .map_err(|_| Error::Fatal("run handle set twice".to_string()))?;
        manager
            .bot
            .set(bot)
            .map_err(|_| Error::Fatal("bot set twice".to_string()))?;

        {
            let mut status = manager.status.write().await;
            status.state = ConnectionState::Connecting;
        }

        let pump_manager = manager.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                pump_manager.handle_event(event).await;
            }
            tracing::warn!("session event channel closed; event pump exiting");
        });

        Ok(manager)
    }

    pub async fn status(&self) -> SessionStatus {
        self.status.read().await.clone()
    }

    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    /// Fallible accessor for the protocol client handle. `NotReady` until
    /// the first `connect()` has completed inside `start`.
    pub fn handle(&self) -> Result<WaHandle> {
        self.handle
            .get()
            .cloned()
            .ok_or_else(|| Error::NotReady("whatsapp client not yet initialised".to_string()))
    }

    /// Requires `Ready` state in addition to a client handle, for operations
    /// that only make sense once paired and connected.
    pub async fn ready_handle(&self) -> Result<WaHandle> {
        let status = self.status.read().await;
        if status.state != ConnectionState::Ready {
            return Err(Error::NotReady(format!("session is {}", status.state.as_str())));
        }
        drop(status);
        self.handle()
    }

    async fn handle_event(self: &Arc<Self>, event: SessionEvent) {
        let result = match event {
            SessionEvent::Connected => self.on_connected().await,
            SessionEvent::Disconnected | SessionEvent::StreamReplaced => self.on_disconnected().await,
            SessionEvent::LoggedOut => self.on_logged_out().await,
            SessionEvent::QrCode { code } => self.on_qr(code).await,
            SessionEvent::PairSuccess => self.on_pair_success().await,
            SessionEvent::Message { msg, info } => self.on_message(*msg, info).await,
            SessionEvent::HistorySync(batch) => self.on_history_sync(batch).await,
            SessionEvent::PushName { jid, name } => self.on_push_name(jid, name).await,
            SessionEvent::ReceiptReadSelf { chat_jid } => self.on_receipt_read_self(chat_jid).await,
            SessionEvent::OfflineSyncCompleted => self.on_offline_sync_completed().await,
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "session event handler failed; continuing");
        }
    }

    async fn on_connected(self: &Arc<Self>) -> Result<()> {
        let connected_at = now();
        let last_disconnected_at = run_store(self.store.clone(), |s| s.get_sync_state_i64("last_disconnected_at")).await?;

        {
            let mut status = self.status.write().await;
            status.state = ConnectionState::Ready;
            status.last_connected_at = Some(connected_at);
            status.last_disconnected_at = last_disconnected_at;
            if let Some(gap) = status.offline_gap_secs() {
                tracing::info!(offline_gap_secs = gap, "reconnected after offline gap");
            }
        }
        run_store(self.store.clone(), move |s| s.set_sync_state_i64("last_connected_at", connected_at)).await?;
        run_store(self.store.clone(), |s| s.reset_all_unread()).await?;

        if let Ok(handle) = self.handle() {
            if let Err(e) = handle.mark_available().await {
                tracing::warn!(error = %e, "failed to signal availability");
            }
        }

        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.hydrate_contacts_and_groups().await {
                tracing::warn!(error = %e, "contact/group hydration failed");
            }
        });

        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.backfill_sender_names().await {
                tracing::warn!(error = %e, "sender-name backfill failed");
            }
        });

        Ok(())
    }

    async fn on_disconnected(self: &Arc<Self>) -> Result<()> {
        let disconnected_at = now();
        {
            let mut status = self.status.write().await;
            status.state = ConnectionState::Disconnected;
            status.last_disconnected_at = Some(disconnected_at);
        }
        run_store(self.store.clone(), move |s| s.set_sync_state_i64("last_disconnected_at", disconnected_at)).await?;

        let manager = self.clone();
        tokio::spawn(async move {
            manager.reconnect().await;
        });
        Ok(())
    }

    async fn on_logged_out(self: &Arc<Self>) -> Result<()> {
        let mut status = self.status.write().await;
        status.state = ConnectionState::Disconnected;
        status.qr_code = None;
        tracing::error!("whatsapp session logged out");
        Ok(())
    }

    async fn on_qr(self: &Arc<Self>, code: String) -> Result<()> {
        let mut status = self.status.write().await;
        status.state = ConnectionState::Qr;
        status.qr_code = Some(code);
        Ok(())
    }

    async fn on_pair_success(self: &Arc<Self>) -> Result<()> {
        let mut status = self.status.write().await;
        status.state = ConnectionState::Authenticated;
        status.qr_code = None;
        Ok(())
    }

    async fn on_push_name(self: &Arc<Self>, jid: String, name: String) -> Result<()> {
        run_store(self.store.clone(), move |s| s.update_push_name(&jid, &name)).await
    }

    async fn on_receipt_read_self(self: &Arc<Self>, chat_jid: String) -> Result<()> {
        run_store(self.store.clone(), move |s| s.mark_read(&chat_jid)).await
    }

    async fn on_message(self: &Arc<Self>, msg: waproto::whatsapp::Message, info: MessageInfo) -> Result<()> {
        let handle = self.handle().ok();
        let own_jid = handle.as_ref().and_then(|h| h.own_jid());
        let pipeline = self.process_message(&msg, &info, own_jid.as_deref(), handle.as_ref()).await?;

        run_store(self.store.clone(), {
            let chat_jid = info.chat_jid.clone();
            let body = pipeline.body.clone();
            move |s| s.update_chat_last_message(&chat_jid, &body, info.timestamp)
        })
        .await?;

        if !info.is_from_me {
            run_store(self.store.clone(), move |s| s.increment_unread(&info.chat_jid)).await?;
        }
        Ok(())
    }

    async fn on_history_sync(self: &Arc<Self>, batch: client::HistorySyncBatch) -> Result<()> {
        let handle = self.handle().ok();
        let own_jid = handle.as_ref().and_then(|h| h.own_jid());

        for conversation in batch.conversations {
            let mut max_ts: Option<i64> = None;
            let mut max_body = String::new();
            let mut any_group = false;

            for (msg, info) in &conversation.messages {
                any_group = any_group || info.is_group;
                let pipeline = self.process_message(msg, info, own_jid.as_deref(), handle.as_ref()).await?;
                if max_ts.map(|ts| info.timestamp > ts).unwrap_or(true) {
                    max_ts = Some(info.timestamp);
                    max_body = pipeline.body;
                }
            }

            if let Some(ts) = max_ts {
                let chat_jid = conversation.chat_jid.clone();
                run_store(self.store.clone(), {
                    let chat_jid = chat_jid.clone();
                    let body = max_body.clone();
                    move |s| s.upsert_chat(&chat_jid, "", any_group, Some(&body), Some(ts))
                })
                .await?;
                run_store(self.store.clone(), move |s| s.update_chat_last_message(&chat_jid, &max_body, ts)).await?;
            }

            let chat_jid = conversation.chat_jid.clone();
            let unread_count = conversation.unread_count;
            run_store(self.store.clone(), move |s| s.set_unread(&chat_jid, unread_count)).await?;
        }
        Ok(())
    }

    async fn on_offline_sync_completed(self: &Arc<Self>) -> Result<()> {
        tokio::time::sleep(OFFLINE_STABILIZATION_DELAY).await;

        let handle = match self.handle() {
            Ok(h) => h,
            Err(_) => return Ok(()),
        };
        let chats = run_store(self.store.clone(), |s| s.get_chats()).await?;
        let top_chats: Vec<_> = chats
            .into_iter()
            .filter(|c| c.last_message_timestamp.is_some())
            .take(RECENT_BACKFILL_CHAT_COUNT)
            .collect();

        let fut = async {
            for (i, chat) in top_chats.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(RECENT_BACKFILL_STAGGER).await;
                }
                let anchor = HistoryAnchor {
                    chat_jid: crate::address::string_to_internal(&chat.id),
                    raw_id: crate::history_sync::RECENT_SENTINEL_RAW_ID.to_string(),
                    from_me: true,
                    timestamp: now(),
                };
                if let Err(e) = handle.request_history(anchor, RECENT_BACKFILL_MESSAGE_COUNT).await {
                    tracing::warn!(chat = %chat.id, error = %e, "recent backfill request failed");
                }
            }
        };
        let _ = tokio::time::timeout(RECENT_BACKFILL_DEADLINE, fut).await;
        Ok(())
    }

    /// Reconnect policy (§4.4.5): a try-lock collapses concurrent triggers
    /// into a single attempt; a second trigger while one is in flight is a
    /// silent no-op.
    async fn reconnect(self: &Arc<Self>) {
        let guard = match self.reconnect_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };

        {
            let mut status = self.status.write().await;
            status.state = ConnectionState::Connecting;
        }

        if let Ok(handle) = self.handle() {
            handle.disconnect().await;
            tokio::time::sleep(RECONNECT_SLEEP).await;
            if let Err(e) = handle.reconnect().await {
                tracing::warn!(error = %e, "reconnect attempt failed");
            }
        }
        drop(guard);
    }

    async fn hydrate_contacts_and_groups(self: &Arc<Self>) -> Result<()> {
        let handle = self.handle()?;

        let contacts = handle.all_contacts().await?;
        for (jid, contact) in contacts {
            let number = extract_number(&jid);
            let display_name = contact.display_name().to_string();
            run_store(self.store.clone(), move |s| {
                s.upsert_contact(&jid, &display_name, &contact.push_name, &number, false)
            })
            .await?;
        }

        let groups = handle.joined_groups().await?;
        for (jid, name) in groups {
            run_store(self.store.clone(), {
                let jid = jid.clone();
                let name = name.clone();
                move |s| s.upsert_chat(&jid, &name, true, None, None)
            })
            .await?;
            run_store(self.store.clone(), move |s| s.upsert_contact(&jid, &name, "", "", true)).await?;
        }
        Ok(())
    }

    /// Sender-name backfill (§4.4.7): run once per `Connected`, resolving
    /// names for messages from group `LID` senders that arrived with no
    /// resolvable name at the time.
    async fn backfill_sender_names(self: &Arc<Self>) -> Result<()> {
        let handle = self.handle()?;
        let pairs = run_store(self.store.clone(), |s| s.group_lid_senders_missing_name(SENDER_NAME_BACKFILL_LIMIT)).await?;

        let mut participant_cache: std::collections::HashMap<String, Vec<client::GroupParticipant>> =
            std::collections::HashMap::new();

        for (chat_jid, sender_address) in pairs {
            if !participant_cache.contains_key(&chat_jid) {
                let participants = handle.group_participants(&chat_jid).await.unwrap_or_default();
                participant_cache.insert(chat_jid.clone(), participants);
            }

            let name = resolve_sender_name(&handle, &self.store, &chat_jid, &sender_address, true, "").await;
            if name.is_empty() {
                continue;
            }

            let key_candidates = run_store(self.store.clone(), {
                let chat_jid = chat_jid.clone();
                let sender_address = sender_address.clone();
                move |s| s.messages_for_backfill(&chat_jid, &sender_address)
            })
            .await
            .unwrap_or_default();

            for key in key_candidates {
                run_store(self.store.clone(), {
                    let name = name.clone();
                    move |s| s.backfill_sender_name(&key, &name).map(|_| ())
                })
                .await?;
            }
        }
        Ok(())
    }

    /// Shared per-message pipeline (§4.4.2 steps 1–4), used by both the
    /// live `Message` event and each history-sync conversation.
    async fn process_message(
        self: &Arc<Self>,
        msg: &waproto::whatsapp::Message,
        info: &MessageInfo,
        own_jid: Option<&str>,
        handle: Option<&WaHandle>,
    ) -> Result<MessagePipelineResult> {
        let sender_address = compute_sender_address(info, own_jid);
        let sender_name = match handle {
            Some(handle) => resolve_sender_name(handle, &self.store, &info.chat_jid, &sender_address, info.is_group, &info.push_name).await,
            None => info.push_name.clone(),
        };

        let content = ProtoMessage::from_wire(msg);
        let body = extract_body(&content);
        let media_kind = detect_media_kind(&content).map(|k| k.as_str().to_string());
        let has_media = media_kind.is_some();
        let raw_encoded: Option<Vec<u8>> = if has_media {
            Some(prost::Message::encode_to_vec(msg))
        } else {
            None
        };

        let key = crate::address::MessageKey::new(info.is_from_me, string_to_api(&info.chat_jid), info.id.clone()).format();

        run_store(self.store.clone(), {
            let chat_jid = info.chat_jid.clone();
            let sender_address = sender_address.clone();
            let sender_name = sender_name.clone();
            let body = body.clone();
            let from_me = info.is_from_me;
            let timestamp = info.timestamp;
            let media_kind = media_kind.clone();
            let raw_encoded = raw_encoded.clone();
            move |s| {
                s.upsert_message(
                    &key,
                    &chat_jid,
                    &sender_address,
                    &sender_name,
                    from_me,
                    &body,
                    timestamp,
                    has_media,
                    media_kind.as_deref(),
                    raw_encoded.as_deref(),
                )
            }
        })
        .await?;

        run_store(self.store.clone(), {
            let chat_jid = info.chat_jid.clone();
            let body = body.clone();
            let is_group = info.is_group;
            let timestamp = info.timestamp;
            move |s| s.upsert_chat(&chat_jid, "", is_group, Some(&body), Some(timestamp))
        })
        .await?;

        Ok(MessagePipelineResult { body })
    }
}

struct MessagePipelineResult {
    body: String,
}

/// Sender address per §4.4.2 step 1: participant if present; else the own
/// device id if `fromMe`; else the chat address for non-group chats; else
/// empty.
fn compute_sender_address(info: &MessageInfo, own_jid: Option<&str>) -> String {
    if let Some(participant) = &info.participant_jid {
        participant.clone()
    } else if info.is_from_me {
        own_jid.map(|s| s.to_string()).unwrap_or_default()
    } else if !info.is_group {
        info.chat_jid.clone()
    } else {
        String::new()
    }
}

/// Sender-name cascade (§4.4.4), expressed as first-non-empty-wins over
/// four fallible lookups rather than inlined control flow.
async fn resolve_sender_name(
    handle: &WaHandle,
    store: &Arc<Store>,
    chat_jid: &str,
    sender_address: &str,
    is_group: bool,
    push_name: &str,
) -> String {
    if sender_address.is_empty() {
        return push_name.to_string();
    }

    if let Some(name) = handle.contact_display_name(sender_address).await {
        if !name.is_empty() {
            return name;
        }
    }

    if let Ok(Some(name)) = run_store(store.clone(), {
        let sender_address = sender_address.to_string();
        move |s| s.get_contact_name(&sender_address)
    })
    .await
    {
        if !name.is_empty() {
            return name;
        }
    }

    if is_group && sender_address.ends_with("@lid") {
        if let Some(name) = lookup_via_group_participant(handle, store, chat_jid, sender_address).await {
            if !name.is_empty() {
                return name;
            }
        }
    }

    if !push_name.is_empty() {
        return push_name.to_string();
    }
    String::new()
}

async fn lookup_via_group_participant(
    handle: &WaHandle,
    store: &Arc<Store>,
    chat_jid: &str,
    sender_address: &str,
) -> Option<String> {
    let participants = handle.group_participants(chat_jid).await.ok()?;
    let participant = participants
        .iter()
        .find(|p| p.canonical_jid == sender_address || p.lid.as_deref() == Some(sender_address))?;

    if let Some(name) = handle.contact_display_name(&participant.canonical_jid).await {
        if !name.is_empty() {
            return Some(name);
        }
    }
    if let Ok(Some(name)) = run_store(store.clone(), {
        let canonical = participant.canonical_jid.clone();
        move |s| s.get_contact_name(&canonical)
    })
    .await
    {
        if !name.is_empty() {
            return Some(name);
        }
    }
    Some(extract_number(&participant.canonical_jid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_gap_is_none_without_both_timestamps() {
        let status = SessionStatus {
            last_connected_at: Some(100),
            ..Default::default()
        };
        assert_eq!(status.offline_gap_secs(), None);
    }

    #[test]
    fn offline_gap_is_positive_difference() {
        let status = SessionStatus {
            last_connected_at: Some(150),
            last_disconnected_at: Some(100),
            ..Default::default()
        };
        assert_eq!(status.offline_gap_secs(), Some(50));
    }

    #[test]
    fn sender_address_prefers_participant_over_everything_else() {
        let info = MessageInfo {
            id: "A".to_string(),
            chat_jid: "1@g.us".to_string(),
            sender_jid: "ignored".to_string(),
            participant_jid: Some("2@s.whatsapp.net".to_string()),
            is_from_me: true,
            is_group: true,
            push_name: String::new(),
            timestamp: 1,
        };
        assert_eq!(compute_sender_address(&info, Some("own@s.whatsapp.net")), "2@s.whatsapp.net");
    }

    #[test]
    fn sender_address_falls_back_to_own_jid_when_from_me() {
        let info = MessageInfo {
            id: "A".to_string(),
            chat_jid: "1@s.whatsapp.net".to_string(),
            sender_jid: "ignored".to_string(),
            participant_jid: None,
            is_from_me: true,
            is_group: false,
            push_name: String::new(),
            timestamp: 1,
        };
        assert_eq!(compute_sender_address(&info, Some("own@s.whatsapp.net")), "own@s.whatsapp.net");
    }

    #[test]
    fn sender_address_falls_back_to_chat_for_non_group() {
        let info = MessageInfo {
            id: "A".to_string(),
            chat_jid: "1@s.whatsapp.net".to_string(),
            sender_jid: "ignored".to_string(),
            participant_jid: None,
            is_from_me: false,
            is_group: false,
            push_name: String::new(),
            timestamp: 1,
        };
        assert_eq!(compute_sender_address(&info, None), "1@s.whatsapp.net");
    }

    #[test]
    fn sender_address_is_empty_for_unresolvable_group_case() {
        let info = MessageInfo {
            id: "A".to_string(),
            chat_jid: "1@g.us".to_string(),
            sender_jid: "ignored".to_string(),
            participant_jid: None,
            is_from_me: false,
            is_group: true,
            push_name: String::new(),
            timestamp: 1,
        };
        assert_eq!(compute_sender_address(&info, None), "");
    }
}
