//! Recording fakes shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    audit::AuditLogger,
    config::{Policy, DEFAULT_CONTENT_LIMIT, DEFAULT_REPLY_LIMIT},
    confessions::ConfessionService,
    domain::{ChatId, MessageId, MessageRef, RoleId, ThreadRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{FetchedMessage, InlineKeyboard, MessagingCapabilities},
    },
    store::RecordStore,
    Result,
};

pub const PUBLIC: ChatId = ChatId(-100);
pub const MODERATION: ChatId = ChatId(-200);
pub const LOG: ChatId = ChatId(-300);

pub fn policy(moderated: bool) -> Policy {
    Policy {
        public_chat: PUBLIC,
        log_chat: LOG,
        moderation_chat: moderated.then_some(MODERATION),
        moderator_roles: ["owner", "administrator"]
            .into_iter()
            .map(RoleId::new)
            .collect(),
        pin_on_publish: false,
        content_limit: DEFAULT_CONTENT_LIMIT,
        reply_limit: DEFAULT_REPLY_LIMIT,
        author_name: "Gossip Miri".to_string(),
    }
}

/// Service over a fresh temp store and a recording messenger.
pub fn service(moderated: bool) -> (ConfessionService, Arc<FakeMessenger>) {
    build(policy(moderated))
}

/// Unmoderated service with a tweaked policy.
pub fn service_with(tweak: impl FnOnce(&mut Policy)) -> (ConfessionService, Arc<FakeMessenger>) {
    let mut p = policy(false);
    tweak(&mut p);
    build(p)
}

fn build(policy: Policy) -> (ConfessionService, Arc<FakeMessenger>) {
    let fake = Arc::new(FakeMessenger::default());
    let store = Arc::new(RecordStore::open(tmp_file("gossip-svc-store")));
    let svc = ConfessionService::new(
        policy,
        store,
        fake.clone(),
        AuditLogger::new(tmp_file("gossip-svc-audit"), true),
    );
    (svc, fake)
}

pub fn tmp_file(prefix: &str) -> PathBuf {
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    let seq = SEQ.fetch_add(1, Ordering::SeqCst);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{}-{nanos}-{seq}", std::process::id()))
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    sends: Mutex<Vec<(ChatId, String)>>,
    thread_posts: Mutex<Vec<(ThreadRef, String)>>,
    threads: Mutex<Vec<(MessageRef, String, ThreadRef)>>,
    keyboards: Mutex<Vec<(ChatId, InlineKeyboard)>>,
    edits: Mutex<Vec<(MessageRef, String)>>,
    deleted_messages: Mutex<Vec<MessageRef>>,
    deleted_threads: Mutex<Vec<ThreadRef>>,
    pins: Mutex<Vec<MessageRef>>,
    roles: Mutex<HashMap<UserId, HashSet<RoleId>>>,
    gone: Mutex<HashSet<MessageRef>>,

    hang_sends: AtomicBool,
    fail_sends_to: Mutex<HashSet<ChatId>>,
    fail_threads: AtomicBool,
    fail_deletes: AtomicBool,
    fail_roles: AtomicBool,
    supports_fetch: AtomicBool,
}

impl FakeMessenger {
    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    fn check_send(&self, chat_id: ChatId) -> Result<()> {
        if self.fail_sends_to.lock().unwrap().contains(&chat_id) {
            return Err(Error::ExternalSurface(format!("send to {} failed", chat_id.0)));
        }
        Ok(())
    }

    pub fn hang_sends(&self, on: bool) {
        self.hang_sends.store(on, Ordering::SeqCst);
    }

    pub fn fail_sends_to(&self, chat_id: ChatId) {
        self.fail_sends_to.lock().unwrap().insert(chat_id);
    }

    pub fn fail_threads(&self, on: bool) {
        self.fail_threads.store(on, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, on: bool) {
        self.fail_deletes.store(on, Ordering::SeqCst);
    }

    pub fn fail_roles(&self, on: bool) {
        self.fail_roles.store(on, Ordering::SeqCst);
    }

    pub fn enable_fetch(&self) {
        self.supports_fetch.store(true, Ordering::SeqCst);
    }

    pub fn forget_message(&self, msg: MessageRef) {
        self.gone.lock().unwrap().insert(msg);
    }

    pub fn grant_role(&self, user: UserId, role: &str) {
        self.roles
            .lock()
            .unwrap()
            .entry(user)
            .or_default()
            .insert(RoleId::new(role));
    }

    /// Every html body posted to `chat_id`, keyboard posts included.
    pub fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == chat_id)
            .map(|(_, html)| html.clone())
            .collect()
    }

    pub fn thread_posts(&self) -> Vec<(ThreadRef, String)> {
        self.thread_posts.lock().unwrap().clone()
    }

    pub fn threads(&self) -> Vec<(MessageRef, String, ThreadRef)> {
        self.threads.lock().unwrap().clone()
    }

    pub fn keyboards(&self) -> Vec<(ChatId, InlineKeyboard)> {
        self.keyboards.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn deleted_messages(&self) -> Vec<MessageRef> {
        self.deleted_messages.lock().unwrap().clone()
    }

    pub fn deleted_threads(&self) -> Vec<ThreadRef> {
        self.deleted_threads.lock().unwrap().clone()
    }

    pub fn pins(&self) -> Vec<MessageRef> {
        self.pins.lock().unwrap().clone()
    }

    /// Total count of outbound posts of any kind.
    pub fn total_posts(&self) -> usize {
        self.sends.lock().unwrap().len() + self.thread_posts.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_edit: true,
            supports_pins: true,
            supports_fetch: self.supports_fetch.load(Ordering::SeqCst),
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        if self.hang_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check_send(chat_id)?;
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        Ok(self.alloc(chat_id))
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        self.edits.lock().unwrap().push((msg, html.to_string()));
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::ExternalSurface("message already gone".to_string()));
        }
        self.deleted_messages.lock().unwrap().push(msg);
        Ok(())
    }

    async fn pin_message(&self, msg: MessageRef) -> Result<()> {
        self.pins.lock().unwrap().push(msg);
        Ok(())
    }

    async fn create_thread(&self, msg: MessageRef, name: &str) -> Result<ThreadRef> {
        if self.fail_threads.load(Ordering::SeqCst) {
            return Err(Error::ExternalSurface("thread creation failed".to_string()));
        }
        let root = self.alloc(msg.chat_id);
        let thread = ThreadRef {
            chat_id: msg.chat_id,
            root: root.message_id,
        };
        self.threads
            .lock()
            .unwrap()
            .push((msg, name.to_string(), thread));
        Ok(thread)
    }

    async fn send_in_thread(&self, thread: ThreadRef, html: &str) -> Result<MessageRef> {
        tokio::task::yield_now().await;
        self.thread_posts
            .lock()
            .unwrap()
            .push((thread, html.to_string()));
        Ok(self.alloc(thread.chat_id))
    }

    async fn delete_thread(&self, thread: ThreadRef) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::ExternalSurface("thread already gone".to_string()));
        }
        self.deleted_threads.lock().unwrap().push(thread);
        Ok(())
    }

    async fn fetch_message(&self, msg: MessageRef) -> Result<Option<FetchedMessage>> {
        if self.gone.lock().unwrap().contains(&msg) {
            return Ok(None);
        }
        Ok(Some(FetchedMessage { msg }))
    }

    async fn actor_roles(&self, _chat_id: ChatId, user_id: UserId) -> Result<HashSet<RoleId>> {
        if self.fail_roles.load(Ordering::SeqCst) {
            return Err(Error::ExternalSurface("member lookup failed".to_string()));
        }
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.check_send(chat_id)?;
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        self.keyboards.lock().unwrap().push((chat_id, keyboard));
        Ok(self.alloc(chat_id))
    }

    async fn answer_callback_query(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }
}
