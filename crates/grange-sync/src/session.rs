use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use grange_push::PushHub;
use grange_types::api::SendMessageRequest;
use grange_types::models::{Message, MessageBody, Thread, ThreadKind};
use grange_types::notices::ChatNotice;

use crate::SyncError;
use crate::backend::Backend;
use crate::feed::MessageFeed;
use crate::receipts::{self, Receipt};
use crate::store::{Action, Store};

/// Message batch size on first load. Poll threads show a single question,
/// so one message is enough there.
const CHAT_INITIAL_MESSAGES: u32 = 30;
const QUESTION_INITIAL_MESSAGES: u32 = 1;

/// Surfaced for every failed backend call; failures are not distinguished,
/// the next timer tick is the retry policy.
pub const GENERIC_ERROR: &str =
    "The conversation could not be updated. Trying again automatically.";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Reconciliation fetch cadence; the failsafe for lost push delivery.
    pub poll_interval: Duration,
    pub receipt_interval: Duration,
    /// Blocks the answer form after a poll answer is submitted.
    pub answer_cooldown: Duration,
    pub older_page_size: u32,
    /// Spread poll ticks of concurrently open threads by up to ±10%.
    pub jitter: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            receipt_interval: Duration::from_millis(5000),
            answer_cooldown: Duration::from_millis(4000),
            older_page_size: 30,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Closed,
    Loading,
    Ready,
    Sending,
    /// Re-render block after a poll answer; expires back to `Ready`.
    AnswerCooldown,
}

#[derive(Debug)]
enum Command {
    SendMessage(MessageBody),
    SubmitAnswer(String),
    LoadOlder,
    Close,
}

/// What the session reports back to its window.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Loaded { thread: Thread, messages: Vec<Message> },
    MessagesAppended(Vec<Message>),
    OlderMessagesLoaded(Vec<Message>),
    MessageDeleted { message_id: u64 },
    ReceiptUpdated(Receipt),
    PhaseChanged(SessionPhase),
    Error { message: String },
}

/// Handle to one open thread. Dropping it (or calling [`close`]) ends the
/// session task; its timers die with it.
///
/// [`close`]: SessionHandle::close
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    window_id: Uuid,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn window_id(&self) -> Uuid {
        self.window_id
    }

    pub fn send_message(&self, body: MessageBody) -> Result<(), SyncError> {
        self.command(Command::SendMessage(body))
    }

    pub fn submit_answer(&self, option: String) -> Result<(), SyncError> {
        self.command(Command::SubmitAnswer(option))
    }

    pub fn load_older(&self) -> Result<(), SyncError> {
        self.command(Command::LoadOlder)
    }

    pub fn close(&self) -> Result<(), SyncError> {
        self.command(Command::Close)
    }

    /// Wait for the session task to finish shutting down.
    pub async fn join(self) {
        let _ = self.task.await;
    }

    fn command(&self, command: Command) -> Result<(), SyncError> {
        self.commands.send(command).map_err(|_| SyncError::Closed)
    }
}

/// Open a thread: spawns the session task and returns its handle plus the
/// event stream for the window. The task loads the thread, acknowledges its
/// unread markers, and then keeps the feed in sync from both the push
/// channel and the reconciliation poller.
pub fn open<B: Backend>(
    backend: B,
    hub: PushHub,
    store: Store,
    thread_id: u64,
    config: SessionConfig,
) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let window_id = Uuid::new_v4();

    let task = tokio::spawn(run(
        backend, hub, store, thread_id, window_id, config, commands_rx, events_tx,
    ));

    (SessionHandle { commands: commands_tx, window_id, task }, events_rx)
}

#[allow(clippy::too_many_arguments)]
async fn run<B: Backend>(
    backend: B,
    hub: PushHub,
    store: Store,
    thread_id: u64,
    window_id: Uuid,
    config: SessionConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut notices = hub.subscribe();

    let _ = events.send(SessionEvent::PhaseChanged(SessionPhase::Loading));

    let thread = match backend.get_thread(thread_id).await {
        Ok(thread) => thread,
        Err(e) => {
            warn!("thread {} could not be opened: {}", thread_id, e);
            let _ = events.send(SessionEvent::Error { message: GENERIC_ERROR.to_string() });
            let _ = events.send(SessionEvent::PhaseChanged(SessionPhase::Closed));
            return;
        }
    };

    store
        .dispatch(Action::WindowOpened {
            window_id,
            group_id: thread.group_id,
            thread_id: thread.id,
        })
        .await;

    let mut session = Session {
        backend,
        hub,
        store,
        config,
        events,
        feed: MessageFeed::new(),
        receipt: None,
        cooldown: None,
        phase: SessionPhase::Loading,
        thread,
    };

    if session.initial_load().await {
        session.acknowledge_read().await;
    }
    session.set_phase(SessionPhase::Ready);

    session.run_loop(&mut commands, &mut notices).await;

    session.store.dispatch(Action::WindowClosed { window_id }).await;
    session.set_phase(SessionPhase::Closed);
}

struct Session<B: Backend> {
    backend: B,
    hub: PushHub,
    store: Store,
    config: SessionConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    feed: MessageFeed,
    receipt: Option<Receipt>,
    cooldown: Option<Instant>,
    phase: SessionPhase,
    thread: Thread,
}

impl<B: Backend> Session<B> {
    async fn run_loop(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        notices: &mut broadcast::Receiver<ChatNotice>,
    ) {
        let mut poll = tokio::time::interval(jittered(self.config.poll_interval, self.config.jitter));
        let mut receipt = tokio::time::interval(self.config.receipt_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        receipt.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Consume the immediate first tick of both intervals.
        poll.tick().await;
        receipt.tick().await;

        let mut push_open = true;

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.fetch_newer().await;
                }
                _ = receipt.tick() => {
                    self.poll_receipt().await;
                }
                notice = notices.recv(), if push_open => {
                    match notice {
                        Ok(notice) => self.on_notice(notice).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("push notice receiver lagged by {} notices", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("push hub closed; thread {} relies on polling only", self.thread.id);
                            push_open = false;
                        }
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(Command::Close) | None => break,
                        Some(command) => self.on_command(command).await,
                    }
                }
                _ = tokio::time::sleep_until(self.cooldown.unwrap_or_else(Instant::now)),
                    if self.cooldown.is_some() =>
                {
                    self.cooldown = None;
                    self.set_phase(SessionPhase::Ready);
                }
            }
        }
    }

    /// First page of the thread's messages. Returns whether the load
    /// succeeded; on failure the window shows an empty feed and the next
    /// poll tick retries.
    async fn initial_load(&mut self) -> bool {
        let limit = initial_limit(self.thread.kind);
        match self.backend.recent_messages(self.thread.id, limit).await {
            Ok(batch) => {
                self.feed.merge_newer(batch);
                self.emit(SessionEvent::Loaded {
                    thread: self.thread.clone(),
                    messages: self.feed.messages().to_vec(),
                });
                true
            }
            Err(e) => {
                self.report("initial message load", e);
                self.emit(SessionEvent::Loaded {
                    thread: self.thread.clone(),
                    messages: Vec::new(),
                });
                false
            }
        }
    }

    /// Fetch everything newer than the watermark and append it. Runs on
    /// every poll tick and on matching `CREATED` notices; the seen-set in
    /// the feed absorbs the overlap between the two.
    async fn fetch_newer(&mut self) {
        let result = match self.feed.watermark() {
            Some(watermark) => self.backend.messages_after(self.thread.id, watermark).await,
            None => {
                self.backend
                    .recent_messages(self.thread.id, initial_limit(self.thread.kind))
                    .await
            }
        };

        match result {
            Ok(batch) => {
                let accepted = self.feed.merge_newer(batch);
                if !accepted.is_empty() {
                    self.emit(SessionEvent::MessagesAppended(accepted));
                }
            }
            Err(e) => self.report("message fetch", e),
        }
    }

    async fn poll_receipt(&mut self) {
        match receipts::fetch_receipt(&self.backend, &self.thread).await {
            Ok(receipt) => {
                if self.receipt != Some(receipt) {
                    self.receipt = Some(receipt);
                    self.emit(SessionEvent::ReceiptUpdated(receipt));
                }
            }
            Err(e) => self.report("read receipt fetch", e),
        }
    }

    /// Publish the `READ` notice, then delete each marker this thread has
    /// in the store. Sequential with no rollback: if deletion fails part
    /// way, the remaining markers reappear as unread until the next global
    /// refresh clears them.
    async fn acknowledge_read(&mut self) {
        self.hub.publish_read(self.thread.group_id, self.thread.id);

        let plan = self
            .store
            .markers_for_thread(self.thread.group_id, self.thread.id)
            .await;
        for marker in plan {
            match self.backend.delete_unread_marker(&marker.id).await {
                Ok(()) => {
                    self.store
                        .dispatch(Action::MarkerCleared { marker_id: marker.id })
                        .await;
                }
                Err(e) => warn!("unread marker {} not cleared: {}", marker.id, e),
            }
        }
    }

    async fn on_notice(&mut self, notice: ChatNotice) {
        if notice.thread_id() != self.thread.id {
            // Other threads' unread state is maintained globally, not here.
            return;
        }

        match notice {
            ChatNotice::Created { .. } => {
                self.fetch_newer().await;
                // The thread is open and showing the new message, so it
                // counts as read right away.
                self.acknowledge_read().await;
            }
            ChatNotice::Deleted { message_id, .. } => {
                if self.feed.remove(message_id) {
                    self.emit(SessionEvent::MessageDeleted { message_id });
                }
            }
            ChatNotice::Read { .. } => {
                // Someone viewed the thread; refresh the receipt ahead of
                // the next scheduled tick.
                self.poll_receipt().await;
            }
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::SendMessage(body) => {
                self.set_phase(SessionPhase::Sending);
                let req = SendMessageRequest { body };
                match self.backend.send_message(self.thread.id, &req).await {
                    Ok(message) => {
                        let accepted = self.feed.merge_newer(vec![message]);
                        if !accepted.is_empty() {
                            self.emit(SessionEvent::MessagesAppended(accepted));
                        }
                    }
                    Err(e) => self.report("message send", e),
                }
                self.set_phase(SessionPhase::Ready);
            }

            Command::SubmitAnswer(option) => {
                if self.thread.kind != ThreadKind::Question {
                    debug!("answer submitted to non-poll thread {}", self.thread.id);
                    return;
                }
                if self.cooldown.is_some() {
                    debug!("answer ignored during cooldown");
                    return;
                }
                self.set_phase(SessionPhase::Sending);
                let req = SendMessageRequest { body: MessageBody::Text { text: option } };
                match self.backend.send_message(self.thread.id, &req).await {
                    Ok(message) => {
                        let accepted = self.feed.merge_newer(vec![message]);
                        if !accepted.is_empty() {
                            self.emit(SessionEvent::MessagesAppended(accepted));
                        }
                        self.cooldown = Some(Instant::now() + self.config.answer_cooldown);
                        self.set_phase(SessionPhase::AnswerCooldown);
                    }
                    Err(e) => {
                        self.report("answer submit", e);
                        self.set_phase(SessionPhase::Ready);
                    }
                }
            }

            Command::LoadOlder => {
                if self.feed.previous_loaded() {
                    return;
                }
                let Some(before) = self.feed.earliest() else {
                    return;
                };
                match self
                    .backend
                    .messages_before(self.thread.id, before, self.config.older_page_size)
                    .await
                {
                    Ok(batch) => {
                        let accepted = self.feed.merge_older(batch);
                        self.emit(SessionEvent::OlderMessagesLoaded(accepted));
                    }
                    Err(e) => self.report("older message fetch", e),
                }
            }

            Command::Close => unreachable!("handled by the loop"),
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // The window may already be gone; the loop exits via the closed
        // command channel, not here.
        let _ = self.events.send(event);
    }

    fn report(&self, what: &str, error: grange_api::ApiError) {
        warn!("{} failed for thread {}: {}", what, self.thread.id, error);
        self.emit(SessionEvent::Error { message: GENERIC_ERROR.to_string() });
    }
}

fn initial_limit(kind: ThreadKind) -> u32 {
    match kind {
        ThreadKind::Chat => CHAT_INITIAL_MESSAGES,
        ThreadKind::Question => QUESTION_INITIAL_MESSAGES,
    }
}

fn jittered(base: Duration, jitter: bool) -> Duration {
    if !jitter {
        return base;
    }
    base.mul_f64(rand::rng().random_range(0.9..=1.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::{DateTime, TimeZone, Utc};
    use tokio::sync::Mutex;

    use grange_api::ApiError;
    use grange_types::api::{ReceiptCount, ReceiptStatus};
    use grange_types::models::{ThreadScope, UnreadMarker};

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).unwrap()
    }

    fn text(id: u64, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            thread_id: 9,
            author_id: 1,
            body: MessageBody::Text { text: format!("message {}", id) },
            created_at,
        }
    }

    fn chat_thread() -> Thread {
        Thread {
            id: 9,
            group_id: 5,
            title: "Delivery planning".to_string(),
            kind: ThreadKind::Chat,
            scope: ThreadScope::Direct,
            expires_at: None,
            poll: None,
        }
    }

    fn question_thread() -> Thread {
        Thread {
            id: 9,
            group_id: 5,
            title: "Silage order 2026".to_string(),
            kind: ThreadKind::Question,
            scope: ThreadScope::Group,
            expires_at: None,
            poll: Some(grange_types::models::PollInfo {
                options: vec!["yes".to_string(), "no".to_string()],
            }),
        }
    }

    #[derive(Clone)]
    struct FakeBackend {
        thread: Thread,
        messages: Arc<Mutex<Vec<Message>>>,
        deleted_markers: Arc<Mutex<Vec<String>>>,
        next_id: Arc<AtomicU64>,
    }

    impl FakeBackend {
        fn new(thread: Thread, messages: Vec<Message>) -> Self {
            let next = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
            Self {
                thread,
                messages: Arc::new(Mutex::new(messages)),
                deleted_markers: Arc::new(Mutex::new(Vec::new())),
                next_id: Arc::new(AtomicU64::new(next)),
            }
        }

        async fn push_server_message(&self, message: Message) {
            self.messages.lock().await.push(message);
        }
    }

    impl Backend for FakeBackend {
        async fn get_thread(&self, _thread_id: u64) -> Result<Thread, ApiError> {
            Ok(self.thread.clone())
        }

        async fn recent_messages(
            &self,
            _thread_id: u64,
            limit: u32,
        ) -> Result<Vec<Message>, ApiError> {
            let mut all = self.messages.lock().await.clone();
            all.sort_by_key(|m| (m.created_at, m.id));
            let skip = all.len().saturating_sub(limit as usize);
            Ok(all.into_iter().skip(skip).collect())
        }

        async fn messages_after(
            &self,
            _thread_id: u64,
            after: DateTime<Utc>,
        ) -> Result<Vec<Message>, ApiError> {
            let mut newer: Vec<Message> = self
                .messages
                .lock()
                .await
                .iter()
                .filter(|m| m.created_at > after)
                .cloned()
                .collect();
            newer.sort_by_key(|m| (m.created_at, m.id));
            Ok(newer)
        }

        async fn messages_before(
            &self,
            _thread_id: u64,
            before: DateTime<Utc>,
            limit: u32,
        ) -> Result<Vec<Message>, ApiError> {
            let mut older: Vec<Message> = self
                .messages
                .lock()
                .await
                .iter()
                .filter(|m| m.created_at < before)
                .cloned()
                .collect();
            older.sort_by_key(|m| (m.created_at, m.id));
            let skip = older.len().saturating_sub(limit as usize);
            Ok(older.into_iter().skip(skip).collect())
        }

        async fn send_message(
            &self,
            thread_id: u64,
            req: &SendMessageRequest,
        ) -> Result<Message, ApiError> {
            let message = Message {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                thread_id,
                author_id: 42,
                body: req.body.clone(),
                created_at: at(12, 0),
            };
            self.messages.lock().await.push(message.clone());
            Ok(message)
        }

        async fn delete_unread_marker(&self, marker_id: &str) -> Result<(), ApiError> {
            self.deleted_markers.lock().await.push(marker_id.to_string());
            Ok(())
        }

        async fn receipt_read(&self, _thread_id: u64) -> Result<ReceiptStatus, ApiError> {
            Ok(ReceiptStatus { read: true })
        }

        async fn receipt_read_count(&self, _thread_id: u64) -> Result<ReceiptCount, ApiError> {
            Ok(ReceiptCount { count: 3 })
        }
    }

    fn no_jitter() -> SessionConfig {
        SessionConfig { jitter: false, ..Default::default() }
    }

    fn marker(id: &str, path: &str) -> UnreadMarker {
        UnreadMarker { id: id.to_string(), path: path.to_string() }
    }

    async fn wait_for(
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
        pred: impl Fn(&SessionEvent) -> bool,
    ) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(300), async {
            loop {
                let event = events.recv().await.expect("session event stream ended");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for session event")
    }

    #[tokio::test(start_paused = true)]
    async fn opening_a_thread_clears_its_unread_markers() {
        let backend = FakeBackend::new(chat_thread(), vec![text(1, at(10, 0))]);
        let (hub, mut outbound) = PushHub::new();
        let store = Store::new();
        store
            .dispatch(Action::UnreadLoaded(vec![
                marker("a", "chat-5-9-1"),
                marker("b", "chat-5-9-2"),
                marker("c", "chat-7-1-1"),
            ]))
            .await;

        let (handle, mut events) = open(backend.clone(), hub, store.clone(), 9, no_jitter());
        wait_for(&mut events, |e| matches!(e, SessionEvent::Loaded { .. })).await;
        wait_for(&mut events, |e| {
            matches!(e, SessionEvent::PhaseChanged(SessionPhase::Ready))
        })
        .await;

        // Read notice published, both thread markers deleted, the foreign
        // group's marker untouched.
        match outbound.recv().await {
            Some(ChatNotice::Read { group_id, thread_id }) => {
                assert_eq!((group_id, thread_id), (5, 9));
            }
            other => panic!("expected read notice, got {:?}", other),
        }
        assert_eq!(*backend.deleted_markers.lock().await, vec!["a", "b"]);
        assert_eq!(store.thread_unread(5, 9).await, 0);

        let remaining: Vec<String> =
            store.snapshot().await.unread.iter().map(|m| m.path.clone()).collect();
        assert_eq!(remaining, vec!["chat-7-1-1"]);

        handle.close().unwrap();
        handle.join().await;
        assert!(store.snapshot().await.open_windows.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn created_notice_fetches_and_acknowledges() {
        let backend = FakeBackend::new(chat_thread(), vec![text(1, at(10, 0))]);
        let (hub, mut outbound) = PushHub::new();
        let store = Store::new();

        let (handle, mut events) = open(backend.clone(), hub.clone(), store.clone(), 9, no_jitter());
        wait_for(&mut events, |e| {
            matches!(e, SessionEvent::PhaseChanged(SessionPhase::Ready))
        })
        .await;
        outbound.recv().await; // read notice from opening

        backend.push_server_message(text(2, at(10, 5))).await;
        hub.deliver(ChatNotice::Created { group_id: 5, thread_id: 9, message_id: 2 });

        let event =
            wait_for(&mut events, |e| matches!(e, SessionEvent::MessagesAppended(_))).await;
        match event {
            SessionEvent::MessagesAppended(batch) => {
                assert_eq!(batch.len(), 1);
                assert_eq!(batch[0].id, 2);
            }
            _ => unreachable!(),
        }

        // The open thread re-acknowledges right away.
        match outbound.recv().await {
            Some(ChatNotice::Read { thread_id, .. }) => assert_eq!(thread_id, 9),
            other => panic!("expected read notice, got {:?}", other),
        }

        handle.close().unwrap();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_notice_removes_exactly_that_message() {
        let backend =
            FakeBackend::new(chat_thread(), vec![text(1, at(10, 0)), text(2, at(10, 5))]);
        let (hub, _outbound) = PushHub::new();
        let store = Store::new();

        let (handle, mut events) = open(backend, hub.clone(), store, 9, no_jitter());
        wait_for(&mut events, |e| {
            matches!(e, SessionEvent::PhaseChanged(SessionPhase::Ready))
        })
        .await;

        hub.deliver(ChatNotice::Deleted { group_id: 5, thread_id: 9, message_id: 1 });

        let event =
            wait_for(&mut events, |e| matches!(e, SessionEvent::MessageDeleted { .. }))
                .await;
        assert!(matches!(event, SessionEvent::MessageDeleted { message_id: 1 }));

        handle.close().unwrap();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn poll_tick_picks_up_messages_after_watermark() {
        let backend = FakeBackend::new(
            chat_thread(),
            vec![text(1, at(10, 0)), text(2, at(10, 5)), text(3, at(10, 10))],
        );
        let (hub, _outbound) = PushHub::new();
        let store = Store::new();

        let (handle, mut events) = open(backend.clone(), hub, store, 9, no_jitter());
        let loaded =
            wait_for(&mut events, |e| matches!(e, SessionEvent::Loaded { .. })).await;
        match loaded {
            SessionEvent::Loaded { messages, .. } => assert_eq!(messages.len(), 3),
            _ => unreachable!(),
        }

        // No push notice: only the reconciliation poller sees this one.
        backend.push_server_message(text(4, at(10, 15))).await;

        let event =
            wait_for(&mut events, |e| matches!(e, SessionEvent::MessagesAppended(_))).await;
        match event {
            SessionEvent::MessagesAppended(batch) => {
                assert_eq!(batch.len(), 1);
                assert_eq!(batch[0].created_at, at(10, 15));
            }
            _ => unreachable!(),
        }

        handle.close().unwrap();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn question_threads_load_one_message_and_cool_down_after_answering() {
        let backend = FakeBackend::new(
            question_thread(),
            vec![text(1, at(9, 0)), text(2, at(9, 30))],
        );
        let (hub, _outbound) = PushHub::new();
        let store = Store::new();

        let (handle, mut events) = open(backend, hub, store, 9, no_jitter());
        let loaded =
            wait_for(&mut events, |e| matches!(e, SessionEvent::Loaded { .. })).await;
        match loaded {
            // Poll threads fetch a single message.
            SessionEvent::Loaded { messages, .. } => assert_eq!(messages.len(), 1),
            _ => unreachable!(),
        }
        wait_for(&mut events, |e| {
            matches!(e, SessionEvent::PhaseChanged(SessionPhase::Ready))
        })
        .await;

        handle.submit_answer("yes".to_string()).unwrap();
        wait_for(&mut events, |e| {
            matches!(e, SessionEvent::PhaseChanged(SessionPhase::AnswerCooldown))
        })
        .await;
        // The cooldown expires on its own and the form unlocks.
        wait_for(&mut events, |e| {
            matches!(e, SessionEvent::PhaseChanged(SessionPhase::Ready))
        })
        .await;

        handle.close().unwrap();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn backward_pagination_reports_the_empty_page() {
        let backend = FakeBackend::new(chat_thread(), vec![text(1, at(10, 0))]);
        let (hub, _outbound) = PushHub::new();
        let store = Store::new();

        let (handle, mut events) = open(backend, hub, store, 9, no_jitter());
        wait_for(&mut events, |e| {
            matches!(e, SessionEvent::PhaseChanged(SessionPhase::Ready))
        })
        .await;

        handle.load_older().unwrap();
        let event = wait_for(&mut events, |e| {
            matches!(e, SessionEvent::OlderMessagesLoaded(_))
        })
        .await;
        match event {
            SessionEvent::OlderMessagesLoaded(batch) => assert!(batch.is_empty()),
            _ => unreachable!(),
        }

        handle.close().unwrap();
        handle.join().await;
    }
}
