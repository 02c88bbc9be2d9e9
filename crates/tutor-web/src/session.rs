//! Per-session tutoring state and the table that owns it.
//!
//! Every browser session gets its own [`Session`]: a
//! [`ConversationController`], a [`PreferencePanel`] and a broadcast channel
//! for its WebSocket clients. [`SessionStore`] maps session ids to
//! `Arc<tokio::sync::Mutex<Session>>`, so turns on one session are
//! serialised while different sessions run independently. The table lock is
//! only held to insert, look up, remove or expire entries.
//!
//! Sessions with no WebSocket client that have been idle longer than the
//! configured TTL are dropped by a periodic sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use tutor_rs::agent::{ConversationController, PreferencePanel};
use tutor_rs::api::LlmClient;
use tutor_rs::config::{TutorConfig, TutorSettings};
use tutor_rs::error::TutorError;
use uuid::Uuid;

use crate::broadcast::WsMessage;
use crate::snapshot::{Bubble, SessionSnapshot};

/// Shared handle to one session.
pub type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// One student's conversation.
pub struct Session {
    id: Uuid,
    controller: ConversationController,
    panel: PreferencePanel,
    events: broadcast::Sender<WsMessage>,
    last_active: Instant,
}

impl Session {
    fn new(
        id: Uuid,
        controller: ConversationController,
        panel: PreferencePanel,
        broadcast_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(broadcast_capacity);
        Self {
            id,
            controller,
            panel,
            events,
            last_active: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn panel(&self) -> &PreferencePanel {
        &self.panel
    }

    /// Subscribe to this session's WebSocket messages.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from_session(self)
    }

    /// Time since the last greeting, chat, selection or reset.
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    fn has_clients(&self) -> bool {
        self.events.receiver_count() > 0
    }

    /// Reseed the conversation and produce the opening message.
    ///
    /// On failure the previous conversation is kept.
    pub async fn greet(&mut self) -> Result<String, TutorError> {
        self.last_active = Instant::now();
        let result = self.controller.greet(&self.panel.snapshot()).await;
        self.after_turn(result)
    }

    /// Record a student message and generate the tutor's reply.
    ///
    /// The student's turn is kept even when the reply fails.
    pub async fn chat(&mut self, message: &str) -> Result<String, TutorError> {
        self.last_active = Instant::now();
        let agent = self.controller.config().agent.name.clone();
        let submitted = self
            .controller
            .submit_user_turn(message)
            .map(|turn| Bubble::from_turn(turn, &agent));
        let bubble = match submitted {
            Ok(bubble) => bubble,
            Err(e) => return Err(self.report(e)),
        };
        self.broadcast(WsMessage::UserMessage { bubble });

        let result = self.controller.advance(&self.panel.snapshot()).await;
        self.after_turn(result)
    }

    /// Select a preference option. Takes effect on the next turn.
    pub fn select(&mut self, category: &str, option: &str) -> Result<(), TutorError> {
        self.last_active = Instant::now();
        if let Err(e) = self.panel.select(category, option) {
            return Err(self.report(e));
        }
        self.broadcast_snapshot();
        Ok(())
    }

    /// Reseed and greet again. Preferences are kept.
    pub async fn reset(&mut self) -> Result<String, TutorError> {
        info!("Session {} reset", self.id);
        let reply = self.greet().await?;
        self.broadcast_snapshot();
        Ok(reply)
    }

    fn after_turn(&self, result: Result<String, TutorError>) -> Result<String, TutorError> {
        let reply = result.map_err(|e| self.report(e))?;
        let agent = &self.controller.config().agent.name;
        if let Some(turn) = self.controller.transcript().last() {
            self.broadcast(WsMessage::TutorMessage {
                bubble: Bubble::from_turn(turn, agent),
            });
        }
        let stage = self.controller.stage();
        self.broadcast(WsMessage::Stage {
            id: stage.id,
            name: stage.name.clone(),
        });
        Ok(reply)
    }

    /// Push an error to connected clients and hand it back.
    fn report(&self, error: TutorError) -> TutorError {
        self.broadcast(WsMessage::Error {
            message: error.to_string(),
        });
        error
    }

    fn broadcast_snapshot(&self) {
        match serde_json::to_value(self.snapshot()) {
            Ok(data) => self.broadcast(WsMessage::Snapshot { data }),
            Err(e) => debug!("Failed to serialize snapshot: {e}"),
        }
    }

    fn broadcast(&self, msg: WsMessage) {
        // No subscribers is fine.
        let _ = self.events.send(msg);
    }
}

/// All live sessions, plus what is needed to create new ones.
pub struct SessionStore {
    client: Arc<dyn LlmClient>,
    config: Arc<TutorConfig>,
    settings: TutorSettings,
    broadcast_capacity: usize,
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
}

impl SessionStore {
    pub fn new(
        client: Arc<dyn LlmClient>,
        config: Arc<TutorConfig>,
        settings: TutorSettings,
    ) -> Self {
        Self {
            client,
            config,
            settings,
            broadcast_capacity: 256,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Capacity of each session's broadcast channel. Default: 256.
    ///
    /// Clients that fall behind by this many messages receive a fresh
    /// snapshot instead.
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    /// Create a session with a fresh controller and default preferences.
    pub fn create(&self) -> SharedSession {
        let id = Uuid::new_v4();
        let controller = ConversationController::new(
            self.client.clone(),
            self.config.clone(),
            self.settings.clone(),
        );
        let panel = PreferencePanel::new(self.config.clone());
        let session = Arc::new(tokio::sync::Mutex::new(Session::new(
            id,
            controller,
            panel,
            self.broadcast_capacity,
        )));
        self.table().insert(id, session.clone());
        info!("Session {id} created");
        session
    }

    pub fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.table().get(&id).cloned()
    }

    /// Remove a session. Returns `false` if it did not exist.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.table().remove(&id).is_some();
        if removed {
            info!("Session {id} ended");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Drop sessions idle for at least `ttl` with no WebSocket client.
    /// Returns how many were removed.
    ///
    /// A session whose lock is held is mid-turn and always kept.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let mut table = self.table();
        let before = table.len();
        table.retain(|id, session| {
            let Ok(s) = session.try_lock() else {
                return true;
            };
            let keep = s.has_clients() || s.idle_for() < ttl;
            if !keep {
                info!("Session {id} expired after {:?} idle", s.idle_for());
            }
            keep
        });
        before - table.len()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Periodically evict sessions idle for `ttl`. Stops once the store is
/// dropped.
pub(crate) async fn expire_idle_sessions(store: Weak<SessionStore>, ttl: Duration) {
    let period = ttl.clamp(Duration::from_millis(10), Duration::from_secs(60));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(store) = store.upgrade() else {
            break;
        };
        let expired = store.evict_idle(ttl);
        if expired > 0 {
            debug!("Expired {expired} idle session(s), {} live", store.len());
        }
    }
}
