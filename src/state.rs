//! Application state: the session store and the generation client.
//!
//! Each session is owned by one user (an HTTP client holding its id, or one WebSocket
//! connection) and sits behind its own mutex; sessions never share content.
//! Sessions nobody touched for `SESSION_IDLE_SECS` are dropped by `spawn_idle_sweeper`.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::load_agent_config_from_env;
use crate::gemini::Gemini;
use crate::generation::{ContentModel, GenerationClient};
use crate::navigation::Session;

pub type SharedSession = Arc<Mutex<Session>>;

const DEFAULT_IDLE_SECS: u64 = 30 * 60;

/// A stored session and the last time a caller looked it up.
pub struct SessionEntry {
    pub session: SharedSession,
    pub last_seen: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    pub generator: GenerationClient,
}

impl AppState {
    /// Build state from env: load prompt config, init the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let prompts = load_agent_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let model: Option<Arc<dyn ContentModel>> = match Gemini::from_env() {
            Some(g) => {
                info!(target: "madrasati_backend", base_url = %g.base_url, model = %g.model, "Gemini enabled.");
                Some(Arc::new(g))
            }
            None => {
                info!(target: "madrasati_backend", "Gemini disabled (no GEMINI_API_KEY). Generation requests will fail with a notice.");
                None
            }
        };

        Self::with_generator(GenerationClient::new(model, prompts))
    }

    pub fn with_generator(generator: GenerationClient) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), generator }
    }

    /// Create and register a fresh session at the home view.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> SharedSession {
        let session = Session::new();
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        let entry = SessionEntry { session: shared.clone(), last_seen: Instant::now() };
        self.sessions.write().await.insert(id, entry);
        info!(target: "navigation", session = %id, "Session created");
        shared
    }

    /// Look a session up and mark it as recently used.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: Uuid) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    /// Drop a session together with its selection and content.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(target: "navigation", session = %id, "Session removed");
        }
        removed
    }

    /// Drop every session idle for at least `max_idle`. Sessions with a generation in
    /// flight are kept. Returns how many were dropped.
    #[instrument(level = "debug", skip(self))]
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            if entry.last_seen.elapsed() < max_idle {
                return true;
            }
            let busy = entry.session.try_lock().map_or(true, |s| s.is_loading());
            if !busy {
                debug!(target: "navigation", session = %id, "Session expired");
            }
            busy
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(target: "navigation", evicted, remaining = sessions.len(), "Idle sessions dropped");
        }
        evicted
    }
}

/// Idle limit from SESSION_IDLE_SECS (default 30 minutes).
pub fn idle_limit_from_env() -> Duration {
    let secs = std::env::var("SESSION_IDLE_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_IDLE_SECS);
    Duration::from_secs(secs)
}

/// Periodically evict idle sessions. The sweep runs at a tenth of the idle limit.
pub fn spawn_idle_sweeper(state: Arc<AppState>, max_idle: Duration) -> tokio::task::JoinHandle<()> {
    let every = (max_idle / 10).max(Duration::from_secs(1));
    info!(target: "madrasati_backend", idle_secs = max_idle.as_secs(), sweep_secs = every.as_secs(), "Session sweeper started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            state.evict_idle(max_idle).await;
        }
    })
}
