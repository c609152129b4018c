use crate::presenter::TablePresenter;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

/// Sessions unused for this long are dropped.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on live sessions; the longest idle one is evicted first.
pub const MAX_SESSIONS: usize = 1024;

/// State belonging to one browser session.
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    presenter: Mutex<TablePresenter>,
    last_seen: Mutex<Instant>,
}

impl SessionContext {
    fn new(id: Uuid, now: Instant) -> Self {
        Self {
            id,
            presenter: Mutex::new(TablePresenter::new()),
            last_seen: Mutex::new(now),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Lock the session's table. Never hold the guard across an `.await`.
    pub fn presenter(&self) -> MutexGuard<'_, TablePresenter> {
        self.presenter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self, now: Instant) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_seen = *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last_seen)
    }
}

/// Sessions keyed by the id stored in the `session` cookie.
///
/// Lookups never create sessions. Only [`SessionStore::resolve`] does, and
/// the jar it returns must be sent back with the response.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionContext>>>>,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(MAX_SESSIONS, SESSION_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            max_sessions: max_sessions.max(1),
            idle_timeout,
        }
    }

    /// The live session named by the request's cookie, if any.
    pub fn find(&self, jar: &CookieJar) -> Option<Arc<SessionContext>> {
        let id = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())?;
        self.get(id)
    }

    /// Find the caller's session, creating one if the cookie is missing or
    /// stale. The returned jar carries the cookie for new sessions.
    pub fn resolve(&self, jar: CookieJar) -> (CookieJar, Arc<SessionContext>) {
        if let Some(session) = self.find(&jar) {
            return (jar, session);
        }

        let session = self.create();
        let cookie = Cookie::build((SESSION_COOKIE, session.id().to_string()))
            .path("/")
            .http_only(true);
        (jar.add(cookie), session)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<SessionContext>> {
        let now = Instant::now();
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()?;

        if session.idle_for(now) >= self.idle_timeout {
            self.write().remove(&id);
            debug!("session {id} expired");
            return None;
        }
        session.touch(now);
        Some(session)
    }

    pub fn create(&self) -> Arc<SessionContext> {
        let now = Instant::now();
        let session = Arc::new(SessionContext::new(Uuid::new_v4(), now));

        let mut sessions = self.write();
        let idle_timeout = self.idle_timeout;
        sessions.retain(|_, s| s.idle_for(now) < idle_timeout);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .max_by_key(|(_, s)| s.idle_for(now))
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    debug!("evicted session {id}");
                }
                None => break,
            }
        }
        sessions.insert(session.id(), Arc::clone(&session));
        debug!("created session {} ({} live)", session.id(), sessions.len());
        session
    }

    /// Number of sessions held, expired ones included until the next purge.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Arc<SessionContext>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
