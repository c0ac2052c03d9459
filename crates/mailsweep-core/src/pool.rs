//! Bounded pool of authenticated sessions.
//!
//! A semaphore caps how many sessions exist at once; idle sessions are
//! cached for the next caller. The cache lock is only held to push or pop,
//! never across a network call.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};
use crate::session::{Connector, MailSession};

/// Hands out sessions to worker tasks.
pub struct SessionPool<C: Connector> {
    connector: C,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<C::Session>>,
    capacity: usize,
    opened: AtomicUsize,
    closed: AtomicBool,
}

/// A session checked out of a [`SessionPool`].
///
/// Hand it back with [`SessionPool::release`]. Dropping it instead closes
/// the connection without LOGOUT and frees the slot.
pub struct PooledSession<S> {
    session: S,
    _permit: OwnedSemaphorePermit,
}

impl<S> Deref for PooledSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S> DerefMut for PooledSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<C: Connector> SessionPool<C> {
    /// Creates a pool that never holds more than `max_sessions` sessions.
    #[must_use]
    pub fn new(connector: C, max_sessions: usize) -> Self {
        let capacity = max_sessions.max(1);
        Self {
            connector,
            permits: Arc::new(Semaphore::new(capacity)),
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            opened: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Most sessions that can exist at once.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sessions opened over the pool's lifetime.
    #[must_use]
    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Sessions waiting in the cache.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    /// Waits for a free slot, then reuses a cached session or opens a new
    /// one.
    ///
    /// # Errors
    ///
    /// [`Error::PoolClosed`] once [`close_all`](Self::close_all) ran, and
    /// [`Error::SessionAcquisition`] when connecting or logging in fails.
    pub async fn acquire(&self) -> Result<PooledSession<C::Session>> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }

        if let Some(session) = self.pop_healthy() {
            return Ok(PooledSession {
                session,
                _permit: permit,
            });
        }

        let session = self
            .connector
            .connect()
            .await
            .map_err(Error::SessionAcquisition)?;
        let opened = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(opened, "opened IMAP session");

        Ok(PooledSession {
            session,
            _permit: permit,
        })
    }

    /// Returns a session. Healthy sessions go back to the cache; broken
    /// ones, and any returned after [`close_all`](Self::close_all), are
    /// logged out.
    pub async fn release(&self, pooled: PooledSession<C::Session>) {
        let PooledSession {
            session,
            _permit: permit,
        } = pooled;

        let rejected = if session.is_healthy() && !self.closed.load(Ordering::Acquire) {
            let mut idle = self.lock_idle();
            if idle.len() < self.capacity {
                idle.push(session);
                None
            } else {
                Some(session)
            }
        } else {
            Some(session)
        };

        if let Some(mut session) = rejected {
            logout(&mut session).await;
        }
        drop(permit);
    }

    /// Logs out every cached session and refuses further acquisitions.
    /// Safe to call more than once.
    pub async fn close_all(&self) {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        self.permits.close();

        let drained: Vec<C::Session> = self.lock_idle().drain(..).collect();
        if first {
            tracing::debug!(
                cached = drained.len(),
                opened = self.connections_opened(),
                "closing session pool"
            );
        }
        for mut session in drained {
            logout(&mut session).await;
        }
    }

    /// Opens and returns one session to prove the server accepts the
    /// credentials.
    ///
    /// # Errors
    ///
    /// See [`acquire`](Self::acquire).
    pub async fn check_connection(&self) -> Result<()> {
        let session = self.acquire().await?;
        self.release(session).await;
        Ok(())
    }

    fn pop_healthy(&self) -> Option<C::Session> {
        let mut idle = self.lock_idle();
        while let Some(session) = idle.pop() {
            if session.is_healthy() {
                return Some(session);
            }
            tracing::debug!("discarding dead cached session");
        }
        None
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<C::Session>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connector> std::fmt::Debug for SessionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("capacity", &self.capacity)
            .field("available", &self.permits.available_permits())
            .field("opened", &self.connections_opened())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

async fn logout<S: MailSession>(session: &mut S) {
    if let Err(e) = session.logout().await {
        tracing::debug!(error = %e, "logout failed");
    }
}
