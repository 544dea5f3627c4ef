//! Async driver for a [`TestSession`].
//!
//! The controller owns the session and a gateway. Loading spawns a fetch task;
//! starting another load aborts the one in flight, and the session's load
//! tickets drop any completion that still slips through. A fetch task that
//! dies without reporting back is settled as a failed load when awaited. The
//! session lock is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::model::TestId;
use crate::session::{LoadTicket, SessionStatus, TestSession, Transition};
use crate::traits::TestGateway;

/// Drives one session against a gateway.
pub struct SessionController {
    gateway: Arc<dyn TestGateway>,
    session: Arc<Mutex<TestSession>>,
    in_flight: Option<InFlightLoad>,
}

/// The spawned fetch task together with the ticket it must present.
struct InFlightLoad {
    test_id: TestId,
    ticket: LoadTicket,
    handle: JoinHandle<()>,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn TestGateway>) -> Self {
        Self {
            gateway,
            session: Arc::new(Mutex::new(TestSession::new())),
            in_flight: None,
        }
    }

    /// Start loading test `id`, superseding any load still in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load_test(&mut self, id: TestId) -> LoadTicket {
        if let Some(previous) = self.in_flight.take() {
            if !previous.handle.is_finished() {
                tracing::debug!(test_id = previous.test_id, "cancelling superseded load");
            }
            previous.handle.abort();
        }

        let ticket = self.with_session(TestSession::begin_load);
        let gateway = Arc::clone(&self.gateway);
        let session = Arc::clone(&self.session);

        let handle = tokio::spawn(async move {
            tracing::debug!(
                test_id = id,
                gateway = gateway.name(),
                generation = ticket.generation(),
                "fetching test"
            );
            let outcome = gateway.fetch_test(id).await.map_err(|e| format!("{e:#}"));
            let transition = lock(&session).finish_load(ticket, outcome);
            if !transition.is_applied() {
                tracing::debug!(test_id = id, "dropped result of superseded load");
            }
        });

        self.in_flight = Some(InFlightLoad {
            test_id: id,
            ticket,
            handle,
        });
        ticket
    }

    /// Wait for the current load (if any) to finish.
    ///
    /// A fetch task that panicked is recorded as a failed load, so the
    /// session never stays `Loading` once this returns.
    pub async fn wait_for_load(&mut self) {
        let Some(load) = self.in_flight.take() else {
            return;
        };
        match load.handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                tracing::warn!(test_id = load.test_id, "load task failed: {e}");
                let message = format!("load task failed: {e}");
                lock(&self.session).finish_load(load.ticket, Err(message));
            }
        }
    }

    /// Load test `id` and wait for the outcome. Returns the resulting status;
    /// a failed fetch is reported through the session, not as an error.
    pub async fn load_test_and_wait(&mut self, id: TestId) -> SessionStatus {
        self.load_test(id);
        self.wait_for_load().await;
        self.with_session(|s| s.status())
    }

    /// Run a synchronous operation against the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut TestSession) -> R) -> R {
        f(&mut lock(&self.session))
    }

    /// A copy of the current session state.
    pub fn snapshot(&self) -> TestSession {
        lock(&self.session).clone()
    }

    /// Grade the attempt.
    ///
    /// Uses the gateway's separately published answer key when there is one,
    /// otherwise the key carried by the loaded test.
    pub async fn check_answers(&self) -> Transition {
        let test_id = self.with_session(|s| s.test().map(|t| t.id));

        let key = match test_id {
            Some(id) => match self.gateway.fetch_answer_key(id).await {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(test_id = id, "answer key unavailable, using test flags: {e:#}");
                    None
                }
            },
            None => None,
        };

        self.with_session(|s| {
            // The test may have been replaced while the key was in flight.
            let key = key.filter(|_| s.test().map(|t| t.id) == test_id);
            match key {
                Some(key) => s.check_answers_with_key(key),
                None => s.check_answers(),
            }
        })
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(load) = self.in_flight.take() {
            load.handle.abort();
        }
    }
}

fn lock(session: &Mutex<TestSession>) -> MutexGuard<'_, TestSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
