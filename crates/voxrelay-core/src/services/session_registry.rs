//! Per-client session registry.
//!
//! Binds each client identity to its connection, its selected voice and at
//! most one active turn task. All cancellation goes through here: a new
//! turn cancels the previous one, `cancel` stops the current one, and
//! `unregister` stops everything for a departing client.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::events::ClientConnection;

/// Errors from registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Client {0} is already connected")]
    AlreadyConnected(String),

    #[error("Client {0} is not connected")]
    NotConnected(String),
}

/// Handle for a spawned turn task.
struct TaskHandle {
    id: u64,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

struct ClientSession {
    connection: ClientConnection,
    voice: Option<String>,
    active: Option<TaskHandle>,
    /// Cancelled task that has not finished yet.
    draining: Option<TaskHandle>,
}

impl ClientSession {
    const fn new(connection: ClientConnection) -> Self {
        Self {
            connection,
            voice: None,
            active: None,
            draining: None,
        }
    }

    fn take_tasks(&mut self) -> Vec<TaskHandle> {
        [self.draining.take(), self.active.take()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Registry of connected clients and their running turns.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, ClientSession>>,
    next_task_id: AtomicU64,
    drain_timeout: Duration,
}

impl SessionRegistry {
    /// Create a registry. `drain_timeout` bounds how long a replacement or
    /// teardown waits for a cancelled task to finish its bookkeeping.
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_task_id: AtomicU64::new(1),
            drain_timeout,
        }
    }

    /// Bind `identity` to `connection`.
    ///
    /// A binding whose connection has already closed is treated as stale
    /// and replaced; any live binding is an error.
    pub async fn register(
        &self,
        identity: &str,
        connection: ClientConnection,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().connection.is_closed() {
                    return Err(SessionError::AlreadyConnected(identity.to_string()));
                }
                debug!(client_id = %identity, "Replacing stale session");
                for task in entry.get_mut().take_tasks() {
                    task.cancel.cancel();
                }
                entry.insert(ClientSession::new(connection));
            }
            Entry::Vacant(entry) => {
                entry.insert(ClientSession::new(connection));
            }
        }
        debug!(client_id = %identity, "Client registered");
        Ok(())
    }

    /// Start `task` as the client's active turn, cancelling any prior one.
    ///
    /// The slot swap happens under the registry lock, so two concurrent
    /// starts can never both end up active. The new task waits (bounded by
    /// the drain timeout) for cancelled predecessors to finish before it
    /// runs, which keeps their final events ahead of its own.
    ///
    /// Returns the id assigned to the task.
    pub async fn start_task<F, Fut>(
        self: &Arc<Self>,
        identity: &str,
        task: F,
    ) -> Result<u64, SessionError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(identity)
            .ok_or_else(|| SessionError::NotConnected(identity.to_string()))?;

        let predecessors: Vec<JoinHandle<()>> = session
            .take_tasks()
            .into_iter()
            .map(|prev| {
                debug!(client_id = %identity, task_id = prev.id, "Cancelling previous task");
                prev.cancel.cancel();
                prev.join
            })
            .collect();

        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let registry = Arc::downgrade(self);
        let owner = identity.to_string();
        let drain_timeout = self.drain_timeout;

        let join = tokio::spawn(async move {
            for prev in predecessors {
                if tokio::time::timeout(drain_timeout, prev).await.is_err() {
                    warn!(client_id = %owner, task_id, "Previous task did not stop in time");
                }
            }

            if AssertUnwindSafe(task(token)).catch_unwind().await.is_err() {
                error!(client_id = %owner, task_id, "Turn task panicked");
            }

            if let Some(registry) = registry.upgrade() {
                registry.finish_task(&owner, task_id).await;
            }
        });

        session.active = Some(TaskHandle {
            id: task_id,
            cancel,
            join,
        });
        debug!(client_id = %identity, task_id, "Started task");
        Ok(task_id)
    }

    /// Cancel the client's active task.
    ///
    /// Returns `false` when there was nothing to cancel, so calling this
    /// twice has the same effect as calling it once.
    pub async fn cancel(&self, identity: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(identity) else {
            return false;
        };
        let Some(task) = session.active.take() else {
            return false;
        };

        debug!(client_id = %identity, task_id = task.id, "Cancelling active task");
        task.cancel.cancel();
        session.draining = Some(task);
        true
    }

    /// Cancel all of the client's tasks and remove its binding.
    ///
    /// Waits up to the drain timeout for each cancelled task to finish.
    /// Returns `false` if the identity was not registered.
    pub async fn unregister(&self, identity: &str) -> bool {
        let removed = self.sessions.lock().await.remove(identity);
        let Some(mut session) = removed else {
            return false;
        };

        for task in session.take_tasks() {
            task.cancel.cancel();
            match tokio::time::timeout(self.drain_timeout, task.join).await {
                Ok(Ok(())) => debug!(client_id = %identity, task_id = task.id, "Task stopped"),
                Ok(Err(e)) => warn!(client_id = %identity, error = %e, "Task ended abnormally"),
                Err(_) => warn!(client_id = %identity, task_id = task.id, "Task stop timed out"),
            }
        }

        debug!(client_id = %identity, "Client unregistered");
        true
    }

    pub async fn set_voice(&self, identity: &str, voice: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(identity)
            .ok_or_else(|| SessionError::NotConnected(identity.to_string()))?;
        session.voice = Some(voice.to_string());
        Ok(())
    }

    pub async fn voice(&self, identity: &str) -> Option<String> {
        self.sessions
            .lock()
            .await
            .get(identity)
            .and_then(|s| s.voice.clone())
    }

    pub async fn connection(&self, identity: &str) -> Option<ClientConnection> {
        self.sessions
            .lock()
            .await
            .get(identity)
            .map(|s| s.connection.clone())
    }

    pub async fn has_active_task(&self, identity: &str) -> bool {
        self.sessions
            .lock()
            .await
            .get(identity)
            .is_some_and(|s| s.active.is_some())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Clear a finished task's slot, unless a newer task already took it.
    async fn finish_task(&self, identity: &str, task_id: u64) {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(identity) else {
            return;
        };
        if session.active.as_ref().is_some_and(|t| t.id == task_id) {
            session.active = None;
        }
        if session.draining.as_ref().is_some_and(|t| t.id == task_id) {
            session.draining = None;
        }
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        for (client_id, session) in self.sessions.get_mut().iter_mut() {
            for task in session.take_tasks() {
                debug!(%client_id, task_id = task.id, "Cancelling task during registry drop");
                task.cancel.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::OutboundEvent;
    use tokio::sync::{mpsc, oneshot};
    use tokio::time::timeout;

    fn registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(Duration::from_secs(2)))
    }

    async fn connected(reg: &SessionRegistry, id: &str) -> mpsc::Receiver<OutboundEvent> {
        let (conn, rx) = ClientConnection::channel(8);
        reg.register(id, conn).await.unwrap();
        rx
    }

    #[tokio::test]
    async fn register_twice_is_rejected() {
        let reg = registry();
        let _rx = connected(&reg, "alice").await;

        let (conn, _rx2) = ClientConnection::channel(8);
        assert_eq!(
            reg.register("alice", conn).await,
            Err(SessionError::AlreadyConnected("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn register_replaces_closed_connection() {
        let reg = registry();
        let rx = connected(&reg, "alice").await;
        drop(rx);

        let (conn, _rx2) = ClientConnection::channel(8);
        assert!(reg.register("alice", conn).await.is_ok());
        assert_eq!(reg.session_count().await, 1);
    }

    #[tokio::test]
    async fn start_task_requires_registration() {
        let reg = registry();
        let result = reg.start_task("ghost", |_| async {}).await;
        assert_eq!(result, Err(SessionError::NotConnected("ghost".to_string())));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let reg = registry();
        let _rx = connected(&reg, "alice").await;

        reg.start_task("alice", |token| async move { token.cancelled().await })
            .await
            .unwrap();

        assert!(reg.cancel("alice").await);
        assert!(!reg.cancel("alice").await);
        assert!(!reg.cancel("nobody").await);
    }

    #[tokio::test]
    async fn new_task_cancels_previous() {
        let reg = registry();
        let _rx = connected(&reg, "alice").await;

        let (first_done_tx, first_done_rx) = oneshot::channel();
        reg.start_task("alice", |token| async move {
            token.cancelled().await;
            let _ = first_done_tx.send(());
        })
        .await
        .unwrap();

        let (second_ran_tx, second_ran_rx) = oneshot::channel();
        reg.start_task("alice", |_| async move {
            let _ = second_ran_tx.send(());
        })
        .await
        .unwrap();

        timeout(Duration::from_secs(2), first_done_rx)
            .await
            .expect("first task should observe cancellation")
            .unwrap();
        timeout(Duration::from_secs(2), second_ran_rx)
            .await
            .expect("second task should run")
            .unwrap();
    }

    #[tokio::test]
    async fn finished_task_clears_slot() {
        let reg = registry();
        let _rx = connected(&reg, "alice").await;

        let (done_tx, done_rx) = oneshot::channel();
        reg.start_task("alice", |_| async move {
            let _ = done_tx.send(());
        })
        .await
        .unwrap();
        done_rx.await.unwrap();

        // finish_task runs right after the body; give it a moment.
        for _ in 0..50 {
            if !reg.has_active_task("alice").await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!reg.has_active_task("alice").await);
        assert!(!reg.cancel("alice").await);
    }

    #[tokio::test]
    async fn unregister_cancels_and_removes() {
        let reg = registry();
        let _rx = connected(&reg, "alice").await;

        let (stopped_tx, stopped_rx) = oneshot::channel();
        reg.start_task("alice", |token| async move {
            token.cancelled().await;
            let _ = stopped_tx.send(());
        })
        .await
        .unwrap();

        assert!(reg.unregister("alice").await);
        assert!(stopped_rx.await.is_ok());
        assert_eq!(reg.session_count().await, 0);
        assert!(!reg.unregister("alice").await);
    }

    #[tokio::test]
    async fn voice_is_per_session() {
        let reg = registry();
        let _a = connected(&reg, "alice").await;
        let _b = connected(&reg, "bob").await;

        reg.set_voice("alice", "en-GB-SoniaNeural").await.unwrap();

        assert_eq!(reg.voice("alice").await.as_deref(), Some("en-GB-SoniaNeural"));
        assert_eq!(reg.voice("bob").await, None);
        assert!(reg.set_voice("carol", "x").await.is_err());
    }

    #[tokio::test]
    async fn drop_cancels_running_tasks() {
        let reg = registry();
        let _rx = connected(&reg, "alice").await;

        let (token_tx, token_rx) = oneshot::channel();
        reg.start_task("alice", |token| async move {
            let _ = token_tx.send(token.clone());
            token.cancelled().await;
        })
        .await
        .unwrap();

        let token = token_rx.await.unwrap();
        assert!(!token.is_cancelled());
        drop(reg);
        assert!(token.is_cancelled());
    }
}
