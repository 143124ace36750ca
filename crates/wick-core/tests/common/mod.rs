// ABOUTME: In-memory Connector and Session doubles for wick-core integration tests.
// ABOUTME: Sessions record their lifecycle state so leaks and double closes are observable.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use wick_wamp::{
    CallResult, ConnectConfig, Connector, Dict, Event, EventHandler, Invocation,
    InvocationError, InvocationHandler, List, ProgressHandler, Session, SessionDetails, WampError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Established,
    Closed,
}

pub struct MockSession {
    details: SessionDetails,
    state: Mutex<SessionState>,
    goodbye: Mutex<Option<String>>,
    terminated: watch::Sender<bool>,
    pub calls: AtomicUsize,
    pub publishes: AtomicUsize,
    pub closes: AtomicUsize,
    pub config: ConnectConfig,
    subscriptions: Mutex<HashMap<String, EventHandler>>,
    registrations: Mutex<HashMap<String, InvocationHandler>>,
    /// Calls to these procedures fail with a remote error.
    failing: Mutex<HashSet<String>>,
    /// Progressive results emitted before every final call result.
    progress_steps: AtomicUsize,
}

impl MockSession {
    pub fn new(id: u64, config: ConnectConfig) -> Self {
        let (terminated, _) = watch::channel(false);
        Self {
            details: SessionDetails {
                session_id: id,
                realm: config.realm.clone(),
                authid: format!("mock-{id}"),
                authrole: "anonymous".to_string(),
                authmethod: config.variant.method().to_string(),
                ..SessionDetails::default()
            },
            state: Mutex::new(SessionState::Established),
            goodbye: Mutex::new(None),
            terminated,
            calls: AtomicUsize::new(0),
            publishes: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            config,
            subscriptions: Mutex::new(HashMap::new()),
            registrations: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            progress_steps: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("lock")
    }

    pub fn fail_calls_to(&self, procedure: &str) {
        self.failing
            .lock()
            .expect("lock")
            .insert(procedure.to_string());
    }

    pub fn with_progress_steps(&self, steps: usize) {
        self.progress_steps.store(steps, Ordering::SeqCst);
    }

    /// Simulate the router ending the session.
    pub fn terminate(&self, goodbye_reason: Option<&str>) {
        *self.goodbye.lock().expect("lock") = goodbye_reason.map(str::to_string);
        *self.state.lock().expect("lock") = SessionState::Closed;
        self.terminated.send_replace(true);
    }

    pub fn emit(&self, topic: &str, args: List) -> bool {
        let handler = self.subscriptions.lock().expect("lock").get(topic).cloned();
        match handler {
            Some(handler) => {
                handler(Event {
                    args,
                    ..Event::default()
                });
                true
            }
            None => false,
        }
    }

    pub async fn invoke(
        &self,
        procedure: &str,
        args: List,
    ) -> Option<Result<CallResult, InvocationError>> {
        let handler = self.registrations.lock().expect("lock").get(procedure).cloned()?;
        Some(
            handler(Invocation {
                args,
                ..Invocation::default()
            })
            .await,
        )
    }

    pub fn is_registered(&self, procedure: &str) -> bool {
        self.registrations.lock().expect("lock").contains_key(procedure)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.lock().expect("lock").contains_key(topic)
    }

    fn ensure_open(&self) -> Result<(), WampError> {
        match self.state() {
            SessionState::Established => Ok(()),
            SessionState::Closed => Err(WampError::Closed),
        }
    }
}

#[async_trait]
impl Session for MockSession {
    fn id(&self) -> u64 {
        self.details.session_id
    }

    fn details(&self) -> &SessionDetails {
        &self.details
    }

    async fn call(
        &self,
        procedure: &str,
        _options: Dict,
        args: List,
        kwargs: Dict,
        progress: Option<ProgressHandler>,
    ) -> Result<CallResult, WampError> {
        self.ensure_open()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.failing.lock().expect("lock").contains(procedure) {
            return Err(WampError::Remote {
                error: "wamp.error.no_such_procedure".to_string(),
                args: vec![serde_json::json!(format!("no callee for {procedure}"))],
                kwargs: Dict::new(),
            });
        }
        if let Some(progress) = progress {
            for step in 0..self.progress_steps.load(Ordering::SeqCst) {
                progress(CallResult::new(vec![serde_json::json!(step)], Dict::new()));
            }
        }
        Ok(CallResult::new(args, kwargs))
    }

    async fn publish(&self, _topic: &str, _options: Dict, _args: List, _kwargs: Dict) -> Result<(), WampError> {
        self.ensure_open()?;
        self.publishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, _options: Dict, handler: EventHandler) -> Result<(), WampError> {
        self.ensure_open()?;
        self.subscriptions
            .lock()
            .expect("lock")
            .insert(topic.to_string(), handler);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), WampError> {
        self.ensure_open()?;
        match self.subscriptions.lock().expect("lock").remove(topic) {
            Some(_) => Ok(()),
            None => Err(WampError::NotHeld {
                kind: "subscription",
                name: topic.to_string(),
            }),
        }
    }

    async fn register(
        &self,
        procedure: &str,
        _options: Dict,
        handler: InvocationHandler,
    ) -> Result<(), WampError> {
        self.ensure_open()?;
        self.registrations
            .lock()
            .expect("lock")
            .insert(procedure.to_string(), handler);
        Ok(())
    }

    async fn unregister(&self, procedure: &str) -> Result<(), WampError> {
        self.ensure_open()?;
        match self.registrations.lock().expect("lock").remove(procedure) {
            Some(_) => Ok(()),
            None => Err(WampError::NotHeld {
                kind: "registration",
                name: procedure.to_string(),
            }),
        }
    }

    async fn close(&self) -> Result<(), WampError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().expect("lock") = SessionState::Closed;
        self.terminated.send_replace(true);
        Ok(())
    }

    async fn done(&self) {
        let mut rx = self.terminated.subscribe();
        let _ = rx.wait_for(|terminated| *terminated).await;
    }

    fn goodbye_reason(&self) -> Option<String> {
        self.goodbye.lock().expect("lock").clone()
    }
}

/// Hands out MockSessions; attempts listed in `failing` are refused.
#[derive(Default)]
pub struct MockConnector {
    attempts: AtomicUsize,
    next_id: AtomicU64,
    failing: HashSet<usize>,
    opened: Mutex<Vec<Arc<MockSession>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(attempts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing: attempts.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<Arc<MockSession>> {
        self.opened.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: ConnectConfig) -> Result<Arc<dyn Session>, WampError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.failing.contains(&attempt) {
            return Err(WampError::ConnectionFailed(format!(
                "attempt {attempt}: connection refused"
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Arc::new(MockSession::new(id, config));
        self.opened.lock().expect("lock").push(Arc::clone(&session));
        Ok(session)
    }
}

/// Upcast for APIs taking `&[Arc<dyn Session>]`.
pub fn as_dyn(sessions: &[Arc<MockSession>]) -> Vec<Arc<dyn Session>> {
    sessions
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn Session>)
        .collect()
}
