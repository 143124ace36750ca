// ABOUTME: WampConnector and WampSession: the join handshake and a live session driven by a reader task.
// ABOUTME: Requests wait on oneshot channels; events and invocations are dispatched to registered handlers.

use crate::config::ConnectConfig;
use crate::error::{Result, WampError};
use crate::message::{code, reason, Codec, Dict, List, Message};
use crate::session::{
    CallResult, Connector, Event, EventHandler, Invocation, InvocationHandler, ProgressHandler,
    Session, SessionDetails,
};
use crate::transport::{self, Outgoing, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, info, warn};
use url::Url;
use wick_auth::Challenge;

/// How long close() waits for the router's GOODBYE before dropping the transport.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens real sessions over WebSocket or raw socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WampConnector;

#[async_trait]
impl Connector for WampConnector {
    async fn connect(&self, config: ConnectConfig) -> Result<Arc<dyn Session>> {
        let session = WampSession::connect(config).await?;
        Ok(Arc::new(session))
    }
}

fn client_roles() -> Value {
    json!({
        "caller": {"features": {"progressive_call_results": true}},
        "callee": {"features": {"progressive_call_results": true}},
        "publisher": {"features": {}},
        "subscriber": {"features": {}}
    })
}

async fn send_message(tx: &mpsc::Sender<Outgoing>, codec: Codec, message: &Message) -> Result<()> {
    let bytes = codec.encode(message)?;
    tx.send(Outgoing::Frame(bytes))
        .await
        .map_err(|_| WampError::Closed)
}

fn unexpected(message: Message) -> WampError {
    WampError::Protocol(format!("unexpected {} reply", message.name()))
}

#[derive(Debug, Clone, Default)]
struct Termination {
    goodbye_reason: Option<String>,
}

/// A handler waiting for its SUBSCRIBED / REGISTERED ack. The reader installs
/// it while routing the ack, before it reads the next frame.
enum Attach {
    Subscription {
        topic: String,
        handler: EventHandler,
    },
    Registration {
        procedure: String,
        handler: InvocationHandler,
    },
}

#[derive(Default)]
struct State {
    pending: HashMap<u64, oneshot::Sender<Result<Message>>>,
    progress: HashMap<u64, ProgressHandler>,
    attach: HashMap<u64, Attach>,
    subscriptions: HashMap<u64, EventHandler>,
    topics: HashMap<String, u64>,
    registrations: HashMap<u64, InvocationHandler>,
    procedures: HashMap<String, u64>,
    closing: bool,
    terminated: bool,
}

struct Shared {
    state: Mutex<State>,
    next_request: AtomicU64,
    terminated: watch::Sender<Option<Termination>>,
}

/// A joined session.
pub struct WampSession {
    details: SessionDetails,
    codec: Codec,
    outbound: mpsc::Sender<Outgoing>,
    shared: Arc<Shared>,
}

impl WampSession {
    /// Open the transport, join the realm and start the reader task.
    pub async fn connect(config: ConnectConfig) -> Result<Self> {
        let codec = Codec::for_serializer(config.serializer)?;
        let url = Url::parse(&config.url).map_err(|e| {
            WampError::ConnectionFailed(format!("invalid url '{}': {e}", config.url))
        })?;

        match config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, Self::join(url, codec, config))
                .await
                .map_err(|_| {
                    WampError::ConnectionFailed(format!("timed out after {}s", limit.as_secs()))
                })?,
            None => Self::join(url, codec, config).await,
        }
    }

    async fn join(url: Url, codec: Codec, config: ConnectConfig) -> Result<Self> {
        let Transport {
            sender,
            mut receiver,
        } = transport::connect(&url, codec, config.keepalive).await?;
        debug!(url = %url, "connected");

        let mut details = config.hello.clone();
        details.insert("roles".to_string(), client_roles());
        if config.variant.handles_challenges() {
            details.insert("authmethods".to_string(), json!([config.variant.method()]));
        }
        send_message(
            &sender,
            codec,
            &Message::Hello {
                realm: config.realm.clone(),
                details,
            },
        )
        .await?;

        loop {
            let frame = receiver.recv().await.ok_or_else(|| {
                WampError::ConnectionFailed("router closed the connection during join".to_string())
            })?;

            match codec.decode(&frame)? {
                Message::Welcome { session, details } => {
                    let details = SessionDetails::from_welcome(session, &config.realm, &details);
                    debug!(
                        session_id = session,
                        realm = %details.realm,
                        authid = %details.authid,
                        authrole = %details.authrole,
                        authmethod = %details.authmethod,
                        authprovider = %details.authprovider,
                        "attached session"
                    );
                    debug!(
                        broker = %details.features("broker"),
                        dealer = %details.features("dealer"),
                        "router features"
                    );
                    return Ok(Self::start(details, codec, sender, receiver));
                }
                Message::Challenge { auth_method, extra } => {
                    let response = config
                        .variant
                        .respond(&Challenge::new(auth_method, extra))?;
                    send_message(
                        &sender,
                        codec,
                        &Message::Authenticate {
                            signature: response.signature,
                            extra: response.extra,
                        },
                    )
                    .await?;
                }
                Message::Abort { details, reason } => {
                    let message = details
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    let _ = sender.send(Outgoing::Close).await;
                    return Err(WampError::Aborted { reason, message });
                }
                other => {
                    let _ = sender.send(Outgoing::Close).await;
                    return Err(WampError::Protocol(format!(
                        "unexpected {} during join",
                        other.name()
                    )));
                }
            }
        }
    }

    fn start(
        details: SessionDetails,
        codec: Codec,
        outbound: mpsc::Sender<Outgoing>,
        receiver: mpsc::Receiver<Vec<u8>>,
    ) -> Self {
        let (terminated, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            next_request: AtomicU64::new(1),
            terminated,
        });

        tokio::spawn(read_loop(
            Arc::clone(&shared),
            codec,
            outbound.downgrade(),
            receiver,
        ));

        Self {
            details,
            codec,
            outbound,
            shared,
        }
    }

    fn next_request(&self) -> u64 {
        self.shared.next_request.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(
        &self,
        request: u64,
        message: Message,
        progress: Option<ProgressHandler>,
        attach: Option<Attach>,
    ) -> Result<Message> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.shared.state.lock().await;
            if state.terminated || state.closing {
                return Err(WampError::Closed);
            }
            state.pending.insert(request, tx);
            if let Some(handler) = progress {
                state.progress.insert(request, handler);
            }
            if let Some(attach) = attach {
                state.attach.insert(request, attach);
            }
        }

        if let Err(e) = send_message(&self.outbound, self.codec, &message).await {
            let mut state = self.shared.state.lock().await;
            state.pending.remove(&request);
            state.progress.remove(&request);
            state.attach.remove(&request);
            return Err(e);
        }

        rx.await.map_err(|_| WampError::Closed)?
    }
}

#[async_trait]
impl Session for WampSession {
    fn id(&self) -> u64 {
        self.details.session_id
    }

    fn details(&self) -> &SessionDetails {
        &self.details
    }

    async fn call(
        &self,
        procedure: &str,
        mut options: Dict,
        args: List,
        kwargs: Dict,
        progress: Option<ProgressHandler>,
    ) -> Result<CallResult> {
        if progress.is_some() {
            options
                .entry("receive_progress")
                .or_insert(Value::Bool(true));
        }
        let request = self.next_request();
        let message = Message::Call {
            request,
            options,
            procedure: procedure.to_string(),
            args,
            kwargs,
        };

        match self.request(request, message, progress, None).await? {
            Message::Result {
                details,
                args,
                kwargs,
                ..
            } => Ok(CallResult {
                args,
                kwargs,
                details,
            }),
            other => Err(unexpected(other)),
        }
    }

    async fn publish(&self, topic: &str, options: Dict, args: List, kwargs: Dict) -> Result<()> {
        let acknowledge = options.get("acknowledge").and_then(Value::as_bool) == Some(true);
        let request = self.next_request();
        let message = Message::Publish {
            request,
            options,
            topic: topic.to_string(),
            args,
            kwargs,
        };

        if !acknowledge {
            if self.shared.state.lock().await.terminated {
                return Err(WampError::Closed);
            }
            return send_message(&self.outbound, self.codec, &message).await;
        }

        match self.request(request, message, None, None).await? {
            Message::Published { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn subscribe(&self, topic: &str, options: Dict, handler: EventHandler) -> Result<()> {
        let request = self.next_request();
        let message = Message::Subscribe {
            request,
            options,
            topic: topic.to_string(),
        };

        let attach = Attach::Subscription {
            topic: topic.to_string(),
            handler,
        };
        match self.request(request, message, None, Some(attach)).await? {
            Message::Subscribed { subscription, .. } => {
                debug!(topic, subscription, "subscribed");
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    async fn unsubscribe(&self, topic: &str) -> Result<()> {
        let subscription = self
            .shared
            .state
            .lock()
            .await
            .topics
            .get(topic)
            .copied()
            .ok_or_else(|| WampError::NotHeld {
                kind: "subscription",
                name: topic.to_string(),
            })?;

        let request = self.next_request();
        let message = Message::Unsubscribe {
            request,
            subscription,
        };
        match self.request(request, message, None, None).await? {
            Message::Unsubscribed { .. } => {
                let mut state = self.shared.state.lock().await;
                state.subscriptions.remove(&subscription);
                state.topics.remove(topic);
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    async fn register(
        &self,
        procedure: &str,
        options: Dict,
        handler: InvocationHandler,
    ) -> Result<()> {
        let request = self.next_request();
        let message = Message::Register {
            request,
            options,
            procedure: procedure.to_string(),
        };

        let attach = Attach::Registration {
            procedure: procedure.to_string(),
            handler,
        };
        match self.request(request, message, None, Some(attach)).await? {
            Message::Registered { registration, .. } => {
                debug!(procedure, registration, "registered");
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    async fn unregister(&self, procedure: &str) -> Result<()> {
        let registration = self
            .shared
            .state
            .lock()
            .await
            .procedures
            .get(procedure)
            .copied()
            .ok_or_else(|| WampError::NotHeld {
                kind: "registration",
                name: procedure.to_string(),
            })?;

        let request = self.next_request();
        let message = Message::Unregister {
            request,
            registration,
        };
        match self.request(request, message, None, None).await? {
            Message::Unregistered { .. } => {
                let mut state = self.shared.state.lock().await;
                state.registrations.remove(&registration);
                state.procedures.remove(procedure);
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    async fn close(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock().await;
            if state.terminated {
                return Ok(());
            }
            if state.closing {
                drop(state);
                self.done().await;
                return Ok(());
            }
            state.closing = true;
        }

        let goodbye = Message::Goodbye {
            details: Dict::new(),
            reason: reason::CLOSE_REALM.to_string(),
        };
        if send_message(&self.outbound, self.codec, &goodbye)
            .await
            .is_err()
        {
            self.done().await;
            return Ok(());
        }

        if tokio::time::timeout(CLOSE_TIMEOUT, self.done()).await.is_err() {
            warn!(session_id = self.id(), "router did not answer GOODBYE, dropping connection");
            let _ = self.outbound.send(Outgoing::Close).await;
            self.done().await;
        }
        Ok(())
    }

    async fn done(&self) {
        let mut rx = self.shared.terminated.subscribe();
        let _ = rx.wait_for(Option::is_some).await;
    }

    fn goodbye_reason(&self) -> Option<String> {
        self.shared
            .terminated
            .borrow()
            .as_ref()
            .and_then(|t| t.goodbye_reason.clone())
    }
}

async fn read_loop(
    shared: Arc<Shared>,
    codec: Codec,
    outbound: mpsc::WeakSender<Outgoing>,
    mut receiver: mpsc::Receiver<Vec<u8>>,
) {
    let mut goodbye_reason = None;

    while let Some(frame) = receiver.recv().await {
        let message = match codec.decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "dropping undecodable message");
                continue;
            }
        };

        match message {
            Message::Goodbye {
                reason: router_reason,
                ..
            } => {
                let closing = shared.state.lock().await.closing;
                if let Some(tx) = outbound.upgrade() {
                    if !closing {
                        let reply = Message::Goodbye {
                            details: Dict::new(),
                            reason: reason::GOODBYE_AND_OUT.to_string(),
                        };
                        let _ = send_message(&tx, codec, &reply).await;
                    }
                    let _ = tx.send(Outgoing::Close).await;
                }
                if !closing {
                    info!(reason = %router_reason, "router ended the session");
                    goodbye_reason = Some(router_reason);
                }
                break;
            }
            Message::Abort { reason, .. } => {
                warn!(reason = %reason, "session aborted by router");
                break;
            }
            other => dispatch(&shared, codec, &outbound, other).await,
        }
    }

    let pending = {
        let mut state = shared.state.lock().await;
        state.terminated = true;
        state.progress.clear();
        state.attach.clear();
        std::mem::take(&mut state.pending)
    };
    for (_, waiter) in pending {
        let _ = waiter.send(Err(WampError::Closed));
    }
    shared
        .terminated
        .send_replace(Some(Termination { goodbye_reason }));
}

/// Install a handler once its ack is routed; an ERROR reply drops it.
fn install(state: &mut State, reply: &Message, attach: Attach) {
    match (reply, attach) {
        (
            Message::Subscribed { subscription, .. },
            Attach::Subscription { topic, handler },
        ) => {
            state.subscriptions.insert(*subscription, handler);
            state.topics.insert(topic, *subscription);
        }
        (
            Message::Registered { registration, .. },
            Attach::Registration { procedure, handler },
        ) => {
            state.registrations.insert(*registration, handler);
            state.procedures.insert(procedure, *registration);
        }
        _ => {}
    }
}

async fn dispatch(
    shared: &Shared,
    codec: Codec,
    outbound: &mpsc::WeakSender<Outgoing>,
    message: Message,
) {
    if let Message::Result {
        request,
        details,
        args,
        kwargs,
    } = &message
    {
        if details.get("progress").and_then(Value::as_bool) == Some(true) {
            let handler = shared.state.lock().await.progress.get(request).cloned();
            if let Some(handler) = handler {
                handler(CallResult {
                    args: args.clone(),
                    kwargs: kwargs.clone(),
                    details: details.clone(),
                });
            }
            return;
        }
    }

    match message {
        Message::Event {
            subscription,
            publication,
            details,
            args,
            kwargs,
        } => {
            let handler = shared
                .state
                .lock()
                .await
                .subscriptions
                .get(&subscription)
                .cloned();
            match handler {
                Some(handler) => handler(Event {
                    subscription,
                    publication,
                    args,
                    kwargs,
                    details,
                }),
                None => debug!(subscription, "event for unknown subscription"),
            }
        }
        Message::Invocation {
            request,
            registration,
            details,
            args,
            kwargs,
        } => {
            let handler = shared
                .state
                .lock()
                .await
                .registrations
                .get(&registration)
                .cloned();
            let Some(tx) = outbound.upgrade() else {
                return;
            };

            let Some(handler) = handler else {
                let reply = Message::Error {
                    request_type: code::INVOCATION,
                    request,
                    details: Dict::new(),
                    error: "wamp.error.no_such_registration".to_string(),
                    args: List::new(),
                    kwargs: Dict::new(),
                };
                let _ = send_message(&tx, codec, &reply).await;
                return;
            };

            let future = handler(Invocation {
                request,
                registration,
                args,
                kwargs,
                details,
            });
            tokio::spawn(async move {
                let reply = match future.await {
                    Ok(result) => Message::Yield {
                        request,
                        options: Dict::new(),
                        args: result.args,
                        kwargs: result.kwargs,
                    },
                    Err(err) => Message::Error {
                        request_type: code::INVOCATION,
                        request,
                        details: Dict::new(),
                        error: err.error,
                        args: err.args,
                        kwargs: err.kwargs,
                    },
                };
                if let Err(e) = send_message(&tx, codec, &reply).await {
                    warn!(request, error = %e, "failed to answer invocation");
                }
            });
        }
        other => {
            let Some(request) = other.request_id() else {
                debug!(message = other.name(), "ignoring unexpected message");
                return;
            };
            let waiter = {
                let mut state = shared.state.lock().await;
                state.progress.remove(&request);
                if let Some(attach) = state.attach.remove(&request) {
                    install(&mut state, &other, attach);
                }
                state.pending.remove(&request)
            };
            let outcome = match other {
                Message::Error {
                    error,
                    args,
                    kwargs,
                    ..
                } => Err(WampError::Remote {
                    error,
                    args,
                    kwargs,
                }),
                reply => Ok(reply),
            };
            match waiter {
                Some(waiter) => {
                    let _ = waiter.send(outcome);
                }
                None => debug!(request, "reply for unknown request"),
            }
        }
    }
}
