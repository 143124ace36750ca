// ABOUTME: WebSocket and raw-socket transports exposed as a pair of frame channels.
// ABOUTME: A writer task owns the sink (and keepalive pings); a reader task forwards inbound frames.

use crate::error::{Result, WampError};
use crate::message::Codec;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};
use url::Url;

/// Buffer size for outbound frames.
pub const OUTBOUND_BUFFER: usize = 64;

/// Buffer size for inbound frames.
pub const INBOUND_BUFFER: usize = 256;

/// Raw-socket handshake magic byte.
pub const RAWSOCKET_MAGIC: u8 = 0x7F;

/// Requested maximum message length exponent: 2^(9 + 15) = 16 MiB.
pub const RAWSOCKET_MAX_LENGTH_EXPONENT: u8 = 0x0F;

const FRAME_REGULAR: u8 = 0;
const FRAME_PING: u8 = 1;
const FRAME_PONG: u8 = 2;
const MAX_FRAME_LENGTH: usize = 0x00FF_FFFF;

/// Something for the writer task to do.
#[derive(Debug)]
pub enum Outgoing {
    Frame(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// An open connection. Dropping every sender, or sending [`Outgoing::Close`],
/// closes it; `receiver` yields `None` once the peer is gone.
pub struct Transport {
    pub sender: mpsc::Sender<Outgoing>,
    pub receiver: mpsc::Receiver<Vec<u8>>,
}

/// Open a transport for an already-normalized URL.
pub async fn connect(url: &Url, codec: Codec, keepalive: Option<Duration>) -> Result<Transport> {
    match url.scheme() {
        "ws" | "wss" => connect_websocket(url, codec, keepalive).await,
        "tcp" => connect_rawsocket(url, codec, keepalive).await,
        // TODO: TLS raw socket once a rustls connector is wired in next to tungstenite's.
        "tcps" => Err(WampError::Unsupported(
            "raw socket over TLS (rss/tcps) is not supported yet".to_string(),
        )),
        other => Err(WampError::ConnectionFailed(format!(
            "unsupported url scheme '{other}'"
        ))),
    }
}

fn keepalive_interval(keepalive: Option<Duration>) -> Option<Interval> {
    keepalive
        .filter(|d| !d.is_zero())
        .map(|d| tokio::time::interval_at(Instant::now() + d, d))
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn connect_websocket(
    url: &Url,
    codec: Codec,
    keepalive: Option<Duration>,
) -> Result<Transport> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| WampError::ConnectionFailed(e.to_string()))?;
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static(codec.subprotocol()),
    );

    let (ws, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| WampError::ConnectionFailed(e.to_string()))?;

    let selected = response
        .headers()
        .get("Sec-WebSocket-Protocol")
        .and_then(|v| v.to_str().ok());
    if selected != Some(codec.subprotocol()) {
        return Err(WampError::ConnectionFailed(format!(
            "router did not accept subprotocol {}",
            codec.subprotocol()
        )));
    }
    debug!(url = %url, subprotocol = codec.subprotocol(), "websocket connected");

    let (mut sink, mut stream) = ws.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Outgoing>(OUTBOUND_BUFFER);
    let (in_tx, in_rx) = mpsc::channel::<Vec<u8>>(INBOUND_BUFFER);
    let binary = codec.is_binary();

    tokio::spawn(async move {
        let mut ticker = keepalive_interval(keepalive);
        loop {
            tokio::select! {
                outgoing = out_rx.recv() => {
                    let frame = match outgoing {
                        Some(Outgoing::Frame(bytes)) if binary => WsMessage::Binary(bytes),
                        Some(Outgoing::Frame(bytes)) => match String::from_utf8(bytes) {
                            Ok(text) => WsMessage::Text(text),
                            Err(e) => {
                                warn!(error = %e, "dropping non utf-8 text frame");
                                continue;
                            }
                        },
                        Some(Outgoing::Pong(payload)) => WsMessage::Pong(payload),
                        Some(Outgoing::Close) | None => {
                            let _ = sink.send(WsMessage::Close(None)).await;
                            let _ = sink.close().await;
                            break;
                        }
                    };
                    if let Err(e) = sink.send(frame).await {
                        debug!(error = %e, "websocket write failed");
                        break;
                    }
                }
                _ = tick(&mut ticker) => {
                    if let Err(e) = sink.send(WsMessage::Ping(Vec::new())).await {
                        debug!(error = %e, "websocket keepalive ping failed");
                        break;
                    }
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let payload = match frame {
                Ok(WsMessage::Text(text)) => text.into_bytes(),
                Ok(WsMessage::Binary(bytes)) => bytes,
                Ok(WsMessage::Close(close)) => {
                    debug!(?close, "websocket closed by peer");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!(error = %e, "websocket read failed");
                    break;
                }
            };
            if in_tx.send(payload).await.is_err() {
                break;
            }
        }
    });

    Ok(Transport {
        sender: out_tx,
        receiver: in_rx,
    })
}

/// The four handshake bytes a client sends.
pub fn handshake_request(codec: Codec) -> [u8; 4] {
    [
        RAWSOCKET_MAGIC,
        (RAWSOCKET_MAX_LENGTH_EXPONENT << 4) | codec.rawsocket_id(),
        0,
        0,
    ]
}

/// Check the router's handshake reply, returning the router's maximum message length.
pub fn check_handshake_reply(reply: [u8; 4], codec: Codec) -> Result<usize> {
    if reply[0] != RAWSOCKET_MAGIC {
        return Err(WampError::HandshakeRejected(format!(
            "unexpected magic byte {:#04x}",
            reply[0]
        )));
    }

    let serializer = reply[1] & 0x0F;
    let upper = reply[1] >> 4;
    if serializer == 0 {
        let reason = match upper {
            1 => "serializer unsupported",
            2 => "maximum message length unacceptable",
            3 => "use of reserved bits",
            4 => "maximum connection count reached",
            _ => "unknown error",
        };
        return Err(WampError::HandshakeRejected(reason.to_string()));
    }
    if serializer != codec.rawsocket_id() {
        return Err(WampError::HandshakeRejected(format!(
            "router selected serializer {serializer}, expected {}",
            codec.rawsocket_id()
        )));
    }

    Ok(1usize << (9 + u32::from(upper)))
}

/// Four-byte raw-socket frame header.
pub fn frame_header(kind: u8, len: usize) -> Result<[u8; 4]> {
    if len > MAX_FRAME_LENGTH {
        return Err(WampError::Transport(format!(
            "frame of {len} bytes exceeds raw socket limit"
        )));
    }
    let len = len as u32;
    Ok([kind, (len >> 16) as u8, (len >> 8) as u8, len as u8])
}

fn parse_frame_header(header: [u8; 4]) -> (u8, usize) {
    let len = u32::from_be_bytes([0, header[1], header[2], header[3]]);
    (header[0] & 0x07, len as usize)
}

async fn connect_rawsocket(
    url: &Url,
    codec: Codec,
    keepalive: Option<Duration>,
) -> Result<Transport> {
    let host = url
        .host_str()
        .ok_or_else(|| WampError::ConnectionFailed("url has no host".to_string()))?;
    let port = url
        .port()
        .ok_or_else(|| WampError::ConnectionFailed("raw socket url needs a port".to_string()))?;

    let mut stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| WampError::ConnectionFailed(e.to_string()))?;
    stream.set_nodelay(true)?;

    stream.write_all(&handshake_request(codec)).await?;
    let mut reply = [0u8; 4];
    stream.read_exact(&mut reply).await?;
    let router_max = check_handshake_reply(reply, codec)?;
    debug!(host, port, router_max, "raw socket connected");

    let (mut read_half, mut write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::channel::<Outgoing>(OUTBOUND_BUFFER);
    let (in_tx, in_rx) = mpsc::channel::<Vec<u8>>(INBOUND_BUFFER);
    let pong_tx = out_tx.downgrade();

    tokio::spawn(async move {
        let mut ticker = keepalive_interval(keepalive);
        loop {
            let (kind, payload) = tokio::select! {
                outgoing = out_rx.recv() => match outgoing {
                    Some(Outgoing::Frame(bytes)) => (FRAME_REGULAR, bytes),
                    Some(Outgoing::Pong(bytes)) => (FRAME_PONG, bytes),
                    Some(Outgoing::Close) | None => {
                        let _ = write_half.shutdown().await;
                        break;
                    }
                },
                _ = tick(&mut ticker) => (FRAME_PING, Vec::new()),
            };

            if payload.len() > router_max {
                warn!(len = payload.len(), router_max, "dropping frame larger than router accepts");
                continue;
            }
            let header = match frame_header(kind, payload.len()) {
                Ok(header) => header,
                Err(e) => {
                    warn!(error = %e, "dropping oversized frame");
                    continue;
                }
            };
            let written = async {
                write_half.write_all(&header).await?;
                write_half.write_all(&payload).await
            };
            if let Err(e) = written.await {
                debug!(error = %e, "raw socket write failed");
                break;
            }
        }
    });

    tokio::spawn(async move {
        loop {
            let mut header = [0u8; 4];
            if read_half.read_exact(&mut header).await.is_err() {
                break;
            }
            let (kind, len) = parse_frame_header(header);
            let mut payload = vec![0u8; len];
            if read_half.read_exact(&mut payload).await.is_err() {
                break;
            }

            match kind {
                FRAME_REGULAR => {
                    if in_tx.send(payload).await.is_err() {
                        break;
                    }
                }
                FRAME_PING => {
                    if let Some(tx) = pong_tx.upgrade() {
                        let _ = tx.send(Outgoing::Pong(payload)).await;
                    }
                }
                FRAME_PONG => {}
                other => {
                    warn!(frame_type = other, "unknown raw socket frame type, closing");
                    break;
                }
            }
        }
        debug!("raw socket reader finished");
    });

    Ok(Transport {
        sender: out_tx,
        receiver: in_rx,
    })
}
