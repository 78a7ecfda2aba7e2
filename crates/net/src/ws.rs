//! Blocking WebSocket pump.
//!
//! One spawned thread per connection: it connects, forwards decoded inbound
//! frames and lifecycle changes over an mpsc sender, and drains an outbound
//! queue between reads (the underlying stream runs with a short read timeout
//! so writes are never starved). The runtime side never touches socket types;
//! it consumes [`SocketSignal`]s and writes through a [`SocketHandle`].

use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;
use wire::{ClientFrame, ServerFrame, TransportError};

const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle and traffic of one connection attempt, in arrival order.
#[derive(Debug)]
pub enum SocketSignal {
    Open,
    Frame(ServerFrame),
    Closed,
}

/// Write side of a pumped connection. Dropping it closes the socket.
pub struct SocketHandle {
    outbound: mpsc::Sender<ClientFrame>,
}

impl SocketHandle {
    /// Queues a frame; false when the pump has already shut down.
    pub fn send(&self, frame: ClientFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

/// Derives the socket endpoint from the page URL when none is configured:
/// same host, `http -> ws`, `https -> wss`.
pub fn derive_ws_url(page: &Url, path: &str) -> Result<Url, TransportError> {
    let scheme = match page.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(TransportError::InvalidEndpoint(format!(
                "cannot derive a socket endpoint from scheme '{other}'"
            )));
        }
    };
    let mut url = page.clone();
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidEndpoint(page.to_string()))?;
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Spawns the pump thread for one connection attempt.
///
/// Every attempt ends with exactly one `Closed` signal, including failed
/// connects, so the owner can feed its reconnect state machine uniformly.
pub fn spawn(
    url: Url,
    signals: mpsc::Sender<SocketSignal>,
) -> (SocketHandle, thread::JoinHandle<()>) {
    let (outbound_tx, outbound_rx) = mpsc::channel::<ClientFrame>();
    let handle = SocketHandle {
        outbound: outbound_tx,
    };
    let join = thread::spawn(move || pump(url, signals, outbound_rx));
    (handle, join)
}

fn pump(url: Url, signals: mpsc::Sender<SocketSignal>, outbound: mpsc::Receiver<ClientFrame>) {
    let mut socket = match tungstenite::connect(url.as_str()) {
        Ok((socket, _response)) => socket,
        Err(e) => {
            log::warn!(target: "net.ws", "connect to {url} failed: {e}");
            let _ = signals.send(SocketSignal::Closed);
            return;
        }
    };
    configure_read_timeout(&mut socket);
    if signals.send(SocketSignal::Open).is_err() {
        let _ = socket.close(None);
        return;
    }

    loop {
        loop {
            match outbound.try_recv() {
                Ok(frame) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            log::error!(target: "net.ws", "frame encode failed: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = socket.send(Message::Text(text)) {
                        log::warn!(target: "net.ws", "send failed: {e}");
                        let _ = signals.send(SocketSignal::Closed);
                        return;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    let _ = signals.send(SocketSignal::Closed);
                    return;
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => {
                    if signals.send(SocketSignal::Frame(frame)).is_err() {
                        let _ = socket.close(None);
                        return;
                    }
                }
                Err(e) => {
                    log::warn!(target: "net.ws", "unrecognized frame: {e}");
                }
            },
            Ok(Message::Close(_)) => {
                let _ = signals.send(SocketSignal::Closed);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                let _ = signals.send(SocketSignal::Closed);
                return;
            }
            Err(e) => {
                log::warn!(target: "net.ws", "socket error: {e}");
                let _ = signals.send(SocketSignal::Closed);
                return;
            }
        }
    }
}

fn configure_read_timeout(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    if let MaybeTlsStream::Plain(stream) = socket.get_mut()
        && let Err(e) = stream.set_read_timeout(Some(READ_POLL_INTERVAL))
    {
        log::warn!(target: "net.ws", "read timeout not applied: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::derive_ws_url;
    use url::Url;

    #[test]
    fn derives_ws_scheme_from_page_url() {
        let page = Url::parse("http://example.test:8080/app?tab=1").unwrap();
        let ws = derive_ws_url(&page, "/live").unwrap();
        assert_eq!(ws.as_str(), "ws://example.test:8080/live");

        let page = Url::parse("https://example.test/app").unwrap();
        let ws = derive_ws_url(&page, "/live").unwrap();
        assert_eq!(ws.as_str(), "wss://example.test/live");
    }

    #[test]
    fn refuses_non_http_pages() {
        let page = Url::parse("file:///tmp/page.html").unwrap();
        assert!(derive_ws_url(&page, "/live").is_err());
    }
}
