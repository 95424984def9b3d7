//! MJPEG stream server
//!
//! Serves the broadcaster's frames as a `multipart/x-mixed-replace` HTTP
//! response, one JPEG per part, until the client disconnects. Each
//! connection runs on its own task and registers exactly one consumer
//! with the broadcaster; deregistration happens on every exit path, since
//! the last consumer leaving is what powers the camera down.

use crate::broadcaster::FrameBroadcaster;
use crate::error::VideoError;
use crate::frame::Frame;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Multipart boundary token for the MJPEG stream
const BOUNDARY: &str = "frame";

/// Path serving the MJPEG stream
const STREAM_PATH: &str = "/stream.mjpg";

/// Minimal viewer page embedding the stream
const INDEX_PAGE: &str = "<html>\n<head><title>roverlink</title></head>\n<body bgcolor=\"#111111\">\n<center><h1><font color=\"white\">roverlink</font></h1></center>\n<center><img src=\"stream.mjpg\" width=\"640\" height=\"480\"></center>\n</body>\n</html>\n";

/// Stream server configuration
#[derive(Debug, Clone)]
pub struct StreamServerConfig {
    /// Address to bind the HTTP listener to
    pub bind_addr: SocketAddr,
}

impl Default for StreamServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 8000).into(),
        }
    }
}

/// HTTP server turning each stream request into a broadcaster consumer
pub struct StreamServer {
    listener: TcpListener,
    broadcaster: Arc<FrameBroadcaster>,
    local_addr: SocketAddr,
}

impl StreamServer {
    /// Bind the listener; the accept loop starts in [`StreamServer::run`]
    pub async fn bind(
        config: StreamServerConfig,
        broadcaster: Arc<FrameBroadcaster>,
    ) -> Result<Self, VideoError> {
        let listener =
            TcpListener::bind(config.bind_addr)
                .await
                .map_err(|e| VideoError::ServerStart {
                    address: config.bind_addr,
                    source: e,
                })?;
        let local_addr = listener.local_addr()?;
        info!("stream server listening on {}", local_addr);
        Ok(Self {
            listener,
            broadcaster,
            local_addr,
        })
    }

    /// Address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` flips to true.
    ///
    /// In-flight streaming loops observe the same flag, terminate, and
    /// deregister their consumers.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), VideoError> {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("stream server shutting down");
                        return Ok(());
                    }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!("new stream connection from {}", addr);
                            let broadcaster = Arc::clone(&self.broadcaster);
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                handle_connection(broadcaster, stream, addr, shutdown).await;
                            });
                        }
                        Err(e) => {
                            warn!("failed to accept stream connection: {}", e);
                        }
                    }
                }
            }
        }
    }
}

/// Parse the request line and drain headers, returning the request path
async fn read_request_path(stream: &mut BufReader<TcpStream>) -> Option<String> {
    let mut request_line = String::new();
    stream.read_line(&mut request_line).await.ok()?;

    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    if method != "GET" {
        return None;
    }

    // Drain the header block; nothing in it matters for these routes.
    loop {
        let mut line = String::new();
        match stream.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) if line == "\r\n" || line == "\n" => break,
            Ok(_) => continue,
            Err(_) => return None,
        }
    }

    Some(path.to_string())
}

async fn handle_connection(
    broadcaster: Arc<FrameBroadcaster>,
    stream: TcpStream,
    addr: SocketAddr,
    shutdown: watch::Receiver<bool>,
) {
    let mut stream = BufReader::new(stream);

    let path = match read_request_path(&mut stream).await {
        Some(path) => path,
        None => {
            let _ = write_simple(&mut stream, "400 Bad Request", "bad request").await;
            return;
        }
    };

    match path.as_str() {
        "/" | "/index.html" => {
            if let Err(e) = write_page(&mut stream, INDEX_PAGE).await {
                debug!("failed to serve index to {}: {}", addr, e);
            }
        }
        STREAM_PATH => {
            serve_stream(broadcaster, stream, addr, shutdown).await;
        }
        other => {
            debug!("404 for {} from {}", other, addr);
            let _ = write_simple(&mut stream, "404 Not Found", "not found").await;
        }
    }
}

/// Serve the long-lived multipart stream to one client.
///
/// The consumer handle is removed on every exit path: client write
/// failure, server shutdown, or broadcaster refusal to start capture
/// never leak a registration.
async fn serve_stream(
    broadcaster: Arc<FrameBroadcaster>,
    mut stream: BufReader<TcpStream>,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut handle = match broadcaster.add_consumer().await {
        Ok(handle) => handle,
        Err(e) => {
            warn!("capture unavailable for {}: {}", addr, e);
            let _ = write_simple(&mut stream, "503 Service Unavailable", "camera unavailable")
                .await;
            return;
        }
    };
    info!(consumer = %handle.id, "streaming to {}", addr);

    let header = format!(
        "HTTP/1.1 200 OK\r\nAge: 0\r\nCache-Control: no-cache, private\r\nPragma: no-cache\r\nContent-Type: multipart/x-mixed-replace; boundary={}\r\n\r\n",
        BOUNDARY
    );

    if stream.write_all(header.as_bytes()).await.is_ok() {
        loop {
            let frame = tokio::select! {
                frame = broadcaster.wait_for_next_frame(handle.last_seq) => frame,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            if let Err(e) = write_part(&mut stream, &frame).await {
                // Client gone; only this consumer's loop ends.
                debug!(consumer = %handle.id, "removed streaming client {}: {}", addr, e);
                break;
            }
            handle.last_seq = frame.seq;
        }
    }

    broadcaster.remove_consumer(handle).await;
}

/// Write one multipart frame part with its framing headers
async fn write_part(
    stream: &mut BufReader<TcpStream>,
    frame: &Frame,
) -> Result<(), std::io::Error> {
    let part_header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        frame.len()
    );
    stream.write_all(part_header.as_bytes()).await?;
    stream.write_all(&frame.data).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await
}

async fn write_page(
    stream: &mut BufReader<TcpStream>,
    body: &str,
) -> Result<(), std::io::Error> {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

async fn write_simple(
    stream: &mut BufReader<TcpStream>,
    status: &str,
    body: &str,
) -> Result<(), std::io::Error> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}
