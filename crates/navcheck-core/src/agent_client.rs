//! TCP connection to the on-device automation agent.
//!
//! [`AgentClient`] owns the socket and exposes one method per agent command.
//! Each method sends a single framed [`Request`] and checks that the agent
//! answered with the [`Response`] variant that command produces. Tree and
//! position-source payloads come back as raw JSON; decoding them into model
//! types is left to [`AgentDriver`](crate::agent_driver::AgentDriver).
//!
//! # Example
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use navcheck_core::agent_client::AgentClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let addr: SocketAddr = "127.0.0.1:9800".parse()?;
//! let mut client = AgentClient::new(addr);
//!
//! client.connect().await?;
//! client.heartbeat().await?;
//! client.set_synchronization(false).await?;
//! let source_json = client.position_source().await?;
//! println!("{source_json}");
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, debug_span, trace, Instrument};

use crate::protocol::{
    decode_response, encode_request, read_frame_length, ProtocolError, Request, Response,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on one request/response exchange. Tree dumps of the guidance
/// screen during a running simulation are the slowest replies.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while talking to the agent.
#[derive(Error, Debug)]
pub enum AgentClientError {
    #[error("not connected to agent")]
    NotConnected,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The agent reported that the command failed.
    #[error("agent error: {0}")]
    AgentError(String),

    /// The agent answered with a response type the command never produces.
    #[error("unexpected {response} response to {request}")]
    UnexpectedResponse {
        request: &'static str,
        response: &'static str,
    },

    #[error("operation timed out")]
    Timeout,
}

/// Client for a single agent connection.
///
/// Requests are strictly sequential. Any I/O failure or timeout drops the
/// socket, since a late reply would be read as the answer to the next
/// request; [`is_connected`](Self::is_connected) then reports `false`.
pub struct AgentClient {
    addr: SocketAddr,
    stream: Option<TcpStream>,
}

impl AgentClient {
    /// Creates a client for `addr`. Nothing is dialed until
    /// [`connect`](Self::connect).
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, stream: None }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn connect(&mut self) -> Result<(), AgentClientError> {
        let addr = self.addr;
        debug!(%addr, "connecting to agent");
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| AgentClientError::Timeout)?
            .map_err(|e| AgentClientError::ConnectionFailed(e.to_string()))?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.stream = None;
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Sends `request` and returns the agent's reply.
    ///
    /// A [`Response::Error`] is turned into [`AgentClientError::AgentError`].
    pub async fn send(&mut self, request: &Request) -> Result<Response, AgentClientError> {
        let span = debug_span!("agent_request", opcode = request.opcode_name());
        async {
            let stream = self.stream.as_mut().ok_or(AgentClientError::NotConnected)?;
            let exchanged = timeout(REQUEST_TIMEOUT, exchange(stream, &encode_request(request))).await;
            let payload = match exchanged {
                Ok(Ok(payload)) => payload,
                Ok(Err(e)) => {
                    self.stream = None;
                    return Err(AgentClientError::Io(e));
                }
                Err(_) => {
                    self.stream = None;
                    return Err(AgentClientError::Timeout);
                }
            };
            match decode_response(&payload)? {
                Response::Error { message } => Err(AgentClientError::AgentError(message)),
                other => Ok(other),
            }
        }
        .instrument(span)
        .await
    }

    pub async fn heartbeat(&mut self) -> Result<(), AgentClientError> {
        self.command(Request::Heartbeat).await
    }

    pub async fn tap(&mut self, x: i32, y: i32) -> Result<(), AgentClientError> {
        self.command(Request::TapCoord { x, y }).await
    }

    pub async fn tap_by_label(&mut self, label: &str) -> Result<(), AgentClientError> {
        self.command(Request::TapByLabel {
            label: label.to_string(),
        })
        .await
    }

    pub async fn long_press(&mut self, x: i32, y: i32, duration: f64) -> Result<(), AgentClientError> {
        self.command(Request::LongPress { x, y, duration }).await
    }

    /// Returns the accessibility tree of the current screen as JSON.
    pub async fn dump_tree(&mut self) -> Result<String, AgentClientError> {
        let request = Request::DumpTree;
        match self.send(&request).await? {
            Response::Tree { json } => Ok(json),
            other => Err(unexpected(&request, &other)),
        }
    }

    /// Returns a PNG screenshot of the device screen.
    pub async fn screenshot(&mut self) -> Result<Vec<u8>, AgentClientError> {
        let request = Request::Screenshot;
        match self.send(&request).await? {
            Response::Screenshot { data } => Ok(data),
            other => Err(unexpected(&request, &other)),
        }
    }

    pub async fn dismiss_alert(&mut self, selector: &str) -> Result<(), AgentClientError> {
        self.command(Request::DismissAlert {
            selector: selector.to_string(),
        })
        .await
    }

    pub async fn set_synchronization(&mut self, enabled: bool) -> Result<(), AgentClientError> {
        self.command(Request::SetSynchronization { enabled }).await
    }

    /// Returns the positioning manager's data source description as JSON.
    pub async fn position_source(&mut self) -> Result<String, AgentClientError> {
        let request = Request::GetPositionSource;
        match self.send(&request).await? {
            Response::PositionSource { json } => Ok(json),
            other => Err(unexpected(&request, &other)),
        }
    }

    pub async fn configure_position_source(
        &mut self,
        update_interval: f64,
        movement_speed: f64,
    ) -> Result<(), AgentClientError> {
        self.command(Request::ConfigurePositionSource {
            update_interval,
            movement_speed,
        })
        .await
    }

    pub async fn stop_positioning(&mut self) -> Result<(), AgentClientError> {
        self.command(Request::StopPositioning).await
    }

    pub async fn start_positioning(&mut self) -> Result<(), AgentClientError> {
        self.command(Request::StartPositioning).await
    }

    /// Sends a request that is answered with a bare `Ok`.
    async fn command(&mut self, request: Request) -> Result<(), AgentClientError> {
        match self.send(&request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(&request, &other)),
        }
    }
}

/// Writes one request frame and reads back one response payload.
async fn exchange(stream: &mut TcpStream, frame: &[u8]) -> std::io::Result<Vec<u8>> {
    stream.write_all(frame).await?;
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let mut payload = vec![0u8; read_frame_length(&header) as usize];
    stream.read_exact(&mut payload).await?;
    trace!(request_bytes = frame.len(), response_bytes = payload.len(), "exchanged frames");
    Ok(payload)
}

fn unexpected(request: &Request, response: &Response) -> AgentClientError {
    AgentClientError::UnexpectedResponse {
        request: request.opcode_name(),
        response: response.kind_name(),
    }
}
