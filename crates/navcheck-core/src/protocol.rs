//! Binary wire protocol spoken with the on-device automation agent.
//!
//! # Packet Structure (Little Endian)
//!
//! ```text
//! [Header: 4 bytes LE u32 len] [OpCode: 1 byte] [Payload: variable]
//! ```
//!
//! The `len` field encodes the total length of the opcode + payload (NOT including
//! the 4-byte header itself).
//!
//! # Field Encoding
//!
//! - Strings are length-prefixed: a `u32` LE byte count followed by UTF-8 bytes.
//! - Booleans are a single `u8` (`0` = false).
//! - Coordinates are `i32` LE, durations, intervals and speeds are `f64` LE.
//!
//! Besides UI interaction, the agent exposes the app's positioning manager so
//! that a simulated route can be slowed down or sped up while a test drives it.
//!
//! # Example
//!
//! ```
//! use navcheck_core::protocol::{Request, encode_request, decode_request};
//!
//! let req = Request::ConfigurePositionSource { update_interval: 2.0, movement_speed: 15.0 };
//! let wire = encode_request(&req);
//!
//! // Skip the 4-byte length header to decode
//! let decoded = decode_request(&wire[4..]).unwrap();
//! assert_eq!(decoded, req);
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during protocol encoding or decoding.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The opcode byte does not correspond to any known operation.
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpCode(u8),

    /// The buffer does not contain enough bytes for the expected data.
    #[error("insufficient data in buffer")]
    InsufficientData,

    /// A string field contains invalid UTF-8.
    #[error("invalid UTF-8 in string field")]
    Utf8Error,

    /// The payload structure is invalid for the given opcode.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

// ---------------------------------------------------------------------------
// OpCode
// ---------------------------------------------------------------------------

/// On-the-wire operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Keep-alive ping (no payload).
    Heartbeat = 0x01,
    /// Tap at absolute coordinates (i32 x, i32 y).
    TapCoord = 0x02,
    /// Tap element by accessibility label (string).
    TapByLabel = 0x04,
    /// Long press at coordinates (i32 x, i32 y, f64 duration).
    LongPress = 0x09,
    /// Full accessibility tree dump (no payload).
    DumpTree = 0x10,
    /// Screenshot capture (no payload).
    Screenshot = 0x11,
    /// Dismiss the alert controller presenting the identified view, without animation.
    DismissAlert = 0x20,
    /// Toggle the agent's wait-for-idle synchronization (bool).
    SetSynchronization = 0x21,
    /// Describe the positioning manager's current data source (no payload).
    GetPositionSource = 0x22,
    /// Reconfigure the route simulation source (f64 update interval, f64 speed).
    ConfigurePositionSource = 0x23,
    /// Stop the positioning manager (no payload).
    StopPositioning = 0x24,
    /// Start the positioning manager (no payload).
    StartPositioning = 0x25,
    /// Error message from the agent (string).
    Error = 0x99,
    /// Generic response (response-type byte + variable data).
    Response = 0xA0,
}

impl OpCode {
    /// Try to convert a raw byte into an `OpCode`.
    pub fn from_u8(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x01 => Ok(OpCode::Heartbeat),
            0x02 => Ok(OpCode::TapCoord),
            0x04 => Ok(OpCode::TapByLabel),
            0x09 => Ok(OpCode::LongPress),
            0x10 => Ok(OpCode::DumpTree),
            0x11 => Ok(OpCode::Screenshot),
            0x20 => Ok(OpCode::DismissAlert),
            0x21 => Ok(OpCode::SetSynchronization),
            0x22 => Ok(OpCode::GetPositionSource),
            0x23 => Ok(OpCode::ConfigurePositionSource),
            0x24 => Ok(OpCode::StopPositioning),
            0x25 => Ok(OpCode::StartPositioning),
            0x99 => Ok(OpCode::Error),
            0xA0 => Ok(OpCode::Response),
            other => Err(ProtocolError::InvalidOpCode(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response enums
// ---------------------------------------------------------------------------

/// A typed request from the host to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Heartbeat,
    TapCoord { x: i32, y: i32 },
    TapByLabel { label: String },
    LongPress { x: i32, y: i32, duration: f64 },
    DumpTree,
    Screenshot,
    DismissAlert { selector: String },
    SetSynchronization { enabled: bool },
    GetPositionSource,
    ConfigurePositionSource { update_interval: f64, movement_speed: f64 },
    StopPositioning,
    StartPositioning,
}

impl Request {
    /// Returns a short, static name for this request type suitable for use in
    /// tracing span metadata.
    pub fn opcode_name(&self) -> &'static str {
        match self {
            Request::Heartbeat => "heartbeat",
            Request::TapCoord { .. } => "tap_coord",
            Request::TapByLabel { .. } => "tap_by_label",
            Request::LongPress { .. } => "long_press",
            Request::DumpTree => "dump_tree",
            Request::Screenshot => "screenshot",
            Request::DismissAlert { .. } => "dismiss_alert",
            Request::SetSynchronization { .. } => "set_synchronization",
            Request::GetPositionSource => "get_position_source",
            Request::ConfigurePositionSource { .. } => "configure_position_source",
            Request::StopPositioning => "stop_positioning",
            Request::StartPositioning => "start_positioning",
        }
    }
}

/// Response sub-type byte used inside the `Response` opcode payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ResponseType {
    Ok = 0x00,
    Error = 0x01,
    Tree = 0x02,
    Screenshot = 0x03,
    PositionSource = 0x06,
}

impl ResponseType {
    fn from_u8(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x00 => Ok(ResponseType::Ok),
            0x01 => Ok(ResponseType::Error),
            0x02 => Ok(ResponseType::Tree),
            0x03 => Ok(ResponseType::Screenshot),
            0x06 => Ok(ResponseType::PositionSource),
            other => Err(ProtocolError::InvalidPayload(format!(
                "unknown response type: 0x{other:02X}"
            ))),
        }
    }
}

/// A typed response from the agent to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The operation completed successfully with no additional data.
    Ok,
    /// The operation failed.
    Error { message: String },
    /// A JSON-encoded accessibility tree.
    Tree { json: String },
    /// Raw screenshot image bytes (PNG).
    Screenshot { data: Vec<u8> },
    /// A JSON-encoded description of the positioning data source.
    PositionSource { json: String },
}

impl Response {
    /// Short name of the response type, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Response::Ok => "ok",
            Response::Error { .. } => "error",
            Response::Tree { .. } => "tree",
            Response::Screenshot { .. } => "screenshot",
            Response::PositionSource { .. } => "position_source",
        }
    }
}

// ---------------------------------------------------------------------------
// Low-level payload helpers
// ---------------------------------------------------------------------------

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_bytes(buf, s.as_bytes());
}

fn write_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
}

fn write_bool(buf: &mut Vec<u8>, v: bool) {
    buf.push(if v { 1u8 } else { 0u8 });
}

/// A cursor over a byte slice for sequential reads.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        if self.remaining() < N {
            return Err(ProtocolError::InsufficientData);
        }
        let bytes: [u8; N] = self.data[self.pos..self.pos + N]
            .try_into()
            .map_err(|_| ProtocolError::InsufficientData)?;
        self.pos += N;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take::<1>()?[0])
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn read_f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_u32()? as usize;
        if self.remaining() < len {
            return Err(ProtocolError::InsufficientData);
        }
        let v = self.data[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(v)
    }

    fn read_string(&mut self) -> Result<String, ProtocolError> {
        String::from_utf8(self.read_bytes()?).map_err(|_| ProtocolError::Utf8Error)
    }
}

// ---------------------------------------------------------------------------
// Frame helpers
// ---------------------------------------------------------------------------

/// Wrap a payload (opcode + data) with the 4-byte LE length header.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Read the payload length from a 4-byte LE header.
pub fn read_frame_length(header: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*header)
}

// ---------------------------------------------------------------------------
// Encode / decode request
// ---------------------------------------------------------------------------

/// Encode a [`Request`] into wire format including the 4-byte length header.
pub fn encode_request(req: &Request) -> Vec<u8> {
    let mut payload = Vec::new();
    match req {
        Request::Heartbeat => payload.push(OpCode::Heartbeat as u8),
        Request::TapCoord { x, y } => {
            payload.push(OpCode::TapCoord as u8);
            payload.extend_from_slice(&x.to_le_bytes());
            payload.extend_from_slice(&y.to_le_bytes());
        }
        Request::TapByLabel { label } => {
            payload.push(OpCode::TapByLabel as u8);
            write_string(&mut payload, label);
        }
        Request::LongPress { x, y, duration } => {
            payload.push(OpCode::LongPress as u8);
            payload.extend_from_slice(&x.to_le_bytes());
            payload.extend_from_slice(&y.to_le_bytes());
            payload.extend_from_slice(&duration.to_le_bytes());
        }
        Request::DumpTree => payload.push(OpCode::DumpTree as u8),
        Request::Screenshot => payload.push(OpCode::Screenshot as u8),
        Request::DismissAlert { selector } => {
            payload.push(OpCode::DismissAlert as u8);
            write_string(&mut payload, selector);
        }
        Request::SetSynchronization { enabled } => {
            payload.push(OpCode::SetSynchronization as u8);
            write_bool(&mut payload, *enabled);
        }
        Request::GetPositionSource => payload.push(OpCode::GetPositionSource as u8),
        Request::ConfigurePositionSource {
            update_interval,
            movement_speed,
        } => {
            payload.push(OpCode::ConfigurePositionSource as u8);
            payload.extend_from_slice(&update_interval.to_le_bytes());
            payload.extend_from_slice(&movement_speed.to_le_bytes());
        }
        Request::StopPositioning => payload.push(OpCode::StopPositioning as u8),
        Request::StartPositioning => payload.push(OpCode::StartPositioning as u8),
    }
    encode_frame(&payload)
}

/// Decode wire bytes (opcode + payload, **after** the 4-byte length header) into
/// a [`Request`].
pub fn decode_request(data: &[u8]) -> Result<Request, ProtocolError> {
    let mut cur = Cursor::new(data);
    let opcode = OpCode::from_u8(cur.read_u8()?)?;
    match opcode {
        OpCode::Heartbeat => Ok(Request::Heartbeat),
        OpCode::TapCoord => {
            let x = cur.read_i32()?;
            let y = cur.read_i32()?;
            Ok(Request::TapCoord { x, y })
        }
        OpCode::TapByLabel => Ok(Request::TapByLabel {
            label: cur.read_string()?,
        }),
        OpCode::LongPress => {
            let x = cur.read_i32()?;
            let y = cur.read_i32()?;
            let duration = cur.read_f64()?;
            Ok(Request::LongPress { x, y, duration })
        }
        OpCode::DumpTree => Ok(Request::DumpTree),
        OpCode::Screenshot => Ok(Request::Screenshot),
        OpCode::DismissAlert => Ok(Request::DismissAlert {
            selector: cur.read_string()?,
        }),
        OpCode::SetSynchronization => Ok(Request::SetSynchronization {
            enabled: cur.read_bool()?,
        }),
        OpCode::GetPositionSource => Ok(Request::GetPositionSource),
        OpCode::ConfigurePositionSource => {
            let update_interval = cur.read_f64()?;
            let movement_speed = cur.read_f64()?;
            Ok(Request::ConfigurePositionSource {
                update_interval,
                movement_speed,
            })
        }
        OpCode::StopPositioning => Ok(Request::StopPositioning),
        OpCode::StartPositioning => Ok(Request::StartPositioning),
        OpCode::Error | OpCode::Response => Err(ProtocolError::InvalidPayload(format!(
            "opcode 0x{:02X} is not a valid request opcode",
            opcode as u8
        ))),
    }
}

// ---------------------------------------------------------------------------
// Encode / decode response
// ---------------------------------------------------------------------------

/// Encode a [`Response`] into wire format including the 4-byte length header.
pub fn encode_response(resp: &Response) -> Vec<u8> {
    let mut payload = vec![OpCode::Response as u8];
    match resp {
        Response::Ok => payload.push(ResponseType::Ok as u8),
        Response::Error { message } => {
            payload.push(ResponseType::Error as u8);
            write_string(&mut payload, message);
        }
        Response::Tree { json } => {
            payload.push(ResponseType::Tree as u8);
            write_string(&mut payload, json);
        }
        Response::Screenshot { data } => {
            payload.push(ResponseType::Screenshot as u8);
            write_bytes(&mut payload, data);
        }
        Response::PositionSource { json } => {
            payload.push(ResponseType::PositionSource as u8);
            write_string(&mut payload, json);
        }
    }
    encode_frame(&payload)
}

/// Decode wire bytes (opcode + payload, **after** the 4-byte length header) into
/// a [`Response`].
///
/// Accepts both the `Response` opcode (`0xA0`) and a bare `Error` opcode
/// (`0x99`) followed by a message string.
pub fn decode_response(data: &[u8]) -> Result<Response, ProtocolError> {
    let mut cur = Cursor::new(data);
    let opcode = OpCode::from_u8(cur.read_u8()?)?;
    match opcode {
        OpCode::Response => match ResponseType::from_u8(cur.read_u8()?)? {
            ResponseType::Ok => Ok(Response::Ok),
            ResponseType::Error => Ok(Response::Error {
                message: cur.read_string()?,
            }),
            ResponseType::Tree => Ok(Response::Tree {
                json: cur.read_string()?,
            }),
            ResponseType::Screenshot => Ok(Response::Screenshot {
                data: cur.read_bytes()?,
            }),
            ResponseType::PositionSource => Ok(Response::PositionSource {
                json: cur.read_string()?,
            }),
        },
        OpCode::Error => Ok(Response::Error {
            message: cur.read_string()?,
        }),
        other => Err(ProtocolError::InvalidPayload(format!(
            "opcode 0x{:02X} is not a valid response opcode",
            other as u8
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
