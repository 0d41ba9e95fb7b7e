use crate::error::{Result, ServiceError};

use super::codes::{Command, ErrorCode, MessageKind};

/// Frame layout version. Bumped whenever the layout changes.
pub const PROTOCOL_VERSION: i32 = 1;

pub const IDENTITY_LEN: usize = 64;
pub const FILENAME_LEN: usize = 256;
pub const DATA_CAP: usize = 8192;

const HEADER_LEN: usize = 5 * 4;
/// Total size of an encoded frame. Frames are always written and read whole.
pub const FRAME_LEN: usize = HEADER_LEN + IDENTITY_LEN + FILENAME_LEN + DATA_CAP;

/// The single message shape exchanged between all node roles.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: MessageKind,
    pub command: Command,
    pub error: ErrorCode,
    pub identity: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl Frame {
    /// A client command frame.
    pub fn command(command: Command, identity: &str, filename: &str, data: &str) -> Frame {
        Frame {
            kind: MessageKind::Command,
            command,
            error: ErrorCode::Success,
            identity: identity.to_string(),
            filename: filename.to_string(),
            data: data.as_bytes().to_vec(),
        }
    }

    /// A node-to-node control frame.
    pub fn node_command(command: Command, identity: &str, filename: &str, data: &str) -> Frame {
        Frame {
            kind: MessageKind::NodeCommand,
            ..Frame::command(command, identity, filename, data)
        }
    }

    pub fn response(error: ErrorCode, data: &str) -> Frame {
        Frame {
            kind: MessageKind::Response,
            command: Command::None,
            error,
            identity: String::new(),
            filename: String::new(),
            data: data.as_bytes().to_vec(),
        }
    }

    pub fn ack(data: &str) -> Frame {
        Frame {
            kind: MessageKind::Ack,
            ..Frame::response(ErrorCode::Success, data)
        }
    }

    pub fn heartbeat(node_id: &str) -> Frame {
        Frame {
            kind: MessageKind::Heartbeat,
            command: Command::None,
            error: ErrorCode::Success,
            identity: String::new(),
            filename: String::new(),
            data: node_id.as_bytes().to_vec(),
        }
    }

    /// The payload interpreted as text. Sub-fields are `|`-delimited.
    pub fn data_str(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.identity.len() >= IDENTITY_LEN {
            return Err(ServiceError::InvalidParameters(format!(
                "identity exceeds {} bytes",
                IDENTITY_LEN - 1
            )));
        }
        if self.filename.len() >= FILENAME_LEN {
            return Err(ServiceError::InvalidParameters(format!(
                "filename exceeds {} bytes",
                FILENAME_LEN - 1
            )));
        }
        if self.data.len() > DATA_CAP {
            return Err(ServiceError::InvalidParameters(format!(
                "payload exceeds {} bytes",
                DATA_CAP
            )));
        }

        let mut buf = vec![0u8; FRAME_LEN];
        buf[0..4].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        buf[4..8].copy_from_slice(&(self.kind as i32).to_be_bytes());
        buf[8..12].copy_from_slice(&(self.command as i32).to_be_bytes());
        buf[12..16].copy_from_slice(&(self.error as i32).to_be_bytes());
        buf[16..20].copy_from_slice(&(self.data.len() as i32).to_be_bytes());

        let identity_at = HEADER_LEN;
        buf[identity_at..identity_at + self.identity.len()]
            .copy_from_slice(self.identity.as_bytes());

        let filename_at = HEADER_LEN + IDENTITY_LEN;
        buf[filename_at..filename_at + self.filename.len()]
            .copy_from_slice(self.filename.as_bytes());

        let data_at = HEADER_LEN + IDENTITY_LEN + FILENAME_LEN;
        buf[data_at..data_at + self.data.len()].copy_from_slice(&self.data);

        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Frame> {
        if buf.len() != FRAME_LEN {
            return Err(ServiceError::InvalidParameters(format!(
                "frame is {} bytes, expected {}",
                buf.len(),
                FRAME_LEN
            )));
        }

        let version = read_i32(buf, 0);
        if version != PROTOCOL_VERSION {
            return Err(ServiceError::InvalidParameters(format!(
                "unsupported protocol version {}",
                version
            )));
        }

        let kind = MessageKind::from_i32(read_i32(buf, 4))?;
        let command = Command::from_i32(read_i32(buf, 8))?;
        let error = ErrorCode::from_i32(read_i32(buf, 12))?;

        let data_len = read_i32(buf, 16);
        if data_len < 0 || data_len as usize > DATA_CAP {
            return Err(ServiceError::InvalidParameters(format!(
                "payload length {} out of range",
                data_len
            )));
        }

        let identity = read_padded_str(buf, HEADER_LEN, IDENTITY_LEN)?;
        let filename = read_padded_str(buf, HEADER_LEN + IDENTITY_LEN, FILENAME_LEN)?;

        let data_at = HEADER_LEN + IDENTITY_LEN + FILENAME_LEN;
        let data = buf[data_at..data_at + data_len as usize].to_vec();

        Ok(Frame {
            kind,
            command,
            error,
            identity,
            filename,
            data,
        })
    }
}

fn read_i32(buf: &[u8], at: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    i32::from_be_bytes(raw)
}

fn read_padded_str(buf: &[u8], at: usize, len: usize) -> Result<String> {
    let field = &buf[at..at + len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(len);
    std::str::from_utf8(&field[..end])
        .map(|s| s.to_string())
        .map_err(|_| ServiceError::InvalidParameters("string field is not UTF-8".to_string()))
}
