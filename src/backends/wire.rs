//! Wire protocol for the network backends
//!
//! Framing: `[u32 length][u8 level][u32 domain_len][domain bytes][message
//! bytes]`, little-endian, `length` covering everything after the length
//! field itself. Authentication is a single key exchange at connection
//! setup (`[u32 key_len][key bytes]`, answered by one ACK byte); the
//! connection is trusted for its lifetime.

use crate::core::error::{LoggingError, Result};
use crate::core::level::LogLevel;
use rand::RngCore;
use std::io::{self, Read, Write};

/// Upper bound on one frame's payload; connections exceeding it are
/// considered garbage and dropped.
pub(crate) const MAX_FRAME_LEN: u32 = 1024 * 1024;
pub(crate) const MAX_KEY_LEN: u32 = 64;
pub(crate) const HANDSHAKE_ACK: u8 = 0x06;

const AUTH_KEY_LEN: usize = 32;

/// Symmetric secret shared between a server backend and its clients.
///
/// Generated by a server backend at creation time unless one is supplied;
/// retrieve it via `Logging::server_auth_key` and hand it to clients
/// out-of-band.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey(Vec<u8>);

impl AuthKey {
    /// Generate a fresh random 32-byte key.
    pub fn generate() -> Self {
        let mut key = vec![0u8; AUTH_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        write!(f, "AuthKey({} bytes)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WireRecord {
    pub level: LogLevel,
    pub domain: String,
    pub message: String,
}

pub(crate) fn write_frame(
    writer: &mut impl Write,
    level: LogLevel,
    domain: &str,
    message: &str,
) -> io::Result<()> {
    let length = 1 + 4 + domain.len() + message.len();
    if length as u64 > MAX_FRAME_LEN as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "log frame exceeds maximum length",
        ));
    }
    writer.write_all(&(length as u32).to_le_bytes())?;
    writer.write_all(&[level as u8])?;
    writer.write_all(&(domain.len() as u32).to_le_bytes())?;
    writer.write_all(domain.as_bytes())?;
    writer.write_all(message.as_bytes())?;
    Ok(())
}

pub(crate) fn read_frame(reader: &mut impl Read) -> io::Result<WireRecord> {
    let mut length_buf = [0u8; 4];
    reader.read_exact(&mut length_buf)?;
    let length = u32::from_le_bytes(length_buf);
    if !(5..=MAX_FRAME_LEN).contains(&length) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid frame length {length}"),
        ));
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;

    let level = LogLevel::from_u8(payload[0])
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "invalid level byte"))?;
    let domain_len = u32::from_le_bytes(
        payload[1..5]
            .try_into()
            .expect("slice is exactly four bytes"),
    ) as usize;
    if 5 + domain_len > payload.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "domain length exceeds frame",
        ));
    }

    let domain = String::from_utf8(payload[5..5 + domain_len].to_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let message = String::from_utf8(payload[5 + domain_len..].to_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    Ok(WireRecord {
        level,
        domain,
        message,
    })
}

/// Client side of the handshake: present the key, wait for the ACK.
pub(crate) fn send_handshake(stream: &mut (impl Read + Write), key: &AuthKey) -> Result<()> {
    stream.write_all(&(key.as_bytes().len() as u32).to_le_bytes())?;
    stream.write_all(key.as_bytes())?;
    stream.flush()?;

    let mut ack = [0u8; 1];
    stream
        .read_exact(&mut ack)
        .map_err(|_| LoggingError::Auth("server rejected the auth key".to_string()))?;
    if ack[0] != HANDSHAKE_ACK {
        return Err(LoggingError::Auth(
            "server sent an invalid handshake acknowledgment".to_string(),
        ));
    }
    Ok(())
}

/// Server side of the handshake: read the presented key and compare it.
/// Returns `Auth` on mismatch; the caller drops the connection before any
/// record is read.
pub(crate) fn check_handshake(stream: &mut (impl Read + Write), expected: &AuthKey) -> Result<()> {
    let mut length_buf = [0u8; 4];
    stream.read_exact(&mut length_buf)?;
    let length = u32::from_le_bytes(length_buf);
    if length == 0 || length > MAX_KEY_LEN {
        return Err(LoggingError::Auth(format!(
            "invalid auth key length {length}"
        )));
    }

    let mut presented = vec![0u8; length as usize];
    stream.read_exact(&mut presented)?;
    if presented != expected.as_bytes() {
        return Err(LoggingError::Auth("auth key mismatch".to_string()));
    }

    stream.write_all(&[HANDSHAKE_ACK])?;
    stream.flush()?;
    Ok(())
}
