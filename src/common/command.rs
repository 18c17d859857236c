// src/common/command.rs

//! ESP8266 AT command definitions.
//!
//! Only the commands needed to join a network and push one HTTP update over a
//! multiplexed TCP link are modelled.

use core::fmt::{self, Write};

use arrayvec::ArrayString;

/// Capacity for a single formatted command line, terminator included.
pub const COMMAND_CAPACITY: usize = 128;
/// Capacity for the raw HTTP request written after `AT+CIPSEND`.
pub const PAYLOAD_CAPACITY: usize = 200;

pub type CommandBuffer = ArrayString<COMMAND_CAPACITY>;
pub type PayloadBuffer = ArrayString<PAYLOAD_CAPACITY>;

/// A formatted value did not fit its fixed-capacity buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("formatted command exceeds buffer capacity")]
pub struct CommandFormatError;

/// Represents an AT command sent to the modem.
///
/// The `Display` implementation produces the command line without the
/// trailing `\r\n`; use [`AtCommand::format_into`] for the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand<'a> {
    /// `AT` - liveness check.
    Attention,
    /// `AT+CWMODE=1` - station mode.
    StationMode,
    /// `AT+CWJAP="ssid","password"` - join an access point.
    JoinAccessPoint { ssid: &'a str, password: &'a str },
    /// `AT+CIPMUX=1` - allow multiple connections.
    EnableMultiplex,
    /// `AT+CIPSTART=<id>,"TCP","<host>",<port>` - open a TCP link.
    OpenTcp { link_id: u8, host: &'a str, port: u16 },
    /// `AT+CIPSEND=<id>,<len>` - announce `len` raw bytes; the modem answers `>`.
    SendReady { link_id: u8, len: usize },
    /// `AT+CIPCLOSE=<id>` - close a link.
    Close { link_id: u8 },
}

impl fmt::Display for AtCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Attention => f.write_str("AT"),
            AtCommand::StationMode => f.write_str("AT+CWMODE=1"),
            AtCommand::JoinAccessPoint { ssid, password } => {
                write!(f, "AT+CWJAP=\"{}\",\"{}\"", ssid, password)
            }
            AtCommand::EnableMultiplex => f.write_str("AT+CIPMUX=1"),
            AtCommand::OpenTcp { link_id, host, port } => {
                write!(f, "AT+CIPSTART={},\"TCP\",\"{}\",{}", link_id, host, port)
            }
            AtCommand::SendReady { link_id, len } => write!(f, "AT+CIPSEND={},{}", link_id, len),
            AtCommand::Close { link_id } => write!(f, "AT+CIPCLOSE={}", link_id),
        }
    }
}

impl AtCommand<'_> {
    /// Response substring that signals the modem accepted the command.
    pub const fn expected_response(&self) -> &'static [u8] {
        match self {
            AtCommand::SendReady { .. } => b">",
            _ => b"OK",
        }
    }

    /// Formats the command followed by `\r\n` into a fixed-capacity buffer.
    pub fn format_into(&self) -> Result<CommandBuffer, CommandFormatError> {
        let mut buffer = CommandBuffer::new();
        write!(buffer, "{}\r\n", self).map_err(|_| CommandFormatError)?;
        Ok(buffer)
    }
}

/// HTTP GET that writes one field of a channel.
///
/// Rendered as `GET /update?api_key=<KEY>&field<N>=<VALUE>\r\n\r\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest<'a> {
    pub api_key: &'a str,
    pub field: u8,
    pub value: i32,
}

impl fmt::Display for UpdateRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GET /update?api_key={}&field{}={}\r\n\r\n",
            self.api_key, self.field, self.value
        )
    }
}

impl UpdateRequest<'_> {
    pub fn format_into(&self) -> Result<PayloadBuffer, CommandFormatError> {
        let mut buffer = PayloadBuffer::new();
        write!(buffer, "{}", self).map_err(|_| CommandFormatError)?;
        Ok(buffer)
    }
}
