//! Wire protocol types.
//!
//! Requests and responses are single newline-terminated UTF-8 lines of
//! `|`-separated fields.

use thiserror::Error;

/// Command word every payment request starts with.
pub const PAYMENT_COMMAND: &str = "PAYMENT";

/// Field separator on the wire.
pub const FIELD_SEPARATOR: char = '|';

pub const RESPONSE_ACCEPTED: &str = "RESPONSE|ACCEPTED|Transaction processed";
pub const RESPONSE_INVALID_REQUEST: &str = "RESPONSE|REJECTED|Invalid request";
pub const RESPONSE_INVALID_AMOUNT: &str = "RESPONSE|REJECTED|Invalid amount";
pub const RESPONSE_CANCELLED: &str = "RESPONSE|REJECTED|Cancelled";

/// Every response the gateway can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Response {
    /// The payment was processed.
    Accepted,
    /// Wrong field count or wrong command word.
    InvalidRequest,
    /// The amount is not a non-negative integer.
    InvalidAmount,
    /// The grace period ran out before a response was produced.
    Cancelled,
}

impl Response {
    /// The exact line written to the socket (without the trailing newline).
    pub fn as_line(&self) -> &'static str {
        match self {
            Response::Accepted => RESPONSE_ACCEPTED,
            Response::InvalidRequest => RESPONSE_INVALID_REQUEST,
            Response::InvalidAmount => RESPONSE_INVALID_AMOUNT,
            Response::Cancelled => RESPONSE_CANCELLED,
        }
    }

    /// Parse a response line received from the gateway.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim_end_matches(['\r', '\n']) {
            RESPONSE_ACCEPTED => Some(Response::Accepted),
            RESPONSE_INVALID_REQUEST => Some(Response::InvalidRequest),
            RESPONSE_INVALID_AMOUNT => Some(Response::InvalidAmount),
            RESPONSE_CANCELLED => Some(Response::Cancelled),
            _ => None,
        }
    }

    /// Short label used for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Response::Accepted => "accepted",
            Response::InvalidRequest => "invalid_request",
            Response::InvalidAmount => "invalid_amount",
            Response::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_line())
    }
}

/// Why a request line could not be turned into a [`PaymentRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed request")]
    InvalidRequest,
    #[error("amount is not a non-negative integer")]
    InvalidAmount,
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidRequest => Response::InvalidRequest,
            ProtocolError::InvalidAmount => Response::InvalidAmount,
        }
    }
}

/// A validated `PAYMENT|<amount>` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: u64,
}

impl PaymentRequest {
    /// Parse a request line. A single trailing `\r` or `\n` is tolerated.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut parts = line.split(FIELD_SEPARATOR);
        let (command, amount) = match (parts.next(), parts.next(), parts.next()) {
            (Some(command), Some(amount), None) => (command, amount),
            _ => return Err(ProtocolError::InvalidRequest),
        };
        if command != PAYMENT_COMMAND {
            return Err(ProtocolError::InvalidRequest);
        }

        // u64::from_str would also take a leading '+'
        if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::InvalidAmount);
        }
        let amount = amount.parse().map_err(|_| ProtocolError::InvalidAmount)?;

        Ok(Self { amount })
    }

    /// Format the request as it goes on the wire, without the newline.
    pub fn to_line(&self) -> String {
        format!("{}{}{}", PAYMENT_COMMAND, FIELD_SEPARATOR, self.amount)
    }
}
