//! Pipe-delimited kiosk wire format.
//!
//! ```text
//! pcName|member|__HEARTBEAT__
//! pcName|member|__LOGOUT_CLEAN__
//! pcName|member|__PAYMENT__|senderName|amount|method
//! pcName|member|<free-form chat text>
//! OPERATOR|<label>|<free-form chat text>        (operator -> client)
//! ```
//!
//! The delimiter is not escaped. Chat text may itself contain `|` (the
//! remaining fields are re-joined), but text that starts with a reserved
//! token is indistinguishable from that frame type.
//!
//! Framing is one frame per socket write, not per line: chat text may span
//! several lines and keeps its internal line breaks.

pub const FIELD_DELIMITER: char = '|';
pub const HEARTBEAT: &str = "__HEARTBEAT__";
pub const LOGOUT_CLEAN: &str = "__LOGOUT_CLEAN__";
pub const PAYMENT: &str = "__PAYMENT__";

/// First field of every operator -> client frame.
pub const OPERATOR_ORIGIN: &str = "OPERATOR";
/// Sender label of a direct reply.
pub const REPLY_LABEL: &str = "Admin";
/// Sender label of a broadcast.
pub const BROADCAST_LABEL: &str = "Broadcast";

/// Decoded client -> operator frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pc_name: String,
    pub member: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Heartbeat,
    CleanLogout,
    Payment {
        sender_name: String,
        amount: String,
        method: String,
    },
    Chat {
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than three fields
    MissingFields,
    /// One of the three header fields is empty
    EmptyField(&'static str),
    /// `__PAYMENT__` without sender, amount and method
    IncompletePayment,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MissingFields => write!(f, "frame has fewer than 3 fields"),
            DecodeError::EmptyField(name) => write!(f, "frame field `{}` is empty", name),
            DecodeError::IncompletePayment => write!(f, "payment frame is missing fields"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode one inbound frame. Only surrounding whitespace is ignored.
pub fn decode(raw: &str) -> Result<Frame, DecodeError> {
    let mut fields = raw.trim().splitn(3, FIELD_DELIMITER);
    let (Some(pc_name), Some(member), Some(body)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(DecodeError::MissingFields);
    };
    if pc_name.is_empty() {
        return Err(DecodeError::EmptyField("pcName"));
    }
    if member.is_empty() {
        return Err(DecodeError::EmptyField("member"));
    }

    let kind = body.split(FIELD_DELIMITER).next().unwrap_or_default();
    let payload = match kind {
        "" => return Err(DecodeError::EmptyField("type")),
        HEARTBEAT => Payload::Heartbeat,
        LOGOUT_CLEAN => Payload::CleanLogout,
        PAYMENT => {
            let mut rest = body.split(FIELD_DELIMITER).skip(1);
            match (rest.next(), rest.next(), rest.next()) {
                (Some(sender_name), Some(amount), Some(method)) => Payload::Payment {
                    sender_name: sender_name.to_string(),
                    amount: amount.to_string(),
                    method: method.to_string(),
                },
                _ => return Err(DecodeError::IncompletePayment),
            }
        }
        _ => Payload::Chat {
            text: body.to_string(),
        },
    };

    Ok(Frame {
        pc_name: pc_name.to_string(),
        member: member.to_string(),
        payload,
    })
}

/// Encode a client -> operator frame (what kiosks send).
pub fn encode(frame: &Frame) -> String {
    let body = match &frame.payload {
        Payload::Heartbeat => HEARTBEAT.to_string(),
        Payload::CleanLogout => LOGOUT_CLEAN.to_string(),
        Payload::Payment {
            sender_name,
            amount,
            method,
        } => format!("{PAYMENT}|{sender_name}|{amount}|{method}"),
        Payload::Chat { text } => text.clone(),
    };
    format!("{}|{}|{}", frame.pc_name, frame.member, body)
}

/// Encode an operator -> client frame.
pub fn encode_operator(label: &str, text: &str) -> String {
    format!("{}|{}|{}", OPERATOR_ORIGIN, label, text)
}
