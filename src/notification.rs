//! The BGP NOTIFICATION message.

use std::fmt;

use crate::update::attributes::{read_n, read_u8};
use crate::Error;

/// NOTIFICATION major error code: Message Header Error.
pub const MESSAGE_HEADER_ERROR: u8 = 1;
/// NOTIFICATION major error code: OPEN Message Error.
pub const OPEN_MESSAGE_ERROR: u8 = 2;
/// NOTIFICATION major error code: UPDATE Message Error.
pub const UPDATE_MESSAGE_ERROR: u8 = 3;
/// NOTIFICATION major error code: Hold Timer Expired.
pub const HOLD_TIMER_EXPIRED: u8 = 4;
/// NOTIFICATION major error code: Finite State Machine Error.
pub const FSM_ERROR: u8 = 5;
/// NOTIFICATION major error code: Cease.
pub const CEASE: u8 = 6;

/// A BGP NOTIFICATION message: the session layer uses this to tear down a
/// session and explain why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Major error code (RFC 4271 §4.5).
    pub error_code: u8,
    /// Minor error subcode, interpreted relative to `error_code`.
    pub error_subcode: u8,
    /// Optional diagnostic data.
    pub data: Vec<u8>,
}

impl Notification {
    /// A human-readable description of `error_code`.
    pub fn major(&self) -> String {
        match self.error_code {
            MESSAGE_HEADER_ERROR => "Message Header Error".to_string(),
            OPEN_MESSAGE_ERROR => "OPEN Message Error".to_string(),
            UPDATE_MESSAGE_ERROR => "UPDATE Message Error".to_string(),
            HOLD_TIMER_EXPIRED => "Hold Timer Expired".to_string(),
            FSM_ERROR => "Finite State Machine Error".to_string(),
            CEASE => "Cease".to_string(),
            other => format!("Major Code {}", other),
        }
    }

    /// The minor error subcode, as a string (this codec does not carry a
    /// per-subcode description table; the session layer owns that mapping).
    pub fn minor(&self) -> String {
        self.error_subcode.to_string()
    }

    /// The notification's `data` field, if it happens to be valid UTF-8.
    pub fn message(&self) -> Option<String> {
        String::from_utf8(self.data.clone()).ok()
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} / {} {}",
            self.major(),
            self.minor(),
            self.message().unwrap_or_default()
        )
    }
}

/// Decodes a NOTIFICATION message body: `error_code(1) | error_subcode(1) | data(rest)`.
pub fn decode_notification(body: &[u8]) -> Result<Notification, Error> {
    let mut offset = 0;
    let error_code = read_u8(body, &mut offset)?;
    let error_subcode = read_u8(body, &mut offset)?;
    let data = read_n(body, &mut offset, body.len() - offset)?.to_vec();
    Ok(Notification {
        error_code,
        error_subcode,
        data,
    })
}

/// Encodes a NOTIFICATION message body.
pub fn encode_notification(notification: &Notification) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + notification.data.len());
    out.push(notification.error_code);
    out.push(notification.error_subcode);
    out.extend_from_slice(&notification.data);
    out
}

#[test]
fn test_notification_display() {
    let notification = Notification {
        error_code: CEASE,
        error_subcode: 3,
        data: vec![],
    };
    assert_eq!(&notification.to_string(), "Cease / 3 ");

    let notification = Notification {
        error_code: OPEN_MESSAGE_ERROR,
        error_subcode: 1,
        data: b"Unsupported Capability".to_vec(),
    };
    assert_eq!(
        &notification.to_string(),
        "OPEN Message Error / 1 Unsupported Capability"
    );
}

#[test]
fn test_notification_display_unknown_major() {
    let notification = Notification {
        error_code: 9,
        error_subcode: 0,
        data: vec![],
    };
    assert_eq!(&notification.to_string(), "Major Code 9 / 0 ");
}

#[test]
fn test_notification_roundtrip() {
    let notification = Notification {
        error_code: CEASE,
        error_subcode: 7,
        data: vec![],
    };
    let bytes = encode_notification(&notification);
    assert_eq!(bytes, vec![6, 7]);
    assert_eq!(decode_notification(&bytes).unwrap(), notification);
}

#[test]
fn test_notification_with_data_roundtrip() {
    let notification = Notification {
        error_code: UPDATE_MESSAGE_ERROR,
        error_subcode: 5,
        data: vec![1, 2, 3],
    };
    let bytes = encode_notification(&notification);
    assert_eq!(decode_notification(&bytes).unwrap(), notification);
}
