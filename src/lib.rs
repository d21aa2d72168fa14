#![deny(missing_docs)]

//! `bgp-codec` encodes and decodes BGP-4 (RFC 4271) wire messages.
//!
//! The crate is a stateless pair of encoder/decoder functions: it does not
//! model a BGP session, a routing table, or a TCP connection. Callers own
//! the session finite-state-machine and feed this crate complete message
//! buffers; the crate turns them into structured values and back.
//!
//! # Examples
//!
//! ```
//! use bgp_codec::{decode_header, decode_message, encode_message, Capabilities, Message};
//!
//! let frame = encode_message(&Message::KeepAlive, &Capabilities::default()).unwrap();
//! let (header, _rest_len) = decode_header(&frame).unwrap();
//! let message = decode_message(header.message_type, &Capabilities::default(), &frame[19..]).unwrap();
//! assert!(matches!(message, Message::KeepAlive));
//! ```

/// The structured `Error` type returned by every fallible function in this crate.
pub mod error;
/// The BGP OPEN message, its optional parameters, and capability negotiation TLVs.
pub mod open;
/// The BGP NOTIFICATION message.
pub mod notification;
/// The BGP UPDATE message: path attributes, NLRI, and the denormalized route view.
pub mod update;

pub use crate::error::Error;
pub use crate::notification::Notification;
pub use crate::open::{OpenCapability, OpenMessage, OpenParameter};
pub use crate::update::attributes::{MpReachNlri, MpUnreachNlri, Origin, PathAttribute, Segment};
pub use crate::update::nlri::{Ipv4Net, Ipv6Net};
pub use crate::update::BGPRoute;

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

/// Size in bytes of the fixed BGP message header (marker + length + type).
pub const MSG_HDR_SIZE: usize = 19;
/// Minimum total size of a legal OPEN message (header + 10 fixed-field bytes).
pub const MIN_OPEN_MSG_SIZE: usize = 29;
/// Maximum total size of a legal BGP message.
pub const MAX_MSG_SIZE: usize = 4096;

/// OPEN capability code: Multiprotocol Extensions (RFC 4760).
pub const CAPABILITY_MP_EXTENSION: u8 = 1;
/// OPEN capability code: Route Refresh (RFC 2918).
pub const CAPABILITY_ROUTE_REFRESH: u8 = 2;
/// OPEN capability code: Graceful Restart (RFC 4724).
pub const CAPABILITY_GRACEFUL_RESTART: u8 = 64;
/// OPEN capability code: 4-octet AS number support (RFC 6793).
pub const CAPABILITY_4BYTE_ASN: u8 = 65;

/// NOTIFICATION major error code: Cease.
pub const BGP_CASE_ERROR: u8 = 6;
/// NOTIFICATION minor error code under Cease: connection collision resolution.
pub const BGP_CASE_ERROR_COLLISION: u8 = 7;

const MSG_TYPE_OPEN: u8 = 1;
const MSG_TYPE_UPDATE: u8 = 2;
const MSG_TYPE_NOTIFICATION: u8 = 3;
const MSG_TYPE_KEEPALIVE: u8 = 4;

/// Address Family Identifier (RFC 4760). Only the families this codec structurally
/// understands are represented; any other on-wire value is an [`Error::BadAddressFamily`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AFI {
    /// Internet Protocol version 4.
    IPV4 = 1,
    /// Internet Protocol version 6.
    IPV6 = 2,
}

impl AFI {
    fn try_from_u16(value: u16) -> Option<AFI> {
        match value {
            1 => Some(AFI::IPV4),
            2 => Some(AFI::IPV6),
            _ => None,
        }
    }
}

/// Subsequent Address Family Identifier (RFC 4760).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SAFI {
    /// Unicast forwarding.
    Unicast = 1,
    /// Multicast forwarding.
    Multicast = 2,
}

impl SAFI {
    fn try_from_u8(value: u8) -> Option<SAFI> {
        match value {
            1 => Some(SAFI::Unicast),
            2 => Some(SAFI::Multicast),
            _ => None,
        }
    }
}

/// Feature flags negotiated by the session layer before a given message is decoded
/// or encoded. This codec has no memory of its own: every negotiated behavior that
/// affects wire shape is passed in explicitly, per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// Whether the RFC 6793 4-octet AS number capability was negotiated. Governs
    /// whether AS_PATH segments are read/written as 2-byte or 4-byte AS numbers.
    pub four_byte_asn: bool,
}

/// The fixed 19-byte header that precedes every BGP message.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// Must be 16 bytes of `0xFF`.
    pub marker: [u8; 16],
    /// Total length of the message, including this header, in `[MSG_HDR_SIZE, MAX_MSG_SIZE]`.
    pub length: u16,
    /// The message type that follows: 1=OPEN, 2=UPDATE, 3=NOTIFICATION, 4=KEEPALIVE.
    pub message_type: u8,
}

/// A single decoded BGP message, carrying its type-specific body.
#[derive(Debug, Clone)]
pub enum Message {
    /// A BGP OPEN message.
    Open(OpenMessage),
    /// A BGP UPDATE message, denormalized into a [`BGPRoute`].
    Update(BGPRoute),
    /// A BGP NOTIFICATION message.
    Notification(Notification),
    /// A BGP KEEPALIVE message. Carries no body.
    KeepAlive,
}

/// Decodes the fixed 19-byte message header from the front of `bytes`.
///
/// Returns the header and the number of body bytes that follow it
/// (`header.length as usize - MSG_HDR_SIZE`), i.e. how much more a caller
/// needs to read off the wire before the message is complete.
pub fn decode_header(bytes: &[u8]) -> Result<(Header, usize), Error> {
    if bytes.len() < MSG_HDR_SIZE {
        return Err(Error::Truncated {
            offset: 0,
            needed: MSG_HDR_SIZE - bytes.len(),
        });
    }

    let mut marker = [0u8; 16];
    marker.copy_from_slice(&bytes[0..16]);
    if marker.iter().any(|&b| b != 0xFF) {
        return Err(Error::BadMarker);
    }

    let mut cursor = Cursor::new(&bytes[16..19]);
    let length = cursor.read_u16::<BigEndian>()?;
    if (length as usize) < MSG_HDR_SIZE || (length as usize) > MAX_MSG_SIZE {
        return Err(Error::BadLength(length));
    }
    let message_type = cursor.read_u8()?;
    if !matches!(
        message_type,
        MSG_TYPE_OPEN | MSG_TYPE_UPDATE | MSG_TYPE_NOTIFICATION | MSG_TYPE_KEEPALIVE
    ) {
        return Err(Error::UnknownType(message_type));
    }

    let header = Header {
        marker,
        length,
        message_type,
    };
    let rest_length = length as usize - MSG_HDR_SIZE;
    Ok((header, rest_length))
}

/// Encodes the fixed 19-byte message header.
pub fn encode_header(header: &Header) -> [u8; MSG_HDR_SIZE] {
    let mut buf = [0u8; MSG_HDR_SIZE];
    buf[0..16].copy_from_slice(&header.marker);
    buf[16..18].copy_from_slice(&header.length.to_be_bytes());
    buf[18] = header.message_type;
    buf
}

/// Decodes a message body given the type carried by its header.
///
/// `capabilities` stands in for session-negotiated state (currently: whether
/// 4-byte AS numbers were negotiated) that affects how UPDATE's AS_PATH
/// attribute is parsed.
pub fn decode_message(
    message_type: u8,
    capabilities: &Capabilities,
    body: &[u8],
) -> Result<Message, Error> {
    match message_type {
        MSG_TYPE_OPEN => Ok(Message::Open(open::decode_open(body)?)),
        MSG_TYPE_UPDATE => Ok(Message::Update(update::decode_update(body, capabilities)?)),
        MSG_TYPE_NOTIFICATION => Ok(Message::Notification(notification::decode_notification(
            body,
        )?)),
        MSG_TYPE_KEEPALIVE => Ok(Message::KeepAlive),
        other => Err(Error::UnknownType(other)),
    }
}

/// Encodes a full message, header included.
///
/// `capabilities` governs the AS_PATH segment width used when encoding an
/// UPDATE message; it is ignored for the other message types.
pub fn encode_message(message: &Message, capabilities: &Capabilities) -> Result<Vec<u8>, Error> {
    let (message_type, body) = match message {
        Message::Open(open) => (MSG_TYPE_OPEN, open::encode_open(open)),
        Message::Update(route) => (
            MSG_TYPE_UPDATE,
            update::encode_update(route, capabilities)?,
        ),
        Message::Notification(n) => (MSG_TYPE_NOTIFICATION, notification::encode_notification(n)),
        Message::KeepAlive => (MSG_TYPE_KEEPALIVE, Vec::new()),
    };

    let length = (MSG_HDR_SIZE + body.len()) as u16;
    let header = Header {
        marker: [0xFF; 16],
        length,
        message_type,
    };

    let mut out = Vec::with_capacity(length as usize);
    out.extend_from_slice(&encode_header(&header));
    out.extend_from_slice(&body);
    Ok(out)
}

/// Generates the fixed 19-byte KEEPALIVE message.
pub fn generate_keepalive() -> Vec<u8> {
    encode_message(&Message::KeepAlive, &Capabilities::default())
        .expect("KEEPALIVE has no body to encode and cannot fail")
}

/// Generates the 23-byte End-of-RIB marker: a minimal IPv4/unicast UPDATE with
/// empty withdrawn routes, empty path attributes, and no announced routes.
pub fn generate_end_of_rib() -> Vec<u8> {
    encode_message(
        &Message::Update(BGPRoute::default()),
        &Capabilities::default(),
    )
    .expect("an empty BGPRoute always encodes")
}

/// Parses a dotted-quad IPv4 address string into its 32-bit network-order value.
pub fn ipv4_string_to_u32(s: &str) -> Result<u32, Error> {
    let addr: std::net::Ipv4Addr = s
        .parse()
        .map_err(|_| Error::UnsupportedFeature(format!("not an IPv4 address: {}", s)))?;
    Ok(u32::from(addr))
}

/// Parses an IPv6 address string (accepting `::` zero-compression) into its value.
pub fn ipv6_string_to_addr(s: &str) -> Result<std::net::Ipv6Addr, Error> {
    s.parse()
        .map_err(|_| Error::UnsupportedFeature(format!("not an IPv6 address: {}", s)))
}

/// Formats an IPv6 address canonically per RFC 5952 (`std::net::Ipv6Addr`'s
/// `Display` implementation already produces this form).
pub fn ipv6_addr_to_string(addr: &std::net::Ipv6Addr) -> String {
    addr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keepalive_roundtrip() {
        let frame = generate_keepalive();
        assert_eq!(frame.len(), 19);
        assert_eq!(&frame[0..16], &[0xFFu8; 16][..]);
        assert_eq!(&frame[16..18], &[0, 19]);
        assert_eq!(frame[18], 4);

        let (header, rest_len) = decode_header(&frame).unwrap();
        assert_eq!(rest_len, 0);
        let message = decode_message(header.message_type, &Capabilities::default(), &[]).unwrap();
        assert!(matches!(message, Message::KeepAlive));
    }

    #[test]
    fn end_of_rib_is_23_bytes() {
        let frame = generate_end_of_rib();
        assert_eq!(frame.len(), 23);
    }

    #[test]
    fn bad_marker_is_rejected() {
        let mut frame = generate_keepalive();
        frame[0] = 0;
        assert!(matches!(decode_header(&frame), Err(Error::BadMarker)));
    }

    #[test]
    fn short_length_is_rejected() {
        let mut frame = generate_keepalive();
        frame[16..18].copy_from_slice(&18u16.to_be_bytes());
        assert!(matches!(decode_header(&frame), Err(Error::BadLength(18))));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut frame = generate_keepalive();
        frame[18] = 9;
        assert!(matches!(decode_header(&frame), Err(Error::UnknownType(9))));
    }

    #[test]
    fn truncated_header_is_rejected() {
        let frame = [0xFFu8; 10];
        assert!(matches!(
            decode_header(&frame),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn ipv6_canonicalizes_per_rfc5952() {
        let addr = ipv6_string_to_addr("FC01:0000:0000:0000:0000:0000:0000:0001").unwrap();
        assert_eq!(ipv6_addr_to_string(&addr), "fc01::1");
    }
}
