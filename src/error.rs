use std::io;

use crate::AFI;

/// Everything that can go wrong while decoding or encoding a BGP message.
///
/// No variant swallows or retries; every fallible function in this crate
/// returns one of these verbatim to its caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input ended before a fixed or length-prefixed field could be read.
    #[error("truncated input at offset {offset}: needed {needed} more byte(s)")]
    Truncated { offset: usize, needed: usize },

    /// The 16-byte marker was not all `0xFF`.
    #[error("bad marker: expected 16 bytes of 0xff")]
    BadMarker,

    /// The header length field was outside `[MSG_HDR_SIZE, MAX_MSG_SIZE]`.
    #[error("bad length: {0} is out of range [19, 4096]")]
    BadLength(u16),

    /// The header type field was not one of OPEN/UPDATE/NOTIFICATION/KEEPALIVE.
    #[error("unknown message type: {0}")]
    UnknownType(u8),

    /// `OpenMessage.version` was not 4.
    #[error("bad OPEN version: {0} (expected 4)")]
    BadVersion(u8),

    /// An NLRI or MP_REACH/MP_UNREACH prefix length exceeded the address width.
    #[error("invalid prefix length {length} for {afi:?}")]
    InvalidPrefixLength { afi: AFI, length: u8 },

    /// A path attribute's type code appeared more than once in one UPDATE.
    #[error("malformed attribute list: type code {0} appears more than once")]
    MalformedAttributeList(u8),

    /// A path attribute's optional bit was clear but the type code is not recognized.
    #[error("unknown well-known attribute: type code {0}")]
    UnknownWellKnownAttribute(u8),

    /// A wire shape that is well-formed but outside this codec's negotiated/supported scope.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// An MP_REACH_NLRI/MP_UNREACH_NLRI or capability AFI/SAFI pair this codec does not interpret.
    #[error("bad address family: afi={afi} safi={safi}")]
    BadAddressFamily { afi: u16, safi: u8 },

    /// A capability TLV's declared length did not fit its expected shape.
    #[error("bad capability: {0}")]
    BadCapability(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::Truncated {
                offset: 0,
                needed: 1,
            },
            _ => Error::UnsupportedFeature(e.to_string()),
        }
    }
}
