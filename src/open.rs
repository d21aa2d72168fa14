//! The BGP OPEN message: fixed fields, optional parameters, and the
//! capability-negotiation TLVs carried inside them.

use byteorder::{BigEndian, WriteBytesExt};
use std::net::Ipv4Addr;

use crate::update::attributes::{read_n, read_u16, read_u8};
use crate::{
    Error, AFI, CAPABILITY_4BYTE_ASN, CAPABILITY_GRACEFUL_RESTART, CAPABILITY_MP_EXTENSION,
    CAPABILITY_ROUTE_REFRESH, SAFI,
};

const OPT_PARAM_CAPABILITIES: u8 = 2;

/// A BGP OPEN message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMessage {
    /// Protocol version; must be 4.
    pub version: u8,
    /// The sender's Autonomous System number.
    pub my_asn: u16,
    /// Proposed hold-timer value, in seconds.
    pub hold_time: u16,
    /// The sender's BGP identifier.
    pub bgp_id: Ipv4Addr,
    /// Optional parameters, most commonly capability advertisements.
    pub parameters: Vec<OpenParameter>,
}

impl OpenMessage {
    /// All MP capabilities (AFI, SAFI) advertised across every `Capabilities`
    /// optional parameter in this message.
    pub fn mp_capabilities(&self) -> Vec<(AFI, SAFI)> {
        let mut out = Vec::new();
        for param in &self.parameters {
            if let OpenParameter::Capabilities(caps) = param {
                for cap in caps {
                    if let OpenCapability::MultiProtocol { afi, safi } = cap {
                        out.push((*afi, *safi));
                    }
                }
            }
        }
        out
    }
}

/// An OPEN message optional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenParameter {
    /// Parameter type 2: one or more capability advertisements.
    Capabilities(Vec<OpenCapability>),
    /// Any other optional-parameter type, preserved byte-exact.
    Unknown {
        /// The parameter's type.
        param_type: u8,
        /// The parameter's raw value bytes.
        value: Vec<u8>,
    },
}

/// A single capability TLV inside a `Capabilities` optional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenCapability {
    /// Multiprotocol Extensions (RFC 4760): the only capability this codec
    /// structurally decodes.
    MultiProtocol {
        /// The advertised address family.
        afi: AFI,
        /// The advertised subsequent address family.
        safi: SAFI,
    },
    /// A recognized-but-opaque capability (Route Refresh, Graceful Restart,
    /// 4-byte ASN, or any other registered code): preserved byte-exact.
    Opaque {
        /// The capability code.
        code: u8,
        /// The capability's raw value bytes.
        value: Vec<u8>,
    },
}

/// Decodes one capability TLV (`code(1) | length(1) | value(length)`),
/// returning it and the number of bytes consumed.
pub fn decode_capability(bytes: &[u8]) -> Result<(OpenCapability, usize), Error> {
    let mut offset = 0;
    let code = read_u8(bytes, &mut offset)?;
    let length = read_u8(bytes, &mut offset)? as usize;
    let value = read_n(bytes, &mut offset, length)?;

    let capability = if code == CAPABILITY_MP_EXTENSION {
        let (afi, safi) = decode_mp_capability(value)?;
        OpenCapability::MultiProtocol { afi, safi }
    } else {
        if !matches!(
            code,
            CAPABILITY_ROUTE_REFRESH | CAPABILITY_GRACEFUL_RESTART | CAPABILITY_4BYTE_ASN
        ) {
            log::warn!("preserving unrecognized capability code {}", code);
        }
        OpenCapability::Opaque {
            code,
            value: value.to_vec(),
        }
    };
    Ok((capability, offset))
}

/// Encodes a single capability TLV.
pub fn encode_capability(code: u8, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + value.len());
    out.push(code);
    out.push(value.len() as u8);
    out.extend_from_slice(value);
    out
}

/// Encodes the Multiprotocol Extensions capability value: `afi(2)|reserved=0(1)|safi(1)`.
pub fn encode_mp_capability(afi: AFI, safi: SAFI) -> [u8; 4] {
    let afi = afi as u16;
    [(afi >> 8) as u8, afi as u8, 0, safi as u8]
}

/// Decodes a Multiprotocol Extensions capability value.
pub fn decode_mp_capability(bytes: &[u8]) -> Result<(AFI, SAFI), Error> {
    if bytes.len() != 4 {
        return Err(Error::BadCapability(format!(
            "MP_EXTENSION capability value must be 4 bytes, got {}",
            bytes.len()
        )));
    }
    let afi_value = u16::from_be_bytes([bytes[0], bytes[1]]);
    let safi_value = bytes[3];
    let afi = AFI::try_from_u16(afi_value)
        .ok_or(Error::BadAddressFamily {
            afi: afi_value,
            safi: safi_value,
        })?;
    let safi = SAFI::try_from_u8(safi_value).ok_or(Error::BadAddressFamily {
        afi: afi_value,
        safi: safi_value,
    })?;
    Ok((afi, safi))
}

/// Decodes an OPEN message body (everything after the 19-byte header).
pub fn decode_open(body: &[u8]) -> Result<OpenMessage, Error> {
    let mut offset = 0;
    let version = read_u8(body, &mut offset)?;
    if version != 4 {
        return Err(Error::BadVersion(version));
    }
    let my_asn = read_u16(body, &mut offset)?;
    let hold_time = read_u16(body, &mut offset)?;
    let bgp_id_bytes = read_n(body, &mut offset, 4)?;
    let bgp_id = Ipv4Addr::new(
        bgp_id_bytes[0],
        bgp_id_bytes[1],
        bgp_id_bytes[2],
        bgp_id_bytes[3],
    );
    let opt_param_len = read_u8(body, &mut offset)? as usize;
    let opt_params = read_n(body, &mut offset, opt_param_len)?;

    let mut parameters = Vec::new();
    let mut pos = 0;
    while pos < opt_params.len() {
        let mut param_offset = pos;
        let param_type = read_u8(opt_params, &mut param_offset)?;
        let param_length = read_u8(opt_params, &mut param_offset)? as usize;
        let value = read_n(opt_params, &mut param_offset, param_length)?;

        if param_type == OPT_PARAM_CAPABILITIES {
            let mut capabilities = Vec::new();
            let mut cpos = 0;
            while cpos < value.len() {
                let (capability, consumed) = decode_capability(&value[cpos..])?;
                capabilities.push(capability);
                cpos += consumed;
            }
            parameters.push(OpenParameter::Capabilities(capabilities));
        } else {
            log::warn!("preserving unrecognized OPEN parameter type {}", param_type);
            parameters.push(OpenParameter::Unknown {
                param_type,
                value: value.to_vec(),
            });
        }

        pos = param_offset;
    }

    log::debug!(
        "decoded OPEN: asn={} hold={} {} parameter(s)",
        my_asn,
        hold_time,
        parameters.len()
    );

    Ok(OpenMessage {
        version,
        my_asn,
        hold_time,
        bgp_id,
        parameters,
    })
}

/// Encodes an OPEN message. `opt_param_len` is never taken from the caller:
/// it is always recomputed here from the parameters actually emitted.
pub fn encode_open(open: &OpenMessage) -> Vec<u8> {
    let mut params = Vec::new();
    for parameter in &open.parameters {
        match parameter {
            OpenParameter::Capabilities(capabilities) => {
                let mut value = Vec::new();
                for capability in capabilities {
                    let encoded = match capability {
                        OpenCapability::MultiProtocol { afi, safi } => {
                            encode_capability(CAPABILITY_MP_EXTENSION, &encode_mp_capability(*afi, *safi))
                        }
                        OpenCapability::Opaque { code, value } => encode_capability(*code, value),
                    };
                    value.extend_from_slice(&encoded);
                }
                params.push(OPT_PARAM_CAPABILITIES);
                params.push(value.len() as u8);
                params.extend_from_slice(&value);
            }
            OpenParameter::Unknown { param_type, value } => {
                params.push(*param_type);
                params.push(value.len() as u8);
                params.extend_from_slice(value);
            }
        }
    }

    let mut out = Vec::with_capacity(10 + params.len());
    out.push(open.version);
    out.write_u16::<BigEndian>(open.my_asn).unwrap();
    out.write_u16::<BigEndian>(open.hold_time).unwrap();
    out.extend_from_slice(&open.bgp_id.octets());
    out.push(params.len() as u8);
    out.extend_from_slice(&params);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_roundtrip_with_mp_and_opaque_capabilities() {
        let open = OpenMessage {
            version: 4,
            my_asn: 65000,
            hold_time: 90,
            bgp_id: Ipv4Addr::new(10, 0, 0, 2),
            parameters: vec![OpenParameter::Capabilities(vec![
                OpenCapability::MultiProtocol {
                    afi: AFI::IPV4,
                    safi: SAFI::Unicast,
                },
                OpenCapability::Opaque {
                    code: CAPABILITY_ROUTE_REFRESH,
                    value: vec![],
                },
                OpenCapability::Opaque {
                    code: CAPABILITY_4BYTE_ASN,
                    value: vec![0, 0, 0xFD, 0xE8],
                },
            ])],
        };

        let bytes = encode_open(&open);
        let decoded = decode_open(&bytes).unwrap();
        assert_eq!(decoded, open);
        assert_eq!(decoded.mp_capabilities(), vec![(AFI::IPV4, SAFI::Unicast)]);
    }

    #[test]
    fn encoder_recomputes_opt_param_length() {
        let open = OpenMessage {
            version: 4,
            my_asn: 100,
            hold_time: 180,
            bgp_id: Ipv4Addr::new(1, 2, 3, 4),
            parameters: vec![],
        };
        let bytes = encode_open(&open);
        // version(1)+asn(2)+hold(2)+id(4)+opt_param_len(1), no parameters.
        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[9], 0);
    }

    #[test]
    fn bad_version_is_rejected() {
        let bytes = [3u8, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(decode_open(&bytes), Err(Error::BadVersion(3))));
    }

    #[test]
    fn unknown_optional_parameter_is_preserved() {
        let open = OpenMessage {
            version: 4,
            my_asn: 1,
            hold_time: 1,
            bgp_id: Ipv4Addr::UNSPECIFIED,
            parameters: vec![OpenParameter::Unknown {
                param_type: 200,
                value: vec![9, 9, 9],
            }],
        };
        let bytes = encode_open(&open);
        let decoded = decode_open(&bytes).unwrap();
        assert_eq!(decoded, open);
    }
}
