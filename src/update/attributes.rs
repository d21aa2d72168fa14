//! Path attribute codec.
//!
//! Path attributes are modeled as a single tagged enum rather than as flattened
//! fields of the UPDATE message: this keeps duplicate-attribute detection,
//! unknown-attribute preservation, and ordering all in one place, and lets the
//! [`crate::update::BGPRoute`] denormalized view be derived from the list rather
//! than stored redundantly alongside it.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::update::nlri::{decode_ipv6_nlri_seq, encode_ipv6_nlri, Ipv6Net};
use crate::{Capabilities, Error, AFI, SAFI};

const ORIGIN: u8 = 1;
const AS_PATH: u8 = 2;
const NEXT_HOP: u8 = 3;
const MED: u8 = 4;
const LOCAL_PREF: u8 = 5;
const ATOMIC_AGGREGATE: u8 = 6;
const AGGREGATOR: u8 = 7;
const COMMUNITIES: u8 = 8;
const MP_REACH_NLRI: u8 = 14;
const MP_UNREACH_NLRI: u8 = 15;

const FLAG_OPTIONAL: u8 = 0x80;
const FLAG_TRANSITIVE: u8 = 0x40;
const FLAG_EXTENDED_LENGTH: u8 = 0x10;

/// How an UPDATE's routes were generated. Defined in RFC 4271.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Generated by an Interior Gateway Protocol.
    IGP,
    /// Generated by an Exterior Gateway Protocol.
    EGP,
    /// How the route was generated is unknown.
    INCOMPLETE,
}

impl Origin {
    fn decode(value: u8) -> Result<Origin, Error> {
        match value {
            0 => Ok(Origin::IGP),
            1 => Ok(Origin::EGP),
            2 => Ok(Origin::INCOMPLETE),
            other => Err(Error::UnsupportedFeature(format!(
                "unknown ORIGIN value {}",
                other
            ))),
        }
    }

    fn encode(self) -> u8 {
        match self {
            Origin::IGP => 0,
            Origin::EGP => 1,
            Origin::INCOMPLETE => 2,
        }
    }
}

/// A single AS_PATH segment. ASNs are always stored as 32-bit values
/// internally regardless of the wire width negotiated for a given session;
/// see [`Capabilities::four_byte_asn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// An unordered set of ASNs (AS_SET, type 1).
    Set(Vec<u32>),
    /// An ordered sequence of ASNs (AS_SEQUENCE, type 2).
    Sequence(Vec<u32>),
}

impl Segment {
    fn decode(bytes: &[u8], offset: &mut usize, four_byte_asn: bool) -> Result<Segment, Error> {
        let segment_type = read_u8(bytes, offset)?;
        let count = read_u8(bytes, offset)? as usize;
        let width = if four_byte_asn { 4 } else { 2 };
        let mut asns = Vec::with_capacity(count);
        for _ in 0..count {
            let asn = if four_byte_asn {
                read_u32(bytes, offset)?
            } else {
                u32::from(read_u16(bytes, offset)?)
            };
            asns.push(asn);
        }
        let _ = width;
        match segment_type {
            1 => Ok(Segment::Set(asns)),
            2 => Ok(Segment::Sequence(asns)),
            other => Err(Error::UnsupportedFeature(format!(
                "unknown AS_PATH segment type {}",
                other
            ))),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>, four_byte_asn: bool) {
        let (segment_type, asns): (u8, &[u32]) = match self {
            Segment::Set(a) => (1, a),
            Segment::Sequence(a) => (2, a),
        };
        buf.push(segment_type);
        buf.push(asns.len() as u8);
        for &asn in asns {
            if four_byte_asn {
                buf.write_u32::<BigEndian>(asn).expect("write to Vec never fails");
            } else {
                buf.write_u16::<BigEndian>(asn as u16)
                    .expect("write to Vec never fails");
            }
        }
    }
}

/// The MP_REACH_NLRI path attribute value, restricted to the one AFI/SAFI
/// pair (IPv6/unicast) this codec structurally understands (RFC 4760).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpReachNlri {
    /// Always [`AFI::IPV6`] for a successfully decoded value.
    pub afi: AFI,
    /// Always [`SAFI::Unicast`] for a successfully decoded value.
    pub safi: SAFI,
    /// The IPv6 next hop for the announced routes.
    pub next_hop: Ipv6Addr,
    /// The announced IPv6 prefixes.
    pub nlri: Vec<Ipv6Net>,
}

impl MpReachNlri {
    fn decode(bytes: &[u8]) -> Result<MpReachNlri, Error> {
        let mut offset = 0;
        let afi = read_u16(bytes, &mut offset)?;
        let safi = read_u8(bytes, &mut offset)?;
        let (afi, safi) = match (AFI::try_from_u16(afi), SAFI::try_from_u8(safi)) {
            (Some(AFI::IPV6), Some(SAFI::Unicast)) => (AFI::IPV6, SAFI::Unicast),
            _ => return Err(Error::BadAddressFamily { afi, safi }),
        };
        let next_hop_length = read_u8(bytes, &mut offset)? as usize;
        if next_hop_length != 16 {
            return Err(Error::BadCapability(format!(
                "MP_REACH_NLRI next hop length {} is not 16 for IPv6 unicast",
                next_hop_length
            )));
        }
        let mut next_hop_bytes = [0u8; 16];
        next_hop_bytes.copy_from_slice(read_n(bytes, &mut offset, 16)?);
        let _reserved = read_u8(bytes, &mut offset)?;
        let nlri = decode_ipv6_nlri_seq(&bytes[offset..])?;
        Ok(MpReachNlri {
            afi,
            safi,
            next_hop: Ipv6Addr::from(next_hop_bytes),
            nlri,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.write_u16::<BigEndian>(AFI::IPV6 as u16).unwrap();
        buf.push(SAFI::Unicast as u8);
        buf.push(16);
        buf.extend_from_slice(&self.next_hop.octets());
        buf.push(0);
        for nlri in &self.nlri {
            buf.extend_from_slice(&encode_ipv6_nlri(nlri));
        }
    }
}

/// The MP_UNREACH_NLRI path attribute value, restricted to IPv6/unicast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpUnreachNlri {
    /// Always [`AFI::IPV6`] for a successfully decoded value.
    pub afi: AFI,
    /// Always [`SAFI::Unicast`] for a successfully decoded value.
    pub safi: SAFI,
    /// The withdrawn IPv6 prefixes.
    pub withdrawn: Vec<Ipv6Net>,
}

impl MpUnreachNlri {
    fn decode(bytes: &[u8]) -> Result<MpUnreachNlri, Error> {
        let mut offset = 0;
        let afi = read_u16(bytes, &mut offset)?;
        let safi = read_u8(bytes, &mut offset)?;
        let (afi, safi) = match (AFI::try_from_u16(afi), SAFI::try_from_u8(safi)) {
            (Some(AFI::IPV6), Some(SAFI::Unicast)) => (AFI::IPV6, SAFI::Unicast),
            _ => return Err(Error::BadAddressFamily { afi, safi }),
        };
        let withdrawn = decode_ipv6_nlri_seq(&bytes[offset..])?;
        Ok(MpUnreachNlri {
            afi,
            safi,
            withdrawn,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.write_u16::<BigEndian>(AFI::IPV6 as u16).unwrap();
        buf.push(SAFI::Unicast as u8);
        for nlri in &self.withdrawn {
            buf.extend_from_slice(&encode_ipv6_nlri(nlri));
        }
    }
}

/// A single BGP path attribute.
///
/// Every standardized attribute this codec recognizes is its own variant;
/// anything else is preserved byte-exact in [`PathAttribute::Unknown`] so a
/// re-encode round-trips attributes this crate does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathAttribute {
    /// How the route was generated. RFC 4271.
    Origin(Origin),
    /// The AS path the route has traversed. RFC 4271.
    AsPath(Vec<Segment>),
    /// The IPv4 next hop. RFC 4271.
    NextHop(Ipv4Addr),
    /// MULTI_EXIT_DISC. RFC 4271.
    Med(u32),
    /// LOCAL_PREF. RFC 4271.
    LocalPref(u32),
    /// ATOMIC_AGGREGATE, a zero-length marker attribute. RFC 4271.
    AtomicAggregate,
    /// AGGREGATOR: the aggregating ASN and its BGP identifier. RFC 4271.
    Aggregator {
        /// The aggregating speaker's ASN.
        asn: u32,
        /// The aggregating speaker's BGP identifier.
        id: Ipv4Addr,
    },
    /// COMMUNITIES. RFC 1997.
    Communities(Vec<u32>),
    /// MP_REACH_NLRI, restricted to IPv6/unicast. RFC 4760.
    MpReachNlri(MpReachNlri),
    /// MP_UNREACH_NLRI, restricted to IPv6/unicast. RFC 4760.
    MpUnreachNlri(MpUnreachNlri),
    /// Any other attribute, preserved byte-exact.
    Unknown {
        /// The attribute's type code.
        code: u8,
        /// The attribute's flag byte, exactly as seen on the wire.
        flags: u8,
        /// The attribute's raw value bytes.
        value: Vec<u8>,
    },
}

impl PathAttribute {
    /// The attribute's type code, matching the constants in `crate` (e.g. [`ORIGIN`]).
    pub fn type_code(&self) -> u8 {
        match self {
            PathAttribute::Origin(_) => ORIGIN,
            PathAttribute::AsPath(_) => AS_PATH,
            PathAttribute::NextHop(_) => NEXT_HOP,
            PathAttribute::Med(_) => MED,
            PathAttribute::LocalPref(_) => LOCAL_PREF,
            PathAttribute::AtomicAggregate => ATOMIC_AGGREGATE,
            PathAttribute::Aggregator { .. } => AGGREGATOR,
            PathAttribute::Communities(_) => COMMUNITIES,
            PathAttribute::MpReachNlri(_) => MP_REACH_NLRI,
            PathAttribute::MpUnreachNlri(_) => MP_UNREACH_NLRI,
            PathAttribute::Unknown { code, .. } => *code,
        }
    }

    /// Decodes one path attribute (flags|type|length|value) from the front of `bytes`,
    /// returning it and the number of bytes consumed.
    pub fn decode(
        bytes: &[u8],
        capabilities: &Capabilities,
    ) -> Result<(PathAttribute, usize), Error> {
        let mut offset = 0;
        let flags = read_u8(bytes, &mut offset)?;
        let code = read_u8(bytes, &mut offset)?;
        let length = if flags & FLAG_EXTENDED_LENGTH == 0 {
            read_u8(bytes, &mut offset)? as usize
        } else {
            read_u16(bytes, &mut offset)? as usize
        };
        let value = read_n(bytes, &mut offset, length)?;

        let attr = match code {
            ORIGIN => {
                if value.len() != 1 {
                    return Err(Error::UnsupportedFeature(
                        "ORIGIN attribute is not 1 byte".to_string(),
                    ));
                }
                PathAttribute::Origin(Origin::decode(value[0])?)
            }
            AS_PATH => {
                let mut segments = Vec::new();
                let mut pos = 0;
                while pos < value.len() {
                    segments.push(Segment::decode(value, &mut pos, capabilities.four_byte_asn)?);
                }
                PathAttribute::AsPath(segments)
            }
            NEXT_HOP => {
                if value.len() != 4 {
                    return Err(Error::UnsupportedFeature(
                        "NEXT_HOP attribute is not 4 bytes".to_string(),
                    ));
                }
                let mut octets = [0u8; 4];
                octets.copy_from_slice(value);
                PathAttribute::NextHop(Ipv4Addr::from(octets))
            }
            MED => PathAttribute::Med(read_u32_slice(value)?),
            LOCAL_PREF => PathAttribute::LocalPref(read_u32_slice(value)?),
            ATOMIC_AGGREGATE => PathAttribute::AtomicAggregate,
            AGGREGATOR => {
                let mut pos = 0;
                let asn = if value.len() == 6 {
                    u32::from(read_u16(value, &mut pos)?)
                } else {
                    read_u32(value, &mut pos)?
                };
                let mut octets = [0u8; 4];
                octets.copy_from_slice(read_n(value, &mut pos, 4)?);
                PathAttribute::Aggregator {
                    asn,
                    id: Ipv4Addr::from(octets),
                }
            }
            COMMUNITIES => {
                let mut communities = Vec::with_capacity(value.len() / 4);
                let mut pos = 0;
                while pos < value.len() {
                    communities.push(read_u32(value, &mut pos)?);
                }
                PathAttribute::Communities(communities)
            }
            MP_REACH_NLRI => PathAttribute::MpReachNlri(MpReachNlri::decode(value)?),
            MP_UNREACH_NLRI => PathAttribute::MpUnreachNlri(MpUnreachNlri::decode(value)?),
            other => {
                if flags & FLAG_OPTIONAL == 0 {
                    return Err(Error::UnknownWellKnownAttribute(other));
                }
                log::warn!("preserving unknown optional attribute type {}", other);
                PathAttribute::Unknown {
                    code: other,
                    flags,
                    value: value.to_vec(),
                }
            }
        };
        Ok((attr, offset))
    }

    /// Encodes this attribute's flags|type|length|value onto `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>, capabilities: &Capabilities) {
        let mut value = Vec::new();
        let mut flags;
        let mut force_extended = false;

        match self {
            PathAttribute::Origin(origin) => {
                value.push(origin.encode());
                flags = FLAG_TRANSITIVE;
            }
            PathAttribute::AsPath(segments) => {
                for segment in segments {
                    segment.encode(&mut value, capabilities.four_byte_asn);
                }
                flags = FLAG_TRANSITIVE;
            }
            PathAttribute::NextHop(addr) => {
                value.extend_from_slice(&addr.octets());
                flags = FLAG_TRANSITIVE;
            }
            PathAttribute::Med(med) => {
                value.write_u32::<BigEndian>(*med).unwrap();
                flags = FLAG_OPTIONAL;
            }
            PathAttribute::LocalPref(pref) => {
                value.write_u32::<BigEndian>(*pref).unwrap();
                flags = FLAG_TRANSITIVE;
            }
            PathAttribute::AtomicAggregate => {
                flags = FLAG_TRANSITIVE;
            }
            PathAttribute::Aggregator { asn, id } => {
                value.write_u32::<BigEndian>(*asn).unwrap();
                value.extend_from_slice(&id.octets());
                flags = FLAG_OPTIONAL;
            }
            PathAttribute::Communities(communities) => {
                for &c in communities {
                    value.write_u32::<BigEndian>(c).unwrap();
                }
                flags = FLAG_OPTIONAL | FLAG_TRANSITIVE;
            }
            PathAttribute::MpReachNlri(mp_reach) => {
                mp_reach.encode(&mut value);
                flags = FLAG_OPTIONAL;
                force_extended = true;
            }
            PathAttribute::MpUnreachNlri(mp_unreach) => {
                mp_unreach.encode(&mut value);
                flags = FLAG_OPTIONAL;
                force_extended = true;
            }
            PathAttribute::Unknown {
                flags: original_flags,
                value: original_value,
                ..
            } => {
                value.extend_from_slice(original_value);
                flags = *original_flags & !FLAG_EXTENDED_LENGTH;
            }
        };

        if force_extended || value.len() > u8::MAX as usize {
            flags |= FLAG_EXTENDED_LENGTH;
        }

        buf.push(flags);
        buf.push(self.type_code());
        if flags & FLAG_EXTENDED_LENGTH != 0 {
            buf.write_u16::<BigEndian>(value.len() as u16).unwrap();
        } else {
            buf.push(value.len() as u8);
        }
        buf.extend_from_slice(&value);
    }
}

pub(crate) fn read_u8(bytes: &[u8], offset: &mut usize) -> Result<u8, Error> {
    let b = read_n(bytes, offset, 1)?[0];
    Ok(b)
}

pub(crate) fn read_u16(bytes: &[u8], offset: &mut usize) -> Result<u16, Error> {
    let b = read_n(bytes, offset, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32, Error> {
    let b = read_n(bytes, offset, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u32_slice(bytes: &[u8]) -> Result<u32, Error> {
    let mut offset = 0;
    read_u32(bytes, &mut offset)
}

pub(crate) fn read_n<'a>(bytes: &'a [u8], offset: &mut usize, n: usize) -> Result<&'a [u8], Error> {
    if *offset + n > bytes.len() {
        return Err(Error::Truncated {
            offset: *offset,
            needed: *offset + n - bytes.len(),
        });
    }
    let slice = &bytes[*offset..*offset + n];
    *offset += n;
    Ok(slice)
}
