//! The BGP UPDATE message.
//!
//! Wire layout: `wd_len(2) | withdrawn | pa_len(2) | path_attrs | announced`.
//! [`decode_update`] walks that layout once into an ordered list of
//! [`PathAttribute`] values and folds each into the denormalized [`BGPRoute`]
//! view callers actually want; [`encode_update`] reverses the fold.

/// Tagged path-attribute codec (ORIGIN, AS_PATH, NEXT_HOP, MP_REACH_NLRI, ...).
pub mod attributes;
/// Bit-packed IPv4/IPv6 prefix (NLRI) codec.
pub mod nlri;

use byteorder::{BigEndian, WriteBytesExt};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::update::attributes::{
    read_n, read_u16, MpReachNlri, MpUnreachNlri, Origin, PathAttribute, Segment,
};
use crate::update::nlri::{decode_ipv4_nlri_seq, encode_ipv4_nlri, Ipv4Net, Ipv6Net};
use crate::{Capabilities, Error, AFI, SAFI};

use std::collections::HashSet;

/// The denormalized, caller-facing view of a decoded UPDATE message.
///
/// This is what [`crate::decode_message`] hands back for an UPDATE: the raw
/// path-attribute TLV walk is folded into named fields as it is decoded.
/// Attributes this crate does not model directly are preserved byte-exact in
/// `unknown_attributes` so a re-encode round-trips them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BGPRoute {
    /// How the announced routes were generated.
    pub origin: Option<Origin>,
    /// The AS path the announced routes have traversed.
    pub as_path: Vec<Segment>,
    /// The IPv4 next hop for announced IPv4 routes.
    pub next_hop_v4: Option<Ipv4Addr>,
    /// The IPv6 next hop for announced IPv6 routes (carried in MP_REACH_NLRI).
    pub next_hop_v6: Option<Ipv6Addr>,
    /// MULTI_EXIT_DISC, if present.
    pub med: Option<u32>,
    /// LOCAL_PREF, if present.
    pub local_pref: Option<u32>,
    /// Whether ATOMIC_AGGREGATE was present.
    pub atomic_aggregate: bool,
    /// The aggregating ASN and BGP identifier, if AGGREGATOR was present.
    pub aggregator: Option<(u32, Ipv4Addr)>,
    /// COMMUNITIES, if present.
    pub communities: Vec<u32>,
    /// Announced IPv4 prefixes.
    pub routes_v4: Vec<Ipv4Net>,
    /// Announced IPv6 prefixes (carried in MP_REACH_NLRI).
    pub routes_v6: Vec<Ipv6Net>,
    /// Withdrawn IPv4 prefixes.
    pub withdraw_v4: Vec<Ipv4Net>,
    /// Withdrawn IPv6 prefixes (carried in MP_UNREACH_NLRI).
    pub withdraw_v6: Vec<Ipv6Net>,
    /// Attributes this crate does not interpret, preserved byte-exact.
    pub unknown_attributes: Vec<PathAttribute>,
}

impl BGPRoute {
    /// An empty route, as carried by the End-of-RIB marker.
    pub fn is_empty(&self) -> bool {
        *self == BGPRoute::default()
    }
}

fn apply_attribute(route: &mut BGPRoute, attr: PathAttribute) {
    match attr {
        PathAttribute::Origin(origin) => route.origin = Some(origin),
        PathAttribute::AsPath(segments) => route.as_path = segments,
        PathAttribute::NextHop(addr) => route.next_hop_v4 = Some(addr),
        PathAttribute::Med(med) => route.med = Some(med),
        PathAttribute::LocalPref(pref) => route.local_pref = Some(pref),
        PathAttribute::AtomicAggregate => route.atomic_aggregate = true,
        PathAttribute::Aggregator { asn, id } => route.aggregator = Some((asn, id)),
        PathAttribute::Communities(communities) => route.communities = communities,
        PathAttribute::MpReachNlri(mp_reach) => {
            route.next_hop_v6 = Some(mp_reach.next_hop);
            route.routes_v6 = mp_reach.nlri;
        }
        PathAttribute::MpUnreachNlri(mp_unreach) => {
            route.withdraw_v6 = mp_unreach.withdrawn;
        }
        unknown @ PathAttribute::Unknown { .. } => route.unknown_attributes.push(unknown),
    }
}

/// Decodes an UPDATE message body.
///
/// An UPDATE with no withdrawn routes, no path attributes, and no announced
/// routes is valid: it is the IPv4/unicast End-of-RIB marker.
pub fn decode_update(body: &[u8], capabilities: &Capabilities) -> Result<BGPRoute, Error> {
    let mut offset = 0;
    let wd_len = read_u16(body, &mut offset)? as usize;
    let withdrawn_bytes = read_n(body, &mut offset, wd_len)?;
    let withdraw_v4 = decode_ipv4_nlri_seq(withdrawn_bytes)?;

    let pa_len = read_u16(body, &mut offset)? as usize;
    let attr_bytes = read_n(body, &mut offset, pa_len)?;

    let mut route = BGPRoute {
        withdraw_v4,
        ..BGPRoute::default()
    };

    let mut seen = HashSet::new();
    let mut pos = 0;
    while pos < attr_bytes.len() {
        let (attr, consumed) = PathAttribute::decode(&attr_bytes[pos..], capabilities)?;
        if !seen.insert(attr.type_code()) {
            return Err(Error::MalformedAttributeList(attr.type_code()));
        }
        pos += consumed;
        apply_attribute(&mut route, attr);
    }

    route.routes_v4 = decode_ipv4_nlri_seq(&body[offset..])?;

    log::trace!(
        "decoded UPDATE: {} withdrawn v4, {} announced v4, {} attribute(s)",
        route.withdraw_v4.len(),
        route.routes_v4.len(),
        seen.len()
    );

    Ok(route)
}

/// Encodes an UPDATE message carrying `route`'s announcements (and, if
/// `route.withdraw_v4`/`route.withdraw_v6` are non-empty, withdrawals too).
///
/// `capabilities` governs the AS_PATH segment width, matching the value
/// passed to [`decode_update`] for the same session.
pub fn encode_update(route: &BGPRoute, capabilities: &Capabilities) -> Result<Vec<u8>, Error> {
    let mut withdrawn = Vec::new();
    for nlri in &route.withdraw_v4 {
        withdrawn.extend_from_slice(&encode_ipv4_nlri(nlri));
    }

    let mut attrs = Vec::new();
    let is_announcement = !route.routes_v4.is_empty() || !route.routes_v6.is_empty();

    if let Some(origin) = route.origin {
        PathAttribute::Origin(origin).encode(&mut attrs, capabilities);
    }
    if is_announcement {
        PathAttribute::AsPath(route.as_path.clone()).encode(&mut attrs, capabilities);
    }
    if let Some(next_hop) = route.next_hop_v4 {
        PathAttribute::NextHop(next_hop).encode(&mut attrs, capabilities);
    }
    if let Some(med) = route.med {
        PathAttribute::Med(med).encode(&mut attrs, capabilities);
    }
    if let Some(local_pref) = route.local_pref {
        PathAttribute::LocalPref(local_pref).encode(&mut attrs, capabilities);
    }
    if route.atomic_aggregate {
        PathAttribute::AtomicAggregate.encode(&mut attrs, capabilities);
    }
    if let Some((asn, id)) = route.aggregator {
        PathAttribute::Aggregator { asn, id }.encode(&mut attrs, capabilities);
    }
    if !route.communities.is_empty() {
        PathAttribute::Communities(route.communities.clone()).encode(&mut attrs, capabilities);
    }
    if !route.routes_v6.is_empty() {
        let next_hop = route.next_hop_v6.ok_or_else(|| {
            Error::UnsupportedFeature("IPv6 routes announced without a next hop".to_string())
        })?;
        PathAttribute::MpReachNlri(MpReachNlri {
            afi: AFI::IPV6,
            safi: SAFI::Unicast,
            next_hop,
            nlri: route.routes_v6.clone(),
        })
        .encode(&mut attrs, capabilities);
    }
    if !route.withdraw_v6.is_empty() {
        PathAttribute::MpUnreachNlri(MpUnreachNlri {
            afi: AFI::IPV6,
            safi: SAFI::Unicast,
            withdrawn: route.withdraw_v6.clone(),
        })
        .encode(&mut attrs, capabilities);
    }
    for attr in &route.unknown_attributes {
        attr.encode(&mut attrs, capabilities);
    }

    let mut announced = Vec::new();
    for nlri in &route.routes_v4 {
        announced.extend_from_slice(&encode_ipv4_nlri(nlri));
    }

    let mut out = Vec::with_capacity(4 + withdrawn.len() + attrs.len() + announced.len());
    out.write_u16::<BigEndian>(withdrawn.len() as u16)?;
    out.extend_from_slice(&withdrawn);
    out.write_u16::<BigEndian>(attrs.len() as u16)?;
    out.extend_from_slice(&attrs);
    out.extend_from_slice(&announced);
    Ok(out)
}

/// Encodes an UPDATE message carrying only `route`'s withdrawals: empty
/// path-attribute section, no announced routes.
pub fn encode_withdraw_update(route: &BGPRoute, capabilities: &Capabilities) -> Result<Vec<u8>, Error> {
    let mut withdrawn = Vec::new();
    for nlri in &route.withdraw_v4 {
        withdrawn.extend_from_slice(&encode_ipv4_nlri(nlri));
    }

    let mut attrs = Vec::new();
    if !route.withdraw_v6.is_empty() {
        PathAttribute::MpUnreachNlri(MpUnreachNlri {
            afi: AFI::IPV6,
            safi: SAFI::Unicast,
            withdrawn: route.withdraw_v6.clone(),
        })
        .encode(&mut attrs, capabilities);
    }

    let mut out = Vec::with_capacity(4 + withdrawn.len() + attrs.len());
    out.write_u16::<BigEndian>(withdrawn.len() as u16)?;
    out.extend_from_slice(&withdrawn);
    out.write_u16::<BigEndian>(attrs.len() as u16)?;
    out.extend_from_slice(&attrs);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_nlri(length: u8, a: u8, b: u8, c: u8, d: u8) -> Ipv4Net {
        Ipv4Net {
            length,
            prefix: Ipv4Addr::new(a, b, c, d),
        }
    }

    #[test]
    fn empty_update_is_end_of_rib() {
        let route = BGPRoute::default();
        let capabilities = Capabilities::default();
        let bytes = encode_update(&route, &capabilities).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        let decoded = decode_update(&bytes, &capabilities).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn ipv4_update_roundtrip() {
        let capabilities = Capabilities::default();
        let route = BGPRoute {
            origin: Some(Origin::IGP),
            as_path: vec![Segment::Sequence(vec![65000])],
            next_hop_v4: Some(Ipv4Addr::new(10, 0, 0, 2)),
            local_pref: Some(100),
            routes_v4: vec![ipv4_nlri(32, 1, 1, 1, 1), ipv4_nlri(32, 1, 1, 1, 2)],
            ..BGPRoute::default()
        };
        let bytes = encode_update(&route, &capabilities).unwrap();
        let decoded = decode_update(&bytes, &capabilities).unwrap();
        assert_eq!(decoded, route);
    }

    #[test]
    fn duplicate_attribute_is_malformed() {
        let capabilities = Capabilities::default();
        // wd_len=0, pa_len=8, two ORIGIN attributes (flags=0x40,type=1,len=1,value=0) each.
        let body = [0u8, 0, 0, 8, 0x40, 1, 1, 0, 0x40, 1, 1, 0];
        assert!(matches!(
            decode_update(&body, &capabilities),
            Err(Error::MalformedAttributeList(1))
        ));
    }

    #[test]
    fn withdraw_only_update_roundtrip() {
        let capabilities = Capabilities::default();
        let route = BGPRoute {
            withdraw_v4: vec![ipv4_nlri(24, 192, 0, 2, 0)],
            ..BGPRoute::default()
        };
        let bytes = encode_withdraw_update(&route, &capabilities).unwrap();
        let decoded = decode_update(&bytes, &capabilities).unwrap();
        assert_eq!(decoded.withdraw_v4, route.withdraw_v4);
        assert!(decoded.routes_v4.is_empty());
    }

    #[test]
    fn ipv6_announcement_requires_next_hop() {
        let capabilities = Capabilities::default();
        let route = BGPRoute {
            routes_v6: vec![Ipv6Net {
                length: 48,
                prefix: "2a00:bdc0:e003::".parse().unwrap(),
            }],
            ..BGPRoute::default()
        };
        assert!(matches!(
            encode_update(&route, &capabilities),
            Err(Error::UnsupportedFeature(_))
        ));
    }
}
