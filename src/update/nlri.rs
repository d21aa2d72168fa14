use std::net::{Ipv4Addr, Ipv6Addr};

use crate::{AFI, Error};

/// An IPv4 prefix as carried in UPDATE's withdrawn/announced NLRI sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Net {
    /// Number of significant prefix bits, in `[0, 32]`.
    pub length: u8,
    /// The prefix. Bits beyond `length` are always zero.
    pub prefix: Ipv4Addr,
}

/// An IPv6 prefix, as carried inside MP_REACH_NLRI/MP_UNREACH_NLRI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Net {
    /// Number of significant prefix bits, in `[0, 128]`.
    pub length: u8,
    /// The prefix. Bits beyond `length` are always zero.
    pub prefix: Ipv6Addr,
}

fn octet_length(bit_length: u8) -> usize {
    (usize::from(bit_length) + 7) / 8
}

/// Encodes one IPv4 NLRI entry: `length(1) | ⌈length/8⌉ high-order prefix bytes`.
pub fn encode_ipv4_nlri(nlri: &Ipv4Net) -> Vec<u8> {
    let octets = nlri.prefix.octets();
    let n = octet_length(nlri.length);
    let mut out = Vec::with_capacity(1 + n);
    out.push(nlri.length);
    out.extend_from_slice(&octets[..n]);
    out
}

/// Decodes a sequence of IPv4 NLRI entries packed back-to-back until `bytes` is exhausted.
pub fn decode_ipv4_nlri_seq(bytes: &[u8]) -> Result<Vec<Ipv4Net>, Error> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let length = bytes[offset];
        if length > 32 {
            return Err(Error::InvalidPrefixLength {
                afi: AFI::IPV4,
                length,
            });
        }
        let n = octet_length(length);
        offset += 1;
        if offset + n > bytes.len() {
            return Err(Error::Truncated {
                offset,
                needed: offset + n - bytes.len(),
            });
        }
        let mut octets = [0u8; 4];
        octets[..n].copy_from_slice(&bytes[offset..offset + n]);
        offset += n;
        out.push(Ipv4Net {
            length,
            prefix: Ipv4Addr::from(octets),
        });
    }
    Ok(out)
}

/// Encodes one IPv6 NLRI entry: `length(1) | ⌈length/8⌉ high-order prefix bytes`.
pub fn encode_ipv6_nlri(nlri: &Ipv6Net) -> Vec<u8> {
    let octets = nlri.prefix.octets();
    let n = octet_length(nlri.length);
    let mut out = Vec::with_capacity(1 + n);
    out.push(nlri.length);
    out.extend_from_slice(&octets[..n]);
    out
}

/// Decodes a sequence of IPv6 NLRI entries packed back-to-back until `bytes` is exhausted.
pub fn decode_ipv6_nlri_seq(bytes: &[u8]) -> Result<Vec<Ipv6Net>, Error> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let length = bytes[offset];
        if length > 128 {
            return Err(Error::InvalidPrefixLength {
                afi: AFI::IPV6,
                length,
            });
        }
        let n = octet_length(length);
        offset += 1;
        if offset + n > bytes.len() {
            return Err(Error::Truncated {
                offset,
                needed: offset + n - bytes.len(),
            });
        }
        let mut octets = [0u8; 16];
        octets[..n].copy_from_slice(&bytes[offset..offset + n]);
        offset += n;
        out.push(Ipv6Net {
            length,
            prefix: Ipv6Addr::from(octets),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_nlri_roundtrip_min_bytes() {
        let nlri = Ipv4Net {
            length: 22,
            prefix: Ipv4Addr::new(11, 92, 128, 0),
        };
        let bytes = encode_ipv4_nlri(&nlri);
        // ceil(22/8) = 3 prefix bytes + 1 length byte.
        assert_eq!(bytes.len(), 4);
        let decoded = decode_ipv4_nlri_seq(&bytes).unwrap();
        assert_eq!(decoded, vec![nlri]);
    }

    #[test]
    fn ipv4_nlri_zero_extends_trailing_bits() {
        // /12 truncates to 2 bytes; low-order bits of the third+fourth octet
        // must come back as zero even if never written.
        let bytes = [12u8, 1, 92];
        let decoded = decode_ipv4_nlri_seq(&bytes).unwrap();
        assert_eq!(decoded[0].prefix, Ipv4Addr::new(1, 92, 0, 0));
    }

    #[test]
    fn ipv4_nlri_rejects_out_of_range_length() {
        let bytes = [33u8, 0, 0, 0, 0];
        assert!(matches!(
            decode_ipv4_nlri_seq(&bytes),
            Err(Error::InvalidPrefixLength { length: 33, .. })
        ));
    }

    #[test]
    fn ipv6_nlri_roundtrip() {
        let nlri = Ipv6Net {
            length: 48,
            prefix: "2a00:bdc0:e003::".parse().unwrap(),
        };
        let bytes = encode_ipv6_nlri(&nlri);
        assert_eq!(bytes.len(), 1 + 6);
        let decoded = decode_ipv6_nlri_seq(&bytes).unwrap();
        assert_eq!(decoded, vec![nlri]);
    }

    #[test]
    fn ipv6_nlri_rejects_out_of_range_length() {
        let bytes = [129u8];
        assert!(matches!(
            decode_ipv6_nlri_seq(&bytes),
            Err(Error::InvalidPrefixLength { length: 129, .. })
        ));
    }
}
