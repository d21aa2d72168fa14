use bgp_codec::update::decode_update;
use bgp_codec::{decode_header, decode_message, Capabilities, Message};
use std::net::Ipv4Addr;

fn framed(hex_no_marker: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xFFu8; 16];
    frame.extend_from_slice(hex_no_marker);
    frame
}

#[test]
fn decodes_update_with_origin_next_hop_local_pref_and_announced_routes() {
    #[rustfmt::skip]
    let frame = framed(&[
        0x00, 0x36, 0x02, // length=54, type=UPDATE
        0x00, 0x00, // withdrawn routes length
        0x00, 0x15, // path attribute length = 21
        0x40, 0x01, 0x01, 0x00, // ORIGIN = IGP
        0x40, 0x02, 0x00, // AS_PATH, empty
        0x40, 0x03, 0x04, 0x0a, 0x00, 0x00, 0x02, // NEXT_HOP = 10.0.0.2
        0x40, 0x05, 0x04, 0x00, 0x00, 0x00, 0x64, // LOCAL_PREF = 100
        0x20, 0x01, 0x01, 0x01, 0x01, // 1.1.1.1/32
        0x20, 0x01, 0x01, 0x01, 0x02, // 1.1.1.2/32
    ]);

    let (header, rest_len) = decode_header(&frame).unwrap();
    assert_eq!(rest_len, frame.len() - 19);
    let message =
        decode_message(header.message_type, &Capabilities::default(), &frame[19..]).unwrap();

    let route = match message {
        Message::Update(route) => route,
        other => panic!("expected Update, got {:?}", other),
    };

    assert!(route.origin.is_some());
    assert!(route.as_path.is_empty());
    assert_eq!(route.next_hop_v4, Some(Ipv4Addr::new(10, 0, 0, 2)));
    assert_eq!(route.local_pref, Some(100));
    assert_eq!(route.routes_v4.len(), 2);
    assert_eq!(route.routes_v4[0].prefix, Ipv4Addr::new(1, 1, 1, 1));
    assert_eq!(route.routes_v4[0].length, 32);
    assert_eq!(route.routes_v4[1].prefix, Ipv4Addr::new(1, 1, 1, 2));

    let reencoded = decode_update(&frame[19..], &Capabilities::default()).unwrap();
    assert_eq!(reencoded, route);
}

#[test]
fn decodes_empty_update_as_end_of_rib() {
    let frame = framed(&[0x00, 0x17, 0x02, 0x00, 0x00, 0x00, 0x00]);
    let (header, _) = decode_header(&frame).unwrap();
    let message =
        decode_message(header.message_type, &Capabilities::default(), &frame[19..]).unwrap();
    match message {
        Message::Update(route) => assert!(route.is_empty()),
        other => panic!("expected Update, got {:?}", other),
    }
}

#[test]
fn decodes_notification_cease_collision() {
    let frame = framed(&[0x00, 0x15, 0x03, 0x06, 0x07]);
    let (header, _) = decode_header(&frame).unwrap();
    let message =
        decode_message(header.message_type, &Capabilities::default(), &frame[19..]).unwrap();
    match message {
        Message::Notification(n) => {
            assert_eq!(n.error_code, 6);
            assert_eq!(n.error_subcode, 7);
            assert!(n.data.is_empty());
        }
        other => panic!("expected Notification, got {:?}", other),
    }
}

#[test]
fn decodes_keepalive() {
    let frame = framed(&[0x00, 0x13, 0x04]);
    let (header, rest_len) = decode_header(&frame).unwrap();
    assert_eq!(rest_len, 0);
    let message =
        decode_message(header.message_type, &Capabilities::default(), &[]).unwrap();
    assert!(matches!(message, Message::KeepAlive));
}
