use criterion::{criterion_group, criterion_main, Criterion};

use bgp_codec::open::{decode_open, encode_open, OpenCapability, OpenMessage, OpenParameter};
use bgp_codec::update::{decode_update, encode_update};
use bgp_codec::{BGPRoute, Capabilities, Ipv4Net, Origin, Segment, AFI, SAFI};
use std::net::Ipv4Addr;

fn sample_route() -> BGPRoute {
    BGPRoute {
        origin: Some(Origin::IGP),
        as_path: vec![Segment::Sequence(vec![65000, 65001, 65002])],
        next_hop_v4: Some(Ipv4Addr::new(10, 0, 0, 1)),
        local_pref: Some(100),
        routes_v4: (0..50)
            .map(|i| Ipv4Net {
                length: 24,
                prefix: Ipv4Addr::new(192, 0, i, 0),
            })
            .collect(),
        ..BGPRoute::default()
    }
}

fn sample_open() -> OpenMessage {
    OpenMessage {
        version: 4,
        my_asn: 65000,
        hold_time: 90,
        bgp_id: Ipv4Addr::new(10, 0, 0, 1),
        parameters: vec![OpenParameter::Capabilities(vec![
            OpenCapability::MultiProtocol {
                afi: AFI::IPV4,
                safi: SAFI::Unicast,
            },
            OpenCapability::MultiProtocol {
                afi: AFI::IPV6,
                safi: SAFI::Unicast,
            },
        ])],
    }
}

fn bench_update(c: &mut Criterion) {
    let capabilities = Capabilities::default();
    let route = sample_route();
    let bytes = encode_update(&route, &capabilities).unwrap();

    let mut group = c.benchmark_group("update");
    group.bench_function("encode", |b| {
        b.iter(|| encode_update(&route, &capabilities).unwrap())
    });
    group.bench_function("decode", |b| {
        b.iter(|| decode_update(&bytes, &capabilities).unwrap())
    });
    group.finish();
}

fn bench_open(c: &mut Criterion) {
    let open = sample_open();
    let bytes = encode_open(&open);

    let mut group = c.benchmark_group("open");
    group.bench_function("encode", |b| b.iter(|| encode_open(&open)));
    group.bench_function("decode", |b| b.iter(|| decode_open(&bytes).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_update, bench_open);
criterion_main!(benches);
