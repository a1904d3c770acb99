use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use osc_address::{Address, url};

const URLS: &[(&str, &str)] = &[
    ("udp", "osc.udp://localhost:7770/"),
    ("tcp-ipv6", "osc.tcp://[fe80::aede:48ff:fe00:1122]:57120/"),
    ("unix", "osc.unix:///tmp/osc.sock"),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("OSC URL Parse");

    for &(name, input) in URLS {
        group.bench_with_input(BenchmarkId::new("from_url", name), input, |b, input| {
            b.iter(|| Address::from_url(black_box(input)))
        });

        group.bench_with_input(BenchmarkId::new("extract", name), input, |b, input| {
            b.iter(|| {
                let input = black_box(input);
                (
                    url::extract_host(input),
                    url::extract_port(input),
                    url::extract_path(input),
                )
            })
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("OSC URL Render");

    for &(name, input) in URLS {
        let addr = Address::from_url(input).unwrap();
        group.bench_with_input(BenchmarkId::new("url", name), &addr, |b, addr| {
            b.iter(|| black_box(addr).url())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
