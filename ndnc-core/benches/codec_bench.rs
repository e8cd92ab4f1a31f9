use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndnc_core::{Data, Interest, KeyChain, MemoryKeyStore, Name};

fn sample_data() -> Data {
    let mut data = Data::new(Name::from_uri("/ndn/bench/data/%FD%01/%00%07").unwrap());
    data.set_content(vec![0x5a; 1024]);
    data
}

fn benchmark_interest_codec(c: &mut Criterion) {
    c.bench_function("interest_encode", |b| {
        b.iter(|| {
            let mut interest = Interest::new(Name::from_uri("/ndn/bench/interest").unwrap());
            interest.set_must_be_fresh(true).set_nonce(vec![1, 2, 3, 4]);
            let _ = interest.wire_encode().unwrap();
        })
    });

    c.bench_function("interest_decode", |b| {
        let mut interest = Interest::new(Name::from_uri("/ndn/bench/interest").unwrap());
        let encoding = interest.wire_encode().unwrap();

        b.iter(|| {
            let _ = Interest::wire_decode(black_box(encoding.bytes())).unwrap();
        })
    });
}

fn benchmark_data_codec(c: &mut Criterion) {
    c.bench_function("data_encode", |b| {
        b.iter(|| {
            let mut data = sample_data();
            let _ = data.wire_encode().unwrap();
        })
    });

    c.bench_function("data_decode", |b| {
        let encoding = sample_data().wire_encode().unwrap();

        b.iter(|| {
            let _ = Data::wire_decode(black_box(encoding.bytes())).unwrap();
        })
    });

    c.bench_function("data_sign_sha256", |b| {
        let key_chain = KeyChain::new(MemoryKeyStore::new());

        b.iter(|| {
            let mut data = sample_data();
            key_chain.sign_data_with_sha256(black_box(&mut data)).unwrap();
        })
    });
}

criterion_group!(benches, benchmark_interest_codec, benchmark_data_codec);
criterion_main!(benches);
