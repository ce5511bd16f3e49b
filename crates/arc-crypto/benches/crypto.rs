use std::sync::OnceLock;

use arc_crypto::{decrypt, encrypt, generate_keypair, KeySize, RsaPrivateKey, RsaPublicKey};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn keypair() -> &'static (RsaPrivateKey, RsaPublicKey) {
    static KEYPAIR: OnceLock<(RsaPrivateKey, RsaPublicKey)> = OnceLock::new();
    KEYPAIR.get_or_init(|| generate_keypair(KeySize::Rsa2048).unwrap())
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let (_, public_key) = keypair();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encrypt(divan::black_box(&data), divan::black_box(public_key)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let (private_key, public_key) = keypair();
    let data = make_data(size);
    let container = encrypt(&data, public_key).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt(
                divan::black_box(&container),
                divan::black_box(private_key),
            )
            .unwrap()
        });
}

#[divan::bench(sample_count = 10)]
fn bench_generate_keypair() {
    generate_keypair(KeySize::Rsa2048).unwrap();
}

fn main() {
    divan::main();
}
