use criterion::{criterion_group, criterion_main, Criterion};
use fibril::Value;

pub fn bench_create_run_collect(c: &mut Criterion) {
    fibril::init();
    c.bench_function("create_run_collect", |b| {
        b.iter(|| {
            let handle = fibril::create("bench", |_| {}).unwrap();
            fibril::resume(handle, Value::NULL).unwrap();
            fibril::collect().unwrap();
        })
    });
    fibril::teardown().unwrap();
}

pub fn bench_resume_yield(c: &mut Criterion) {
    fibril::init();
    let echo = fibril::create("echo", |mut value| loop {
        value = fibril::yield_now(value).unwrap();
    })
    .unwrap();

    c.bench_function("resume_yield", |b| {
        b.iter(|| fibril::resume(echo, Value::from(1)).unwrap())
    });
    fibril::teardown().unwrap();
}

criterion_group!(benches, bench_create_run_collect, bench_resume_yield);
criterion_main!(benches);
