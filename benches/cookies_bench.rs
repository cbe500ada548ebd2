use corenet::CookieJar;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use url::Url;

fn benchmark_cookie_insert(c: &mut Criterion) {
    let jar = CookieJar::new();
    let url = Url::parse("https://example.com").unwrap();

    c.bench_function("cookie_set_cookie", |b| {
        b.iter(|| {
            let _ = jar.set_cookie(black_box(&url), black_box("foo=bar; Path=/; Secure"));
        })
    });
}

fn benchmark_cookie_header(c: &mut Criterion) {
    let jar = CookieJar::new();
    let url = Url::parse("https://example.com/foo/bar").unwrap();
    for i in 0..40 {
        let _ = jar.set_cookie(&url, &format!("cookie{}=val; Path=/foo", i));
    }

    c.bench_function("cookie_header_for_url", |b| {
        b.iter(|| black_box(jar.header_for_url(black_box(&url))))
    });
}

criterion_group!(benches, benchmark_cookie_insert, benchmark_cookie_header);
criterion_main!(benches);
