use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use gatehouse_auth::{Account, CsrfToken, Role, RoleLink, Session, verify_csrf};
use gatehouse_infra::InMemoryStore;
use gatehouse_kernel::{AccountStore, Gatehouse, RequestContext, SessionStore, Settings};

/// Store with one editor account and an open session; returns the cleartext token.
fn seeded_app() -> (Gatehouse<InMemoryStore>, String) {
    let store = InMemoryStore::new();
    let account = Account::new("bench", "$argon2id$unused", Utc::now());
    store.insert_account(account.clone()).unwrap();
    for role in [Role::Member, Role::Editor] {
        store.insert_role_link(RoleLink::new(account.id, role)).unwrap();
    }
    let issued = Session::start(account.id, Utc::now(), Duration::hours(1)).unwrap();
    store.insert_session(issued.session).unwrap();

    (Gatehouse::new(store, Settings::default()), issued.token)
}

fn bench_csrf(c: &mut Criterion) {
    let mut group = c.benchmark_group("csrf");

    group.bench_function("issue", |b| b.iter(|| black_box(CsrfToken::issue())));

    let pair = CsrfToken::issue();
    group.bench_function("verify", |b| {
        b.iter(|| verify_csrf(black_box(Some(pair.token())), black_box(Some(pair.cookie_value()))))
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let (app, session_token) = seeded_app();
    let pair = CsrfToken::issue();

    let unguarded = RequestContext::new();
    let guarded = RequestContext::new()
        .with_submitted_csrf(pair.token())
        .with_stored_csrf_hash(pair.cookie_value())
        .with_session_token(session_token);

    for (label, area, action, ctx) in [
        ("no_guards", "language", "list", &unguarded),
        ("session_editor", "records", "list-records", &guarded),
    ] {
        group.bench_with_input(BenchmarkId::new(label, action), ctx, |b, ctx| {
            b.iter(|| app.dispatch(black_box(area), black_box(action), ctx).unwrap())
        });
    }

    let unknown = RequestContext::new();
    group.bench_function("unknown_action", |b| {
        b.iter(|| app.dispatch("accounts", black_box("  Frobnicate "), &unknown).unwrap_err())
    });

    group.finish();
}

criterion_group!(benches, bench_csrf, bench_dispatch);
criterion_main!(benches);
