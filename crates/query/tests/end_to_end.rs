//! End-to-end expiry behaviour through the public API.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sqlcache_core::cache::{BoundParameters, CacheKey, CacheListener, ExpirationRules, ExpiringCache, Window};
use sqlcache_core::{Clock, Error, ManualClock, Value};
use sqlcache_query::{CachedQueryRunner, QueryCatalog, ResultSet, Row, Statement};
use sqlcache_rewrite::{Record, Rewriter};

#[derive(Default)]
struct ExpiryRecorder {
    expired: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
}

impl CacheListener<CacheKey> for ExpiryRecorder {
    fn on_expire(&self, key: &CacheKey, expired_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.expired.lock().push((key.query_id().to_string(), expired_at, now));
    }
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-20T00:00:00Z").unwrap().with_timezone(&Utc)
}

#[test]
fn test_registered_rule_expires_after_ttl() {
    let clock = Arc::new(ManualClock::new(start()));
    let recorder = Arc::new(ExpiryRecorder::default());

    let rules = ExpirationRules::new();
    rules.load([("Q1", "100ms")]).unwrap();

    let cache: ExpiringCache<CacheKey, String> =
        ExpiringCache::bounded(10, clock.clone()).unwrap().with_listener(recorder.clone());

    let key = CacheKey::builder("Q1").build();
    assert_eq!(key.start_position(), 1);
    assert_eq!(key.max_rows(), 0);

    let expires_at = rules.expiry_for("Q1", clock.now()).unwrap();
    assert_eq!(expires_at - start(), Duration::milliseconds(100));

    cache.add(key.clone(), "result".to_string(), expires_at).unwrap();
    assert_eq!(cache.get_if_not_expired(&key).unwrap().as_deref(), Some("result"));

    clock.advance(Duration::milliseconds(101));
    assert_eq!(cache.get_if_not_expired(&key).unwrap(), None);

    let expired = recorder.expired.lock();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].0, "Q1");
    assert_eq!(expired[0].1, expires_at);
    assert_eq!(expired[0].2, start() + Duration::milliseconds(101));
}

#[test]
fn test_entry_alive_at_exact_expiry() {
    let clock = Arc::new(ManualClock::new(start()));
    let rules = ExpirationRules::new();
    rules.load([("Q1", "100ms")]).unwrap();

    let cache: ExpiringCache<CacheKey, String> = ExpiringCache::bounded(10, clock.clone()).unwrap();
    let key = CacheKey::builder("Q1").build();
    cache.add(key.clone(), "result".to_string(), rules.expiry_for("Q1", clock.now()).unwrap()).unwrap();

    clock.advance(Duration::milliseconds(100));
    assert!(cache.get_if_not_expired(&key).unwrap().is_some());
}

#[test]
fn test_unregistered_id_is_configuration_error() {
    let rules = ExpirationRules::new();
    rules.load([("Q1", "100ms")]).unwrap();
    let result = rules.expiry_for("Q2", start());
    assert!(matches!(result, Err(Error::Configuration(msg)) if msg.contains("Q2")));
}

#[test]
fn test_runner_with_closure_executor() {
    let clock = Arc::new(ManualClock::new(start()));
    let rules = ExpirationRules::new();
    rules.load([("users", "1sec")]).unwrap();

    let catalog = QueryCatalog::new()
        .with("users", "SELECT id, name FROM users WHERE $if(name){name = :name} AND id in (:ids[])");
    let cache = ExpiringCache::bounded(4, clock.clone()).unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&calls);
    let executor = move |statement: &Statement, params: &BoundParameters, window: Window| -> Result<ResultSet, Error> {
        recorded.lock().push(statement.positional_sql());
        let mut rs = ResultSet::with_columns(["id", "name"]);
        for (_, value) in params.iter() {
            rs.push(Row::new(vec![value.clone(), Value::from("alice")]));
        }
        Ok(rs.slice(window))
    };

    let runner = CachedQueryRunner::new(catalog, Rewriter::default(), Arc::new(rules), cache, clock.clone(), executor);
    let conditions = Record::new().with("name", "alice").with("ids", Value::from_iter([7, 8]));

    let first = runner.query("users", &conditions, Window::default()).unwrap();
    let second = runner.query("users", &conditions, Window::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(
        calls.lock().as_slice(),
        ["SELECT id, name FROM users WHERE (0 = 1 or (name = ?)) AND id in (?,?)".to_string()]
    );

    clock.advance(Duration::seconds(2));
    runner.query("users", &conditions, Window::default()).unwrap();
    assert_eq!(calls.lock().len(), 2);
    assert_eq!(runner.stats().expirations(), 1);
}

#[test]
fn test_capacity_evicts_least_recently_used_result() {
    let clock = Arc::new(ManualClock::new(start()));
    let rules = ExpirationRules::new();
    rules.load([("by_id", "1h")]).unwrap();

    let catalog = QueryCatalog::new().with("by_id", "SELECT * FROM users WHERE id = :id");
    let cache = ExpiringCache::bounded(2, clock.clone()).unwrap();
    let executor = |_: &Statement, params: &BoundParameters, _: Window| -> Result<ResultSet, Error> {
        let mut rs = ResultSet::with_columns(["id"]);
        rs.push(params.iter().map(|(_, v)| v.clone()).collect());
        Ok(rs)
    };
    let runner = CachedQueryRunner::new(catalog, Rewriter::default(), Arc::new(rules), cache, clock, executor);

    for id in [1, 2] {
        runner.query("by_id", &Record::new().with("id", id), Window::default()).unwrap();
    }
    // touch 1 so 2 becomes least recently used
    runner.query("by_id", &Record::new().with("id", 1), Window::default()).unwrap();
    runner.query("by_id", &Record::new().with("id", 3), Window::default()).unwrap();

    assert_eq!(runner.stats().evictions(), 1);
    let two = runner.key_for("by_id", &Record::new().with("id", 2), Window::default()).unwrap();
    assert!(!runner.invalidate(&two).unwrap());
    let one = runner.key_for("by_id", &Record::new().with("id", 1), Window::default()).unwrap();
    assert!(runner.invalidate(&one).unwrap());
}
