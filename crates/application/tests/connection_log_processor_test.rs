use netlog_application::services::{
    ConnectionLogProcessor, InMemoryAppRegistry, IpDomainCache,
};
use netlog_domain::DomainError;
use std::sync::Arc;

mod helpers;
use helpers::{connection_event, MockConnectionLogRepository};

fn processor(
    repo: Arc<MockConnectionLogRepository>,
    cache: Arc<IpDomainCache>,
    apps: Option<Arc<InMemoryAppRegistry>>,
) -> ConnectionLogProcessor {
    ConnectionLogProcessor::new(
        repo,
        cache,
        apps.map(|a| a as Arc<dyn netlog_application::ports::AppRegistry>),
    )
}

#[test]
fn test_record_copies_event_fields() {
    let repo = Arc::new(MockConnectionLogRepository::new());
    let processor = processor(repo, Arc::new(IpDomainCache::new(16)), None);

    let record = processor
        .make_connection_record(connection_event("c1", "93.184.216.34:443"))
        .unwrap();

    assert_eq!(&*record.conn_id, "c1");
    assert_eq!(record.dest_ip.to_string(), "93.184.216.34");
    assert_eq!(record.dest_port, 443);
    assert_eq!(record.source_port, 40000);
    assert_eq!(record.duration_ms, 250);
    assert_eq!(record.total_bytes(), 4608);
    assert_eq!(record.timestamp_ms, 1_700_000_000_000);
    assert!(record.id.is_none());
    assert!(record.dns_query.is_none());
    assert!(record.app_name.is_none());
}

#[test]
fn test_enriches_from_ip_cache_and_app_registry() {
    let cache = Arc::new(IpDomainCache::new(16));
    cache.insert("93.184.216.34".parse().unwrap(), Arc::from("example.com"));
    let apps = Arc::new(InMemoryAppRegistry::new());
    apps.register(10_123, "org.example.browser");

    let processor = processor(
        Arc::new(MockConnectionLogRepository::new()),
        cache,
        Some(apps),
    );
    let record = processor
        .make_connection_record(connection_event("c1", "93.184.216.34:443"))
        .unwrap();

    assert_eq!(record.dns_query.as_deref(), Some("example.com"));
    assert_eq!(record.app_name.as_deref(), Some("org.example.browser"));
}

#[test]
fn test_event_query_wins_over_cache() {
    let cache = Arc::new(IpDomainCache::new(16));
    cache.insert("93.184.216.34".parse().unwrap(), Arc::from("cached.example"));
    let processor = processor(Arc::new(MockConnectionLogRepository::new()), cache, None);

    let mut event = connection_event("c1", "93.184.216.34:443");
    event.query = Some(Arc::from("direct.example"));
    let record = processor.make_connection_record(event).unwrap();

    assert_eq!(record.dns_query.as_deref(), Some("direct.example"));
}

#[test]
fn test_conversion_is_deterministic() {
    let processor = processor(
        Arc::new(MockConnectionLogRepository::new()),
        Arc::new(IpDomainCache::new(16)),
        None,
    );
    let a = processor
        .make_connection_record(connection_event("c1", "1.1.1.1:53"))
        .unwrap();
    let b = processor
        .make_connection_record(connection_event("c1", "1.1.1.1:53"))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_open_connection_has_zero_duration() {
    let processor = processor(
        Arc::new(MockConnectionLogRepository::new()),
        Arc::new(IpDomainCache::new(16)),
        None,
    );
    let mut event = connection_event("c1", "1.1.1.1:53");
    event.ended_at_ms = None;
    assert_eq!(processor.make_connection_record(event).unwrap().duration_ms, 0);
}

#[test]
fn test_malformed_events_rejected() {
    let processor = processor(
        Arc::new(MockConnectionLogRepository::new()),
        Arc::new(IpDomainCache::new(16)),
        None,
    );

    let mut no_id = connection_event("", "1.1.1.1:53");
    no_id.conn_id = Arc::from("  ");
    assert!(matches!(
        processor.make_connection_record(no_id),
        Err(DomainError::InvalidEvent(_))
    ));

    let mut backwards = connection_event("c2", "1.1.1.1:53");
    backwards.ended_at_ms = Some(backwards.started_at_ms - 1);
    assert!(matches!(
        processor.make_connection_record(backwards),
        Err(DomainError::InvalidEvent(_))
    ));

    let mut unstarted = connection_event("c3", "1.1.1.1:53");
    unstarted.started_at_ms = 0;
    assert!(processor.make_connection_record(unstarted).is_err());
}

#[tokio::test]
async fn test_insert_batch_delegates_to_repository() {
    let repo = Arc::new(MockConnectionLogRepository::new());
    let processor = processor(repo.clone(), Arc::new(IpDomainCache::new(16)), None);
    let records = vec![
        processor
            .make_connection_record(connection_event("c1", "1.1.1.1:53"))
            .unwrap(),
        processor
            .make_connection_record(connection_event("c2", "8.8.8.8:53"))
            .unwrap(),
    ];

    processor.insert_batch(records).await.unwrap();

    let batches = repo.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(&*batches[0][1].conn_id, "c2");
}

#[tokio::test]
async fn test_insert_batch_propagates_failure() {
    let repo = Arc::new(MockConnectionLogRepository::new());
    repo.set_should_fail(true);
    let processor = processor(repo, Arc::new(IpDomainCache::new(16)), None);

    let result = processor.insert_batch(Vec::new()).await;
    assert!(matches!(result, Err(DomainError::DatabaseError(_))));
}
