mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{MockStreamServer, FIXED_BODY_LEN};
use flvbench_rs::{
    run_load_test, run_sessions, HeaderCheck, HttpStreamSource, LoadTestConfig, SessionError,
    SessionOutcome,
};
use rstest::rstest;

fn config(url: String, clients: usize, duration: Duration) -> LoadTestConfig {
    LoadTestConfig::try_new(url, clients, duration)
        .unwrap()
        .with_connect_timeout(Duration::from_secs(2))
        .with_read_timeout(Duration::from_secs(1))
}

#[rstest]
#[case::skip(HeaderCheck::Skip)]
#[case::enforce(HeaderCheck::Enforce)]
#[tokio::test]
async fn finite_stream_completes_every_session(#[case] header_check: HeaderCheck) {
    let server = MockStreamServer::start().await;
    let clients = 5;
    let duration = Duration::from_secs(1);
    let config =
        config(server.url("/fixed.flv"), clients, duration).with_header_check(header_check);

    let started = Instant::now();
    let report = run_load_test(config).await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= duration, "returned after {elapsed:?}");
    assert!(elapsed < duration + Duration::from_secs(1), "took {elapsed:?}");
    assert_eq!(report.sessions.len(), clients);
    for (idx, session) in report.sessions.iter().enumerate() {
        assert_eq!(session.session_id, idx);
        assert_eq!(session.outcome, "completed");
        assert_eq!(session.total_bytes, FIXED_BODY_LEN as u64);
    }
    assert_eq!(report.overall.total_bytes, (FIXED_BODY_LEN * clients) as u64);
    assert_eq!(report.overall.completed, clients);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn not_found_fails_every_session_with_zero_metrics() {
    let server = MockStreamServer::start().await;
    let config = config(server.url("/missing.flv"), 3, Duration::from_secs(1));
    let source = Arc::new(HttpStreamSource::new(&config).unwrap());

    let run = run_sessions(config, source).await.unwrap();

    assert_eq!(run.records.len(), 3);
    for record in &run.records {
        assert_eq!(
            record.outcome,
            SessionOutcome::Failed(SessionError::UnexpectedStatus { status: 404 })
        );
        assert_eq!(record.metrics.total_bytes, 0);
        assert_eq!(record.metrics.packet_count, 0);
    }

    let report = run.report();
    assert_eq!(report.sessions.len(), 3);
    assert!(report
        .sessions
        .iter()
        .all(|s| s.duration_secs == 0.0 && s.throughput_bps == 0.0));
    assert_eq!(report.overall.failed, 3);
    assert_eq!(report, run.report());
}

#[tokio::test]
async fn endless_stream_is_cancelled_at_deadline() {
    let server = MockStreamServer::start().await;
    let duration = Duration::from_secs(2);
    let config =
        config(server.url("/live.flv"), 4, duration).with_header_check(HeaderCheck::Enforce);
    let read_timeout = config.read_timeout;
    let source = Arc::new(HttpStreamSource::new(&config).unwrap());

    let started = Instant::now();
    let run = run_sessions(config, source).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= duration);
    assert!(
        elapsed < duration + read_timeout + Duration::from_millis(500),
        "took {elapsed:?}"
    );
    for record in &run.records {
        assert_eq!(record.outcome, SessionOutcome::Cancelled);
        assert!(record.metrics.total_bytes > 0);
        assert!(!record.metrics.latencies.is_empty());
    }
}

#[tokio::test]
async fn stalled_stream_cannot_block_shutdown() {
    let server = MockStreamServer::start().await;
    let duration = Duration::from_millis(300);
    let config = config(server.url("/stall.flv"), 2, duration);
    let source = Arc::new(HttpStreamSource::new(&config).unwrap());

    let started = Instant::now();
    let run = run_sessions(config, source).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    for record in &run.records {
        assert_eq!(record.outcome, SessionOutcome::Cancelled);
        assert_eq!(record.metrics.total_bytes, 9);
    }
}

#[tokio::test]
async fn stalled_stream_times_out_before_deadline() {
    let server = MockStreamServer::start().await;
    let config = config(server.url("/stall.flv"), 1, Duration::from_secs(1))
        .with_read_timeout(Duration::from_millis(200));
    let source = Arc::new(HttpStreamSource::new(&config).unwrap());

    let run = run_sessions(config, source).await.unwrap();

    assert!(matches!(
        run.records[0].outcome,
        SessionOutcome::Failed(SessionError::ReadTimeout(_))
    ));
}

#[tokio::test]
async fn bad_signature_fails_only_when_enforced() {
    let server = MockStreamServer::start().await;

    let enforced = config(server.url("/garbage.flv"), 2, Duration::from_secs(1))
        .with_header_check(HeaderCheck::Enforce);
    let report = run_load_test(enforced).await.unwrap();
    assert_eq!(report.overall.failed, 2);
    assert_eq!(report.overall.total_bytes, 0);
    assert!(report.failures[0].error.contains("malformed container header"));

    let skipped = config(server.url("/garbage.flv"), 2, Duration::from_secs(1));
    let report = run_load_test(skipped).await.unwrap();
    assert_eq!(report.overall.completed, 2);
    assert_eq!(report.overall.total_bytes, (FIXED_BODY_LEN * 2) as u64);
}

#[tokio::test]
async fn refused_connection_is_session_local() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{port}/live.flv");
    let config = config(url, 2, Duration::from_secs(1));
    let source = Arc::new(HttpStreamSource::new(&config).unwrap());

    let run = run_sessions(config, source).await.unwrap();

    assert_eq!(run.records.len(), 2);
    for record in &run.records {
        assert!(matches!(
            record.outcome,
            SessionOutcome::Failed(SessionError::ConnectFailure(_))
        ));
    }
}
