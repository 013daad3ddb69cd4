//! End-to-end tests against the mock Xandr server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background thread
//! and drives a real `Session` over HTTP, so URL building, auth headers,
//! JSON bodies and envelope decoding are all exercised together.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mock_server::{MockConfig, MockState};
use serde_json::json;
use xandr_core::{ApiError, ReportDownload, Session, SessionConfig};

/// Start the mock server on a random port and return its address.
fn spawn_server(state: MockState) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, state).await
        })
        .unwrap();
    });

    addr
}

fn seeded_server() -> SocketAddr {
    spawn_server(MockState::seeded(MockConfig::default()))
}

fn session(addr: SocketAddr, password: &str) -> Session {
    let config = SessionConfig::new("api-user", password).with_base_url(format!("http://{addr}"));
    Session::new(config).unwrap()
}

fn logged_in(addr: SocketAddr) -> Session {
    let session = session(addr, "api-pass");
    session.login().unwrap();
    session
}

#[test]
fn login_sets_token() {
    let addr = seeded_server();
    let session = session(addr, "api-pass");
    assert!(!session.is_authenticated());

    session.login().unwrap();
    assert!(session.token().unwrap().starts_with("hbapi:"));
}

#[test]
fn login_with_wrong_password_reports_failure() {
    let addr = seeded_server();
    let session = session(addr, "wrong");

    let err = session.login().unwrap_err();
    assert!(err.is_auth_failure(), "unexpected error: {err}");
    assert!(!session.is_authenticated());
}

#[test]
fn login_against_unreachable_host_reports_transport_failure() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let session = session(addr, "api-pass");

    assert!(matches!(session.login(), Err(ApiError::Transport(_))));
    assert!(!session.is_authenticated());
}

#[test]
fn login_against_silent_server_times_out() {
    // Accepts connections and holds them open without ever answering.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            held.push(stream);
        }
    });

    let config = SessionConfig::new("api-user", "api-pass")
        .with_base_url(format!("http://{addr}"))
        .with_timeout(Duration::from_secs(1));
    let session = Session::new(config).unwrap();

    let started = Instant::now();
    let result = session.login();
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(ApiError::Transport(_))), "unexpected result: {result:?}");
    assert!(elapsed < Duration::from_secs(5), "login took {elapsed:?}");
    assert!(!session.is_authenticated());
}

#[test]
fn session_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();

    let session = logged_in(seeded_server());
    std::thread::scope(|scope| {
        let names = scope.spawn(|| session.advertisers().get_name(51));
        let page = scope.spawn(|| session.segments().list(100));

        assert_eq!(names.join().unwrap().unwrap(), "Acme Shoes");
        assert_eq!(page.join().unwrap().unwrap()["num_elements"], 20);
    });
}

#[test]
fn generic_get_returns_decoded_body() {
    let session = logged_in(seeded_server());
    let body = session.get("advertiser?id=51").unwrap();
    assert_eq!(body["response"]["advertiser"]["id"], 51);
}

#[test]
fn advertiser_name() {
    let session = logged_in(seeded_server());
    assert_eq!(session.advertisers().get_name(51).unwrap(), "Acme Shoes");

    let err = session.advertisers().get_name(4040).unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 404, .. }));
}

#[test]
fn segment_paging_offset() {
    let session = logged_in(seeded_server());

    let page = session.segments().list(50).unwrap();
    assert_eq!(page["start_element"], 50);
    assert_eq!(page["segments"][0]["id"], 51);

    let first = session.segments().list_first_page().unwrap();
    assert_eq!(first["num_elements"], 100);
}

#[test]
fn report_lifecycle() {
    let session = logged_in(seeded_server());
    let reports = session.reports();

    let submitted = reports
        .submit(&json!({"report": {"report_type": "advertiser_analytics", "columns": ["day", "imps"]}}), 51)
        .unwrap();
    let report_id = xandr_core::submitted_report_id(&submitted).unwrap().to_string();

    // The mock answers `pending` to the first status check.
    assert_eq!(
        reports.download(&report_id).unwrap(),
        ReportDownload::NotReady {
            execution_status: "pending".to_string()
        }
    );

    match reports.download(&report_id).unwrap() {
        ReportDownload::Ready(csv) => {
            let csv = String::from_utf8(csv).unwrap();
            assert!(csv.starts_with("day,advertiser_id,imps\n"));
            assert!(csv.contains(",51,"));
        }
        other => panic!("expected a ready report, got {other:?}"),
    }
}

#[test]
fn report_download_ready_on_first_attempt() {
    let addr = spawn_server(MockState::seeded(MockConfig {
        checks_until_ready: 0,
        ..MockConfig::default()
    }));
    let session = logged_in(addr);
    let reports = session.reports();

    let submitted = reports
        .submit(&json!({"report": {"report_type": "advertiser_analytics"}}), 51)
        .unwrap();
    let report_id = xandr_core::submitted_report_id(&submitted).unwrap().to_string();

    assert!(reports.download(&report_id).unwrap().is_ready());
}

#[test]
fn submit_without_report_type_is_rejected() {
    let session = logged_in(seeded_server());
    let err = session.reports().submit(&json!({"report": {}}), 51).unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));
}

#[test]
fn profile_round_trip_with_configured_member() {
    let addr = seeded_server();
    let config = SessionConfig::new("api-user", "api-pass")
        .with_base_url(format!("http://{addr}"))
        .with_member_id(1001);
    let session = Session::new(config).unwrap();
    session.login().unwrap();

    let created = session
        .profiles()
        .create_item(51, &json!({"profile": {"country_action": "include"}}))
        .unwrap();
    assert_eq!(created["member_id"], 1001);

    let id = created["id"].as_u64().unwrap();
    let fetched = session.profiles().get_item(51, id).unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn insertion_order_create_reflects_template_mutation_once() {
    let session = logged_in(seeded_server());
    let mut template = json!({"insertion-order": {"name": "placeholder", "state": "inactive"}});

    let created = session
        .insertion_orders()
        .create(51, "Spring Sale", &mut template)
        .unwrap();

    assert_eq!(created["name"], "Spring Sale");
    assert_eq!(created["advertiser_id"], 51);
    assert_eq!(created["state"], "inactive");
    let keys: Vec<&String> = created.as_object().unwrap().keys().collect();
    assert_eq!(keys.iter().filter(|k| k.as_str() == "name").count(), 1);
    assert_eq!(template["insertion-order"]["name"], "Spring Sale");
}

#[test]
fn line_item_from_live_insertion_order_and_profile() {
    let session = logged_in(seeded_server());

    let insertion_order = session.insertion_orders().get(300).unwrap();
    assert_eq!(session.insertion_orders().get_profile_id(300).unwrap(), 42);
    let profile = session.profiles().get_item(51, 42).unwrap();

    let mut template = json!({
        "line-item": {
            "name": "Retargeting",
            "advertiser": {},
            "budget_intervals": [{"start_date": null, "end_date": null}],
            "insertion_orders": [{"id": 0, "name": null}]
        }
    });
    let created = session
        .line_items()
        .create("Acme Shoes", &mut template, &insertion_order, &profile)
        .unwrap();

    assert_eq!(created["profile_id"], 42);
    assert_eq!(created["advertiser"]["name"], "Acme Shoes");
    assert_eq!(created["budget_intervals"][0]["start_date"], "2024-01-01");
    assert_eq!(created["insertion_orders"][0], json!({"id": 300, "name": "Q1 Push"}));

    let id = created["id"].as_u64().unwrap();
    assert_eq!(session.line_items().get_profile_id(id).unwrap(), 42);
}

#[test]
fn token_from_another_session_is_reusable() {
    let addr = seeded_server();
    let first = logged_in(addr);

    let resumed = session(addr, "unused").with_token(first.token().unwrap());
    assert_eq!(resumed.advertisers().get_name(51).unwrap(), "Acme Shoes");

    resumed.logout();
    assert!(matches!(resumed.advertisers().get(51), Err(ApiError::NotAuthenticated)));
}
