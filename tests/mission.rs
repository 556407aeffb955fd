//! End-to-end mission against a mock target, geo API and model API.

mod helpers;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recon_mission::ai::GeminiProvider;
use recon_mission::mission::HttpPageSource;
use recon_mission::probe::{GeoProbe, HeadersProbe, ProbeRegistry, WellKnownProbe};
use recon_mission::{
    MissionContext, MissionController, MissionErrorKind, MissionOutcome, MissionPhase, ProbeKind,
    ScanLevel, Severity,
};

use helpers::{gemini_answer, mock_config};

const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

async fn mount_target(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Server", "nginx/1.25.3")
                .set_body_string(
                    r#"<html><head><title>Shop</title></head><body><script src="/wp-includes/js/wp-emoji.js"></script></body></html>"#,
                ),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geo/127.0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "country": "Netherlands",
            "city": "Amsterdam",
            "isp": "Example Hosting B.V.",
            "as": "AS64500 Example Hosting B.V.",
            "query": "192.0.2.44"
        })))
        .mount(server)
        .await;
}

fn controller(server: &MockServer) -> MissionController {
    let config = mock_config(&server.uri());
    let client = reqwest::Client::new();

    // DNS and TLS are left unregistered: a loopback target has neither.
    let registry = ProbeRegistry::new()
        .with(Arc::new(HeadersProbe::new(client.clone())))
        .with(Arc::new(GeoProbe::new(client.clone(), config.geo_url.clone())))
        .with(Arc::new(WellKnownProbe::security_txt(client.clone())));
    MissionContext::new(
        Arc::new(HttpPageSource::new(client)),
        registry,
        Arc::new(GeminiProvider::new(&config).unwrap()),
        &config,
    )
    .controller()
}

#[tokio::test]
async fn test_mission_end_to_end() {
    let server = MockServer::start().await;
    mount_target(&server).await;
    let answer = json!({
        "summary": "WordPress shop behind nginx",
        "findings": [
            {"title": "Missing HSTS", "description": "No Strict-Transport-Security header", "severity": "HIGH"}
        ],
        "recommendations": ["Serve the site over HTTPS"],
        "technologies": ["Something the model made up"]
    });
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_answer(&answer)))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let outcome = controller
        .run_mission(&server.uri(), ScanLevel::Standard, "fr")
        .await;
    let MissionOutcome::Completed(report) = outcome else {
        panic!("expected a report, got {outcome:?}");
    };

    // Only the matcher contributes technologies
    let names: Vec<&str> = report.technologies.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["WordPress", "Nginx"]);

    let probed: Vec<ProbeKind> = report.probes.iter().map(|p| p.kind).collect();
    assert_eq!(
        probed,
        vec![ProbeKind::HttpHeaders, ProbeKind::Geo, ProbeKind::SecurityTxt]
    );
    let failed: Vec<ProbeKind> = report.failed_probes.iter().map(|f| f.kind).collect();
    assert!(failed.contains(&ProbeKind::Dns));
    assert!(failed.contains(&ProbeKind::TlsCertificate));

    assert_eq!(report.findings[0].severity, Severity::High);
    assert_eq!(report.intelligence.ip.as_deref(), Some("192.0.2.44"));
    assert_eq!(report.intelligence.hosting.as_deref(), Some("Example Hosting B.V."));
    assert_eq!(report.usage.tokens.prompt_tokens, 1200);
    assert_eq!(report.usage.total_tokens, 1550);
    assert!(!report.usage.estimated);
    assert_eq!(report.language, "fr");
    assert_eq!(controller.state().mission_phase, MissionPhase::Debriefing);
    assert_eq!(controller.usage_totals().snapshot().calls, 1);

    // The ground truth reaches the model verbatim
    let requests = server.received_requests().await.unwrap();
    let generate = requests
        .iter()
        .find(|r| r.url.path() == GENERATE_PATH)
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&generate.body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("CONFIRMED TECHNOLOGIES"));
    assert!(prompt.contains("\"WordPress\""));
    assert!(prompt.contains("code \"fr\""));
    assert!(body["generationConfig"].get("thinkingConfig").is_none());
}

#[tokio::test]
async fn test_mission_fails_with_rate_limit_after_retries() {
    let server = MockServer::start().await;
    mount_target(&server).await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        })))
        .expect(5)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let outcome = controller
        .run_mission(&server.uri(), ScanLevel::Fast, "en")
        .await;
    let MissionOutcome::Failed(error) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(error.kind, MissionErrorKind::RateLimit);

    let state = controller.state();
    assert_eq!(state.mission_phase, MissionPhase::Error);
    assert!(state.mission_report.is_none());
}
