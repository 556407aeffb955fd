//! HTTP probes against a mock target and mock providers.

mod helpers;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recon_mission::probe::{GeoProbe, HeadersProbe, Probe, SslGradeProbe, WellKnownProbe};
use recon_mission::{ProbeError, ProbeTarget};

fn target(server: &MockServer) -> ProbeTarget {
    ProbeTarget::parse(&server.uri()).unwrap()
}

#[tokio::test]
async fn test_header_probe_records_security_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Server", "nginx/1.25.3")
                .insert_header("X-Frame-Options", "DENY")
                .set_body_string("<html></html>"),
        )
        .mount(&server)
        .await;

    let payload = HeadersProbe::new(reqwest::Client::new())
        .run(&target(&server))
        .await
        .unwrap();

    assert_eq!(payload["status"], 200);
    assert_eq!(payload["https"], false);
    assert_eq!(payload["headers"]["server"], "nginx/1.25.3");
    assert_eq!(payload["security_headers"]["present"]["x-frame-options"], "DENY");
    let missing: Vec<&str> = payload["security_headers"]["missing"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(missing.contains(&"strict-transport-security"));
    assert!(!missing.contains(&"x-frame-options"));
    // Plain HTTP only reports the missing transport security
    assert_eq!(payload["warnings"][0]["code"], "no_https");
    assert_eq!(payload["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_header_probe_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let error = HeadersProbe::new(reqwest::Client::new())
        .run(&target(&server))
        .await
        .unwrap_err();
    assert_eq!(error, ProbeError::Status(503));
    assert!(!error.is_fatal());
}

#[tokio::test]
async fn test_missing_security_txt_is_an_observation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let payload = WellKnownProbe::security_txt(reqwest::Client::new())
        .run(&target(&server))
        .await
        .unwrap();
    assert_eq!(payload, json!({"present": false, "path": "/.well-known/security.txt"}));
}

#[tokio::test]
async fn test_robots_txt_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /wp-admin/\nSitemap: https://example.com/sitemap.xml\n"),
        )
        .mount(&server)
        .await;

    let payload = WellKnownProbe::robots_txt(reqwest::Client::new())
        .run(&target(&server))
        .await
        .unwrap();
    assert_eq!(payload["present"], true);
    assert_eq!(payload["disallow"], json!(["/wp-admin/"]));
    assert_eq!(payload["sitemaps"], json!(["https://example.com/sitemap.xml"]));
}

#[tokio::test]
async fn test_geo_probe_maps_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/127.0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "country": "Netherlands",
            "countryCode": "NL",
            "regionName": "North Holland",
            "city": "Amsterdam",
            "isp": "Example Hosting B.V.",
            "org": "Example Cloud",
            "as": "AS64500 Example Hosting B.V.",
            "query": "192.0.2.44"
        })))
        .mount(&server)
        .await;

    let probe = GeoProbe::new(reqwest::Client::new(), format!("{}/geo", server.uri()));
    let payload = probe.run(&target(&server)).await.unwrap();
    assert_eq!(payload["ip"], "192.0.2.44");
    assert_eq!(payload["country_code"], "NL");
    assert_eq!(payload["org"], "Example Cloud");
    assert_eq!(payload["asn"], "AS64500 Example Hosting B.V.");
}

#[tokio::test]
async fn test_geo_probe_failed_lookup_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "fail",
            "message": "reserved range"
        })))
        .mount(&server)
        .await;

    let probe = GeoProbe::new(reqwest::Client::new(), server.uri());
    let error = probe.run(&target(&server)).await.unwrap_err();
    assert_eq!(error, ProbeError::Upstream("reserved range".to_string()));
}

#[tokio::test]
async fn test_ssl_grade_uses_cached_assessment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analyze"))
        .and(query_param("host", "127.0.0.1"))
        .and(query_param("fromCache", "on"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "READY",
            "endpoints": [
                {"ipAddress": "192.0.2.1", "grade": "A+", "hasWarnings": false},
                {"ipAddress": "192.0.2.2", "grade": "B", "hasWarnings": true}
            ]
        })))
        .mount(&server)
        .await;

    let probe = SslGradeProbe::new(reqwest::Client::new(), server.uri());
    let payload = probe.run(&target(&server)).await.unwrap();
    assert_eq!(payload["grade"], "B");
    assert_eq!(payload["endpoints"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ssl_grade_in_progress_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "IN_PROGRESS",
            "endpoints": []
        })))
        .mount(&server)
        .await;

    let probe = SslGradeProbe::new(reqwest::Client::new(), server.uri());
    let error = probe.run(&target(&server)).await.unwrap_err();
    assert!(matches!(error, ProbeError::Upstream(_)));
    assert!(!error.is_fatal());
}
