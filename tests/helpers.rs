// Shared test helpers for mock-server based tests.

use std::time::Duration;

use recon_mission::Config;

/// Configuration with every third-party endpoint pointed at `base` and
/// pacing shortened so tests run in real time.
#[allow(dead_code)] // Not every test file uses every helper
pub fn mock_config(base: &str) -> Config {
    Config {
        api_key: Some("test-key".to_string()),
        ai_base_url: base.to_string(),
        ssl_labs_url: base.to_string(),
        geo_url: format!("{base}/geo"),
        timeout_seconds: 5,
        probe_batch_cooldown: Duration::from_millis(10),
        ai_cooldown: Duration::from_millis(10),
        ai_retry_base_delay: Duration::from_millis(10),
        ai_retry_max_jitter_ms: 5,
        ..Default::default()
    }
}

/// A `generateContent` success body wrapping `answer`.
#[allow(dead_code)]
pub fn gemini_answer(answer: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "text": "Weighing the evidence", "thought": true },
                    { "text": answer.to_string() }
                ]
            },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 1200,
            "candidatesTokenCount": 300,
            "thoughtsTokenCount": 50,
            "totalTokenCount": 1550
        }
    })
}
