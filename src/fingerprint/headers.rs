//! Header-based technology heuristics.
//!
//! Each heuristic inspects one response header and contributes at most one
//! signature. Header names are matched case-insensitively; the evidence string
//! uses the canonical header name (e.g. `X-Powered-By: Express`).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::models::{TechCategory, TechSignature};
use crate::config::{
    HEADER_CF_RAY, HEADER_FLY_REQUEST_ID, HEADER_SERVER, HEADER_VIA, HEADER_X_AMZ_CF_ID,
    HEADER_X_ASPNET_VERSION, HEADER_X_GENERATOR, HEADER_X_NF_REQUEST_ID, HEADER_X_POWERED_BY,
    HEADER_X_VERCEL_ID,
};

/// One entry of a value table: a case-insensitive pattern whose first capture
/// group (if any) is the version.
struct ValueRule {
    pattern: &'static str,
    name: &'static str,
    category: TechCategory,
}

/// A header heuristic.
enum HeaderHeuristic {
    /// The header's presence alone identifies the technology.
    Presence {
        header: &'static str,
        name: &'static str,
        category: TechCategory,
    },
    /// The header value is matched against a table; the first matching entry wins.
    Value {
        header: &'static str,
        table: &'static [ValueRule],
    },
}

const POWERED_BY_TABLE: &[ValueRule] = &[
    ValueRule {
        pattern: r"^Express",
        name: "Express",
        category: TechCategory::Backend,
    },
    ValueRule {
        pattern: r"Next\.js\s*(\d+(?:\.\d+)*)?",
        name: "Next.js",
        category: TechCategory::Frontend,
    },
    ValueRule {
        pattern: r"Nuxt",
        name: "Nuxt.js",
        category: TechCategory::Frontend,
    },
    ValueRule {
        pattern: r"PHP/?(\d+(?:\.\d+)*)?",
        name: "PHP",
        category: TechCategory::Backend,
    },
    ValueRule {
        pattern: r"ASP\.NET",
        name: "ASP.NET",
        category: TechCategory::Backend,
    },
    ValueRule {
        pattern: r"Phusion Passenger",
        name: "Phusion Passenger",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"WP Engine",
        name: "WP Engine",
        category: TechCategory::Server,
    },
];

const SERVER_TABLE: &[ValueRule] = &[
    ValueRule {
        pattern: r"^nginx(?:/(\d+(?:\.\d+)*))?",
        name: "Nginx",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^openresty(?:/(\d+(?:\.\d+)*))?",
        name: "OpenResty",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^Apache(?:/(\d+(?:\.\d+)*))?",
        name: "Apache HTTP Server",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^Microsoft-IIS(?:/(\d+(?:\.\d+)*))?",
        name: "IIS",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^LiteSpeed",
        name: "LiteSpeed",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^Caddy",
        name: "Caddy",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^cloudflare",
        name: "Cloudflare",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^Vercel",
        name: "Vercel",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^Netlify",
        name: "Netlify",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^gunicorn(?:/(\d+(?:\.\d+)*))?",
        name: "Gunicorn",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^Kestrel",
        name: "Kestrel",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^AmazonS3",
        name: "Amazon S3",
        category: TechCategory::Server,
    },
    ValueRule {
        pattern: r"^GitHub\.com",
        name: "GitHub Pages",
        category: TechCategory::Server,
    },
];

const GENERATOR_TABLE: &[ValueRule] = &[
    ValueRule {
        pattern: r"^WordPress\s*(\d+(?:\.\d+)*)?",
        name: "WordPress",
        category: TechCategory::Backend,
    },
    ValueRule {
        pattern: r"^Drupal\s*(\d+)?",
        name: "Drupal",
        category: TechCategory::Backend,
    },
];

const HEROKU_VIA_TABLE: &[ValueRule] = &[ValueRule {
    pattern: r"vegur",
    name: "Heroku",
    category: TechCategory::Server,
}];

const HEURISTICS: &[HeaderHeuristic] = &[
    HeaderHeuristic::Value {
        header: HEADER_X_POWERED_BY,
        table: POWERED_BY_TABLE,
    },
    HeaderHeuristic::Value {
        header: HEADER_SERVER,
        table: SERVER_TABLE,
    },
    HeaderHeuristic::Value {
        header: HEADER_X_GENERATOR,
        table: GENERATOR_TABLE,
    },
    HeaderHeuristic::Value {
        header: HEADER_X_ASPNET_VERSION,
        table: &[ValueRule {
            pattern: r"^(\d+(?:\.\d+)*)",
            name: "ASP.NET",
            category: TechCategory::Backend,
        }],
    },
    HeaderHeuristic::Presence {
        header: HEADER_X_VERCEL_ID,
        name: "Vercel",
        category: TechCategory::Server,
    },
    HeaderHeuristic::Presence {
        header: HEADER_X_NF_REQUEST_ID,
        name: "Netlify",
        category: TechCategory::Server,
    },
    HeaderHeuristic::Presence {
        header: HEADER_CF_RAY,
        name: "Cloudflare",
        category: TechCategory::Server,
    },
    HeaderHeuristic::Presence {
        header: HEADER_FLY_REQUEST_ID,
        name: "Fly.io",
        category: TechCategory::Server,
    },
    HeaderHeuristic::Presence {
        header: HEADER_X_AMZ_CF_ID,
        name: "Amazon CloudFront",
        category: TechCategory::Server,
    },
    HeaderHeuristic::Value {
        header: HEADER_VIA,
        table: HEROKU_VIA_TABLE,
    },
];

/// Compiled value patterns, keyed by `(heuristic index, table index)`.
static VALUE_PATTERNS: LazyLock<HashMap<(usize, usize), Regex>> = LazyLock::new(|| {
    let mut compiled = HashMap::new();
    for (h, heuristic) in HEURISTICS.iter().enumerate() {
        if let HeaderHeuristic::Value { table, .. } = heuristic {
            for (t, rule) in table.iter().enumerate() {
                match RegexBuilder::new(rule.pattern)
                    .case_insensitive(true)
                    .build()
                {
                    Ok(re) => {
                        compiled.insert((h, t), re);
                    }
                    Err(e) => {
                        log::error!("Invalid header pattern for {}: {e}", rule.name);
                    }
                }
            }
        }
    }
    compiled
});

/// Looks a header up case-insensitively, ignoring empty values.
///
/// When the map holds the header under several casings, the canonical name
/// wins, then the lexicographically smallest key, so lookups do not depend on
/// map iteration order.
fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    if let Some(value) = headers.get(name) {
        let value = value.trim();
        return (!value.is_empty()).then_some(value);
    }
    headers
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(name))
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Runs every header heuristic.
///
/// `known` holds names already confirmed (from content); a heuristic whose
/// technology is already known is skipped, and each name is emitted once.
pub(crate) fn check_headers(
    headers: &HashMap<String, String>,
    known: &[TechSignature],
) -> Vec<TechSignature> {
    let mut found: Vec<TechSignature> = Vec::new();
    let already_named = |name: &str, found: &[TechSignature]| {
        known.iter().chain(found.iter()).any(|s| s.name == name)
    };

    for (h, heuristic) in HEURISTICS.iter().enumerate() {
        let signature = match heuristic {
            HeaderHeuristic::Presence {
                header,
                name,
                category,
            } => header_value(headers, header).map(|value| TechSignature {
                name: (*name).to_string(),
                category: *category,
                version: None,
                evidence: format!("{header}: {value}"),
            }),
            HeaderHeuristic::Value { header, table } => {
                header_value(headers, header).and_then(|value| {
                    table.iter().enumerate().find_map(|(t, rule)| {
                        let re = VALUE_PATTERNS.get(&(h, t))?;
                        let caps = re.captures(value)?;
                        let version = caps
                            .iter()
                            .skip(1)
                            .flatten()
                            .map(|m| m.as_str())
                            .find(|v| !v.is_empty())
                            .map(str::to_string);
                        Some(TechSignature {
                            name: rule.name.to_string(),
                            category: rule.category,
                            version,
                            evidence: format!("{header}: {value}"),
                        })
                    })
                })
            }
        };

        if let Some(signature) = signature {
            if already_named(&signature.name, &found) {
                log::debug!(
                    "Header heuristic for {} skipped: already confirmed",
                    signature.name
                );
                continue;
            }
            found.push(signature);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_all_value_patterns_compile() {
        let expected: usize = HEURISTICS
            .iter()
            .map(|h| match h {
                HeaderHeuristic::Value { table, .. } => table.len(),
                HeaderHeuristic::Presence { .. } => 0,
            })
            .sum();
        assert_eq!(VALUE_PATTERNS.len(), expected);
    }

    #[test]
    fn test_powered_by_express() {
        let found = check_headers(&headers(&[("x-powered-by", "Express")]), &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Express");
        assert_eq!(found[0].category, TechCategory::Backend);
        assert!(found[0].evidence.contains("X-Powered-By: Express"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let found = check_headers(&headers(&[("SERVER", "nginx/1.25.3")]), &[]);
        assert_eq!(found[0].name, "Nginx");
        assert_eq!(found[0].version.as_deref(), Some("1.25.3"));
    }

    #[test]
    fn test_duplicate_casings_resolve_deterministically() {
        for _ in 0..200 {
            let map = headers(&[("Server", "nginx/1.25.3"), ("server", "Apache/2.4.58")]);
            let found = check_headers(&map, &[]);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].name, "Nginx");
        }

        // Without the canonical casing the smallest key wins.
        for _ in 0..200 {
            let map = headers(&[("SERVER", "nginx/1.25.3"), ("server", "Apache/2.4.58")]);
            assert_eq!(check_headers(&map, &[])[0].name, "Nginx");
        }
    }

    #[test]
    fn test_php_version_from_powered_by() {
        let found = check_headers(&headers(&[("X-Powered-By", "PHP/8.2.1")]), &[]);
        assert_eq!(found[0].name, "PHP");
        assert_eq!(found[0].version.as_deref(), Some("8.2.1"));
    }

    #[test]
    fn test_one_signature_per_name() {
        // Both the Server value and CF-Ray identify Cloudflare
        let found = check_headers(
            &headers(&[("server", "cloudflare"), ("cf-ray", "8a1b2c3d4e5f-AMS")]),
            &[],
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Cloudflare");
        assert_eq!(found[0].evidence, "Server: cloudflare");
    }

    #[test]
    fn test_known_names_are_skipped() {
        let known = vec![TechSignature {
            name: "Next.js".to_string(),
            category: TechCategory::Frontend,
            version: None,
            evidence: "content: \"__NEXT_DATA__\"".to_string(),
        }];
        let found = check_headers(&headers(&[("x-powered-by", "Next.js")]), &known);
        assert!(found.is_empty());
    }

    #[test]
    fn test_presence_heuristics() {
        let found = check_headers(
            &headers(&[
                ("x-vercel-id", "fra1::iad1::abc"),
                ("fly-request-id", "01H"),
                ("via", "1.1 vegur"),
            ]),
            &[],
        );
        let names: Vec<&str> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Vercel", "Fly.io", "Heroku"]);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let found = check_headers(&headers(&[("server", "  ")]), &[]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_unknown_values_add_nothing() {
        let found = check_headers(&headers(&[("server", "SomethingCustom/1.0")]), &[]);
        assert!(found.is_empty());
    }
}
