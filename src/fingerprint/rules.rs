//! Static fingerprint rule set.
//!
//! Rules are plain data: a name, a category, content patterns tried in order
//! and an optional version pattern. They are compiled once per process.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::models::{FingerprintRule, TechCategory};

/// Uncompiled rule definition.
struct RuleDefinition {
    name: &'static str,
    category: TechCategory,
    content_patterns: &'static [&'static str],
    version_pattern: Option<&'static str>,
}

const RULE_DEFINITIONS: &[RuleDefinition] = &[
    // Frontend frameworks and build tooling
    RuleDefinition {
        name: "React",
        category: TechCategory::Frontend,
        content_patterns: &[
            r"data-reactroot",
            r"data-reactid",
            r"_reactRootContainer",
            r"react-dom(?:\.production)?(?:\.min)?\.js",
        ],
        version_pattern: Some(r"react(?:-dom)?@(\d+\.\d+(?:\.\d+)?)"),
    },
    RuleDefinition {
        name: "Next.js",
        category: TechCategory::Frontend,
        content_patterns: &[r"__NEXT_DATA__", r"/_next/static/"],
        version_pattern: Some(r#""version"\s*:\s*"(\d+\.\d+\.\d+)"[^}]*"buildId""#),
    },
    RuleDefinition {
        name: "Vue.js",
        category: TechCategory::Frontend,
        content_patterns: &[
            r"data-v-[0-9a-f]{8}",
            r"vue(?:\.runtime)?(?:\.global)?(?:\.prod)?(?:\.min)?\.js",
            r"__vue_app__",
        ],
        version_pattern: Some(r"vue@(\d+\.\d+(?:\.\d+)?)"),
    },
    RuleDefinition {
        name: "Nuxt.js",
        category: TechCategory::Frontend,
        content_patterns: &[r"__NUXT__", r"/_nuxt/"],
        version_pattern: None,
    },
    RuleDefinition {
        name: "Angular",
        category: TechCategory::Frontend,
        content_patterns: &[r"ng-version=", r"<app-root", r"ng-app="],
        version_pattern: Some(r#"ng-version="(\d+\.\d+\.\d+)""#),
    },
    RuleDefinition {
        name: "Svelte",
        category: TechCategory::Frontend,
        content_patterns: &[r#"class="[^"]*svelte-[a-z0-9]{5,}"#, r"__svelte"],
        version_pattern: None,
    },
    RuleDefinition {
        name: "Vite",
        category: TechCategory::Frontend,
        content_patterns: &[r"vite/client", r"/@vite/", r"__vite__"],
        version_pattern: None,
    },
    RuleDefinition {
        name: "Gatsby",
        category: TechCategory::Frontend,
        content_patterns: &[r"___gatsby", r"gatsby-chunk-mapping"],
        version_pattern: Some(r#"<meta name="generator" content="Gatsby (\d+\.\d+\.\d+)""#),
    },
    RuleDefinition {
        name: "Astro",
        category: TechCategory::Frontend,
        content_patterns: &[r"<astro-island", r"astro-[a-z0-9]{8}"],
        version_pattern: Some(r#"<meta name="generator" content="Astro v(\d+\.\d+\.\d+)""#),
    },
    RuleDefinition {
        name: "Remix",
        category: TechCategory::Frontend,
        content_patterns: &[r"__remixContext", r"__remixManifest"],
        version_pattern: None,
    },
    // Client-side libraries
    RuleDefinition {
        name: "jQuery",
        category: TechCategory::Library,
        content_patterns: &[r"jquery[.-]?(?:\d+\.\d+(?:\.\d+)?)?(?:\.min)?\.js", r"jQuery\.fn"],
        version_pattern: Some(r"jquery[.-](\d+\.\d+(?:\.\d+)?)(?:\.min)?\.js"),
    },
    RuleDefinition {
        name: "Bootstrap",
        category: TechCategory::Library,
        content_patterns: &[r"bootstrap(?:\.bundle)?(?:\.min)?\.(?:css|js)"],
        version_pattern: Some(r"bootstrap@(\d+\.\d+\.\d+)"),
    },
    RuleDefinition {
        name: "Tailwind CSS",
        category: TechCategory::Library,
        content_patterns: &[r"tailwindcss", r"cdn\.tailwindcss\.com"],
        version_pattern: Some(r"tailwindcss@(\d+\.\d+(?:\.\d+)?)"),
    },
    RuleDefinition {
        name: "Alpine.js",
        category: TechCategory::Library,
        content_patterns: &[r"alpinejs", r#"x-data="[^"]*""#],
        version_pattern: Some(r"alpinejs@(\d+\.\d+\.\d+)"),
    },
    RuleDefinition {
        name: "htmx",
        category: TechCategory::Library,
        content_patterns: &[r"htmx(?:\.min)?\.js", r"hx-(?:get|post)="],
        version_pattern: Some(r"htmx\.org@(\d+\.\d+\.\d+)"),
    },
    RuleDefinition {
        name: "Google Tag Manager",
        category: TechCategory::Library,
        content_patterns: &[r"googletagmanager\.com/(?:gtm|gtag)"],
        version_pattern: None,
    },
    // Server-side frameworks and CMSs
    RuleDefinition {
        name: "WordPress",
        category: TechCategory::Backend,
        content_patterns: &[r"/wp-content/", r"/wp-includes/"],
        version_pattern: Some(r#"<meta name="generator" content="WordPress (\d+\.\d+(?:\.\d+)?)""#),
    },
    RuleDefinition {
        name: "Drupal",
        category: TechCategory::Backend,
        content_patterns: &[r"Drupal\.settings", r"/sites/default/files/", r"drupal-settings-json"],
        version_pattern: Some(r#"<meta name="generator" content="Drupal (\d+)"#),
    },
    RuleDefinition {
        name: "Joomla",
        category: TechCategory::Backend,
        content_patterns: &[r"/media/jui/", r#"content="Joomla!"#],
        version_pattern: None,
    },
    RuleDefinition {
        name: "Shopify",
        category: TechCategory::Backend,
        content_patterns: &[r"cdn\.shopify\.com", r"Shopify\.theme"],
        version_pattern: None,
    },
    RuleDefinition {
        name: "Django",
        category: TechCategory::Backend,
        content_patterns: &[r"csrfmiddlewaretoken", r"__admin_media_prefix__"],
        version_pattern: None,
    },
    RuleDefinition {
        name: "Ruby on Rails",
        category: TechCategory::Backend,
        content_patterns: &[r#"name="csrf-param" content="authenticity_token""#, r"data-turbo-track"],
        version_pattern: None,
    },
    RuleDefinition {
        name: "ASP.NET",
        category: TechCategory::Backend,
        content_patterns: &[r"__VIEWSTATE", r"__EVENTVALIDATION"],
        version_pattern: None,
    },
    // Hosted databases / backend-as-a-service
    RuleDefinition {
        name: "Firebase",
        category: TechCategory::Database,
        content_patterns: &[r"firebaseio\.com", r"firebase-app(?:-compat)?\.js", r"firebaseapp\.com"],
        version_pattern: Some(r"firebasejs/(\d+\.\d+\.\d+)/"),
    },
    RuleDefinition {
        name: "Supabase",
        category: TechCategory::Database,
        content_patterns: &[r"[a-z0-9]{20}\.supabase\.co", r"@supabase/supabase-js"],
        version_pattern: Some(r"supabase-js@(\d+\.\d+\.\d+)"),
    },
];

fn compile(pattern: &str, rule: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).size_limit(1 << 20).build() {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("Invalid fingerprint pattern for {rule}: {pattern} ({e})");
            None
        }
    }
}

/// The compiled rule set, in evaluation order.
pub(crate) static RULES: LazyLock<Vec<FingerprintRule>> = LazyLock::new(|| {
    RULE_DEFINITIONS
        .iter()
        .map(|def| FingerprintRule {
            name: def.name,
            category: def.category,
            content_patterns: def
                .content_patterns
                .iter()
                .filter_map(|p| compile(p, def.name))
                .collect(),
            version_pattern: def.version_pattern.and_then(|p| compile(p, def.name)),
        })
        .collect()
});
