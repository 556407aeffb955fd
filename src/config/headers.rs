//! HTTP header name constants.
//!
//! Security headers checked by the header snapshot probe, and the identification
//! headers read by the fingerprint heuristics.

// Security header names
/// Content Security Policy header
pub const HEADER_CONTENT_SECURITY_POLICY: &str = "Content-Security-Policy";
/// HTTP Strict Transport Security header
pub const HEADER_STRICT_TRANSPORT_SECURITY: &str = "Strict-Transport-Security";
/// X-Content-Type-Options header
pub const HEADER_X_CONTENT_TYPE_OPTIONS: &str = "X-Content-Type-Options";
/// X-Frame-Options header
pub const HEADER_X_FRAME_OPTIONS: &str = "X-Frame-Options";
/// Referrer-Policy header
pub const HEADER_REFERRER_POLICY: &str = "Referrer-Policy";
/// Permissions-Policy header
pub const HEADER_PERMISSIONS_POLICY: &str = "Permissions-Policy";

/// Security headers reported as present/missing in the header snapshot.
pub const SECURITY_HEADERS: &[&str] = &[
    HEADER_CONTENT_SECURITY_POLICY,
    HEADER_STRICT_TRANSPORT_SECURITY,
    HEADER_X_CONTENT_TYPE_OPTIONS,
    HEADER_X_FRAME_OPTIONS,
    HEADER_REFERRER_POLICY,
    HEADER_PERMISSIONS_POLICY,
];

// Infrastructure/Server identification
/// Server header (identifies server software)
pub const HEADER_SERVER: &str = "Server";
/// X-Powered-By header (identifies server framework)
pub const HEADER_X_POWERED_BY: &str = "X-Powered-By";
/// X-AspNet-Version header
pub const HEADER_X_ASPNET_VERSION: &str = "X-AspNet-Version";
/// X-Generator header (identifies CMS/generator)
pub const HEADER_X_GENERATOR: &str = "X-Generator";

// CDN/PaaS identification
/// CF-Ray header (Cloudflare request ID)
pub const HEADER_CF_RAY: &str = "CF-Ray";
/// X-Vercel-Id header
pub const HEADER_X_VERCEL_ID: &str = "X-Vercel-Id";
/// X-NF-Request-Id header (Netlify)
pub const HEADER_X_NF_REQUEST_ID: &str = "X-NF-Request-Id";
/// Fly-Request-Id header (Fly.io)
pub const HEADER_FLY_REQUEST_ID: &str = "Fly-Request-Id";
/// Via header (proxy chain information)
pub const HEADER_VIA: &str = "Via";
/// X-Amz-Cf-Id header (AWS CloudFront)
pub const HEADER_X_AMZ_CF_ID: &str = "X-Amz-Cf-Id";

