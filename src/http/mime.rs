//! Header names and MIME types used by the response helpers.

pub const MIME_APPLICATION_JSON: &str = "application/json";
pub const MIME_APPLICATION_JSON_CHARSET_UTF8: &str = "application/json; charset=UTF-8";
pub const MIME_TEXT_HTML: &str = "text/html";
pub const MIME_TEXT_HTML_CHARSET_UTF8: &str = "text/html; charset=UTF-8";
pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_TEXT_PLAIN_CHARSET_UTF8: &str = "text/plain; charset=UTF-8";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
pub const MIME_APPLICATION_FORM: &str = "application/x-www-form-urlencoded";

pub const HEADER_X_REAL_IP: &str = "x-real-ip";
pub const HEADER_X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const HEADER_X_REQUEST_ID: &str = "x-request-id";

/// Content type for a file, by extension. Unknown extensions are served as
/// `application/octet-stream`.
pub fn from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => MIME_TEXT_HTML_CHARSET_UTF8,
        "txt" => MIME_TEXT_PLAIN_CHARSET_UTF8,
        "json" => MIME_APPLICATION_JSON_CHARSET_UTF8,
        "css" => "text/css; charset=UTF-8",
        "js" | "mjs" => "text/javascript; charset=UTF-8",
        "xml" => "text/xml; charset=UTF-8",
        "csv" => "text/csv; charset=UTF-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => MIME_OCTET_STREAM,
    }
}
