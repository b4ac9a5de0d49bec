//! Transport-neutral request and response values.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP request, reissued unchanged on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Post, url).body(body)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A complete response: status, headers and the buffered body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u32,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// `charset` parameter of `Content-Type`, unquoted.
    pub fn charset(&self) -> Option<&str> {
        self.content_type()?
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, v)| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    }

    /// `Retry-After` in delta-seconds form (HTTP-date form is ignored).
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}

/// Parse `HTTP/1.1 404 Not Found` into (404, "Not Found").
pub(crate) fn parse_status_line(line: &str) -> Option<(u32, String)> {
    let rest = line.strip_prefix("HTTP/")?;
    let mut parts = rest.splitn(3, ' ');
    let _version = parts.next()?;
    let code = parts.next()?.trim().parse::<u32>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Some((code, reason))
}

/// Parse `Name: value`.
pub(crate) fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(200).is_success());
        assert!(HttpResponse::new(204).is_success());
        assert!(!HttpResponse::new(199).is_success());
        assert!(!HttpResponse::new(302).is_success());
        assert!(!HttpResponse::new(503).is_success());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let r = HttpResponse::new(200).with_header("Content-Type", "text/plain");
        assert_eq!(r.header("content-type"), Some("text/plain"));
        assert_eq!(r.header("etag"), None);
    }

    #[test]
    fn charset_from_content_type() {
        let r = HttpResponse::new(200).with_header("Content-Type", "text/html; Charset=\"ISO-8859-1\"");
        assert_eq!(r.charset(), Some("ISO-8859-1"));
        let plain = HttpResponse::new(200).with_header("Content-Type", "application/json");
        assert_eq!(plain.charset(), None);
        assert_eq!(HttpResponse::new(200).charset(), None);
    }

    #[test]
    fn retry_after_seconds() {
        let r = HttpResponse::new(429).with_header("Retry-After", "7");
        assert_eq!(r.retry_after(), Some(Duration::from_secs(7)));
        let date = HttpResponse::new(503).with_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(date.retry_after(), None);
    }

    #[test]
    fn status_line_parsing() {
        assert_eq!(parse_status_line("HTTP/1.1 404 Not Found"), Some((404, "Not Found".to_string())));
        assert_eq!(parse_status_line("HTTP/2 200"), Some((200, String::new())));
        assert_eq!(parse_status_line("Content-Length: 5"), None);
    }

    #[test]
    fn header_line_parsing() {
        assert_eq!(
            parse_header_line("Retry-After:  3 "),
            Some(("Retry-After".to_string(), "3".to_string()))
        );
        assert_eq!(parse_header_line("garbage"), None);
    }

    #[test]
    fn request_builder() {
        let req = HttpRequest::post("http://example.com/items", "{}").header("Accept", "application/json");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
        assert_eq!(req.headers, vec![("Accept".to_string(), "application/json".to_string())]);
    }
}
