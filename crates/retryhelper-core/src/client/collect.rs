//! Easy2 handler that buffers one response, and handle setup for a request.

use std::str;

use curl::easy::{Easy2, List};

use crate::config::ClientConfig;
use crate::http::{parse_header_line, parse_status_line, HttpRequest, HttpResponse, Method};

/// Collects status line, headers and body of one transfer.
///
/// Headers are reset on every `HTTP/` status line, so after redirects or a
/// `100 Continue` only the final response remains.
#[derive(Debug, Default)]
pub struct Collector {
    pub(super) reason: String,
    pub(super) headers: Vec<(String, String)>,
    pub(super) body: Vec<u8>,
}

impl Collector {
    pub fn clear(&mut self) {
        self.reason.clear();
        self.headers.clear();
        self.body.clear();
    }

    /// Move the collected response out, leaving the collector empty.
    pub fn take_response(&mut self, status: u32) -> HttpResponse {
        HttpResponse {
            status,
            reason: std::mem::take(&mut self.reason),
            headers: std::mem::take(&mut self.headers),
            body: std::mem::take(&mut self.body),
        }
    }
}

impl curl::easy::Handler for Collector {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                self.headers.clear();
                self.reason = parse_status_line(line)
                    .map(|(_, reason)| reason)
                    .unwrap_or_default();
            } else if let Some(header) = parse_header_line(line) {
                self.headers.push(header);
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Apply `request` and `config` to a freshly reset handle.
pub fn configure(
    easy: &mut Easy2<Collector>,
    request: &HttpRequest,
    config: &ClientConfig,
) -> Result<(), curl::Error> {
    easy.url(&request.url)?;
    match request.method {
        Method::Get => easy.get(true)?,
        Method::Head => easy.nobody(true)?,
        Method::Post => easy.post(true)?,
        other => easy.custom_request(other.as_str())?,
    }
    if let Some(body) = &request.body {
        easy.post_fields_copy(body)?;
        if request.method != Method::Post {
            easy.custom_request(request.method.as_str())?;
        }
    }
    if !request.headers.is_empty() {
        let mut list = List::new();
        for (name, value) in &request.headers {
            list.append(&format!("{}: {}", name, value))?;
        }
        easy.http_headers(list)?;
    }
    easy.follow_location(config.follow_redirects)?;
    easy.max_redirections(config.max_redirections)?;
    easy.connect_timeout(config.connect_timeout())?;
    easy.timeout(config.timeout())?;
    easy.tcp_nodelay(config.tcp_nodelay)?;
    Ok(())
}
