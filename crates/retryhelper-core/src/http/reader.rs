//! Turning a successful response into the caller's result type.

use serde::de::DeserializeOwned;
use std::io::{Cursor, Read};
use std::marker::PhantomData;

use super::error::DecodeError;
use super::message::HttpResponse;

/// Reads the body of a 2xx response as `Output`.
pub trait ResponseReader {
    type Output;

    fn read(&self, response: HttpResponse) -> Result<Self::Output, DecodeError>;

    /// Body as text, for the diagnostic message of a non-2xx response.
    fn read_as_string(&self, response: &HttpResponse) -> Result<String, DecodeError> {
        decode_text(response)
    }
}

/// Decode the body with the response charset, UTF-8 when none is given.
pub fn decode_text(response: &HttpResponse) -> Result<String, DecodeError> {
    decode_bytes(&response.body, response.charset())
}

fn decode_bytes(body: &[u8], charset: Option<&str>) -> Result<String, DecodeError> {
    let charset = charset.unwrap_or("utf-8").to_ascii_lowercase();
    match charset.as_str() {
        "utf-8" | "utf8" => std::str::from_utf8(body)
            .map(str::to_owned)
            .map_err(|e| DecodeError::InvalidText {
                charset: "UTF-8",
                offset: e.valid_up_to(),
            }),
        "us-ascii" | "ascii" => match body.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(DecodeError::InvalidText {
                charset: "US-ASCII",
                offset,
            }),
            None => Ok(body.iter().map(|&b| b as char).collect()),
        },
        "iso-8859-1" | "latin1" | "latin-1" => Ok(body.iter().map(|&b| b as char).collect()),
        _ => Err(DecodeError::UnsupportedCharset(charset)),
    }
}

/// Decoded text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringReader;

impl ResponseReader for StringReader {
    type Output = String;

    fn read(&self, response: HttpResponse) -> Result<String, DecodeError> {
        decode_text(&response)
    }
}

/// Raw body bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesReader;

impl ResponseReader for BytesReader {
    type Output = Vec<u8>;

    fn read(&self, response: HttpResponse) -> Result<Vec<u8>, DecodeError> {
        Ok(response.body)
    }
}

/// Body as a stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamReader;

impl ResponseReader for StreamReader {
    type Output = Box<dyn Read + Send>;

    fn read(&self, response: HttpResponse) -> Result<Self::Output, DecodeError> {
        Ok(Box::new(Cursor::new(response.body)))
    }
}

/// JSON body deserialized into `T`.
pub struct JsonReader<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonReader<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ResponseReader for JsonReader<T> {
    type Output = T;

    fn read(&self, response: HttpResponse) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(body: &[u8], content_type: Option<&str>) -> HttpResponse {
        let r = HttpResponse::new(200).with_body(body.to_vec());
        match content_type {
            Some(ct) => r.with_header("Content-Type", ct),
            None => r,
        }
    }

    #[test]
    fn utf8_is_default() {
        let r = text("héllo".as_bytes(), None);
        assert_eq!(StringReader.read(r).unwrap(), "héllo");
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let r = text(&[b'o', b'k', 0xff], Some("text/plain"));
        match StringReader.read(r) {
            Err(DecodeError::InvalidText { charset, offset }) => {
                assert_eq!(charset, "UTF-8");
                assert_eq!(offset, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn latin1_charset() {
        let r = text(&[0x63, 0x61, 0x66, 0xe9], Some("text/plain; charset=ISO-8859-1"));
        assert_eq!(StringReader.read(r).unwrap(), "café");
    }

    #[test]
    fn us_ascii_charset() {
        let ok = text(b"plain", Some("text/plain; charset=US-ASCII"));
        assert_eq!(StringReader.read(ok).unwrap(), "plain");

        let bad = text(&[b'o', b'k', 0xe9], Some("text/plain; charset=us-ascii"));
        match StringReader.read(bad) {
            Err(DecodeError::InvalidText { charset, offset }) => {
                assert_eq!((charset, offset), ("US-ASCII", 2))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unsupported_charset() {
        let r = text(b"abc", Some("text/plain; charset=Shift_JIS"));
        assert!(matches!(
            StringReader.read(r),
            Err(DecodeError::UnsupportedCharset(cs)) if cs == "shift_jis"
        ));
    }

    #[test]
    fn bytes_and_stream() {
        let r = text(&[0, 1, 2, 0xff], None);
        assert_eq!(BytesReader.read(r.clone()).unwrap(), vec![0, 1, 2, 0xff]);
        let mut out = Vec::new();
        StreamReader.read(r).unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![0, 1, 2, 0xff]);
    }

    #[test]
    fn json_reader() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Page {
            items: Vec<u32>,
            next: Option<String>,
        }
        let r = text(br#"{"items":[1,2],"next":null}"#, Some("application/json"));
        let page: Page = JsonReader::new().read(r).unwrap();
        assert_eq!(page, Page { items: vec![1, 2], next: None });

        let bad = text(b"not json", None);
        assert!(matches!(JsonReader::<Page>::new().read(bad), Err(DecodeError::Json(_))));
    }
}
