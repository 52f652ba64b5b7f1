//! Remote referee.
//!
//! Delegates chain judgement to a user-deployed HTTP endpoint instead of the
//! local idiom table. The endpoint owns whatever generation logic it likes;
//! this client only speaks the wire contract.
//!
//! Request: POST JSON `{"word": "一马当先", "previous": "万里挑一"}`
//! (`previous` is `null` at the start of a chain).
//!
//! Response: JSON `{"isValid": true, "message": null, "userIdiom": {...},
//! "aiIdiom": {...}}` where idiom records have `word`, `pinyin`,
//! `explanation`, `derivation` and an optional `example`.
//!
//! Uses the `reqwest` blocking client, no async runtime needed. Every
//! failure (transport, HTTP status, malformed body) is `Error::Remote`;
//! a failure is never reported as an invalid word.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::chain::Referee;
use crate::idiom::JielongResponse;
use crate::{Error, Result};

/// Default request timeout.
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    word: &'a str,
    previous: Option<&'a str>,
}

/// HTTP client for a remote referee endpoint.
#[derive(Debug, Clone)]
pub struct RemoteReferee {
    endpoint: String,
    timeout_ms: u64,
}

impl RemoteReferee {
    pub fn new<E: Into<String>>(endpoint: E) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }

    /// Set the request timeout in milliseconds.
    pub fn set_timeout(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn remote_err(&self, cause: impl std::fmt::Display) -> Error {
        Error::Remote(format!("{}: {}", self.endpoint, cause))
    }
}

impl Referee for RemoteReferee {
    fn submit(&self, word: &str, previous: Option<&str>) -> Result<JielongResponse> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|e| self.remote_err(e))?;

        debug!(endpoint = %self.endpoint, word, ?previous, "remote submit");
        let response = client
            .post(&self.endpoint)
            .json(&SubmitRequest { word, previous })
            .send()
            .map_err(|e| self.remote_err(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.remote_err(status));
        }

        let body: JielongResponse = response.json().map_err(|e| self.remote_err(e))?;
        if body.is_valid && body.user_idiom.is_none() {
            return Err(self.remote_err("accepted response without userIdiom"));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    #[test]
    fn new_uses_default_timeout() {
        let referee = RemoteReferee::new("http://127.0.0.1:9/jielong");
        assert_eq!(referee.timeout_ms, DEFAULT_REMOTE_TIMEOUT_MS);
        assert_eq!(referee.endpoint(), "http://127.0.0.1:9/jielong");
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_string(&SubmitRequest {
            word: "先声夺人",
            previous: Some("一马当先"),
        })
        .unwrap();
        assert_eq!(body, r#"{"word":"先声夺人","previous":"一马当先"}"#);

        let start = serde_json::to_string(&SubmitRequest {
            word: "一马当先",
            previous: None,
        })
        .unwrap();
        assert_eq!(start, r#"{"word":"一马当先","previous":null}"#);
    }

    #[test]
    fn unreachable_endpoint_is_a_remote_error() {
        // port 9 (discard) is closed on any sane test host
        let mut referee = RemoteReferee::new("http://127.0.0.1:9/jielong");
        referee.set_timeout(200);
        let err = referee.submit("一马当先", None).unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }

    fn remote_error(status: &str, body: &str) -> String {
        let (url, server) = serve_once(status, body);
        let err = RemoteReferee::new(format!("{}/jielong", url))
            .submit("一马当先", None)
            .unwrap_err();
        server.join().unwrap();
        match err {
            Error::Remote(msg) => msg,
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn server_error_status_is_a_remote_error() {
        let msg = remote_error("500 Internal Server Error", "{}");
        assert!(msg.contains("500"), "{msg}");
    }

    #[test]
    fn undecodable_body_is_a_remote_error() {
        remote_error("200 OK", "<html>not json</html>");
    }

    #[test]
    fn accepted_without_user_idiom_is_a_remote_error() {
        let msg = remote_error("200 OK", r#"{"isValid":true}"#);
        assert!(msg.contains("userIdiom"), "{msg}");
    }

    #[test]
    fn rejection_passes_through_as_data() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"isValid":false,"message":"应该以“先”开头哦"}"#,
        );
        let resp = RemoteReferee::new(url)
            .submit("当先一步", Some("一马当先"))
            .unwrap();
        assert!(!resp.is_valid);
        assert_eq!(resp.message.as_deref(), Some("应该以“先”开头哦"));
        assert_eq!(
            server.join().unwrap(),
            r#"{"word":"当先一步","previous":"一马当先"}"#
        );
    }

    #[test]
    fn accepted_response_carries_both_idioms() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"isValid":true,"userIdiom":{"word":"一马当先","pinyin":"yī mǎ dāng xiān","explanation":"e","derivation":"d"},"aiIdiom":{"word":"先声夺人","pinyin":"xiān shēng duó rén","explanation":"e","derivation":"d"}}"#,
        );
        let resp = RemoteReferee::new(url).submit("一马当先", None).unwrap();
        server.join().unwrap();
        assert!(resp.is_valid);
        assert_eq!(resp.user_idiom.unwrap().word, "一马当先");
        assert_eq!(resp.ai_idiom.unwrap().example, "");
    }
}
