//! OpenSubtitles hash lookup over XML-RPC.
//!
//! Used only to disambiguate search results: a content hash may map to an
//! IMDb id. Every failure is swallowed and reported as "unknown".

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::ProviderError;
use crate::provider::{run_blocking, HashLookup};
use crate::xmlrpc::{build_request, parse_response, Value};

const DEFAULT_ENDPOINT: &str = "https://api.opensubtitles.org/xml-rpc";
const USER_AGENT: &str = "OS Test User Agent";
const SESSION_IDLE: Duration = Duration::from_secs(20);

struct Session {
    token: String,
    last_used: Instant,
}

pub struct OpenSubtitlesClient {
    http: reqwest::Client,
    endpoint: String,
    session: Mutex<Option<Session>>,
}

impl OpenSubtitlesClient {
    pub fn new() -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            session: Mutex::new(None),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, ProviderError> {
        log::debug!("OpenSubtitles {method}");
        let body = build_request(method, params);
        let resp = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let bytes = resp.bytes().await?.to_vec();
        run_blocking(move || parse_response(&bytes)).await
    }

    /// Log in anonymously, or reuse a token that has not been idle too long.
    async fn token(&self, session: &mut Option<Session>) -> Result<String, ProviderError> {
        if let Some(s) = session.as_mut().filter(|s| s.last_used.elapsed() < SESSION_IDLE) {
            s.last_used = Instant::now();
            return Ok(s.token.clone());
        }
        let reply = self
            .call("LogIn", &["".into(), "".into(), "en".into(), USER_AGENT.into()])
            .await?;
        let token = login_token(&reply)?;
        *session = Some(Session {
            token: token.clone(),
            last_used: Instant::now(),
        });
        Ok(token)
    }

    /// IMDb id (`tt0133093`) registered for a content hash.
    pub async fn check_hash(&self, hash: &str) -> Result<Option<String>, ProviderError> {
        let mut session = self.session.lock().await;
        let token = self.token(&mut session).await?;
        let reply = self
            .call(
                "CheckMovieHash",
                &[token.as_str().into(), Value::Array(vec![hash.into()])],
            )
            .await;
        match reply {
            Ok(reply) => Ok(imdb_from_reply(&reply, hash)),
            Err(e) => {
                *session = None;
                Err(e)
            }
        }
    }
}

impl HashLookup for OpenSubtitlesClient {
    async fn imdb_for_hash(&self, hash: &str) -> Option<String> {
        match self.check_hash(hash).await {
            Ok(imdb) => imdb,
            Err(e) => {
                log::debug!("OpenSubtitles lookup for {hash} failed: {e}");
                None
            }
        }
    }
}

fn login_token(reply: &Value) -> Result<String, ProviderError> {
    let status = reply.get("status").and_then(Value::as_str).unwrap_or_default();
    if !status.starts_with("200") {
        return Err(ProviderError::parse(format!("LogIn status '{status}'")));
    }
    reply
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::parse("LogIn reply without token"))
}

/// Pull `data[hash].MovieImdbID` out of a `CheckMovieHash` reply.
///
/// Unknown hashes come back as an empty array or a missing member.
pub fn imdb_from_reply(reply: &Value, hash: &str) -> Option<String> {
    let id = reply.get("data")?.get(hash)?.get("MovieImdbID")?;
    let digits = match id {
        Value::Int(i) => i.to_string(),
        Value::String(s) => s.trim().trim_start_matches("tt").to_string(),
        _ => return None,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits == "0" {
        return None;
    }
    Some(format!("tt{digits:0>7}"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn reply_with(id: Value) -> Value {
        let movie = Value::Struct(BTreeMap::from([("MovieImdbID".to_string(), id)]));
        let data = Value::Struct(BTreeMap::from([("abc".to_string(), movie)]));
        Value::Struct(BTreeMap::from([("data".to_string(), data)]))
    }

    #[test]
    fn imdb_ids_are_zero_padded() {
        assert_eq!(
            imdb_from_reply(&reply_with("133093".into()), "abc").as_deref(),
            Some("tt0133093")
        );
        assert_eq!(
            imdb_from_reply(&reply_with(Value::Int(1375666)), "abc").as_deref(),
            Some("tt1375666")
        );
    }

    #[test]
    fn unknown_hash_yields_none() {
        let empty = Value::Struct(BTreeMap::from([(
            "data".to_string(),
            Value::Array(Vec::new()),
        )]));
        assert_eq!(imdb_from_reply(&empty, "abc"), None);
        assert_eq!(imdb_from_reply(&reply_with("133093".into()), "other"), None);
        assert_eq!(imdb_from_reply(&reply_with("".into()), "abc"), None);
    }

    #[test]
    fn login_requires_ok_status() {
        let ok = Value::Struct(BTreeMap::from([
            ("status".to_string(), Value::from("200 OK")),
            ("token".to_string(), Value::from("tok")),
        ]));
        assert_eq!(login_token(&ok).unwrap(), "tok");

        let denied = Value::Struct(BTreeMap::from([(
            "status".to_string(),
            Value::from("401 Unauthorized"),
        )]));
        assert!(login_token(&denied).is_err());
    }

    #[tokio::test]
    async fn unreachable_service_is_not_an_error() {
        let client = OpenSubtitlesClient::new()
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/xml-rpc");
        assert_eq!(client.imdb_for_hash("8e245d9679d31e12").await, None);
    }
}
