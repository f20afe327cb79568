//! HTTP relay implementation.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use std::time::Duration;

use super::{ProbeError, Relay, RelayResponse, PROBE_TIMEOUT};
use crate::store::ClientIdentity;

/// Redirects followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// Largest body prefix kept for body rules. The rest is never read.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Header set presented for one client identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityProfile {
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
}

const CHROME_DESKTOP: IdentityProfile = IdentityProfile {
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    accept_language: "en-US,en;q=0.9",
};

const SAFARI_IOS: IdentityProfile = IdentityProfile {
    user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    accept_language: "en-US,en;q=0.9",
};

const FIREFOX_DESKTOP: IdentityProfile = IdentityProfile {
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    accept_language: "en-US,en;q=0.5",
};

const GOOGLE_BOT: IdentityProfile = IdentityProfile {
    user_agent: "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    accept: "*/*",
    accept_language: "en",
};

const BROWSER_PROFILES: [IdentityProfile; 3] = [CHROME_DESKTOP, SAFARI_IOS, FIREFOX_DESKTOP];

/// Look up the header profile for an identity. SMART picks a browser at random.
pub fn identity_profile(identity: ClientIdentity) -> IdentityProfile {
    match identity {
        ClientIdentity::Smart => *BROWSER_PROFILES
            .choose(&mut rand::thread_rng())
            .unwrap_or(&CHROME_DESKTOP),
        ClientIdentity::ChromeDesktop => CHROME_DESKTOP,
        ClientIdentity::SafariIos => SAFARI_IOS,
        ClientIdentity::FirefoxDesktop => FIREFOX_DESKTOP,
        ClientIdentity::GoogleBot => GOOGLE_BOT,
    }
}

fn profile_headers(profile: IdentityProfile) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(profile.user_agent));
    headers.insert(ACCEPT, HeaderValue::from_static(profile.accept));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(profile.accept_language));
    headers
}

/// Relay that fetches targets directly over HTTP(S).
#[derive(Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    timeout: Duration,
    body_limit: usize,
}

impl HttpRelay {
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            body_limit: MAX_BODY_BYTES,
        })
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    fn map_error(&self, e: reqwest::Error) -> ProbeError {
        if e.is_timeout() {
            ProbeError::Timeout(self.timeout)
        } else if e.is_builder() {
            ProbeError::Config(e.to_string())
        } else {
            ProbeError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn probe(
        &self,
        url: &str,
        identity: ClientIdentity,
    ) -> Result<RelayResponse, ProbeError> {
        let mut response = self
            .client
            .get(url)
            .headers(profile_headers(identity_profile(identity)))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_error(e))? {
            if !append_capped(&mut body, &chunk, self.body_limit) {
                break;
            }
        }

        Ok(RelayResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Append at most `limit` bytes in total. Returns false once the limit is hit.
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    buf.len() < limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one response with a `len`-byte body of `a`s, written in 8 KiB chunks.
    async fn serve_body(len: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;

            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", len);
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let chunk = vec![b'a'; 8192];
            let mut sent = 0;
            while sent < len {
                let n = chunk.len().min(len - sent);
                // The relay hangs up once it has read enough
                if socket.write_all(&chunk[..n]).await.is_err() {
                    return;
                }
                sent += n;
            }
        });
        format!("http://{}/", addr)
    }

    #[test]
    fn test_append_capped() {
        let mut buf = Vec::new();
        assert!(append_capped(&mut buf, b"abc", 5));
        assert!(!append_capped(&mut buf, b"defg", 5));
        assert_eq!(buf, b"abcde");
        assert!(!append_capped(&mut buf, b"h", 5));
        assert_eq!(buf.len(), 5);
    }

    #[tokio::test]
    async fn test_small_body_read_whole() {
        let url = serve_body(100).await;
        let relay = HttpRelay::new().unwrap();
        let response = relay.probe(&url, ClientIdentity::ChromeDesktop).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), 100);
    }

    #[tokio::test]
    async fn test_oversized_body_truncated() {
        // Far more than the relay keeps, so it must hang up early
        let url = serve_body(512 * 1024 * 1024).await;
        let relay = HttpRelay::with_timeout(Duration::from_secs(5))
            .unwrap()
            .with_body_limit(64 * 1024);

        let response = relay.probe(&url, ClientIdentity::ChromeDesktop).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), 64 * 1024);
        assert!(response.body.bytes().all(|b| b == b'a'));
    }

    #[test]
    fn test_identity_lookup() {
        assert_eq!(identity_profile(ClientIdentity::GoogleBot), GOOGLE_BOT);
        assert_eq!(identity_profile(ClientIdentity::SafariIos), SAFARI_IOS);

        for _ in 0..20 {
            let smart = identity_profile(ClientIdentity::Smart);
            assert!(BROWSER_PROFILES.contains(&smart));
        }
    }

    #[tokio::test]
    async fn test_http_relay_invalid_url() {
        let relay = HttpRelay::with_timeout(Duration::from_millis(100)).unwrap();
        let result = relay.probe("http://256.256.256.256", ClientIdentity::ChromeDesktop).await;
        assert!(result.is_err());
    }
}
