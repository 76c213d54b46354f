//! HTTPS client shared by the Firebase session and the weather fetcher

use embassy_net::Stack;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_time::{Duration, with_timeout};
use log::{debug, warn};
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::headers::ContentType;
use reqwless::request::{Method, RequestBuilder};
use tempo_core::cloud::TransportError;
use thiserror_no_std::Error;

/// TLS records can be up to 16 KiB plus overhead
pub const TLS_READ_BUF_SIZE: usize = 16_640;
pub const TLS_WRITE_BUF_SIZE: usize = 4096;
/// Sign-in responses carry a ~1 KiB JWT plus headers
pub const RESPONSE_BUF_SIZE: usize = 4096;

/// Whole request, connect to last body byte
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub type TcpState = TcpClientState<1, 1024, 1024>;
pub type SharedHttps = AsyncMutex<CriticalSectionRawMutex, HttpsClient>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("Connection failed")]
    Connect,
    #[error("Request failed")]
    Request,
    #[error("Response body unreadable")]
    Body,
    #[error("Request timed out")]
    TimedOut,
}

impl HttpError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connection failed",
            Self::Request => "request failed",
            Self::Body => "response body unreadable",
            Self::TimedOut => "request timed out",
        }
    }
}

impl From<HttpError> for TransportError {
    fn from(e: HttpError) -> Self {
        TransportError::new(TransportError::CONNECTION, e.as_str())
    }
}

/// One TLS connection at a time over the station interface.
///
/// Certificates are not verified; the node has no trust store.
pub struct HttpsClient {
    tcp: TcpClient<'static, 1, 1024, 1024>,
    dns: DnsSocket<'static>,
    tls_read: &'static mut [u8; TLS_READ_BUF_SIZE],
    tls_write: &'static mut [u8; TLS_WRITE_BUF_SIZE],
    response: &'static mut [u8; RESPONSE_BUF_SIZE],
    seed: u64,
}

impl HttpsClient {
    pub fn new(
        stack: Stack<'static>,
        tcp_state: &'static TcpState,
        tls_read: &'static mut [u8; TLS_READ_BUF_SIZE],
        tls_write: &'static mut [u8; TLS_WRITE_BUF_SIZE],
        response: &'static mut [u8; RESPONSE_BUF_SIZE],
        seed: u64,
    ) -> Self {
        Self {
            tcp: TcpClient::new(stack, tcp_state),
            dns: DnsSocket::new(stack),
            tls_read,
            tls_write,
            response,
            seed,
        }
    }

    pub async fn get<T>(
        &mut self,
        url: &str,
        parse: impl FnOnce(u16, &[u8]) -> T,
    ) -> Result<T, HttpError> {
        with_timeout(REQUEST_TIMEOUT, self.exchange(Method::GET, url, None, parse))
            .await
            .map_err(|_| HttpError::TimedOut)?
    }

    /// POST `body` as `application/json`.
    pub async fn post_json<T>(
        &mut self,
        url: &str,
        body: &[u8],
        parse: impl FnOnce(u16, &[u8]) -> T,
    ) -> Result<T, HttpError> {
        with_timeout(REQUEST_TIMEOUT, self.exchange(Method::POST, url, Some(body), parse))
            .await
            .map_err(|_| HttpError::TimedOut)?
    }

    async fn exchange<T>(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        parse: impl FnOnce(u16, &[u8]) -> T,
    ) -> Result<T, HttpError> {
        let Self {
            tcp,
            dns,
            tls_read,
            tls_write,
            response,
            seed,
        } = self;

        let tls = TlsConfig::new(*seed, &mut tls_read[..], &mut tls_write[..], TlsVerify::None);
        let mut client = HttpClient::new_with_tls(&*tcp, &*dns, tls);

        let request = client.request(method, url).await.map_err(|e| {
            warn!("HTTPS connect failed: {:?}", e);
            HttpError::Connect
        })?;

        let sent = match body {
            Some(body) => {
                request
                    .body(body)
                    .content_type(ContentType::ApplicationJson)
                    .send(&mut response[..])
                    .await
            }
            None => request.send(&mut response[..]).await,
        };
        let reply = sent.map_err(|e| {
            warn!("HTTPS request failed: {:?}", e);
            HttpError::Request
        })?;

        let status = reply.status.0;
        debug!("HTTP {}", status);
        let payload = reply.body().read_to_end().await.map_err(|e| {
            warn!("HTTPS body read failed: {:?}", e);
            HttpError::Body
        })?;

        Ok(parse(status, payload))
    }
}
