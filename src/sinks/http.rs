use crate::error::SinkError;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

pub fn build_sink_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send `request` and map transport errors and non-2xx replies to
/// [`SinkError`]. URLs are stripped from transport errors since some
/// carry credentials in the query string.
pub(crate) async fn send_checked(sink: &str, request: RequestBuilder) -> Result<(), SinkError> {
    let response = request.send().await.map_err(|e| SinkError::Request {
        sink: sink.to_string(),
        message: e.without_url().to_string(),
    })?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SinkError::Status {
            sink: sink.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Whether `endpoint` is an absolute http(s) URL.
pub(crate) fn is_http_url(endpoint: &str) -> bool {
    url::Url::parse(endpoint).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
