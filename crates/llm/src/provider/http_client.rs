use std::time::Duration;

use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};

pub(super) fn default_http_client_builder(mut headers: HeaderMap) -> reqwest::ClientBuilder {
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        // No overall request timeout: it would also bound the body read and
        // cut off long streaming responses. Connects are bounded separately.
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
}
