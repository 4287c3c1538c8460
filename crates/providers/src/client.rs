use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::{info, warn};

/// Build a reqwest::Client for provider/bridge HTTP.
///
/// `proxy`: `None` follows the HTTPS_PROXY/HTTP_PROXY environment (reqwest's
/// default), `Some("")` forces a direct connection, `Some(url)` routes
/// through that proxy.
pub fn build_http_client(proxy: Option<&str>, timeout: Duration) -> Client {
    let mut builder = Client::builder().timeout(timeout);

    match proxy {
        Some("") => {
            info!("HTTP client forced to direct connect (proxy disabled)");
            builder = builder.no_proxy();
        }
        Some(proxy_url) => match Proxy::all(proxy_url) {
            Ok(p) => {
                info!(proxy = %proxy_url, "HTTP client using proxy");
                builder = builder.proxy(p);
            }
            Err(e) => {
                warn!(error = %e, proxy = %proxy_url, "Invalid proxy URL, falling back to direct connect");
            }
        },
        None => {}
    }

    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build HTTP client, using default");
        Client::new()
    })
}
