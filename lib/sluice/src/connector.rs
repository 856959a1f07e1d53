//! Plain HTTP connector.

use std::time::Duration;

use hyper_util::client::legacy::connect::HttpConnector;

/// Create an HTTP connector with the given connect timeout.
///
/// Only `http://` URLs are accepted; TLS is left to a custom [`Transport`].
///
/// [`Transport`]: sluice_core::Transport
#[must_use]
pub fn http_connector(connect_timeout: Duration) -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    connector.enforce_http(true);
    connector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_connector() {
        let _connector = http_connector(Duration::from_secs(1));
    }
}
