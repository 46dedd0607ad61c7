//! Startup reachability probe.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::application::ports::GatewayError;

/// Default probe timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Check that something accepts TCP connections at `address`.
///
/// The connection is closed immediately; no session is established.
pub async fn probe_gateway(address: &str, timeout: Duration) -> Result<(), GatewayError> {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_)) => {
            tracing::debug!(address, "Gateway probe succeeded");
            Ok(())
        }
        Ok(Err(e)) => Err(GatewayError::Connection(format!("{address}: {e}"))),
        Err(_) => Err(GatewayError::Connection(format!(
            "{address}: no answer within {timeout:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        assert_ok!(probe_gateway(&address, PROBE_TIMEOUT).await);
    }

    #[tokio::test]
    async fn probe_reports_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let err = assert_err!(probe_gateway(&address, PROBE_TIMEOUT).await);
        assert!(matches!(err, GatewayError::Connection(_)));
    }
}
