use std::io::{self, Write};
use std::sync::Arc;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, Proxy};
use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task;

use crate::dsn::Dsn;
use crate::options::ClientOptions;
use crate::protocol::Event;

/// An error raised while building a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The options carry no DSN to send to.
    #[error("no DSN configured")]
    MissingDsn,
    /// A proxy URL could not be used.
    #[error("invalid proxy url `{url}`")]
    InvalidProxy {
        /// The rejected URL.
        url: String,
        /// The reason it was rejected.
        #[source]
        source: reqwest::Error,
    },
    /// The HTTP client could not be built.
    #[error("failed to build the http client")]
    Client(#[source] reqwest::Error),
    /// The background runtime could not be started.
    #[error("failed to start the transport runtime")]
    Runtime(#[source] io::Error),
}

/// The trait for transports.
///
/// A transport is responsible for sending events to Sentry.  Sending must
/// not block and must not fail from the caller's point of view.
pub trait Transport: Send + Sync + 'static {
    /// Sends an event.
    fn send_event(&self, event: Event);
}

/// A factory creating transport instances.
///
/// Because options are potentially reused between different clients the
/// options do not actually contain a transport but a factory object that
/// can create transports instead.
///
/// The factory has a single method that creates a new arced transport.
/// Because transports can be wrapped in `Arc`s and those are clonable
/// any `Arc<Transport>` is also a valid transport factory.  This for
/// instance lets you put a `Arc<TestTransport>` directly into the options.
///
/// This is automatically implemented for all closures optionally taking
/// options and returning a boxed factory.
pub trait TransportFactory: Send + Sync {
    /// Given some options creates a transport.
    fn create_transport(&self, options: &ClientOptions)
        -> Result<Arc<dyn Transport>, TransportError>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ClientOptions) -> Arc<dyn Transport> + Send + Sync,
{
    fn create_transport(
        &self,
        options: &ClientOptions,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        Ok((*self)(options))
    }
}

impl<T: Transport> TransportFactory for Arc<T> {
    fn create_transport(
        &self,
        _options: &ClientOptions,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(self.clone())
    }
}

/// Creates the default HTTP transport.
///
/// This is the default value for `transport` on the client options.  It
/// creates a [`HttpTransport`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(
        &self,
        options: &ClientOptions,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(HttpTransport::new(options)?))
    }
}

/// Serializes an event into the compressed store payload.
///
/// The payload is the JSON encoding of the event, zlib compressed.
pub fn encode_event(event: &Event) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, event)?;
    encoder.flush()?;
    encoder.finish()
}

/// A [`Transport`] that sends events via the [`reqwest`] library.
///
/// Every event is posted from its own detached task.  The tasks run on the
/// tokio runtime that was current when the transport was created, which is
/// normally the host's event loop.  Created outside of a runtime, the
/// transport starts a small background runtime of its own.
///
/// Failed transmissions are dropped.  With `debug` enabled they are
/// reported on stderr.
///
/// [`reqwest`]: https://crates.io/crates/reqwest
pub struct HttpTransport {
    client: ReqwestClient,
    dsn: Dsn,
    url: String,
    user_agent: String,
    debug: bool,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl HttpTransport {
    /// Creates a new Transport.
    pub fn new(options: &ClientOptions) -> Result<HttpTransport, TransportError> {
        let mut builder = ReqwestClient::builder()
            .user_agent(&*options.user_agent)
            .danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(url) = options.http_proxy.as_ref() {
            builder = builder.proxy(Proxy::http(&**url).map_err(|source| {
                TransportError::InvalidProxy {
                    url: url.to_string(),
                    source,
                }
            })?);
        }
        if let Some(url) = options.https_proxy.as_ref() {
            builder = builder.proxy(Proxy::https(&**url).map_err(|source| {
                TransportError::InvalidProxy {
                    url: url.to_string(),
                    source,
                }
            })?);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::Client)?;
        HttpTransport::with_client(options, client)
    }

    /// Creates a new Transport that uses the specified [`ReqwestClient`].
    pub fn with_client(
        options: &ClientOptions,
        client: ReqwestClient,
    ) -> Result<HttpTransport, TransportError> {
        let dsn = options.dsn.clone().ok_or(TransportError::MissingDsn)?;
        let url = dsn.store_api_url().to_string();

        let (handle, runtime) = match Handle::try_current() {
            Ok(handle) => (handle, None),
            Err(_) => {
                let runtime = Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name("sentry-transport")
                    .enable_all()
                    .build()
                    .map_err(TransportError::Runtime)?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        Ok(HttpTransport {
            client,
            dsn,
            url,
            user_agent: options.user_agent.to_string(),
            debug: options.debug,
            handle,
            runtime,
        })
    }

    /// The URL events are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn send_event(&self, event: Event) {
        let auth = self.dsn.to_auth(Some(&self.user_agent)).to_string();
        // NOTE: the request is built here so the task does not borrow `self`.
        let request = self
            .client
            .post(self.url.as_str())
            .header("X-Sentry-Auth", auth)
            .header(CONTENT_TYPE, "application/octet-stream");
        let debug = self.debug;

        self.handle.spawn(async move {
            let event_id = event.event_id.simple();
            // symbolizing reads debug info from disk
            let resolved = task::spawn_blocking(move || {
                let mut event = event;
                event.resolve_backtraces();
                event
            });
            let event = match resolved.await {
                Ok(event) => event,
                Err(err) => {
                    sentry_debug!(debug, "Failed to resolve event {}: {}", event_id, err);
                    return;
                }
            };
            let body = match encode_event(&event) {
                Ok(body) => body,
                Err(err) => {
                    sentry_debug!(debug, "Failed to encode event {}: {}", event_id, err);
                    return;
                }
            };
            match request.body(body).send().await {
                Ok(response) if response.status().is_success() => {
                    sentry_debug!(debug, "Sent event {}", event_id);
                }
                Ok(response) => {
                    sentry_debug!(
                        debug,
                        "Event {} was rejected: {}",
                        event_id,
                        response.status()
                    );
                }
                Err(err) => {
                    sentry_debug!(debug, "Failed to send event {}: {}", event_id, err);
                }
            }
        });
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        // in-flight events of an owned runtime are abandoned
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use flate2::read::ZlibDecoder;

    #[test]
    fn test_encode_event() {
        let event = Event {
            message: Some("Something broke".into()),
            ..Default::default()
        };
        let body = encode_event(&event).unwrap();

        let mut json = String::new();
        ZlibDecoder::new(&body[..])
            .read_to_string(&mut json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["message"], "Something broke");
        assert_eq!(value["level"], 40);
        assert_eq!(value["platform"], "rust");
    }

    #[test]
    fn test_http_transport_without_runtime() {
        let options = ClientOptions {
            dsn: Some("http://public@127.0.0.1:9/1".parse().unwrap()),
            ..Default::default()
        };
        let transport = HttpTransport::new(&options).unwrap();
        assert_eq!(transport.url(), "http://127.0.0.1:9/api/1/store/");
        transport.send_event(Event::default());
        drop(transport);
    }

    #[test]
    fn test_missing_dsn() {
        assert!(matches!(
            HttpTransport::new(&ClientOptions::default()),
            Err(TransportError::MissingDsn)
        ));
    }

    #[test]
    fn test_invalid_proxy() {
        let options = ClientOptions {
            dsn: Some("http://public@127.0.0.1:9/1".parse().unwrap()),
            https_proxy: Some("http://exa mple.com:3128".into()),
            ..Default::default()
        };
        assert!(matches!(
            HttpTransport::new(&options),
            Err(TransportError::InvalidProxy { .. })
        ));
    }
}
