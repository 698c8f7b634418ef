// Server module - hyper HTTP/1 front end for the image pipeline
//
// Routes:
// - GET /health  liveness check, always 200 "ok"
// - GET /stats   cache counters as JSON
// - GET /<any>?f=&h=&w=&m=&i=&a=  transformed image

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CACHE_CONTROL, CONTENT_TYPE};
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::DefaultsConfig;
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::transform::RawTransformRequest;

/// Response header reporting whether the image came from the cache
pub const X_CACHE: &str = "x-cache";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub struct ImageServer {
    pipeline: Arc<Pipeline>,
    defaults: DefaultsConfig,
}

impl ImageServer {
    pub fn new(pipeline: Arc<Pipeline>, defaults: DefaultsConfig) -> Self {
        Self { pipeline, defaults }
    }

    /// Accept connections on `listener` until `shutdown` resolves
    pub async fn serve<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(address = %listener.local_addr()?, "Listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        let service = service_fn(move |req: Request<Incoming>| {
                            let server = Arc::clone(&server);
                            async move { Ok::<_, Infallible>(server.handle_request(req).await) }
                        });

                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_request(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let span = tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );
        self.handle(req.method(), req.uri().path(), req.uri().query())
            .instrument(span)
            .await
    }

    /// Route one request
    pub async fn handle(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
    ) -> Response<Full<Bytes>> {
        if *method != Method::GET && *method != Method::HEAD {
            let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
            return response;
        }

        match path {
            "/health" => text_response(StatusCode::OK, "ok"),
            "/stats" => self.stats_response(),
            _ => {
                let raw = parse_query(query, &self.defaults);
                self.image_response(raw).await
            }
        }
    }

    fn stats_response(&self) -> Response<Full<Bytes>> {
        match serde_json::to_vec(&self.pipeline.cache_stats()) {
            Ok(body) => {
                let mut response = Response::new(Full::new(Bytes::from(body)));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(e) => error_response(&PipelineError::internal(e.to_string())),
        }
    }

    async fn image_response(&self, raw: RawTransformRequest) -> Response<Full<Bytes>> {
        let pipeline = Arc::clone(&self.pipeline);
        let span = tracing::Span::current();

        let result = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            pipeline.resolve_bytes(&raw)
        })
        .await
        .unwrap_or_else(|e| Err(PipelineError::internal(format!("Worker failed: {}", e))));

        match result {
            Ok(image) => {
                let mut response = Response::new(Full::new(image.bytes));
                let headers = response.headers_mut();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(image.content_type));
                headers.insert(X_CACHE, HeaderValue::from_static(image.status.as_str()));
                // Output for a given URL never changes
                headers.insert(
                    CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=31536000, immutable"),
                );
                response
            }
            Err(e) => error_response(&e),
        }
    }
}

/// Build a raw request from the query string
///
/// Absent or unparsable integers fall back to `defaults` (method, filter,
/// anchor) or zero (width, height). The first occurrence of a repeated
/// parameter wins.
pub fn parse_query(query: Option<&str>, defaults: &DefaultsConfig) -> RawTransformRequest {
    let mut source_id = None;
    let mut method = None;
    let mut width = None;
    let mut height = None;
    let mut filter = None;
    let mut anchor = None;

    for pair in query.unwrap_or_default().split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode_component(name);
        let value = decode_component(value);

        let slot = match name.as_str() {
            "f" => {
                source_id.get_or_insert(value);
                continue;
            }
            "m" => &mut method,
            "w" => &mut width,
            "h" => &mut height,
            "i" => &mut filter,
            "a" => &mut anchor,
            _ => continue,
        };
        // Surrounding whitespace makes the value unparsable
        slot.get_or_insert(value.parse::<i64>().ok());
    }

    RawTransformRequest {
        source_id: source_id.unwrap_or_default(),
        method: method.flatten().unwrap_or(defaults.method),
        width: width.flatten().unwrap_or(0),
        height: height.flatten().unwrap_or(0),
        filter: filter.flatten().unwrap_or(defaults.filter),
        anchor: anchor.flatten().unwrap_or(defaults.anchor),
    }
}

fn decode_component(value: &str) -> String {
    let value = value.replace('+', " ");
    let decoded = urlencoding::decode(&value).map(|decoded| decoded.into_owned());
    decoded.unwrap_or(value)
}

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

/// Map a pipeline failure to its HTTP response
pub fn error_response(err: &PipelineError) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::info!(status = status.as_u16(), error = %err, "Request rejected");
    }

    text_response(status, err.to_string())
}
