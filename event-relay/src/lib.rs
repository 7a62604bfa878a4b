pub mod config;
pub mod errors;
pub mod events;
pub mod mixpanel;
pub mod protocol;

mod api;
mod cors;
mod metrics_defs;
#[cfg(test)]
mod testutils;

use api::utils::{HandlerBody, json_response};
use errors::{RelayError, Result};
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use metrics::Gauge;
use metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use mixpanel::AnalyticsClient;
use shared::http::{make_error_response, run_http_service};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

pub use metrics_defs::ALL_METRICS;

/// Serves the relay on the configured listener until accepting fails.
pub async fn run(
    config: config::Config,
    client: Arc<dyn AnalyticsClient>,
) -> Result<()> {
    let relay_service = RelayService::new(client);
    run_http_service(&config.listener.host, config.listener.port, relay_service).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Health,
    Identify,
    Track,
    Preflight,
    NotFound,
}

impl Route {
    fn resolve(method: &Method, path: &str) -> Self {
        match (method, path) {
            (&Method::OPTIONS, _) => Route::Preflight,
            (&Method::GET | &Method::HEAD, "/") => Route::Health,
            (&Method::POST, "/identify") => Route::Identify,
            (&Method::POST, "/track") => Route::Track,
            _ => Route::NotFound,
        }
    }

    const fn as_str(&self) -> &'static str {
        match self {
            Route::Health => "health",
            Route::Identify => "identify",
            Route::Track => "track",
            Route::Preflight => "preflight",
            Route::NotFound => "not_found",
        }
    }
}

/// HTTP front of the relay. Holds nothing but the shared vendor client.
#[derive(Clone)]
pub struct RelayService {
    client: Arc<dyn AnalyticsClient>,
}

impl RelayService {
    pub fn new(client: Arc<dyn AnalyticsClient>) -> Self {
        Self { client }
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<HandlerBody>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let route = Route::resolve(request.method(), request.uri().path());
        tracing::debug!(
            method = %request.method(),
            path = %request.uri().path(),
            route = route.as_str(),
            "Received request"
        );

        let mut timer = RequestTimer::start(route);

        let mut response = match route {
            Route::Health => json_response(StatusCode::OK, &api::health::health(self.client.as_ref())),
            Route::Identify => api::identify::handle(self.client.as_ref(), request.into_body()).await,
            Route::Track => api::track::handle(&self.client, request.into_body()).await,
            Route::Preflight => cors::preflight_response(request.headers()),
            Route::NotFound => make_error_response(StatusCode::NOT_FOUND),
        };
        cors::apply_cors_headers(response.headers_mut());
        timer.finish(response.status());

        response
    }
}

/// Counts a request as in flight until dropped, then records its duration.
///
/// Hyper drops the handler future when the client goes away, so the
/// bookkeeping lives in `Drop` rather than after the last await.
struct RequestTimer {
    route: Route,
    started: Instant,
    status: Option<StatusCode>,
    inflight: Gauge,
}

impl RequestTimer {
    fn start(route: Route) -> Self {
        let inflight = shared::gauge!(REQUESTS_INFLIGHT);
        inflight.increment(1);

        RequestTimer {
            route,
            started: Instant::now(),
            status: None,
            inflight,
        }
    }

    fn finish(&mut self, status: StatusCode) {
        self.status = Some(status);
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let status = match self.status {
            Some(status) => status.as_str().to_owned(),
            None => "cancelled".to_owned(),
        };

        shared::histogram!(
            REQUEST_DURATION,
            "route" => self.route.as_str(),
            "status" => status
        )
        .record(self.started.elapsed().as_secs_f64());
        self.inflight.decrement(1);
    }
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<HandlerBody>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let relay_service = self.clone();
        Box::pin(async move { Ok(relay_service.handle(req).await) })
    }
}
