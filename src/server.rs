//! HTTP surface of the exporter.
//!
//! The telemetry route runs one scrape per request: it resolves the region,
//! describes and collects the requested function and encodes the result
//! together with the exporter's own metrics. Requests to it are counted by
//! status code. Every other path serves a landing page.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::{debug, error, warn};

use crate::collector::{Collector, LambdaCollector, ProcessCollector, ScrapeCollector, Target};
use crate::encoding::text;
use crate::invoke::Connect;
use crate::region::RegionResolver;
use crate::registry::DescriptorRegistry;
use crate::stats::ExporterStats;

/// Query parameter naming the function to scrape.
pub const FUNCTION_NAME_PARAM: &str = "function_name[]";

/// State shared by all requests.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Descriptors learned from all functions.
    pub registry: Arc<DescriptorRegistry>,
    /// Cumulative drop and failure counters.
    pub stats: Arc<ExporterStats>,
    /// Region of the process.
    pub region: Arc<RegionResolver>,
    /// Factory of per-region invocation clients.
    pub connector: Arc<dyn Connect>,
    /// Path of the telemetry route.
    pub telemetry_path: String,
}

/// Build the exporter's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&state.telemetry_path, get(scrape))
        .route_layer(middleware::from_fn_with_state(
            state.stats.clone(),
            instrument,
        ))
        .fallback(landing_page)
        .with_state(state)
}

/// Tracks in-flight telemetry requests and counts responses by status code.
async fn instrument(
    State(stats): State<Arc<ExporterStats>>,
    request: Request,
    next: Next,
) -> Response {
    let _in_flight = stats.request_started();
    let response = next.run(request).await;
    stats.record_response(response.status().as_u16());
    response
}

async fn landing_page(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>AWS Lambda Exporter</title></head>\n\
         <body>\n\
         <h1>AWS Lambda Exporter</h1>\n\
         <p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        state.telemetry_path
    ))
}

/// First non-empty value of `function_name[]`, or of `function_name`.
fn function_name(params: &[(String, String)]) -> Option<&str> {
    [FUNCTION_NAME_PARAM, "function_name"].iter().find_map(|key| {
        params
            .iter()
            .find(|(name, value)| name == key && !value.is_empty())
            .map(|(_, value)| value.as_str())
    })
}

async fn scrape(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let Some(function_name) = function_name(&params) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("Missing {FUNCTION_NAME_PARAM} query parameter"),
        )
            .into_response();
    };
    debug!(function_name, "scrape requested");

    let region = match state.region.resolve().await {
        Ok(region) => region,
        Err(err) => {
            warn!(error = %err, "couldn't get region");
            return (StatusCode::BAD_REQUEST, format!("Couldn't get region {err}")).into_response();
        }
    };

    let start = Instant::now();
    let collector = LambdaCollector::new(
        Target::new(region.as_str(), function_name),
        state.connector.connect(&region),
        state.registry.clone(),
        state.stats.clone(),
    );
    let descriptors = collector.describe().await;
    debug!(
        function_name,
        descriptors = descriptors.len(),
        "descriptors in effect"
    );
    let collection = collector.collect().await;
    let up = collection.is_ok();

    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(ProcessCollector::new()),
        Box::new(ScrapeCollector::new(
            collector.target().clone(),
            up,
            start.elapsed(),
            state.registry.len(),
            state.stats.clone(),
        )),
        Box::new(collection.unwrap_or_default()),
    ];

    let mut buffer = String::new();
    if let Err(err) = text::encode(&mut buffer, &collectors) {
        error!(error = %err, "couldn't encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    ([(CONTENT_TYPE, text::CONTENT_TYPE)], buffer).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn bracketed_parameter_takes_precedence() {
        let params = params(&[
            ("function_name", "plain"),
            ("function_name[]", "first"),
            ("function_name[]", "second"),
        ]);

        assert_eq!(Some("first"), function_name(&params));
    }

    #[test]
    fn plain_parameter_is_accepted() {
        assert_eq!(
            Some("plain"),
            function_name(&params(&[("function_name", "plain")]))
        );
    }

    #[test]
    fn empty_or_missing_parameter() {
        assert_eq!(None, function_name(&params(&[("function_name[]", "")])));
        assert_eq!(None, function_name(&params(&[("other", "x")])));
    }
}
