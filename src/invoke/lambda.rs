//! Client for the AWS Lambda `Invoke` API.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lambda::config::{Builder, Region};
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::operation::invoke::InvokeOutput;
use aws_sdk_lambda::types::{InvocationType, LogType};
use aws_sdk_lambda::Client;
use base64::Engine;
use bytes::Bytes;
use tracing::trace;

use super::{Connect, Invocation, Invoke};
use crate::error::{Error, Result};

/// Invokes functions of one region synchronously, asking for the tail of
/// the execution log.
#[derive(Debug, Clone)]
pub struct LambdaClient {
    client: Client,
}

impl LambdaClient {
    /// Client for `region`, sharing the credentials, their cache and any
    /// endpoint override of `config`.
    pub fn new(config: &SdkConfig, region: &str) -> Self {
        let config = Builder::from(config)
            .region(Region::new(region.to_owned()))
            .build();

        Self {
            client: Client::from_conf(config),
        }
    }
}

#[async_trait]
impl Invoke for LambdaClient {
    async fn invoke(&self, function_name: &str) -> Result<Invocation> {
        trace!(function_name, "invoking function");
        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::RequestResponse)
            .log_type(LogType::Tail)
            .send()
            .await
            .map_err(|err| {
                let diagnostic = DisplayErrorContext(&err).to_string();
                match err.raw_response() {
                    Some(response) => Error::Invoke {
                        status: response.status().as_u16(),
                        diagnostic,
                    },
                    None => Error::Transport(diagnostic),
                }
            })?;

        Ok(invocation(&output))
    }
}

fn invocation(output: &InvokeOutput) -> Invocation {
    let log_result = output
        .log_result()
        .and_then(|tail| base64::engine::general_purpose::STANDARD.decode(tail).ok())
        .map(|tail| String::from_utf8_lossy(&tail).into_owned());

    Invocation {
        status: u16::try_from(output.status_code()).unwrap_or_default(),
        payload: output
            .payload()
            .map(|payload| Bytes::copy_from_slice(payload.as_ref()))
            .unwrap_or_default(),
        log_result,
        function_error: output.function_error().map(str::to_owned),
    }
}

/// Creates a [`LambdaClient`] per region from one loaded SDK configuration.
#[derive(Debug, Clone)]
pub struct LambdaConnector {
    config: SdkConfig,
}

impl LambdaConnector {
    /// Create a connector. The region of `config` is replaced per client.
    pub fn new(config: SdkConfig) -> Self {
        Self { config }
    }
}

impl Connect for LambdaConnector {
    fn connect(&self, region: &str) -> Arc<dyn Invoke> {
        Arc::new(LambdaClient::new(&self.config, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::BehaviorVersion;
    use aws_sdk_lambda::config::retry::RetryConfig;
    use aws_sdk_lambda::config::Credentials;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::Router;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;

    const LOG_TAIL: &str = "START RequestId: 1\nEND RequestId: 1\n";

    #[derive(Debug, Clone)]
    struct Received {
        path: String,
        invocation_type: Option<String>,
        log_type: Option<String>,
        authorization: String,
    }

    type Log = Arc<Mutex<Vec<Received>>>;

    fn header(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    async fn invocations(
        State(log): State<Log>,
        Path(name): Path<String>,
        uri: Uri,
        headers: HeaderMap,
    ) -> Response {
        log.lock().push(Received {
            path: uri.path().to_owned(),
            invocation_type: header(&headers, "x-amz-invocation-type"),
            log_type: header(&headers, "x-amz-log-type"),
            authorization: header(&headers, "authorization").unwrap_or_default(),
        });

        let tail = base64::engine::general_purpose::STANDARD.encode(LOG_TAIL);
        match name.as_str() {
            "demo" => (
                [
                    ("x-amz-executed-version", "$LATEST".to_owned()),
                    ("x-amz-log-result", tail),
                ],
                r#"{"result": "up 1\n"}"#,
            )
                .into_response(),
            "broken" => (
                [
                    ("x-amz-executed-version", "$LATEST"),
                    ("x-amz-function-error", "Unhandled"),
                ],
                r#"{"errorMessage":"boom"}"#,
            )
                .into_response(),
            _ => (
                StatusCode::NOT_FOUND,
                [
                    ("content-type", "application/json"),
                    ("x-amzn-errortype", "ResourceNotFoundException"),
                ],
                format!(r#"{{"Type":"User","message":"Function not found: {name}"}}"#),
            )
                .into_response(),
        }
    }

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{address}")
    }

    async fn connector(endpoint: &str) -> LambdaConnector {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(Credentials::new("AKIDEXAMPLE", "secret", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        LambdaConnector::new(config)
    }

    async fn lambda() -> (Log, LambdaConnector) {
        let log = Log::default();
        let router = Router::new()
            .route("/2015-03-31/functions/:name/invocations", post(invocations))
            .with_state(log.clone());
        let endpoint = serve(router).await;
        (log, connector(&endpoint).await)
    }

    #[tokio::test]
    async fn invoke_requests_log_tail() {
        let (log, connector) = lambda().await;

        let invocation = connector.connect("eu-west-1").invoke("demo").await.unwrap();

        assert_eq!(200, invocation.status);
        assert_eq!(None, invocation.function_error);
        assert_eq!(Some(LOG_TAIL), invocation.log_result.as_deref());
        assert_eq!(
            &br#"{"result": "up 1\n"}"#[..],
            &invocation.into_payload().unwrap()[..]
        );

        let received = log.lock().clone();
        assert_eq!(1, received.len());
        assert_eq!("/2015-03-31/functions/demo/invocations", received[0].path);
        assert_eq!(Some("RequestResponse"), received[0].invocation_type.as_deref());
        assert_eq!(Some("Tail"), received[0].log_type.as_deref());
        assert!(received[0]
            .authorization
            .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(received[0]
            .authorization
            .contains("/eu-west-1/lambda/aws4_request"));
    }

    #[tokio::test]
    async fn function_error_header_is_reported() {
        let (_, connector) = lambda().await;

        let invocation = connector.connect("eu-west-1").invoke("broken").await.unwrap();

        assert_eq!(Some("Unhandled"), invocation.function_error.as_deref());
        assert_eq!(None, invocation.log_result);
        match invocation.into_payload() {
            Err(Error::Invoke { status, diagnostic }) => {
                assert_eq!(200, status);
                assert_eq!(r#"Unhandled: {"errorMessage":"boom"}"#, diagnostic);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn service_error_keeps_status() {
        let (_, connector) = lambda().await;

        match connector.connect("eu-west-1").invoke("missing").await {
            Err(Error::Invoke { status, .. }) => assert_eq!(404, status),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let connector = connector(&endpoint).await;
        assert!(matches!(
            connector.connect("eu-west-1").invoke("demo").await,
            Err(Error::Transport(_))
        ));
    }
}
