//! Invocation of remote functions.
//!
//! The collectors only see the narrow [`Invoke`] contract; [`LambdaClient`]
//! implements it on top of the AWS SDK, which resolves credentials through
//! the standard provider chain.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};

pub mod lambda;

pub use lambda::{LambdaClient, LambdaConnector};

/// Raw outcome of one invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// HTTP status of the invocation.
    pub status: u16,
    /// Response payload.
    pub payload: Bytes,
    /// Decoded tail of the execution log, if returned.
    pub log_result: Option<String>,
    /// Kind of function error (`Handled`, `Unhandled`), if any.
    pub function_error: Option<String>,
}

impl Invocation {
    /// A successful invocation returning `payload`.
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            payload: payload.into(),
            log_result: None,
            function_error: None,
        }
    }

    /// The payload of a successful invocation.
    ///
    /// A status other than 200 or a reported function error turns into
    /// [`Error::Invoke`], carrying the function error kind or, failing that,
    /// the response body.
    pub fn into_payload(self) -> Result<Bytes> {
        if self.status == 200 && self.function_error.is_none() {
            return Ok(self.payload);
        }

        let diagnostic = match self.function_error {
            Some(kind) => format!("{kind}: {}", String::from_utf8_lossy(&self.payload)),
            None => String::from_utf8_lossy(&self.payload).into_owned(),
        };
        Err(Error::Invoke {
            status: self.status,
            diagnostic,
        })
    }
}

/// Synchronous request/response call of a remote function by name.
#[async_trait]
pub trait Invoke: std::fmt::Debug + Send + Sync {
    /// Invoke `function_name` once, without input payload.
    async fn invoke(&self, function_name: &str) -> Result<Invocation>;
}

/// Hands out an [`Invoke`] implementation bound to one region.
pub trait Connect: std::fmt::Debug + Send + Sync {
    /// Client for functions deployed in `region`.
    fn connect(&self, region: &str) -> Arc<dyn Invoke>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_invocation_yields_payload() {
        let payload = Invocation::ok(&b"{}"[..]).into_payload().unwrap();
        assert_eq!(&b"{}"[..], &payload[..]);
    }

    #[test]
    fn non_success_status_is_an_error() {
        let invocation = Invocation {
            status: 404,
            payload: Bytes::from_static(b"Function not found"),
            log_result: None,
            function_error: None,
        };

        match invocation.into_payload() {
            Err(Error::Invoke { status, diagnostic }) => {
                assert_eq!(404, status);
                assert_eq!("Function not found", diagnostic);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn function_error_is_an_error() {
        let invocation = Invocation {
            function_error: Some("Unhandled".to_owned()),
            ..Invocation::ok(&br#"{"errorMessage":"boom"}"#[..])
        };

        match invocation.into_payload() {
            Err(Error::Invoke { status, diagnostic }) => {
                assert_eq!(200, status);
                assert_eq!(r#"Unhandled: {"errorMessage":"boom"}"#, diagnostic);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
