use std::fmt;

use crate::Value;

/// Logical inputs of one operation.
///
/// Carried by every [`OpResult`] so results of concurrent calls can be
/// matched back to the request that produced them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    /// Storage key, absent for diagnostic calls.
    pub key: Option<String>,
    /// Value or argument sent with the call.
    pub value: Option<Value>,
}

impl Params {
    /// Parameters of a call without inputs.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: None,
        }
    }

    pub fn key_value(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    /// Parameters of a diagnostic call taking a single argument.
    pub fn arg(value: impl Into<Value>) -> Self {
        Self {
            key: None,
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key, &self.value) {
            (Some(key), Some(value)) => write!(f, "{key}:{value}"),
            (Some(key), None) => f.write_str(key),
            (None, Some(value)) => write!(f, "{value}"),
            (None, None) => f.write_str("none"),
        }
    }
}

impl From<String> for Params {
    fn from(key: String) -> Self {
        Self::key(key)
    }
}

impl From<&str> for Params {
    fn from(key: &str) -> Self {
        Self::key(key)
    }
}

impl<V: Into<Value>> From<(String, V)> for Params {
    fn from((key, value): (String, V)) -> Self {
        Self::key_value(key, value)
    }
}

impl From<u32> for Params {
    fn from(arg: u32) -> Self {
        Self::arg(arg)
    }
}

/// Uniform success/failure envelope for one operation.
///
/// Exactly one of [`value`](Self::value) and [`error`](Self::error) is
/// populated; the constructors are the only way to build one.
#[derive(Clone, Debug, PartialEq)]
pub struct OpResult<T> {
    status: u16,
    endpoint: String,
    params: Params,
    outcome: std::result::Result<T, String>,
}

impl<T> OpResult<T> {
    pub fn success(status: u16, endpoint: impl Into<String>, params: Params, value: T) -> Self {
        Self {
            status,
            endpoint: endpoint.into(),
            params,
            outcome: Ok(value),
        }
    }

    pub fn failure(
        status: u16,
        endpoint: impl Into<String>,
        params: Params,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status,
            endpoint: endpoint.into(),
            params,
            outcome: Err(error.into()),
        }
    }

    /// Response status, `0` when no response was received.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Fully resolved request address.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Consumes the envelope, keeping only the outcome.
    pub fn into_result(self) -> std::result::Result<T, String> {
        self.outcome
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OpResult<U> {
        OpResult {
            status: self.status,
            endpoint: self.endpoint,
            params: self.params,
            outcome: self.outcome.map(f),
        }
    }
}

impl<T> fmt::Display for OpResult<T>
where
    T: fmt::Debug,
{
    /// Renders a failure as `status, message, endpoint`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(value) => write!(f, "{}: {value:?}", self.params),
            Err(error) => write!(
                f,
                "failed with status: {}, error: {}, url: {}",
                self.status,
                error.trim(),
                self.endpoint
            ),
        }
    }
}
