//! Plain inbound call and outcome types.
//!
//! These are the only values exchanged with the HTTP adapter; nothing here
//! depends on a web framework.

use std::collections::HashMap;

/// Request method as far as dispatch cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET: handshake.
    Get,
    /// POST: message delivery.
    Post,
    /// Anything else; always rejected.
    Other,
}

impl HttpMethod {
    /// Parse a method name. Matching is exact: `get` is not `GET`.
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            _ => HttpMethod::Other,
        }
    }
}

/// Query string parameters. A key may repeat; lookups see the first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value for `key`, treating an empty string as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Every value for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Request body, raw or already parsed by the adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CallBody {
    /// No body.
    #[default]
    Empty,
    /// Unparsed wire text.
    Raw(String),
    /// Structural map, e.g. from a body-parsing middleware.
    Parsed(serde_json::Value),
}

impl CallBody {
    /// Whether there is anything to dispatch.
    pub fn is_present(&self) -> bool {
        match self {
            CallBody::Empty => false,
            CallBody::Raw(text) => !text.trim().is_empty(),
            CallBody::Parsed(value) => !value.is_null(),
        }
    }
}

impl From<String> for CallBody {
    fn from(text: String) -> Self {
        if text.is_empty() {
            CallBody::Empty
        } else {
            CallBody::Raw(text)
        }
    }
}

/// One inbound HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCall {
    /// Request method.
    pub method: HttpMethod,
    /// Query parameters.
    pub query: QueryParams,
    /// Request body.
    pub body: CallBody,
}

impl InboundCall {
    /// GET with no body.
    pub fn get(query: QueryParams) -> Self {
        Self {
            method: HttpMethod::Get,
            query,
            body: CallBody::Empty,
        }
    }

    /// POST with a raw body.
    pub fn post(query: QueryParams, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            query,
            body: CallBody::from(body.into()),
        }
    }

    /// POST with a body the adapter already parsed.
    pub fn post_parsed(query: QueryParams, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            query,
            body: CallBody::Parsed(body),
        }
    }
}

/// Final status and body handed back to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl DispatchOutcome {
    /// Acknowledgment body when no reply was produced.
    pub const ACK_BODY: &'static str = "success";

    /// 200 with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// 200 `success`.
    pub fn acknowledged() -> Self {
        Self::ok(Self::ACK_BODY)
    }

    /// 400 `Bad Request`.
    pub fn bad_request() -> Self {
        Self {
            status: 400,
            body: "Bad Request".into(),
        }
    }

    /// 401 `Invalid signature`.
    pub fn unauthorized() -> Self {
        Self {
            status: 401,
            body: "Invalid signature".into(),
        }
    }

    /// 404 `Not Found`.
    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: "Not Found".into(),
        }
    }

    /// 500 `Internal Server Error`.
    pub fn internal_error() -> Self {
        Self {
            status: 500,
            body: "Internal Server Error".into(),
        }
    }

    /// Canonical outcome for a status code.
    pub fn for_status(status: u16) -> Self {
        match status {
            400 => Self::bad_request(),
            401 => Self::unauthorized(),
            404 => Self::not_found(),
            _ => Self::internal_error(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
