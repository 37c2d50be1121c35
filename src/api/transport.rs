use crate::error::{RemoteError, RemoteResult};
use crate::retry::{CancelToken, Clock, ResilientCaller};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpBody {
    pub content_type: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<HttpBody>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers
            .push(("Authorization".to_string(), format!("Bearer {token}")));
        self
    }

    pub fn body(mut self, content_type: impl Into<String>, content: impl Into<String>) -> Self {
        self.body = Some(HttpBody {
            content_type: content_type.into(),
            content: content.into(),
        });
        self
    }

    pub fn json(self, value: &serde_json::Value) -> Self {
        self.body("application/json", value.to_string())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// 2xx passes through; 429 is transient; anything else is permanent.
    pub fn error_for_status(self) -> RemoteResult<Self> {
        match self.status {
            200..=299 => Ok(self),
            429 => Err(RemoteError::rate_limited(self.body)),
            status => Err(RemoteError::Permanent {
                status,
                body: self.body,
            }),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> RemoteResult<T> {
        serde_json::from_str(&self.body).map_err(RemoteError::parse)
    }
}

/// One HTTP exchange. Transport faults map to [`RemoteError::Transient`];
/// status codes are left for [`HttpResponse::error_for_status`].
pub trait Transport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, RemoteResult<HttpResponse>>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, RemoteResult<HttpResponse>> {
        async move {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
            };
            let mut req = self.client.request(method, &request.url);
            for (name, value) in &request.headers {
                req = req.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                req = req
                    .header("Content-Type", body.content_type)
                    .body(body.content);
            }

            let res = req.send().await.map_err(RemoteError::transport)?;
            let status = res.status().as_u16();
            let body = res.text().await.map_err(RemoteError::transport)?;
            Ok(HttpResponse { status, body })
        }
        .boxed_local()
    }
}

/// Sends `request` through the resilient caller and checks the status of
/// every attempt.
pub(crate) async fn send_resilient<T: Transport, C: Clock>(
    transport: &T,
    caller: &ResilientCaller<C>,
    cancel: &CancelToken,
    request: HttpRequest,
) -> RemoteResult<HttpResponse> {
    caller
        .call(cancel, || {
            let req = request.clone();
            async move { transport.send(req).await?.error_for_status() }
        })
        .await
}
