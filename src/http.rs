//! 底層 HTTP 協作者。
//!
//! 協議引擎只需要「送出請求、取得狀態碼、標頭與內容」這一個原語；
//! TLS、連線池與 DNS 都留給實作者。預設實作使用 reqwest 的阻塞式客戶端。

use std::{fmt, time::Duration};

use reqwest::{blocking::Client, header::HeaderMap, Method};

use crate::error::TransportError;

/// 送往授權伺服器的原始請求。
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        HttpRequest {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// 伺服器的原始回應。
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// 定義 HTTP 協作者的行為。
pub trait HttpClient: Send + Sync + fmt::Debug {
    /// 送出請求並回傳完整回應。非 2xx 狀態碼不是錯誤；只有網路或 I/O 失敗才回傳錯誤。
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// 使用 reqwest 阻塞式客戶端的實作。
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// 建立一個帶有請求逾時的客戶端。
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ReqwestClient { client })
    }
}

impl HttpClient for ReqwestClient {
    fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
