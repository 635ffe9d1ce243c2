//! 傳輸轉接器：在 HTTP 協作者之上實作 ACME 的請求/回應約定。
//!
//! 所有簽名請求都經過 [`Connection`] 的同一條路徑：取得 nonce 租約、簽名、送出、
//! 吸收新 nonce，必要時以新的 nonce 重送。

use chrono::{DateTime, Utc};
use openssl::x509::X509;
use reqwest::{header::HeaderMap, Method, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    certificate::decode_chain,
    directory::Endpoint,
    error::{AcmeError, DecodingError, Result},
    http::{HttpRequest, HttpResponse},
    jws::sign,
    nonce::NewNonce,
    problem::{mime_essence, Classifier, Problem, ProblemKind, ProtocolError, PROBLEM_CONTENT_TYPE},
    protection::KeyIdentity,
    session::Session,
};

/// 簽名請求的 Content-Type。
pub const JOSE_CONTENT_TYPE: &str = "application/jose+json";
/// PEM 憑證鏈的 Content-Type。
pub const PEM_CHAIN_CONTENT_TYPE: &str = "application/pem-certificate-chain";
/// 單一 DER 憑證的 Content-Type。
pub const PKIX_CERT_CONTENT_TYPE: &str = "application/pkix-cert";

const JSON_CONTENT_TYPE: &str = "application/json";

/// 與授權伺服器之間的連線轉接器，借用所屬的 [`Session`]。
#[derive(Debug, Clone, Copy)]
pub struct Connection<'a> {
    session: &'a Session,
}

impl<'a> Connection<'a> {
    pub fn new(session: &'a Session) -> Self {
        Connection { session }
    }

    pub fn session(&self) -> &'a Session {
        self.session
    }

    /// 未簽名的 GET 請求。回應中的 nonce 同樣會被吸收。
    pub fn get(&self, url: &str) -> Result<Response> {
        debug!(url = %url, "GET");
        let request = self.base_request(Method::GET, url);
        let response = self.session.http().request(request)?;
        self.session.nonces().absorb_from(&response.headers)?;
        Ok(Response::new(url, response))
    }

    /// 以帳戶 URL（`kid`）簽名的 POST 請求。
    pub fn post_as_signed(&self, url: &str, claims: &Value) -> Result<Response> {
        self.send_signed(url, Some(claims), self.kid()?, None)
    }

    /// POST-as-GET：以空 payload 讀取資源。
    pub fn post_as_get(&self, url: &str) -> Result<Response> {
        self.send_signed(url, None, self.kid()?, None)
    }

    /// 以 POST-as-GET 下載憑證鏈。
    pub fn post_as_get_certificate(&self, url: &str) -> Result<Response> {
        self.send_signed(url, None, self.kid()?, Some(PEM_CHAIN_CONTENT_TYPE))
    }

    /// 以公鑰本身（`jwk`）簽名的 POST 請求，只用於建立帳戶與以憑證金鑰撤銷。
    pub fn post_with_jwk(&self, url: &str, claims: &Value) -> Result<Response> {
        let jwk = self.session.key_pair().jwk()?;
        self.send_signed(url, Some(claims), KeyIdentity::Jwk(jwk), None)
    }

    /// 確認回應的狀態碼在可接受清單中；否則分類為 [`ProtocolError`]。
    pub fn accept(&self, response: &Response, statuses: &[u16]) -> Result<u16> {
        if statuses.contains(&response.status) {
            return Ok(response.status);
        }

        let error = response.to_protocol_error(self.session.classifier());
        if error.kind == ProblemKind::RateLimited {
            warn!(
                url = %response.request_url,
                retry_after = ?error.retry_after,
                "rate limited by authority"
            );
        }
        Err(error.into())
    }

    fn kid(&self) -> Result<KeyIdentity> {
        self.session
            .key_id()
            .map(KeyIdentity::Kid)
            .ok_or_else(|| AcmeError::IllegalState("no account is bound to this session".to_owned()))
    }

    fn base_request(&self, method: Method, url: &str) -> HttpRequest {
        let config = self.session.config();
        let mut request = HttpRequest::new(method, url).header("User-Agent", config.user_agent.as_str());
        if let Some(locale) = &config.locale {
            request = request.header("Accept-Language", accept_language(locale));
        }
        request
    }

    /// 簽名請求的唯一路徑。
    ///
    /// 在整個往返期間持有 nonce 租約；回應的 nonce 一律在回傳前吸收。
    /// 以 `badNonce` 被拒時重新簽名重送，最多 `nonce_retries` 次。
    fn send_signed(
        &self,
        url: &str,
        payload: Option<&Value>,
        identity: KeyIdentity,
        accept: Option<&str>,
    ) -> Result<Response> {
        // 目錄請求本身會吸收 nonce，必須在取得租約之前完成。
        let new_nonce_url = self.session.endpoint(Endpoint::NewNonce)?;
        let source = NewNonce::new(
            self.session.http(),
            &new_nonce_url,
            &self.session.config().user_agent,
        );
        let max_retries = self.session.config().nonce_retries;

        let mut lease = self.session.nonces().lease();
        let mut attempt = 0;
        loop {
            let nonce = lease.take_or_fetch(&source)?;
            let jws = sign(url, payload, &nonce, self.session.key_pair(), identity.clone())?;

            let mut request = self
                .base_request(Method::POST, url)
                .header("Content-Type", JOSE_CONTENT_TYPE)
                .body(jws.to_json()?);
            if let Some(accept) = accept {
                request = request.header("Accept", accept);
            }

            debug!(url = %url, attempt, "POST signed request");
            let response = self.session.http().request(request)?;
            lease.absorb_from(&response.headers)?;
            let response = Response::new(url, response);

            if response.is_success() {
                return Ok(response);
            }

            let error = response.to_protocol_error(self.session.classifier());
            if !error.is_retryable() {
                return Ok(response);
            }
            if attempt >= max_retries {
                warn!(url = %url, attempts = attempt + 1, "bad nonce retries exhausted");
                return Err(error.into());
            }
            attempt += 1;
            warn!(url = %url, attempt, "authority rejected nonce, resending");
        }
    }
}

/// 由語系產生 `Accept-Language` 標頭，例如 `zh-TW` → `zh-TW,zh;q=0.8,*;q=0.1`。
fn accept_language(locale: &str) -> String {
    let locale = locale.replace('_', "-");
    match locale.split_once('-') {
        Some((language, _)) => format!("{},{};q=0.8,*;q=0.1", locale, language),
        None => format!("{},*;q=0.1", locale),
    }
}

/// 依 Content-Type 分類的回應內容。
#[derive(Debug)]
pub enum ResponseBody {
    Json(Value),
    Problem(Problem),
    /// 憑證鏈，葉憑證在前。
    Certificate(Vec<X509>),
    Empty,
    Other {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// 已完成的回應，附帶請求 URL 以解析相對連結。
#[derive(Debug, Clone)]
pub struct Response {
    request_url: String,
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new(request_url: impl Into<String>, response: HttpResponse) -> Self {
        Response {
            request_url: request_url.into(),
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }

    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// MIME 型別本體（小寫、不含參數）。
    pub fn content_type(&self) -> Option<String> {
        self.header_str(reqwest::header::CONTENT_TYPE.as_str())
            .map(mime_essence)
    }

    fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 以請求 URL 為基準解析可能是相對路徑的目標。
    pub fn resolve(&self, target: &str) -> std::result::Result<String, DecodingError> {
        let resolved = match Url::parse(&self.request_url) {
            Ok(base) => base.join(target),
            Err(_) => Url::parse(target),
        };
        resolved
            .map(|url| url.to_string())
            .map_err(|e| DecodingError::InvalidUrl {
                value: target.to_owned(),
                reason: e.to_string(),
            })
    }

    /// `Location` 標頭，已解析為絕對 URL。
    pub fn location(&self) -> std::result::Result<Option<String>, DecodingError> {
        self.header_str("Location")
            .map(|value| self.resolve(value.trim()))
            .transpose()
    }

    /// 同 [`location`](Self::location)，但缺少時回傳錯誤。
    pub fn required_location(&self) -> std::result::Result<String, DecodingError> {
        self.location()?
            .ok_or(DecodingError::MissingHeader("Location"))
    }

    /// 第一個關係為 `rel` 的 `Link` 目標。
    pub fn link(&self, rel: &str) -> std::result::Result<Option<String>, DecodingError> {
        Ok(self.links(rel)?.into_iter().next())
    }

    /// 所有關係為 `rel` 的 `Link` 目標，依出現順序。
    pub fn links(&self, rel: &str) -> std::result::Result<Vec<String>, DecodingError> {
        self.headers
            .get_all("Link")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_links)
            .filter(|(_, rels)| rels.iter().any(|r| r.eq_ignore_ascii_case(rel)))
            .map(|(target, _)| self.resolve(&target))
            .collect()
    }

    /// `Retry-After` 標頭，接受 HTTP 日期或秒數。
    pub fn retry_after(&self) -> std::result::Result<Option<DateTime<Utc>>, DecodingError> {
        let Some(value) = self.header_str("Retry-After").map(str::trim) else {
            return Ok(None);
        };
        let invalid = || DecodingError::InvalidHeader {
            name: "Retry-After",
            value: value.to_owned(),
        };

        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            let seconds: i64 = value.parse().map_err(|_| invalid())?;
            return chrono::Duration::try_seconds(seconds)
                .and_then(|delta| Utc::now().checked_add_signed(delta))
                .map(Some)
                .ok_or_else(invalid);
        }
        DateTime::parse_from_rfc2822(value)
            .map(|date| Some(date.with_timezone(&Utc)))
            .map_err(|_| invalid())
    }

    /// 依 Content-Type 分類回應內容，不猜測內容本身。
    pub fn body(&self) -> std::result::Result<ResponseBody, DecodingError> {
        if self.body.is_empty() {
            return Ok(ResponseBody::Empty);
        }
        let content_type = self.content_type();
        Ok(match content_type.as_deref() {
            Some(JSON_CONTENT_TYPE) => ResponseBody::Json(serde_json::from_slice(&self.body)?),
            Some(PROBLEM_CONTENT_TYPE) => ResponseBody::Problem(serde_json::from_slice(&self.body)?),
            Some(PEM_CHAIN_CONTENT_TYPE) | Some(PKIX_CERT_CONTENT_TYPE) => {
                ResponseBody::Certificate(self.certificate_chain()?)
            }
            _ => ResponseBody::Other {
                content_type,
                bytes: self.body.clone(),
            },
        })
    }

    /// 解析 JSON 物件內容。
    pub fn json(&self) -> std::result::Result<Value, DecodingError> {
        match self.content_type().as_deref() {
            Some(JSON_CONTENT_TYPE) | Some(PROBLEM_CONTENT_TYPE) => {}
            other => {
                return Err(DecodingError::ContentType(
                    other.unwrap_or("<none>").to_owned(),
                ))
            }
        }
        match serde_json::from_slice::<Value>(&self.body)? {
            value @ Value::Object(_) => Ok(value),
            Value::Array(_) => Err(DecodingError::NotAnObject("array")),
            _ => Err(DecodingError::NotAnObject("scalar")),
        }
    }

    /// 解析憑證鏈；PEM 鏈或單一 DER 憑證，葉憑證在前。
    pub fn certificate_chain(&self) -> std::result::Result<Vec<X509>, DecodingError> {
        match self.content_type().as_deref() {
            Some(PKIX_CERT_CONTENT_TYPE) => Ok(vec![X509::from_der(&self.body)?]),
            Some(PEM_CHAIN_CONTENT_TYPE) => decode_chain(&self.body),
            Some(other) => Err(DecodingError::ContentType(other.to_owned())),
            None => decode_chain(&self.body),
        }
    }

    /// 將非成功回應交給分類器。
    pub fn to_protocol_error(&self, classifier: &Classifier) -> ProtocolError {
        let content_type = self.content_type();
        let retry_after = self.retry_after().unwrap_or_else(|e| {
            debug!(error = %e, "ignoring malformed Retry-After");
            None
        });
        classifier.classify(self.status, content_type.as_deref(), &self.body, retry_after)
    }
}

/// 解析單一 `Link` 標頭值，回傳 `(目標, 關係清單)`。一個值內可以有多個以逗號分隔的連結。
fn parse_links(value: &str) -> Vec<(String, Vec<String>)> {
    let mut links = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let target = after[..end].trim().to_owned();
        let tail = &after[end + 1..];
        let params_end = tail.find('<').unwrap_or(tail.len());

        let rels = tail[..params_end]
            .split(';')
            .filter_map(|param| param.split_once('='))
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case("rel"))
            .flat_map(|(_, value)| {
                value
                    .trim()
                    .trim_end_matches(',')
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .collect();

        links.push((target, rels));
        rest = &tail[params_end..];
    }
    links
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        http::mock::{payload_of, protected_of},
        problem::ProblemKind,
        session::tests::scripted_session,
    };

    const BAD_NONCE: &str = "urn:ietf:params:acme:error:badNonce";

    fn response(url: &str, http: HttpResponse) -> Response {
        Response::new(url, http)
    }

    #[test]
    fn test_link_resolution() {
        let r = response(
            "https://example/acme/authz/1",
            HttpResponse::empty(200)
                .with_header("Link", "<https://example/acct>;rel=\"up\"")
                .with_header("Link", "</acme/dir>;rel=\"index\", </acme/cert/1/2>;rel=alternate"),
        );

        assert_eq!(r.link("up").unwrap().as_deref(), Some("https://example/acct"));
        assert_eq!(
            r.link("index").unwrap().as_deref(),
            Some("https://example/acme/dir")
        );
        assert_eq!(
            r.links("alternate").unwrap(),
            vec!["https://example/acme/cert/1/2".to_owned()]
        );
        assert!(r.link("terms-of-service").unwrap().is_none());
    }

    #[test]
    fn test_link_up_absolute_regardless_of_base() {
        let r = response(
            "/relative/request",
            HttpResponse::empty(200).with_header("Link", "<https://example/acct>;rel=\"up\""),
        );
        assert_eq!(r.link("up").unwrap().as_deref(), Some("https://example/acct"));
    }

    #[test]
    fn test_relative_location() {
        let r = response(
            "https://example/acme/new-order",
            HttpResponse::empty(201).with_header("Location", "/acme/order/42"),
        );
        assert_eq!(r.required_location().unwrap(), "https://example/acme/order/42");

        let r = response("https://example/acme/new-order", HttpResponse::empty(201));
        assert!(matches!(
            r.required_location(),
            Err(DecodingError::MissingHeader("Location"))
        ));
    }

    #[test]
    fn test_retry_after_forms() {
        let r = response(
            "https://example/",
            HttpResponse::empty(200).with_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        let at = r.retry_after().unwrap().unwrap();
        assert_eq!(at.to_rfc3339(), "2015-10-21T07:28:00+00:00");

        let before = Utc::now();
        let r = response(
            "https://example/",
            HttpResponse::empty(200).with_header("Retry-After", "120"),
        );
        let at = r.retry_after().unwrap().unwrap();
        assert!(at >= before + chrono::Duration::seconds(120));

        let r = response(
            "https://example/",
            HttpResponse::empty(200).with_header("Retry-After", "soon"),
        );
        assert!(matches!(
            r.retry_after(),
            Err(DecodingError::InvalidHeader { .. })
        ));

        for seconds in ["10000000000000", "99999999999999999", "99999999999999999999"] {
            let r = response(
                "https://example/",
                HttpResponse::empty(200).with_header("Retry-After", seconds),
            );
            assert!(matches!(
                r.retry_after(),
                Err(DecodingError::InvalidHeader { .. })
            ));
        }
    }

    #[test]
    fn test_out_of_range_retry_after_is_dropped_when_classifying() {
        let (client, session) = scripted_session();
        client.push(
            HttpResponse::problem(429, "urn:ietf:params:acme:error:rateLimited", "slow down")
                .with_header("Retry-After", "99999999999999999")
                .with_nonce("n1"),
        );

        let conn = session.connect();
        let r = conn.post_as_get("https://ca.example/acme/order/1").unwrap();
        let err = conn.accept(&r, &[200]).unwrap_err();
        let protocol = err.protocol().unwrap();
        assert_eq!(protocol.kind, ProblemKind::RateLimited);
        assert_eq!(protocol.retry_after, None);
    }

    #[test]
    fn test_body_is_tagged_by_content_type() {
        let r = response("https://example/", HttpResponse::json(200, json!({"status": "valid"})));
        assert!(matches!(r.body().unwrap(), ResponseBody::Json(_)));

        let r = response(
            "https://example/",
            HttpResponse::problem(400, "urn:ietf:params:acme:error:malformed", "bad"),
        );
        assert!(matches!(r.body().unwrap(), ResponseBody::Problem(_)));

        let r = response("https://example/", HttpResponse::empty(204));
        assert!(matches!(r.body().unwrap(), ResponseBody::Empty));

        let r = response(
            "https://example/",
            HttpResponse::empty(200).with_body("text/plain", b"{\"looks\": \"like json\"}"),
        );
        assert!(matches!(r.body().unwrap(), ResponseBody::Other { .. }));
        assert!(matches!(r.json(), Err(DecodingError::ContentType(_))));
    }

    #[test]
    fn test_json_requires_object() {
        let r = response("https://example/", HttpResponse::json(200, json!([1, 2])));
        assert!(matches!(r.json(), Err(DecodingError::NotAnObject(_))));
    }

    #[test]
    fn test_accept_classifies_unlisted_status() {
        let (client, session) = scripted_session();
        client.push(
            HttpResponse::problem(429, "urn:ietf:params:acme:error:rateLimited", "too many orders")
                .with_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT")
                .with_nonce("n1"),
        );

        let conn = session.connect();
        let r = conn.post_as_get("https://ca.example/acme/order/1").unwrap();
        let err = conn.accept(&r, &[200]).unwrap_err();
        let protocol = err.protocol().unwrap();
        assert_eq!(protocol.kind, ProblemKind::RateLimited);
        assert!(protocol.retry_after.is_some());
        assert_eq!(err.to_string(), "too many orders");
        assert_eq!(session.nonces().peek().as_deref(), Some("n1"));
    }

    #[test]
    fn test_bad_nonce_resent_once_with_fresh_nonce() {
        let (client, session) = scripted_session();
        session.nonces().absorb("stale");
        client.push(HttpResponse::problem(400, BAD_NONCE, "bad nonce").with_nonce("fresh"));
        client.push(HttpResponse::json(200, json!({"status": "pending"})).with_nonce("next"));

        let r = session
            .connect()
            .post_as_signed("https://ca.example/acme/order/1", &json!({}))
            .unwrap();
        assert_eq!(r.status(), 200);

        let posts = client.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(protected_of(&posts[0])["nonce"], "stale");
        assert_eq!(protected_of(&posts[1])["nonce"], "fresh");
        assert_eq!(session.nonces().peek().as_deref(), Some("next"));
    }

    #[test]
    fn test_second_bad_nonce_is_fatal() {
        let (client, session) = scripted_session();
        client.push(HttpResponse::problem(400, BAD_NONCE, "bad nonce").with_nonce("a"));
        client.push(HttpResponse::problem(400, BAD_NONCE, "bad nonce again").with_nonce("b"));
        client.push(HttpResponse::json(200, json!({})));

        let err = session
            .connect()
            .post_as_get("https://ca.example/acme/order/1")
            .unwrap_err();

        assert_eq!(err.protocol().unwrap().kind, ProblemKind::BadNonce);
        assert_eq!(client.posts().len(), 2);
        assert_eq!(client.remaining(), 1);
        assert_eq!(session.nonces().peek().as_deref(), Some("b"));
    }

    #[test]
    fn test_nonce_chain_across_requests() {
        let (client, session) = scripted_session();
        for i in 0..3 {
            client.push(HttpResponse::json(200, json!({})).with_nonce(&format!("resp-{}", i)));
        }

        let conn = session.connect();
        for _ in 0..3 {
            conn.post_as_get("https://ca.example/acme/order/1").unwrap();
        }

        let posts = client.posts();
        assert_eq!(protected_of(&posts[0])["nonce"], "head-nonce-0");
        assert_eq!(protected_of(&posts[1])["nonce"], "resp-0");
        assert_eq!(protected_of(&posts[2])["nonce"], "resp-1");
        assert_eq!(payload_of(&posts[0]), Value::Null);
    }

    #[test]
    fn test_missing_nonce_in_response_fetches_new_one() {
        let (client, session) = scripted_session();
        client.push(HttpResponse::json(200, json!({})));
        client.push(HttpResponse::json(200, json!({})));

        let conn = session.connect();
        conn.post_as_get("https://ca.example/acme/order/1").unwrap();
        conn.post_as_get("https://ca.example/acme/order/1").unwrap();

        let posts = client.posts();
        assert_eq!(protected_of(&posts[0])["nonce"], "head-nonce-0");
        assert_eq!(protected_of(&posts[1])["nonce"], "head-nonce-1");
    }

    #[test]
    fn test_signed_request_headers() {
        let (client, session) = scripted_session();
        client.push(HttpResponse::json(201, json!({})).with_nonce("n"));

        session
            .connect()
            .post_with_jwk("https://ca.example/acme/new-acct", &json!({"termsOfServiceAgreed": true}))
            .unwrap();

        let post = &client.posts()[0];
        assert!(post
            .headers
            .iter()
            .any(|(name, value)| *name == "Content-Type" && value == JOSE_CONTENT_TYPE));
        let header = protected_of(post);
        assert_eq!(header["url"], "https://ca.example/acme/new-acct");
        assert!(header.get("jwk").is_some());
        assert!(header.get("kid").is_none());
        assert_eq!(payload_of(post)["termsOfServiceAgreed"], true);
    }

    #[test]
    fn test_transport_error_surfaces() {
        let (client, session) = scripted_session();
        client.push_error(crate::error::TransportError::Unreachable {
            url: "https://ca.example/acme/order/1".to_owned(),
            reason: "connection reset".to_owned(),
        });

        let err = session
            .connect()
            .post_as_get("https://ca.example/acme/order/1")
            .unwrap_err();
        assert!(matches!(err, AcmeError::Transport(_)));
    }

    #[test]
    fn test_concurrent_requests_never_reuse_nonce() {
        let (client, session) = scripted_session();
        let session = Arc::new(session);
        for i in 0..16 {
            client.push(HttpResponse::json(200, json!({})).with_nonce(&format!("resp-{}", i)));
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for _ in 0..4 {
                        session
                            .connect()
                            .post_as_get("https://ca.example/acme/order/1")
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut nonces: Vec<String> = client
            .posts()
            .iter()
            .map(|p| protected_of(p)["nonce"].as_str().unwrap().to_owned())
            .collect();
        let total = nonces.len();
        nonces.sort();
        nonces.dedup();
        assert_eq!(total, 16);
        assert_eq!(nonces.len(), 16);
    }

    #[test]
    fn test_accept_language() {
        assert_eq!(accept_language("zh_TW"), "zh-TW,zh;q=0.8,*;q=0.1");
        assert_eq!(accept_language("de"), "de,*;q=0.1");
    }
}
