//! 訂單：建立、取得授權、最終化（finalize）與下載憑證。

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    authorization::Authorization,
    certificate::Certificate,
    csr::Csr,
    directory::Endpoint,
    error::{AcmeError, Result},
    key_pair::KeyPair,
    payload::{FinalizeOrderPayload, Identifier, NewOrderPayload, PayloadT},
    problem::Problem,
    resource::{fetch, wait_for_completion, wait_until, CancelToken, Resource, Status},
    session::Session,
};

/// 訂單文件中本層會讀取的欄位。
#[derive(Debug, Clone, Default, Deserialize)]
struct OrderDocument {
    #[serde(default)]
    expires: Option<String>,
    #[serde(default)]
    identifiers: Vec<Identifier>,
    #[serde(rename = "notBefore", default)]
    not_before: Option<String>,
    #[serde(rename = "notAfter", default)]
    not_after: Option<String>,
    #[serde(default)]
    authorizations: Vec<String>,
    #[serde(default)]
    finalize: Option<String>,
    #[serde(default)]
    certificate: Option<String>,
    #[serde(default)]
    error: Option<Problem>,
}

/// 表示一筆憑證訂單。
#[derive(Debug, Clone)]
pub struct Order<'a> {
    session: &'a Session,
    location: String,
    doc: OrderDocument,
    json: Value,
    status: Status,
}

impl<'a> Order<'a> {
    /// 以訂單 URL 取得既有訂單。
    pub fn bind(session: &'a Session, url: &str) -> Result<Self> {
        let mut order = Order {
            session,
            location: url.to_owned(),
            doc: OrderDocument::default(),
            json: Value::Null,
            status: Status::Unknown,
        };
        fetch(&mut order)?;
        Ok(order)
    }

    pub fn url(&self) -> &str {
        &self.location
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.doc.identifiers
    }

    /// 訂單到期時間（RFC 3339 字串）。
    pub fn expires(&self) -> Option<&str> {
        self.doc.expires.as_deref()
    }

    pub fn not_before(&self) -> Option<&str> {
        self.doc.not_before.as_deref()
    }

    pub fn not_after(&self) -> Option<&str> {
        self.doc.not_after.as_deref()
    }

    pub fn authorization_urls(&self) -> &[String] {
        &self.doc.authorizations
    }

    /// 訂單變成 `valid` 後才會出現的憑證 URL。
    pub fn certificate_url(&self) -> Option<&str> {
        self.doc.certificate.as_deref()
    }

    /// 訂單失敗時伺服器附上的問題文件。
    pub fn error(&self) -> Option<&Problem> {
        self.doc.error.as_ref()
    }

    /// 依序取得訂單的所有授權。
    pub fn authorizations(&self) -> Result<Vec<Authorization<'a>>> {
        self.doc
            .authorizations
            .iter()
            .map(|url| Authorization::bind(self.session, url))
            .collect()
    }

    /// 以 DER 編碼的 CSR 最終化訂單。
    ///
    /// # Errors
    ///
    /// 訂單不是 `ready` 時回傳 [`AcmeError::IllegalState`]，不會送出請求。
    pub fn finalize(&mut self, csr_der: &[u8]) -> Result<Status> {
        if self.status != Status::Ready {
            return Err(AcmeError::IllegalState(format!(
                "order {} is {}, not ready",
                self.location, self.status
            )));
        }
        let url = self
            .doc
            .finalize
            .clone()
            .ok_or_else(|| AcmeError::IllegalState("order has no finalize URL".to_owned()))?;
        let claims = FinalizeOrderPayload::new(csr_der).to_claims()?;

        let conn = self.session.connect();
        let response = conn.post_as_signed(&url, &claims)?;
        conn.accept(&response, &[200])?;
        self.apply(response.json()?)?;
        debug!(order = %self.location, status = %self.status, "order finalized");
        Ok(self.status)
    }

    /// 以憑證金鑰為所有識別項產生 CSR 後最終化訂單。
    pub fn finalize_with_key(&mut self, certificate_key: &KeyPair) -> Result<Status> {
        let csr = self
            .doc
            .identifiers
            .iter()
            .try_fold(Csr::new(), |csr, identifier| csr.add_identifier(identifier))?;
        let der = csr.to_der(certificate_key)?;
        self.finalize(&der)
    }

    /// 等待所有授權完成，訂單進入 `ready`（或終結狀態）。
    pub fn wait_until_ready(
        &mut self,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<Status> {
        wait_until(
            self,
            |status| status == Status::Ready || status.is_terminal(),
            timeout,
            cancel,
        )
    }

    /// 等待最終化完成，訂單進入 `valid` 或 `invalid`。
    pub fn wait_for_completion(
        &mut self,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<Status> {
        wait_for_completion(self, timeout, cancel)
    }

    /// 下載已簽發的憑證。
    pub fn certificate(&self) -> Result<Certificate> {
        let url = self.certificate_url().ok_or_else(|| {
            AcmeError::IllegalState(format!("order {} has no certificate yet", self.location))
        })?;
        Certificate::download(self.session, url)
    }
}

impl Resource for Order<'_> {
    const KIND: &'static str = "order";

    fn session(&self) -> &Session {
        self.session
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn status(&self) -> Status {
        self.status
    }

    fn json(&self) -> &Value {
        &self.json
    }

    fn apply(&mut self, json: Value) -> Result<()> {
        self.doc = serde_json::from_value(json.clone())?;
        self.status = Status::of(&json);
        self.json = json;
        Ok(())
    }
}

/// 用於構建 [`Order`] 實例的構造器。
#[derive(Debug)]
pub struct OrderBuilder<'a> {
    session: &'a Session,
    identifiers: Vec<Identifier>,
    not_before: Option<DateTime<Utc>>,
    not_after: Option<DateTime<Utc>>,
}

impl<'a> OrderBuilder<'a> {
    pub fn new(session: &'a Session) -> Self {
        OrderBuilder {
            session,
            identifiers: Vec::new(),
            not_before: None,
            not_after: None,
        }
    }

    pub fn domain(self, domain: &str) -> Self {
        self.identifier(Identifier::dns(domain))
    }

    pub fn domains<I, S>(self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        domains
            .into_iter()
            .fold(self, |builder, domain| builder.domain(domain.as_ref()))
    }

    pub fn identifier(mut self, identifier: Identifier) -> Self {
        self.identifiers.push(identifier);
        self
    }

    /// 要求憑證的生效時間。
    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }

    /// 要求憑證的到期時間。
    pub fn not_after(mut self, at: DateTime<Utc>) -> Self {
        self.not_after = Some(at);
        self
    }

    /// 向 `newOrder` 端點建立訂單。
    pub fn create(self) -> Result<Order<'a>> {
        let url = self.session.endpoint(Endpoint::NewOrder)?;
        let mut payload = NewOrderPayload::new(self.identifiers);
        payload.not_before = self
            .not_before
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));
        payload.not_after = self
            .not_after
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));
        let claims = payload.to_claims()?;

        let conn = self.session.connect();
        let response = conn.post_as_signed(&url, &claims)?;
        conn.accept(&response, &[201])?;
        let location = response.required_location()?;

        let mut order = Order {
            session: self.session,
            location,
            doc: OrderDocument::default(),
            json: Value::Null,
            status: Status::Unknown,
        };
        order.apply(response.json()?)?;
        debug!(order = %order.location, status = %order.status, "order created");
        Ok(order)
    }
}
