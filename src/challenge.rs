use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{AcmeError, DecodingError, Result},
    payload::{ChallengeValidationPayload, PayloadT},
    problem::Problem,
    resource::{fetch, Resource, Status},
    session::Session,
};

/// 表示 ACME 挑戰的類型。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChallengeType {
    Http01,
    Dns01,
    TlsAlpn01,
    /// 本層不認得的類型，原樣保留。
    Other(String),
}

impl ChallengeType {
    /// 根據字串返回對應的挑戰類型。
    pub fn parse(s: &str) -> Self {
        match s {
            "http-01" => Self::Http01,
            "dns-01" => Self::Dns01,
            "tls-alpn-01" => Self::TlsAlpn01,
            other => Self::Other(other.to_owned()),
        }
    }

    /// 返回挑戰類型對應的字串表示。
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http01 => "http-01",
            Self::Dns01 => "dns-01",
            Self::TlsAlpn01 => "tls-alpn-01",
            Self::Other(other) => other,
        }
    }
}

/// 挑戰文件中本層會讀取的欄位。
#[derive(Debug, Clone, Deserialize)]
struct ChallengeDocument {
    #[serde(rename = "type")]
    challenge_type: String,
    url: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    validated: Option<String>,
    #[serde(default)]
    error: Option<Problem>,
}

/// 表示一個 ACME 驗證挑戰。
///
/// 本層只負責通知伺服器開始驗證（[`trigger`](Self::trigger)）與追蹤狀態；
/// 實際佈署驗證內容由呼叫者處理。
#[derive(Debug, Clone)]
pub struct Challenge<'a> {
    session: &'a Session,
    challenge_type: ChallengeType,
    doc: ChallengeDocument,
    json: Value,
    status: Status,
}

impl<'a> Challenge<'a> {
    /// 由授權文件中內嵌的挑戰物件建立。
    pub fn from_json(session: &'a Session, json: Value) -> Result<Self> {
        if !json.is_object() {
            return Err(DecodingError::NotAnObject("challenge").into());
        }
        let doc: ChallengeDocument = serde_json::from_value(json.clone())?;
        Ok(Challenge {
            session,
            challenge_type: ChallengeType::parse(&doc.challenge_type),
            status: Status::of(&json),
            doc,
            json,
        })
    }

    /// 以挑戰 URL 取得挑戰。
    pub fn bind(session: &'a Session, url: &str) -> Result<Self> {
        let conn = session.connect();
        let response = conn.post_as_get(url)?;
        conn.accept(&response, &[200])?;
        Self::from_json(session, response.json()?)
    }

    pub fn challenge_type(&self) -> &ChallengeType {
        &self.challenge_type
    }

    pub fn url(&self) -> &str {
        &self.doc.url
    }

    pub fn token(&self) -> Option<&str> {
        self.doc.token.as_deref()
    }

    /// 驗證完成時間（RFC 3339 字串）。
    pub fn validated(&self) -> Option<&str> {
        self.doc.validated.as_deref()
    }

    /// 驗證失敗時伺服器附上的問題文件。
    pub fn error(&self) -> Option<&Problem> {
        self.doc.error.as_ref()
    }

    /// 計算 key authorization：`token.thumbprint`。
    pub fn key_authorization(&self) -> Result<String> {
        let token = self
            .token()
            .ok_or(AcmeError::Decoding(DecodingError::MissingField("token")))?;
        Ok(format!("{}.{}", token, self.session.key_pair().thumbprint()?))
    }

    /// 通知伺服器開始驗證：以空物件 `{}` 簽名 POST 到挑戰 URL。
    ///
    /// 挑戰會從 `pending` 進入 `processing`；本方法不會等待驗證結果。
    pub fn trigger(&mut self) -> Result<Status> {
        let claims = ChallengeValidationPayload::default().to_claims()?;
        let conn = self.session.connect();
        let response = conn.post_as_signed(&self.doc.url, &claims)?;
        conn.accept(&response, &[200])?;
        self.apply(response.json()?)?;
        debug!(
            challenge = %self.doc.url,
            challenge_type = self.challenge_type.as_str(),
            status = %self.status,
            "challenge triggered"
        );
        Ok(self.status)
    }

    /// 重新取得挑戰狀態。
    pub fn fetch(&mut self) -> Result<Status> {
        fetch(self)
    }
}

impl Resource for Challenge<'_> {
    const KIND: &'static str = "challenge";

    fn session(&self) -> &Session {
        self.session
    }

    fn location(&self) -> &str {
        &self.doc.url
    }

    fn status(&self) -> Status {
        self.status
    }

    fn json(&self) -> &Value {
        &self.json
    }

    fn apply(&mut self, json: Value) -> Result<()> {
        let doc: ChallengeDocument = serde_json::from_value(json.clone())?;
        if doc.url != self.doc.url {
            return Err(AcmeError::IllegalState(format!(
                "challenge URL changed from {} to {}",
                self.doc.url, doc.url
            )));
        }
        self.status = Status::of(&json);
        self.doc = doc;
        self.json = json;
        Ok(())
    }
}
