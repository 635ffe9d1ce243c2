//! 模塊提供 ACME 帳戶管理：建立、綁定、更新聯絡資訊與停用。

use serde_json::Value;
use tracing::debug;

use crate::{
    directory::Endpoint,
    error::{AcmeError, Result},
    order::OrderBuilder,
    payload::{AccountUpdatePayload, DeactivationPayload, NewAccountPayload, PayloadT},
    resource::{fetch, Resource, Status},
    session::Session,
};

/// 表示 ACME 帳戶。帳戶 URL 同時是後續所有簽名請求的 `kid`。
#[derive(Debug, Clone)]
pub struct Account<'a> {
    session: &'a Session,
    location: String,
    json: Value,
    status: Status,
    terms_of_service: Option<String>,
}

impl<'a> Account<'a> {
    /// 綁定 session 目前的帳戶 URL 並取得帳戶資料。
    ///
    /// # Errors
    ///
    /// session 尚未設定帳戶 URL 時回傳 [`AcmeError::IllegalState`]。
    pub fn bind(session: &'a Session) -> Result<Self> {
        let location = session
            .key_id()
            .ok_or_else(|| AcmeError::IllegalState("session has no account URL".to_owned()))?;
        let mut account = Account {
            session,
            location,
            json: Value::Null,
            status: Status::Unknown,
            terms_of_service: None,
        };
        fetch(&mut account)?;
        Ok(account)
    }

    /// 帳戶 URL。
    pub fn url(&self) -> &str {
        &self.location
    }

    /// 帳戶的聯絡方式（`mailto:` 等 URI）。
    pub fn contacts(&self) -> Vec<String> {
        self.json
            .get("contact")
            .and_then(Value::as_array)
            .map(|contacts| {
                contacts
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 帳戶訂單清單的 URL。
    pub fn orders_url(&self) -> Option<&str> {
        self.json.get("orders").and_then(Value::as_str)
    }

    /// 建立帳戶時伺服器以 `Link: rel="terms-of-service"` 提供的服務條款。
    pub fn terms_of_service(&self) -> Option<&str> {
        self.terms_of_service.as_deref()
    }

    /// 以新的聯絡方式取代現有設定。
    pub fn update_contacts(&mut self, contacts: Vec<String>) -> Result<()> {
        let claims = AccountUpdatePayload::new(contacts).to_claims()?;
        self.post(&claims)
    }

    /// 停用帳戶。停用後伺服器不再接受此帳戶的任何請求。
    pub fn deactivate(&mut self) -> Result<Status> {
        let claims = DeactivationPayload::default().to_claims()?;
        self.post(&claims)?;
        debug!(account = %self.location, status = %self.status, "account deactivated");
        Ok(self.status)
    }

    /// 開始建立新訂單。
    pub fn new_order(&self) -> OrderBuilder<'a> {
        OrderBuilder::new(self.session)
    }

    fn post(&mut self, claims: &Value) -> Result<()> {
        let conn = self.session.connect();
        let response = conn.post_as_signed(&self.location, claims)?;
        conn.accept(&response, &[200])?;
        self.apply(response.json()?)
    }
}

impl Resource for Account<'_> {
    const KIND: &'static str = "account";

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
        self.status = Status::of(&json);
        self.json = json;
        Ok(())
    }
}

/// 用於構建 [`Account`] 實例的構造器，採用 builder 模式。
#[derive(Debug, Default)]
pub struct AccountBuilder {
    contacts: Vec<String>,
    terms_agreed: bool,
    only_existing: bool,
}

impl AccountBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增聯絡 URI，例如 `mailto:admin@example.com`。
    pub fn add_contact(mut self, contact: &str) -> Self {
        self.contacts.push(contact.to_owned());
        self
    }

    /// 新增電子郵件聯絡方式，自動加上 `mailto:`。
    pub fn add_email(self, email: &str) -> Self {
        self.add_contact(&format!("mailto:{}", email))
    }

    /// 同意伺服器的服務條款。
    pub fn agree_to_terms(mut self) -> Self {
        self.terms_agreed = true;
        self
    }

    /// 只尋找既有帳戶；伺服器找不到時回傳 `accountDoesNotExist`。
    pub fn only_existing(mut self) -> Self {
        self.only_existing = true;
        self
    }

    /// 向 `newAccount` 端點建立（或尋找）帳戶，並將帳戶 URL 設為 session 的 `kid`。
    ///
    /// # Errors
    ///
    /// 伺服器拒絕時回傳 [`AcmeError::Protocol`]，例如 `accountDoesNotExist` 或
    /// `externalAccountRequired`。
    pub fn create(self, session: &Session) -> Result<Account<'_>> {
        let url = session.endpoint(Endpoint::NewAccount)?;
        let claims =
            NewAccountPayload::new(self.contacts, self.terms_agreed, self.only_existing).to_claims()?;

        let conn = session.connect();
        let response = conn.post_with_jwk(&url, &claims)?;
        let status = conn.accept(&response, &[200, 201])?;

        let location = response.required_location()?;
        let terms_of_service = response.link("terms-of-service")?;
        let json = match response.json() {
            Ok(json) => json,
            Err(_) if status == 200 => Value::Null,
            Err(e) => return Err(e.into()),
        };
        session.set_key_id(location.clone());
        debug!(account = %location, created = status == 201, "account bound to session");

        let mut account = Account {
            session,
            location,
            json: Value::Null,
            status: Status::Unknown,
            terms_of_service,
        };
        if json.is_null() {
            fetch(&mut account)?;
        } else {
            account.apply(json)?;
        }
        Ok(account)
    }
}
