//! 協議 session：目錄快取、nonce 池與帳戶金鑰的擁有者。
//!
//! 一個 [`Session`] 對應一把帳戶金鑰與一個授權伺服器。它是唯一持有可變共享狀態的地方；
//! 資源物件（帳戶、訂單等）只借用它。

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use tracing::debug;

use crate::{
    connection::Connection,
    directory::{Directory, Endpoint, Metadata},
    error::{AcmeError, Result},
    http::{HttpClient, ReqwestClient},
    key_pair::KeyPair,
    nonce::NoncePool,
    problem::{Classifier, ProblemTypes},
};

/// Session 的設定值。
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 授權伺服器目錄的 URL。
    pub directory_url: String,
    pub user_agent: String,
    /// 送出 `Accept-Language` 時使用的語系，例如 `zh-TW`。
    pub locale: Option<String>,
    /// 沒有 `Retry-After` 提示時的輪詢間隔。
    pub poll_interval: Duration,
    /// 遇到 `badNonce` 時最多重送幾次。
    pub nonce_retries: u32,
    /// 單一 HTTP 請求的逾時。
    pub http_timeout: Duration,
}

impl SessionConfig {
    pub const DEFAULT_DIRECTORY_URL: &'static str =
        "https://acme-v02.api.letsencrypt.org/directory";
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
    pub const DEFAULT_NONCE_RETRIES: u32 = 1;
    pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

    /// 檢查設定值是否可用。
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.directory_url)
            .map_err(|e| AcmeError::Config(format!("directory URL {}: {}", self.directory_url, e)))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(AcmeError::Config(format!(
                "directory URL must use http or https: {}",
                self.directory_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(AcmeError::Config("poll interval must be positive".to_owned()));
        }
        if self.http_timeout.is_zero() {
            return Err(AcmeError::Config("HTTP timeout must be positive".to_owned()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(AcmeError::Config("user agent cannot be empty".to_owned()));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            directory_url: Self::DEFAULT_DIRECTORY_URL.to_owned(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            locale: None,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            nonce_retries: Self::DEFAULT_NONCE_RETRIES,
            http_timeout: Self::DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// 與單一授權伺服器互動的 session。
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    http: Arc<dyn HttpClient>,
    key_pair: KeyPair,
    key_id: RwLock<Option<String>>,
    directory: RwLock<Option<Arc<Directory>>>,
    nonces: NoncePool,
    classifier: Classifier,
}

impl Session {
    /// 以預設設定與指定帳戶金鑰建立 session。
    pub fn new(key_pair: KeyPair) -> Result<Self> {
        SessionBuilder::new(key_pair).build()
    }

    pub fn builder(key_pair: KeyPair) -> SessionBuilder {
        SessionBuilder::new(key_pair)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn http(&self) -> &dyn HttpClient {
        self.http.as_ref()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn nonces(&self) -> &NoncePool {
        &self.nonces
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// 帳戶 URL；在帳戶建立或綁定前為 `None`。
    pub fn key_id(&self) -> Option<String> {
        self.key_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_key_id(&self, key_id: impl Into<String>) {
        *self.key_id.write().unwrap_or_else(PoisonError::into_inner) = Some(key_id.into());
    }

    /// 取得連線轉接器。
    pub fn connect(&self) -> Connection<'_> {
        Connection::new(self)
    }

    /// 取得目錄；第一次呼叫時向伺服器取得並快取。
    pub fn directory(&self) -> Result<Arc<Directory>> {
        if let Some(directory) = self
            .directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(directory));
        }
        self.refresh_directory()
    }

    /// 無條件重新取得目錄並取代快取。
    pub fn refresh_directory(&self) -> Result<Arc<Directory>> {
        let url = &self.config.directory_url;
        debug!(url = %url, "fetching directory");

        let conn = self.connect();
        let response = conn.get(url)?;
        conn.accept(&response, &[200])?;
        let directory = Arc::new(Directory::from_json(url.clone(), response.json()?)?);

        *self
            .directory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&directory));
        Ok(directory)
    }

    /// 取得指定端點的 URL，伺服器未提供時回傳 [`AcmeError::MissingEndpoint`]。
    pub fn endpoint(&self, endpoint: Endpoint) -> Result<String> {
        self.directory()?
            .url(endpoint)
            .map(str::to_owned)
            .ok_or(AcmeError::MissingEndpoint(endpoint.as_str()))
    }

    pub fn metadata(&self) -> Result<Metadata> {
        Ok(self.directory()?.metadata().clone())
    }
}

/// 用於構建 [`Session`] 實例的構造器。
pub struct SessionBuilder {
    config: SessionConfig,
    key_pair: KeyPair,
    http: Option<Arc<dyn HttpClient>>,
    directory: Option<Directory>,
    key_id: Option<String>,
    problem_types: ProblemTypes,
}

impl SessionBuilder {
    pub fn new(key_pair: KeyPair) -> Self {
        SessionBuilder {
            config: SessionConfig::default(),
            key_pair,
            http: None,
            directory: None,
            key_id: None,
            problem_types: ProblemTypes::default(),
        }
    }

    /// 以完整設定取代目前的設定值。
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn directory_url(mut self, url: &str) -> Self {
        self.config.directory_url = url.to_owned();
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.config.user_agent = user_agent.to_owned();
        self
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.config.locale = Some(locale.to_owned());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn nonce_retries(mut self, retries: u32) -> Self {
        self.config.nonce_retries = retries;
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    /// 使用自訂的 HTTP 協作者。未設定時使用 [`ReqwestClient`]。
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// 預先放入目錄，跳過第一次的目錄請求。
    pub fn directory(mut self, directory: Directory) -> Self {
        self.directory = Some(directory);
        self
    }

    /// 綁定既有帳戶的 URL。
    pub fn key_id(mut self, key_id: &str) -> Self {
        self.key_id = Some(key_id.to_owned());
        self
    }

    pub fn problem_types(mut self, types: ProblemTypes) -> Self {
        self.problem_types = types;
        self
    }

    pub fn build(self) -> Result<Session> {
        self.config.validate()?;
        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestClient::new(self.config.http_timeout)?),
        };

        Ok(Session {
            config: self.config,
            http,
            key_pair: self.key_pair,
            key_id: RwLock::new(self.key_id),
            directory: RwLock::new(self.directory.map(Arc::new)),
            nonces: NoncePool::new(),
            classifier: Classifier::new(self.problem_types),
        })
    }
}
