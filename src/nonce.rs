//! 防重放 nonce 的保管。
//!
//! 每個 [`Session`](crate::session::Session) 擁有一個 [`NoncePool`]，池中最多保存一個 nonce。
//! 簽名請求透過 [`NoncePool::lease`] 取得租約，在整個往返期間持有鎖：
//! 取出（或向 `newNonce` 取得）→ 簽名 → 送出 → 吸收回應中的新 nonce。

use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::{header::HeaderMap, Method};
use tracing::debug;

use crate::{
    base64::is_url_safe,
    error::{AcmeError, NonceError},
    http::{HttpClient, HttpRequest},
};

/// 回應中攜帶新 nonce 的標頭。
pub const REPLAY_NONCE: &str = "Replay-Nonce";

/// 定義取得新 nonce 的行為。
pub trait NonceT {
    /// 向伺服器取得一個新的 nonce。
    fn get(&self) -> Result<String, AcmeError>;
}

/// 透過對 `newNonce` 端點發出 `HEAD` 請求取得 nonce。
#[derive(Debug)]
pub struct NewNonce<'a> {
    http: &'a dyn HttpClient,
    url: &'a str,
    user_agent: &'a str,
}

impl<'a> NewNonce<'a> {
    pub fn new(http: &'a dyn HttpClient, url: &'a str, user_agent: &'a str) -> Self {
        NewNonce {
            http,
            url,
            user_agent,
        }
    }
}

impl NonceT for NewNonce<'_> {
    fn get(&self) -> Result<String, AcmeError> {
        debug!(url = %self.url, "fetching fresh nonce");
        let request =
            HttpRequest::new(Method::HEAD, self.url).header("User-Agent", self.user_agent);
        let response = self.http.request(request)?;

        replay_nonce(&response.headers)?
            .ok_or_else(|| NonceError::NoNonceHeader(self.url.to_owned()).into())
    }
}

/// 從回應標頭取出並驗證 `Replay-Nonce`。
pub fn replay_nonce(headers: &HeaderMap) -> Result<Option<String>, NonceError> {
    match headers.get(REPLAY_NONCE) {
        None => Ok(None),
        Some(value) => {
            let nonce = value.to_str()?.trim();
            if !is_url_safe(nonce) {
                return Err(NonceError::InvalidNonce(nonce.to_owned()));
            }
            Ok(Some(nonce.to_owned()))
        }
    }
}

/// 單一 session 的 nonce 池。
#[derive(Debug, Default)]
pub struct NoncePool {
    slot: Mutex<Option<String>>,
}

impl NoncePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得租約；在租約存活期間其他呼叫者會被阻擋。
    pub fn lease(&self) -> NonceLease<'_> {
        NonceLease {
            slot: self.slot.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// 取出快取中的 nonce；若沒有則向 `source` 取得新的。
    pub fn acquire(&self, source: &dyn NonceT) -> Result<String, AcmeError> {
        self.lease().take_or_fetch(source)
    }

    /// 無條件以新的 nonce 覆蓋快取。
    pub fn absorb(&self, nonce: impl Into<String>) {
        self.lease().absorb(nonce);
    }

    /// 若回應標頭攜帶 nonce 則吸收之，回傳是否有吸收。
    pub fn absorb_from(&self, headers: &HeaderMap) -> Result<bool, NonceError> {
        self.lease().absorb_from(headers)
    }

    /// 目前快取中的 nonce（不取出）。
    pub fn peek(&self) -> Option<String> {
        self.lease().slot.clone()
    }
}

/// 持有 nonce 池鎖的租約。
#[derive(Debug)]
pub struct NonceLease<'a> {
    slot: MutexGuard<'a, Option<String>>,
}

impl NonceLease<'_> {
    /// 取出快取中的 nonce，或在沒有時向 `source` 取得。取得的 nonce 不會留在池中。
    pub fn take_or_fetch(&mut self, source: &dyn NonceT) -> Result<String, AcmeError> {
        match self.slot.take() {
            Some(nonce) => Ok(nonce),
            None => source.get(),
        }
    }

    pub fn absorb(&mut self, nonce: impl Into<String>) {
        let nonce = nonce.into();
        debug!(nonce = %nonce, "absorbed replay nonce");
        *self.slot = Some(nonce);
    }

    pub fn absorb_from(&mut self, headers: &HeaderMap) -> Result<bool, NonceError> {
        match replay_nonce(headers)? {
            Some(nonce) => {
                self.absorb(nonce);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
