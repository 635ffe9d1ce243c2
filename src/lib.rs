//! # ACME 協議引擎
//!
//! 本庫實作 ACME（RFC 8555）客戶端的協議層：簽名請求、nonce 生命週期、
//! 資源狀態輪詢以及伺服器錯誤分類。TLS、連線池與 DNS 等 HTTP 細節交給
//! [`http::HttpClient`] 的實作者；預設使用 reqwest 的阻塞式客戶端。
//!
//! ## 模組
//!
//! - **session**: 持有帳戶金鑰、目錄快取與 nonce 池；所有操作的起點。
//! - **connection**: 傳輸轉接器，負責 GET、簽名 POST、標頭與內容解析。
//! - **nonce**: 每個 session 一個 nonce 池，簽名請求在整個往返期間持有其鎖。
//! - **jws** / **protection** / **signature**: 產生 flattened JWS。
//! - **problem**: 將問題文件分類為可重試或致命錯誤。
//! - **resource**: 狀態列舉、取得與輪詢；帳戶、訂單、授權與挑戰都建立在其上。
//!
//! ## 使用方式
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use racme_engine::{
//!     account::AccountBuilder,
//!     challenge::ChallengeType,
//!     key_pair::{KeyPair, KeyType},
//!     session::Session,
//! };
//!
//! fn main() -> Result<(), racme_engine::error::AcmeError> {
//!     // 1. 以帳戶金鑰建立 session
//!     let session = Session::builder(KeyPair::generate(KeyType::EcP256, None)?)
//!         .directory_url("https://acme-staging-v02.api.letsencrypt.org/directory")
//!         .build()?;
//!
//!     // 2. 建立帳戶
//!     let account = AccountBuilder::new()
//!         .add_email("admin@example.com")
//!         .agree_to_terms()
//!         .create(&session)?;
//!
//!     // 3. 建立訂單並觸發挑戰
//!     let mut order = account.new_order().domain("example.com").create()?;
//!     for authorization in order.authorizations()? {
//!         if let Some(mut challenge) = authorization.find_challenge(&ChallengeType::Http01)? {
//!             // 在此佈署 challenge.key_authorization()? 的內容
//!             challenge.trigger()?;
//!         }
//!     }
//!
//!     // 4. 等待訂單就緒、最終化並下載憑證
//!     order.wait_until_ready(Duration::from_secs(120), None)?;
//!     order.finalize_with_key(&KeyPair::generate(KeyType::EcP256, None)?)?;
//!     order.wait_for_completion(Duration::from_secs(120), None)?;
//!     let certificate = order.certificate()?;
//!     std::fs::write("example.com.pem", certificate.to_pem()?).ok();
//!
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod authorization;
pub mod base64;
pub mod certificate;
pub mod challenge;
pub mod connection;
pub mod csr;
pub mod directory;
pub mod error;
pub mod http;
pub mod jwk;
pub mod jws;
pub mod key_pair;
pub mod nonce;
pub mod order;
pub mod payload;
pub mod problem;
pub mod protection;
pub mod resource;
pub mod session;
pub mod signature;

pub use error::{AcmeError, Result};
pub use resource::{CancelToken, Status};
pub use session::{Session, SessionBuilder, SessionConfig};
