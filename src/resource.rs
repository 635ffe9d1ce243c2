//! 資源狀態機：狀態列舉、取得與輪詢。
//!
//! 帳戶、訂單、授權與挑戰都實作 [`Resource`]，共用 [`fetch`]、[`wait_until`] 與
//! [`wait_for_completion`]。輪詢迴圈是整個引擎中唯一刻意等待的地方，
//! 受呼叫者提供的期限與 [`CancelToken`] 約束。

use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{AcmeError, Result},
    session::Session,
};

/// 資源狀態。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Ready,
    Processing,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
    /// 伺服器回傳了無法識別的狀態。
    #[serde(other)]
    Unknown,
}

impl Status {
    /// 解析狀態字串（不分大小寫）；無法識別時為 [`Status::Unknown`]。
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Status::Pending,
            "ready" => Status::Ready,
            "processing" => Status::Processing,
            "valid" => Status::Valid,
            "invalid" => Status::Invalid,
            "deactivated" => Status::Deactivated,
            "expired" => Status::Expired,
            "revoked" => Status::Revoked,
            _ => Status::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Ready => "ready",
            Status::Processing => "processing",
            Status::Valid => "valid",
            Status::Invalid => "invalid",
            Status::Deactivated => "deactivated",
            Status::Expired => "expired",
            Status::Revoked => "revoked",
            Status::Unknown => "unknown",
        }
    }

    /// 終結狀態不會再改變。
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Valid | Status::Invalid | Status::Deactivated | Status::Expired | Status::Revoked
        )
    }

    /// 從資源文件的 `status` 欄位讀取狀態。
    pub fn of(json: &Value) -> Self {
        json.get("status")
            .and_then(Value::as_str)
            .map(Status::parse)
            .unwrap_or(Status::Unknown)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 由伺服器 URL 識別、帶有狀態的協議資源。
pub trait Resource {
    /// 資源種類名稱，用於日誌。
    const KIND: &'static str;

    fn session(&self) -> &Session;

    /// 伺服器核發的 URL；一經指定即不可變。
    fn location(&self) -> &str;

    /// 最後一次取得的狀態。
    fn status(&self) -> Status;

    /// 最後一次取得的文件。
    fn json(&self) -> &Value;

    /// 以新的文件取代目前狀態。
    fn apply(&mut self, json: Value) -> Result<()>;
}

/// 以 POST-as-GET 重新取得資源並回傳最新狀態。可重複呼叫。
pub fn fetch<R: Resource>(resource: &mut R) -> Result<Status> {
    refresh(resource)?;
    Ok(resource.status())
}

/// 重新取得資源，回傳伺服器的 `Retry-After` 提示。
fn refresh<R: Resource>(resource: &mut R) -> Result<Option<DateTime<Utc>>> {
    let (json, retry_after) = {
        let conn = resource.session().connect();
        let response = conn.post_as_get(resource.location())?;
        conn.accept(&response, &[200])?;
        let retry_after = response.retry_after().unwrap_or_else(|e| {
            debug!(error = %e, "ignoring malformed Retry-After");
            None
        });
        (response.json()?, retry_after)
    };

    resource.apply(json)?;
    debug!(
        kind = R::KIND,
        location = %resource.location(),
        status = %resource.status(),
        "refreshed resource"
    );
    Ok(retry_after)
}

/// 輪詢直到資源達到終結狀態。
///
/// 逾時或被取消時回傳 [`AcmeError::Timeout`]，資源保留最後觀察到的狀態。
pub fn wait_for_completion<R: Resource>(
    resource: &mut R,
    timeout: Duration,
    cancel: Option<&CancelToken>,
) -> Result<Status> {
    wait_until(resource, Status::is_terminal, timeout, cancel)
}

/// 輪詢直到 `done` 對目前狀態成立。
///
/// 每次取得後若 `done` 不成立，等待伺服器的 `Retry-After` 提示（已過期則使用設定的間隔），
/// 但不超過期限。期限到達時會再取得一次才判定逾時。
pub fn wait_until<R, F>(
    resource: &mut R,
    done: F,
    timeout: Duration,
    cancel: Option<&CancelToken>,
) -> Result<Status>
where
    R: Resource,
    F: Fn(Status) -> bool,
{
    let started = Instant::now();
    // 超出 `Instant` 範圍的逾時視為沒有期限，只能由取消信號中止。
    let deadline = started.checked_add(timeout);
    let interval = resource.session().config().poll_interval;

    loop {
        let hint = refresh(resource)?;
        let status = resource.status();
        if done(status) {
            return Ok(status);
        }

        let now = Instant::now();
        let cancelled = cancel.is_some_and(CancelToken::is_cancelled);
        let expired = deadline.is_some_and(|deadline| now >= deadline);
        if expired || cancelled {
            debug!(kind = R::KIND, location = %resource.location(), %status, cancelled, "polling gave up");
            return Err(timeout_error(resource, started));
        }

        let wait = hint
            .and_then(|at| (at - Utc::now()).to_std().ok())
            .filter(|d| !d.is_zero())
            .unwrap_or(interval);
        let wait = match deadline {
            Some(deadline) => wait.min(deadline - now),
            None => wait,
        };
        debug!(
            kind = R::KIND,
            location = %resource.location(),
            %status,
            wait_ms = wait.as_millis() as u64,
            "resource not done, polling again"
        );

        let interrupted = match cancel {
            Some(token) => token.wait(wait),
            None => {
                thread::sleep(wait);
                false
            }
        };
        if interrupted {
            debug!(kind = R::KIND, location = %resource.location(), "polling cancelled");
            return Err(timeout_error(resource, started));
        }
    }
}

fn timeout_error<R: Resource>(resource: &R, started: Instant) -> AcmeError {
    AcmeError::Timeout {
        location: resource.location().to_owned(),
        status: resource.status(),
        waited: started.elapsed(),
    }
}

/// 用於中止輪詢的取消信號。複製後共享同一個狀態。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 發出取消信號，喚醒所有正在等待的輪詢。
    pub fn cancel(&self) {
        let (lock, condvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 最多等待 `duration`；期間被取消則提早返回 `true`。
    fn wait(&self, duration: Duration) -> bool {
        let (lock, condvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = condvar
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        http::{mock::protected_of, HttpResponse},
        session::tests::scripted_session,
    };

    const LOCATION: &str = "https://ca.example/acme/order/1";

    /// 只有狀態與文件的最小資源。
    struct Tracked<'a> {
        session: &'a Session,
        json: Value,
        status: Status,
    }

    impl<'a> Tracked<'a> {
        fn new(session: &'a Session) -> Self {
            Tracked {
                session,
                json: Value::Null,
                status: Status::Pending,
            }
        }
    }

    impl Resource for Tracked<'_> {
        const KIND: &'static str = "tracked";

        fn session(&self) -> &Session {
            self.session
        }

        fn location(&self) -> &str {
            LOCATION
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

    fn status_response(status: &str, nonce: &str) -> HttpResponse {
        HttpResponse::json(200, json!({ "status": status })).with_nonce(nonce)
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(Status::parse("VALID"), Status::Valid);
        assert_eq!(Status::parse("paused"), Status::Unknown);
        let status: Status = serde_json::from_value(json!("mystery")).unwrap();
        assert_eq!(status, Status::Unknown);
        assert!(Status::Revoked.is_terminal());
        assert!(!Status::Ready.is_terminal());
        assert_eq!(Status::Processing.to_string(), "processing");
    }

    #[test]
    fn test_completion_stops_at_terminal_status() {
        let (client, session) = scripted_session();
        client.push(status_response("pending", "n1"));
        client.push(status_response("processing", "n2"));
        client.push(status_response("valid", "n3"));
        client.push(status_response("valid", "n4"));

        let mut tracked = Tracked::new(&session);
        let status = wait_for_completion(&mut tracked, Duration::from_secs(5), None).unwrap();

        assert_eq!(status, Status::Valid);
        assert_eq!(client.posts().len(), 3);
        assert_eq!(client.remaining(), 1);
    }

    #[test]
    fn test_timeout_keeps_last_status() {
        let (client, session) = scripted_session();
        for i in 0..50 {
            client.push(status_response("processing", &format!("n{}", i)));
        }

        let mut tracked = Tracked::new(&session);
        let err = wait_for_completion(&mut tracked, Duration::from_millis(25), None).unwrap_err();

        assert!(err.is_timeout());
        match err {
            AcmeError::Timeout { status, location, .. } => {
                assert_eq!(status, Status::Processing);
                assert_eq!(location, LOCATION);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(tracked.status(), Status::Processing);
    }

    #[test]
    fn test_retry_after_hint_is_honored() {
        let (client, session) = scripted_session();
        client.push(status_response("processing", "n1").with_header("Retry-After", "1"));
        client.push(status_response("valid", "n2"));

        let mut tracked = Tracked::new(&session);
        let started = Instant::now();
        let status = wait_for_completion(&mut tracked, Duration::from_secs(5), None).unwrap();

        assert_eq!(status, Status::Valid);
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[test]
    fn test_past_retry_after_uses_default_interval() {
        let (client, session) = scripted_session();
        client.push(
            status_response("processing", "n1")
                .with_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        client.push(status_response("valid", "n2"));

        let mut tracked = Tracked::new(&session);
        let started = Instant::now();
        assert_eq!(
            wait_for_completion(&mut tracked, Duration::from_secs(5), None).unwrap(),
            Status::Valid
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_cancel_interrupts_wait() {
        let (client, session) = scripted_session();
        client.push(status_response("processing", "n1").with_header("Retry-After", "30"));

        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let mut tracked = Tracked::new(&session);
        let started = Instant::now();
        let err = wait_for_completion(&mut tracked, Duration::from_secs(60), Some(&token)).unwrap_err();
        handle.join().unwrap();

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(tracked.status(), Status::Processing);
    }

    #[test]
    fn test_unbounded_timeout() {
        let (client, session) = scripted_session();
        client.push(status_response("valid", "n1"));

        let mut tracked = Tracked::new(&session);
        assert_eq!(
            wait_for_completion(&mut tracked, Duration::MAX, None).unwrap(),
            Status::Valid
        );

        client.push(status_response("processing", "n2").with_header("Retry-After", "99999999999999999"));
        client.push(status_response("valid", "n3"));
        let mut tracked = Tracked::new(&session);
        let started = Instant::now();
        assert_eq!(
            wait_for_completion(&mut tracked, Duration::MAX, None).unwrap(),
            Status::Valid
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_unbounded_timeout_ends_on_cancel() {
        let (client, session) = scripted_session();
        client.push(status_response("processing", "n1").with_header("Retry-After", "30"));

        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let mut tracked = Tracked::new(&session);
        let err = wait_for_completion(&mut tracked, Duration::MAX, Some(&token)).unwrap_err();
        handle.join().unwrap();

        assert!(err.is_timeout());
        assert_eq!(tracked.status(), Status::Processing);
    }

    #[test]
    fn test_polls_chain_nonces() {
        let (client, session) = scripted_session();
        client.push(status_response("pending", "n1"));
        client.push(status_response("processing", "n2"));
        client.push(status_response("valid", "n3"));

        let mut tracked = Tracked::new(&session);
        wait_for_completion(&mut tracked, Duration::from_secs(5), None).unwrap();

        let nonces: Vec<_> = client
            .posts()
            .iter()
            .map(|p| protected_of(p)["nonce"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(nonces, vec!["head-nonce-0", "n1", "n2"]);
    }

    #[test]
    fn test_protocol_error_stops_polling() {
        let (client, session) = scripted_session();
        client.push(status_response("pending", "n1"));
        client.push(
            HttpResponse::problem(404, "urn:ietf:params:acme:error:malformed", "No such order")
                .with_nonce("n2"),
        );

        let mut tracked = Tracked::new(&session);
        let err = wait_for_completion(&mut tracked, Duration::from_secs(5), None).unwrap_err();
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "No such order");
        assert_eq!(tracked.status(), Status::Pending);
    }
}
