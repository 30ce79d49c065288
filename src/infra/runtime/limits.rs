use std::time::Duration;

pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds applied to every out-of-process tool run (metadata and execute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLimits {
    pub timeout: Duration,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self { timeout: DEFAULT_SCRIPT_TIMEOUT }
    }
}

impl ExecLimits {
    pub fn from_secs(secs: u64) -> Self {
        // zero would make every script time out immediately
        Self { timeout: Duration::from_secs(secs.max(1)) }
    }
}

/// Build a reqwest client with sane defaults (timeouts, redirects disabled by default).
pub fn make_http_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(Duration::from_secs(6))
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

/// Simple exponential backoff utility for async ops.
pub async fn retry_async<T, E, Fut, F>(mut attempts: u32, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut try_num: u32 = 0;
    let mut delay_ms: u64 = 50;
    loop {
        match op(try_num).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempts == 0 {
                    return Err(e);
                }
                attempts -= 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = (delay_ms * 2).min(1_000);
                try_num += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn it_retries_then_succeeds() {
        let mut calls = 0;
        let res: Result<i32, i32> = retry_async(3, move |_| {
            calls += 1;
            let c = calls;
            async move {
                if c < 3 {
                    Err(-1)
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(res.unwrap(), 42);
    }

    #[tokio::test]
    async fn it_gives_up_after_attempts() {
        let res: Result<(), u32> = retry_async(1, |n| async move { Err(n) }).await;
        assert_eq!(res.unwrap_err(), 1);
    }

    #[test]
    fn limits_default_to_thirty_seconds_and_never_zero() {
        assert_eq!(ExecLimits::default().timeout, Duration::from_secs(30));
        assert_eq!(ExecLimits::from_secs(0).timeout, Duration::from_secs(1));
    }
}
