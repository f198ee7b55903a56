use std::time::Duration;

use log::debug;

/// Windows may keep freshly extracted trees locked for a while.
pub const MOVE_RETRY_DELAYS: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
    Duration::from_secs(16),
];

/// Run `attempt` once, then once more after each delay until it succeeds.
///
/// # Errors
/// Returns the error of the last attempt.
pub async fn with_backoff<T, E, F>(delays: &[Duration], mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut result = attempt();
    for delay in delays {
        let Err(error) = &result else {
            break;
        };
        debug!("Attempt failed ({error}), retrying in {delay:?}");
        tokio::time::sleep(*delay).await;
        result = attempt();
    }
    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::with_backoff;

    #[tokio::test]
    async fn stops_at_first_success() {
        let mut calls = 0;
        let result: Result<u32, String> = with_backoff(&[Duration::ZERO; 5], || {
            calls += 1;
            if calls < 3 { Err("locked".to_string()) } else { Ok(calls) }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn returns_last_error_when_exhausted() {
        let mut calls = 0;
        let result: Result<(), String> = with_backoff(&[Duration::ZERO; 2], || {
            calls += 1;
            Err(format!("attempt {calls}"))
        })
        .await;

        assert_eq!(result, Err("attempt 3".to_string()));
    }
}
