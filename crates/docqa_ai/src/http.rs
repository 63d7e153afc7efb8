use std::time::Duration;

use docqa_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Longest slice of an error body carried into `AppError::details`.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// POST `body` as JSON and decode a JSON reply. Every failure is reported under `code`;
/// transport failures and 429/5xx replies are marked retryable.
pub(crate) fn post_json<B, T>(
    url: &str,
    body: &B,
    timeout: Duration,
    bearer: Option<&str>,
    code: &str,
) -> Result<T, AppError>
where
    B: Serialize,
    T: DeserializeOwned,
{
    let mut req = ureq::post(url).timeout(timeout);
    if let Some(key) = bearer {
        req = req.set("Authorization", &format!("Bearer {key}"));
    }

    match req.send_json(body) {
        Ok(resp) => resp.into_json::<T>().map_err(|e| {
            AppError::new(code, "Failed to decode response")
                .with_details(format!("url={url}; err={e}"))
        }),
        Err(ureq::Error::Status(status, resp)) => {
            let text = resp.into_string().unwrap_or_default();
            let snippet: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            Err(AppError::new(code, "Request was rejected")
                .with_details(format!("url={url}; status={status}; body={snippet}"))
                .with_retryable(status == 429 || status >= 500))
        }
        Err(e) => Err(AppError::new(code, "Failed to reach endpoint")
            .with_details(format!("url={url}; err={e}"))
            .with_retryable(true)),
    }
}
