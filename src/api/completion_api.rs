use backon::{ExponentialBuilder, Retryable};
use tracing::error;
use url::Url;

pub struct CompletionApi;

impl CompletionApi {
    /// POST a chat-completions request, retrying transport failures and 5xx
    /// responses. Other statuses are returned to the caller untouched.
    pub async fn try_post_chat<T>(
        client: reqwest::Client,
        url: &Url,
        api_key: Option<&str>,
        retry_policy: ExponentialBuilder,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        T: serde::Serialize,
    {
        (|| async {
            let mut req = client.post(url.clone()).json(body);
            if let Some(key) = api_key {
                req = req.bearer_auth(key);
            }
            let resp = req.send().await?;
            let status = resp.status();
            if status.is_server_error() {
                if let Err(err) = resp.error_for_status_ref() {
                    error!("classifier service error (will retry): {}", status);
                    return Err(err);
                }
            }
            Ok(resp)
        })
        .retry(retry_policy)
        .await
    }
}
