use super::{BackupError, BackupPayload};
use async_trait::async_trait;
use std::time::Duration;

/// Where snapshots are pushed to and restored from.
#[async_trait]
pub trait BackupTransport: Send + Sync {
    async fn push(&self, payload: &BackupPayload) -> Result<(), BackupError>;

    /// `Ok(None)` means the remote holds no snapshot.
    async fn fetch(&self) -> Result<Option<BackupPayload>, BackupError>;
}

/// The remote backup API: `POST {base}/backup_discord_data` and
/// `GET {base}/get_discord_data_backup`. No authentication.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl BackupTransport for HttpTransport {
    async fn push(&self, payload: &BackupPayload) -> Result<(), BackupError> {
        let response = self
            .client
            .post(self.endpoint("backup_discord_data"))
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackupError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<BackupPayload>, BackupError> {
        let response = self
            .client
            .get(self.endpoint("get_discord_data_backup"))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BackupError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        // An endpoint that has never received a push answers with an empty body.
        if value.get("discord_data").map_or(true, |d| d.is_null()) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let transport =
            HttpTransport::new("https://backup.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            transport.endpoint("backup_discord_data"),
            "https://backup.example.com/backup_discord_data"
        );
    }
}
