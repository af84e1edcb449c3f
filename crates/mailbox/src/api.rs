use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accountmint_core::config::MailApiConfig;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(String),

    #[error("api rejected request: {0}")]
    Rejected(String),
}

/// One message as reported by the mailbox API's `email/list` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailMessage {
    /// `"YYYY-MM-DD HH:MM:SS"`, UTC with no offset marker.
    #[serde(rename = "createTime")]
    pub create_time: Option<String>,
    pub subject: Option<String>,
    /// Plain-text body.
    pub text: Option<String>,
    /// HTML body.
    pub content: Option<String>,
}

impl MailMessage {
    /// Server receipt time. The API omits the offset marker; the value is UTC.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.create_time.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Wire transport to the mailbox API. Token lifecycle lives above this seam
/// so the 401-recovery policy can be tested without a server.
#[async_trait]
pub trait MailboxApi: Send + Sync {
    /// `POST token/generate` with the admin credentials.
    async fn generate_token(&self) -> Result<String, ApiError>;

    /// `POST account/add`; returns the provisioned account id.
    async fn create_address(&self, token: &str, email: &str) -> Result<String, ApiError>;

    /// `POST email/list` filtered to `to_email`, newest first.
    async fn list_messages(&self, token: &str, to_email: &str) -> Result<Vec<MailMessage>, ApiError>;
}

/// All endpoints answer `{code, message, data}`; `code == 200` is success and
/// `code == 401` means the token expired even when the HTTP status is 200.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    #[serde(rename = "accountId")]
    account_id: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct AddAccountRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    to_email: &'a str,
    send_email: &'a str,
    num: u32,
    size: u32,
    time_sort: &'a str,
    #[serde(rename = "type")]
    kind: u32,
    is_del: u32,
}

pub struct HttpMailboxApi {
    client: reqwest::Client,
    config: MailApiConfig,
}

impl HttpMailboxApi {
    pub fn new(config: MailApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/user/{}", self.config.server_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError> {
        let mut request = self.client.post(self.endpoint(path)).json(body);
        if let Some(token) = token {
            request = request.header("Authorization", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if response.status().as_u16() == 401 {
            return Err(ApiError::Unauthorized);
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        match envelope.code {
            200 => envelope
                .data
                .ok_or_else(|| ApiError::Rejected("empty response data".to_string())),
            401 => Err(ApiError::Unauthorized),
            code => Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| format!("api code {}", code)),
            )),
        }
    }
}

#[async_trait]
impl MailboxApi for HttpMailboxApi {
    async fn generate_token(&self) -> Result<String, ApiError> {
        let data: TokenData = self
            .post(
                "token/generate",
                None,
                &TokenRequest {
                    email: &self.config.admin_email,
                    password: &self.config.admin_password,
                },
            )
            .await?;
        Ok(data.token)
    }

    async fn create_address(&self, token: &str, email: &str) -> Result<String, ApiError> {
        let data: AccountData = self
            .post("account/add", Some(token), &AddAccountRequest { email })
            .await?;
        Ok(data.account_id.to_string().trim_matches('"').to_string())
    }

    async fn list_messages(&self, token: &str, to_email: &str) -> Result<Vec<MailMessage>, ApiError> {
        self.post(
            "email/list",
            Some(token),
            &ListRequest {
                to_email,
                send_email: "",
                num: 1,
                size: 10,
                time_sort: "desc",
                kind: 0,
                is_del: 0,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_time_parses_as_utc() {
        let message = MailMessage {
            create_time: Some("2025-11-14 06:21:07".to_string()),
            ..Default::default()
        };
        let received = message.received_at().unwrap();
        assert_eq!(received.to_rfc3339(), "2025-11-14T06:21:07+00:00");
    }

    #[test]
    fn malformed_create_time_is_none() {
        let message = MailMessage {
            create_time: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(message.received_at().is_none());
    }

    #[test]
    fn list_request_matches_wire_format() {
        let body = ListRequest {
            to_email: "a@b.c",
            send_email: "",
            num: 1,
            size: 10,
            time_sort: "desc",
            kind: 0,
            is_del: 0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["toEmail"], "a@b.c");
        assert_eq!(json["timeSort"], "desc");
        assert_eq!(json["type"], 0);
        assert_eq!(json["isDel"], 0);
    }
}
