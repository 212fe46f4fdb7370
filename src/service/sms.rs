// service/sms.rs
use serde::Deserialize;

use crate::config::Config;

/// Mobizon-style SMS gateway client. Delivery is best-effort: every failure
/// path logs and returns `false`, never an error, so callers can stay
/// fail-open on dispatch.
#[derive(Debug, Clone)]
pub struct SmsService {
    api_key: String,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    code: i32,
    message: Option<String>,
}

impl SmsService {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.sms_api_key.clone(),
            api_url: config.sms_api_url.clone(),
        }
    }

    /// Phone format: +77771234567 -> 77771234567
    pub async fn send(&self, phone: &str, text: &str) -> bool {
        let recipient = phone.trim_start_matches('+');

        let client = match reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("SMS client build failed: {}", e);
                return false;
            }
        };

        let result = client
            .get(format!("{}/message/sendsmsmessage", self.api_url))
            .query(&[
                ("recipient", recipient),
                ("text", text),
                ("apiKey", &self.api_key),
                ("output", "json"),
                ("api", "v1"),
            ])
            .send()
            .await;

        match result {
            Ok(resp) => match resp.json::<GatewayResponse>().await {
                Ok(body) if body.code == 0 => true,
                Ok(body) => {
                    tracing::warn!(
                        "SMS gateway rejected message: {}",
                        body.message.unwrap_or_else(|| "unknown error".to_string())
                    );
                    false
                }
                Err(e) => {
                    tracing::warn!("SMS gateway returned unparseable body: {}", e);
                    false
                }
            },
            Err(e) => {
                tracing::warn!("SMS request failed: {}", e);
                false
            }
        }
    }

    pub async fn send_sign_code(&self, phone: &str, code: &str) -> bool {
        let text = format!(
            "AddSy: contract signing code: {}. Do not share it with anyone.",
            code
        );
        self.send(phone, &text).await
    }
}
