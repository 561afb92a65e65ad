use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{
    AllergyNotification, AttendanceNotification, AuthOperation, CsvProcessed, CsvUpload,
    RemoteFunctions,
};
use crate::config::Config;
use crate::error::FunctionError;

/// HTTP client for the remote functions, `POST {base}/{function}` with a JSON body.
///
/// Without a base URL every call is logged and reported as delivered (mock mode).
#[derive(Clone)]
pub struct FunctionsClient {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl FunctionsClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        if base_url.is_none() {
            warn!("⚠️ SAFEPASS_FUNCTIONS_URL not set. Remote functions will be mocked.");
        }
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.functions_url.clone(), config.functions_key.clone())
    }

    pub fn is_mock(&self) -> bool {
        self.base_url.is_none()
    }

    /// Posts `body` and checks the status. `Ok(None)` in mock mode.
    async fn post<B: Serialize + ?Sized>(
        &self,
        function: &str,
        body: &B,
    ) -> Result<Option<reqwest::Response>, FunctionError> {
        let Some(base) = &self.base_url else {
            info!("(Mock) Would invoke remote function {}", function);
            return Ok(None);
        };

        let url = format!("{}/{}", base, function);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(|e| {
            error!("❌ Remote function {} unreachable: {}", function, e);
            FunctionError(format!("{} request failed: {}", function, e))
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            error!("❌ Remote function {} returned {}: {}", function, status, text);
            return Err(FunctionError(format!("{} returned {}: {}", function, status, text)));
        }
        Ok(Some(res))
    }

    /// Like [`post`](Self::post) but decodes the reply. An empty body is `Ok(None)`.
    async fn invoke<B, R>(&self, function: &str, body: &B) -> Result<Option<R>, FunctionError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let Some(res) = self.post(function, body).await? else {
            return Ok(None);
        };
        let bytes = res
            .bytes()
            .await
            .map_err(|e| FunctionError(format!("{} reply unreadable: {}", function, e)))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| FunctionError(format!("{} returned malformed body: {}", function, e)))
    }

    /// Any 2xx counts as delivered; the reply body is ignored.
    async fn notify<B: Serialize + ?Sized>(&self, function: &str, body: &B) -> Result<(), FunctionError> {
        match self.post(function, body).await {
            Ok(_) => {
                info!("✅ {} delivered", function);
                crate::metrics::increment_notifications_sent(function);
                Ok(())
            }
            Err(e) => {
                crate::metrics::increment_notifications_failed(function);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RemoteFunctions for FunctionsClient {
    async fn allergy_notification(&self, payload: &AllergyNotification) -> Result<(), FunctionError> {
        self.notify("allergy-notification", payload).await
    }

    async fn attendance_notification(
        &self,
        payload: &AttendanceNotification,
    ) -> Result<(), FunctionError> {
        self.notify("attendance-notification", payload).await
    }

    async fn process_csv(&self, payload: &CsvUpload) -> Result<CsvProcessed, FunctionError> {
        match self.invoke::<_, CsvProcessed>("csv-processor", payload).await? {
            Some(result) => Ok(result),
            None => Ok(CsvProcessed {
                processed: payload.csv_data.lines().skip(1).filter(|l| !l.trim().is_empty()).count(),
                errors: Vec::new(),
            }),
        }
    }

    async fn auth_operation(&self, payload: &AuthOperation) -> Result<serde_json::Value, FunctionError> {
        Ok(self
            .invoke::<_, serde_json::Value>("auth-operations", payload)
            .await?
            .unwrap_or(serde_json::Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_mode_counts_csv_rows() {
        let client = FunctionsClient::new(None, None);
        assert!(client.is_mock());
        let result = client
            .process_csv(&CsvUpload {
                csv_data: "name,grade\nAda,5\n\nGrace,4\n".to_string(),
                kind: "students".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result.processed, 2);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn mock_mode_delivers_notifications() {
        let client = FunctionsClient::new(None, None);
        assert!(client.allergy_notification(&allergy_payload()).await.is_ok());
    }

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn stub(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn allergy_payload() -> AllergyNotification {
        AllergyNotification {
            student_name: "Sam".into(),
            allergies: vec!["Peanuts".into()],
            location: "Bus #1".into(),
            scanned_by: "Driver User".into(),
            timestamp: "2026-03-02T07:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn no_content_reply_counts_as_delivered() {
        use axum::{http::StatusCode, routing::post};

        let base = stub(
            axum::Router::new()
                .route("/allergy-notification", post(|| async { StatusCode::NO_CONTENT }))
                .route("/csv-processor", post(|| async { StatusCode::OK })),
        )
        .await;
        let client = FunctionsClient::new(Some(base), Some("key".into()));

        assert!(client.allergy_notification(&allergy_payload()).await.is_ok());
        let processed = client
            .process_csv(&CsvUpload {
                csv_data: "name\nAda\n".into(),
                kind: "students".into(),
            })
            .await
            .unwrap();
        assert_eq!(processed.processed, 1);
    }

    #[tokio::test]
    async fn error_status_is_a_failure() {
        use axum::{http::StatusCode, routing::post};

        let base = stub(axum::Router::new().route(
            "/allergy-notification",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        let client = FunctionsClient::new(Some(base), None);

        let err = client.allergy_notification(&allergy_payload()).await.unwrap_err();
        assert!(err.0.contains("503"));
    }

    #[test]
    fn payloads_use_camel_case_keys() {
        let payload = CsvUpload {
            csv_data: "x".into(),
            kind: "students".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["csvData"], "x");
        assert_eq!(json["type"], "students");
    }
}
