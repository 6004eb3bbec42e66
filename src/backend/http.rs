use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::BackendApi;
use crate::config::BackendConfig;
use crate::error::{ComposerError, Result};
use crate::models::{CreatedResponse, ExercisePayload, ExerciseRecord, RoutinePayload, RoutineRecord};

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ComposerError::Backend {
            status: status.as_u16(),
            detail: failure_detail(&body),
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::ensure_success(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn created_id(response: Response) -> Result<String> {
        let status = response.status().as_u16();
        let created: CreatedResponse = Self::read_json(response).await?;
        created.into_id().ok_or_else(|| ComposerError::Backend {
            status,
            detail: "response carried no identifier".to_string(),
        })
    }
}

/// The `detail` string of an error body, or the body itself.
pub fn failure_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ if body.trim().is_empty() => "no details".to_string(),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn create_exercise(&self, exercise: &ExercisePayload) -> Result<String> {
        let url = self.endpoint("therapist/create_exercise");
        debug!("POST {}", url);
        let response = self.client.post(&url).json(exercise).send().await?;
        Self::created_id(response).await
    }

    async fn update_exercise(&self, id: &str, exercise: &ExercisePayload) -> Result<()> {
        let url = self.endpoint(&format!("therapist/update_exercise/{}", id));
        debug!("PUT {}", url);
        let response = self.client.put(&url).json(exercise).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn create_routine(&self, routine: &RoutinePayload) -> Result<String> {
        let url = self.endpoint("create_routine");
        debug!("POST {}", url);
        let response = self.client.post(&url).json(routine).send().await?;
        Self::created_id(response).await
    }

    async fn update_routine(&self, id: &str, routine: &RoutinePayload) -> Result<()> {
        let url = self.endpoint(&format!("therapist/update_routine/{}", id));
        debug!("PUT {}", url);
        let response = self.client.put(&url).json(routine).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn link_routine_to_owner(&self, owner_id: &str, routine_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("therapist/add_custom_routines/{}/{}", owner_id, routine_id));
        debug!("PUT {}", url);
        let response = self.client.put(&url).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn get_routine(&self, id: &str) -> Result<RoutineRecord> {
        let url = self.endpoint(&format!("get_routine/{}", id));
        debug!("GET {}", url);
        Self::read_json(self.client.get(&url).send().await?).await
    }

    async fn get_exercise(&self, id: &str) -> Result<ExerciseRecord> {
        let url = self.endpoint(&format!("get_exercise/{}", id));
        debug!("GET {}", url);
        Self::read_json(self.client.get(&url).send().await?).await
    }

    async fn list_custom_routines(&self, owner_id: &str) -> Result<Vec<RoutineRecord>> {
        let url = self.endpoint(&format!("therapist/get_custom_routines/{}", owner_id));
        debug!("GET {}", url);
        Self::read_json(self.client.get(&url).send().await?).await
    }

    async fn assign_routine(&self, patient_id: &str, routine_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("patient/update_assigned_routines/{}/{}", patient_id, routine_id));
        debug!("PUT {}", url);
        let response = self.client.put(&url).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(&BackendConfig {
            base_url: base_url.to_string(),
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let api = backend("https://api.example.com/");
        assert_eq!(
            api.endpoint("/therapist/create_exercise"),
            "https://api.example.com/therapist/create_exercise"
        );
        assert_eq!(api.endpoint("create_routine"), "https://api.example.com/create_routine");
    }

    #[test]
    fn test_failure_detail() {
        assert_eq!(failure_detail(r#"{"detail": "Exercise not found"}"#), "Exercise not found");
        assert_eq!(
            failure_detail(r#"{"detail": [{"loc": ["body", "reps"]}]}"#),
            r#"[{"loc":["body","reps"]}]"#
        );
        assert_eq!(failure_detail(r#"{"error": "x"}"#), r#"{"error": "x"}"#);
        assert_eq!(failure_detail("Internal Server Error"), "Internal Server Error");
        assert_eq!(failure_detail(""), "no details");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        let api = backend("http://127.0.0.1:9");
        let err = api.get_routine("r-1").await.unwrap_err();
        assert!(matches!(err, ComposerError::Http(_)));
    }
}
