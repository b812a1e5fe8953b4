//! REST client for the inventory backend
//!
//! Every call reads the bearer token from the client store right before it is
//! sent, so a renewal is picked up by the very next request. A 401 or 403
//! from any endpoint clears the persisted credentials.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::error::ApiError;
use super::responses::{
    created_user, default_message, error_message, extract_payload, normalize_failure,
    MessageResponse, MutationOutcome, TokenResponse,
};
use crate::config::ApiConfig;
use crate::models::{
    ActivityLogPage, CreatedUser, Health, ImportReport, InventoryItem, ItemUpdate, LoginRequest,
    LoginResponse, NewItem, NewUser, QrCode, Statistics, StatusChange, User, UserUpdate,
};
use crate::services::session_monitor::TokenRenewer;
use crate::store::ClientState;

const SPREADSHEET_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Backend client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    state: ClientState,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, state: ClientState) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("inventrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            state,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    /// Log in and persist the returned user record and token
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let builder = self.http.post(self.url("/auth/login")).json(&request);
        let login: LoginResponse = self.read(builder).await?;

        self.state.save_login(&login)?;
        tracing::info!(username = %login.user.username, role = %login.user.role, "Logged in");
        Ok(login)
    }

    /// Exchange `token` for a fresh one. The caller persists the result.
    pub async fn refresh(&self, token: &str) -> Result<String, ApiError> {
        let builder = self.http.post(self.url("/auth/refresh")).bearer_auth(token);
        let body: TokenResponse = self.read(builder).await?;
        Ok(body.token)
    }

    // ------------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------------

    pub async fn list_items(&self) -> Result<Vec<InventoryItem>, ApiError> {
        self.read(self.request(Method::GET, "/barang")).await
    }

    pub async fn get_item(&self, id: i64) -> Result<InventoryItem, ApiError> {
        self.read(self.request(Method::GET, &format!("/barang/{id}")))
            .await
    }

    pub async fn create_item(
        &self,
        item: &NewItem,
    ) -> Result<MutationOutcome<InventoryItem>, ApiError> {
        self.mutate(self.json(Method::POST, "/barang", item)).await
    }

    pub async fn update_item(
        &self,
        id: i64,
        update: &ItemUpdate,
    ) -> Result<MutationOutcome<InventoryItem>, ApiError> {
        self.mutate(self.json(Method::PUT, &format!("/barang/{id}"), update))
            .await
    }

    pub async fn update_item_status(
        &self,
        id: i64,
        change: &StatusChange,
    ) -> Result<MutationOutcome<InventoryItem>, ApiError> {
        self.mutate(self.json(Method::PUT, &format!("/barang/{id}/status"), change))
            .await
    }

    pub async fn delete_item(&self, id: i64) -> Result<MutationOutcome<()>, ApiError> {
        let outcome: MutationOutcome<JsonValue> = self
            .mutate(self.request(Method::DELETE, &format!("/barang/{id}")))
            .await?;
        Ok(outcome.map(|_| ()))
    }

    /// Blank import spreadsheet
    pub async fn download_template(&self) -> Result<Vec<u8>, ApiError> {
        self.download("/barang/template").await
    }

    /// All items as a spreadsheet
    pub async fn export_items(&self) -> Result<Vec<u8>, ApiError> {
        self.download("/barang/export").await
    }

    /// Upload a spreadsheet of items.
    ///
    /// Rows the backend rejects are listed in the report; only a response
    /// without a report is an error.
    pub async fn import_items(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<ImportReport, ApiError> {
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str(SPREADSHEET_MIME)?;
        let form = Form::new().part("file", part);
        let builder = self.request(Method::POST, "/barang/import").multipart(form);

        let response = self.execute(builder).await?;
        let status = response.status();
        let body = read_body(response).await?;

        let has_report = body.get("success").is_some() || body.get("failed").is_some();
        if status.is_success() || has_report {
            let report: ImportReport = extract_payload(body)?;
            tracing::info!(
                success = report.success,
                failed = report.failed,
                "Import finished"
            );
            return Ok(report);
        }
        Err(failure(status, &body))
    }

    // ------------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------------

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.read(self.request(Method::GET, "/admin/users")).await
    }

    /// Create a user. A failed welcome e-mail does not fail the creation.
    pub async fn create_user(
        &self,
        input: &NewUser,
    ) -> Result<MutationOutcome<CreatedUser>, ApiError> {
        let outcome: MutationOutcome<JsonValue> =
            self.mutate(self.json(Method::POST, "/admin/users", input)).await?;
        let outcome = outcome.try_map(|body| created_user(body, input.send_welcome_email))?;

        if let MutationOutcome::Success(created) = &outcome {
            tracing::info!(
                username = %created.user.username,
                email = ?created.email,
                "User created"
            );
        }
        Ok(outcome)
    }

    pub async fn update_user(
        &self,
        id: i64,
        update: &UserUpdate,
    ) -> Result<MutationOutcome<User>, ApiError> {
        self.mutate(self.json(Method::PUT, &format!("/admin/users/{id}"), update))
            .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<MutationOutcome<()>, ApiError> {
        let outcome: MutationOutcome<JsonValue> = self
            .mutate(self.request(Method::DELETE, &format!("/admin/users/{id}")))
            .await?;
        Ok(outcome.map(|_| ()))
    }

    pub async fn activity_logs(&self, limit: u32, offset: u32) -> Result<ActivityLogPage, ApiError> {
        let path = format!("/admin/activity-logs?limit={limit}&offset={offset}");
        self.read(self.request(Method::GET, &path)).await
    }

    pub async fn admin_statistics(&self) -> Result<Statistics, ApiError> {
        self.read(self.request(Method::GET, "/admin/statistics"))
            .await
    }

    /// Ask the backend to send a test e-mail; returns its confirmation text
    pub async fn test_email(&self) -> Result<String, ApiError> {
        let body: MessageResponse = self
            .read(self.request(Method::GET, "/admin/test-email"))
            .await?;
        Ok(body.message.unwrap_or_default())
    }

    // ------------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------------

    pub async fn qr_code(&self, id: i64) -> Result<QrCode, ApiError> {
        self.read(self.request(Method::GET, &format!("/qr/{id}")))
            .await
    }

    pub async fn stats(&self) -> Result<Statistics, ApiError> {
        self.read(self.request(Method::GET, "/stats")).await
    }

    pub async fn health(&self) -> Result<Health, ApiError> {
        self.read(self.request(Method::GET, "/health")).await
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.state.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn json<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: &B) -> RequestBuilder {
        self.request(method, path).json(body)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request failed");
            ApiError::from(e)
        })?;
        let status = response.status();
        tracing::debug!(
            path = %response.url().path(),
            status = status.as_u16(),
            "Backend responded"
        );

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = read_body(response).await.unwrap_or(JsonValue::Null);
            let message = error_message(&body).unwrap_or_else(|| status.to_string());
            tracing::warn!(status = status.as_u16(), %message, "Credentials rejected");
            if let Err(e) = self.state.clear_session() {
                tracing::error!(error = %e, "Failed to clear rejected credentials");
            }
            return Err(ApiError::Unauthorized(message));
        }
        Ok(response)
    }

    async fn read<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        let status = response.status();
        let body = read_body(response).await?;

        if !status.is_success() {
            return Err(failure(status, &body));
        }
        Ok(extract_payload(body)?)
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<MutationOutcome<T>, ApiError> {
        let response = self.execute(builder).await?;
        let status = response.status();
        let body = read_body(response).await?;

        if status.is_success() {
            return Ok(MutationOutcome::Success(extract_payload(body)?));
        }
        let outcome = normalize_failure(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), outcome = ?outcome.failure_message(), "Write rejected");
        Ok(outcome)
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = read_body(response).await?;
            return Err(failure(status, &body));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl TokenRenewer for ApiClient {
    async fn renew(&self, token: &str) -> Result<String, ApiError> {
        self.refresh(token).await
    }
}

/// Response body as JSON; non-JSON text becomes a JSON string, empty becomes null
async fn read_body(response: Response) -> Result<JsonValue, ApiError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())))
}

fn failure(status: StatusCode, body: &JsonValue) -> ApiError {
    let message = error_message(body).unwrap_or_else(|| default_message(status.as_u16()));
    if status == StatusCode::NOT_FOUND {
        ApiError::NotFound(message)
    } else {
        ApiError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn client(base_url: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        ApiClient::new(&config, ClientState::new(Arc::new(MemoryStore::new()))).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let api = client("http://localhost:5000/api/");
        assert_eq!(api.base_url(), "http://localhost:5000/api");
        assert_eq!(api.url("/barang"), "http://localhost:5000/api/barang");
    }

    #[test]
    fn test_not_found_and_server_failures() {
        let body = serde_json::json!({ "message": "Barang tidak ditemukan" });
        assert_eq!(
            failure(StatusCode::NOT_FOUND, &body),
            ApiError::NotFound("Barang tidak ditemukan".to_string())
        );
        assert_eq!(
            failure(StatusCode::BAD_GATEWAY, &JsonValue::Null),
            ApiError::Server {
                status: 502,
                message: "Server error".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let api = client("http://127.0.0.1:9");
        let err = api.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_) | ApiError::Timeout));
    }
}
