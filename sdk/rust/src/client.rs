use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::models::{
    GroupItem, GroupMember, LeaderboardEntry, LoginRequest, LoginResponse, Mission,
    MissionGroupStatus, MissionUpdate, NewMission, RegisterRequest, Team,
};

/// Body of an API request.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Form),
}

/// Method, extra headers and body for [`ApiClient::fetch`].
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Client for the backend, reached through the proxy mount.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    /// `base_url` is the proxy mount, e.g. `http://localhost:8080/api/proxy`.
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialStore>) -> Self {
        Self::with_client(Client::new(), base_url, credentials)
    }

    pub fn with_client(http: Client, base_url: &str, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    /// Call `endpoint` and decode the JSON answer.
    ///
    /// `Ok(None)` for `204 No Content`. Every non-2xx answer becomes
    /// [`ApiError::Status`].
    pub async fn fetch(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut headers = options.headers;
        if !matches!(options.body, RequestBody::Multipart(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = self.credentials.get()? {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Stored token is not a valid header value, sending without it"),
            }
        }

        tracing::debug!(method = %options.method, url = %url, "API request");
        let mut request = self.http.request(options.method, &url).headers(headers);
        request = match options.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.body(serde_json::to_vec(&value)?),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&body)?))
    }

    /// [`fetch`](Self::fetch), decoded into `T`. An empty answer is an error.
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        match self.fetch(endpoint, options).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(ApiError::Empty(endpoint.to_string())),
        }
    }

    async fn get_as<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.fetch_as(endpoint, RequestOptions::new(Method::GET)).await
    }

    async fn send_json(
        &self,
        method: Method,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<Option<Value>, ApiError> {
        let options = RequestOptions::new(method).json(serde_json::to_value(body)?);
        self.fetch(endpoint, options).await
    }

    /// Log in and store the returned access token.
    pub async fn login(&self, login_id: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let options = RequestOptions::new(Method::POST)
            .json(serde_json::to_value(LoginRequest { login_id, password })?);
        let login: LoginResponse = self.fetch_as("/users/login", options).await?;
        self.credentials.set(&login.access_token)?;
        Ok(login)
    }

    /// Forget the stored token.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.credentials.clear()?;
        Ok(())
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<Value>, ApiError> {
        self.send_json(Method::POST, "/users/register", request).await
    }

    pub async fn my_teams(&self) -> Result<Vec<Team>, ApiError> {
        self.get_as("/teams/me").await
    }

    pub async fn create_team(&self, name: &str) -> Result<Team, ApiError> {
        let options = RequestOptions::new(Method::POST).json(json!({ "name": name }));
        self.fetch_as("/teams/", options).await
    }

    pub async fn join_team(&self, auth_code: &str) -> Result<Option<Value>, ApiError> {
        self.send_json(Method::POST, "/teams/join", &json!({ "auth_code": auth_code }))
            .await
    }

    pub async fn team_missions(&self, team_id: i64) -> Result<Vec<Mission>, ApiError> {
        self.get_as(&format!("/teams/{team_id}/missions")).await
    }

    pub async fn my_groups(&self) -> Result<Vec<GroupItem>, ApiError> {
        self.get_as("/groups/me").await
    }

    pub async fn group_members(&self, group_id: i64) -> Result<Vec<GroupMember>, ApiError> {
        self.get_as(&format!("/groups/{group_id}/members")).await
    }

    pub async fn group_missions(&self, group_id: i64) -> Result<Vec<Value>, ApiError> {
        self.get_as(&format!("/groups/{group_id}/missions")).await
    }

    pub async fn leaderboard(&self, team_id: i64) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.get_as(&format!("/leaderboard/{team_id}")).await
    }

    pub async fn mission(&self, mission_id: i64) -> Result<Mission, ApiError> {
        self.get_as(&format!("/missions/{mission_id}")).await
    }

    pub async fn create_mission(&self, mission: &NewMission<'_>) -> Result<Option<Value>, ApiError> {
        self.send_json(Method::POST, "/missions/", mission).await
    }

    pub async fn update_mission(
        &self,
        mission_id: i64,
        update: &MissionUpdate<'_>,
    ) -> Result<Option<Value>, ApiError> {
        self.send_json(Method::PATCH, &format!("/missions/{mission_id}"), update)
            .await
    }

    pub async fn delete_mission(&self, mission_id: i64) -> Result<(), ApiError> {
        self.fetch(
            &format!("/missions/{mission_id}"),
            RequestOptions::new(Method::DELETE),
        )
        .await?;
        Ok(())
    }

    pub async fn mission_groups(&self, mission_id: i64) -> Result<Vec<MissionGroupStatus>, ApiError> {
        self.get_as(&format!("/missions/{mission_id}/groups")).await
    }

    /// Submit a JPEG photo as proof for a mission, on behalf of a group.
    pub async fn submit_mission(
        &self,
        mission_id: i64,
        group_id: i64,
        photo: Vec<u8>,
    ) -> Result<Option<Value>, ApiError> {
        let part = Part::bytes(photo)
            .file_name(photo_file_name(mission_id))
            .mime_str("image/jpeg")?;
        let options = RequestOptions::new(Method::POST).multipart(Form::new().part("file", part));
        self.fetch(
            &format!("/missions/{mission_id}/submit?group_id={group_id}"),
            options,
        )
        .await
    }
}

/// `mission_<id>_<unix millis>.jpg`
pub fn photo_file_name(mission_id: i64) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("mission_{mission_id}_{millis}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCredentialStore;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new(
            "http://localhost:8080/api/proxy/",
            Arc::new(MemoryCredentialStore::new()),
        );
        assert_eq!(client.base_url, "http://localhost:8080/api/proxy");
    }

    #[test]
    fn test_photo_file_name_shape() {
        let name = photo_file_name(7);
        assert!(name.starts_with("mission_7_"));
        assert!(name.ends_with(".jpg"));
        let millis = &name["mission_7_".len()..name.len() - ".jpg".len()];
        assert!(millis.parse::<u128>().is_ok());
    }

    #[test]
    fn test_options_default_to_get() {
        let options = RequestOptions::default();
        assert_eq!(options.method, Method::GET);
        assert!(matches!(options.body, RequestBody::Empty));
    }
}
