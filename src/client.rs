//! Mattermost REST v4 client.
//!
//! The collector and resolver talk to the platform through the [`ChatClient`]
//! trait so they can be exercised against in-memory fakes; [`MattermostClient`]
//! is the real implementation on top of `reqwest`.

use crate::config::MattermostConfig;
use crate::error::{Result, SnapError};
use crate::model::{Channel, Member, Team, User, UserStatus};
use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed per-request transport timeout. This is the only timeout in the run;
/// the overall job has no deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the snapshot pipeline needs from the chat platform.
///
/// Every call may fail with a transport or auth error; callers own the
/// decision of whether that skips a team, skips a channel, degrades to
/// sentinels, or aborts the run.
#[async_trait]
pub trait ChatClient {
    /// Teams the authenticated user belongs to.
    async fn user_teams(&self) -> Result<Vec<Team>>;

    /// Channels the authenticated user belongs to within one team.
    async fn user_channels(&self, team_id: &str) -> Result<Vec<Channel>>;

    /// One page of a channel's membership; an empty page ends the listing.
    async fn channel_members_page(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Member>>;

    /// Presence statuses for a batch of user ids.
    async fn statuses_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserStatus>>;

    /// User profiles for a batch of user ids.
    async fn users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>>;
}

/// Authenticated session against a Mattermost server.
pub struct MattermostClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_id: String,
}

impl MattermostClient {
    /// Log in with the configured credentials and establish a session.
    ///
    /// The session token comes back in the `Token` response header; the
    /// response body is the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::MissingSetting`] if credentials are not
    /// configured, [`SnapError::LoginFailed`] if the server rejects them.
    pub async fn login(config: &MattermostConfig) -> Result<Self> {
        let (base_url, login_id, password) = config.credentials()?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let response = http
            .post(format!("{base_url}/api/v4/users/login"))
            .json(&serde_json::json!({
                "login_id": login_id,
                "password": password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SnapError::login_failed(
                base_url,
                format!("HTTP {}", response.status().as_u16()),
            ));
        }

        let token = response
            .headers()
            .get("Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                SnapError::login_failed(&base_url, "no session token in login response")
            })?;

        let me: User = response.json().await?;
        debug!("Authenticated against {} as user {}", base_url, me.id);

        Ok(Self {
            http,
            base_url,
            token,
            user_id: me.id,
        })
    }

    /// Id of the authenticated user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// End the session. Best effort: a failed logout only logs a warning,
    /// the snapshot is already durable by the time this runs.
    pub async fn logout(&self) {
        let endpoint = "/api/v4/users/logout";
        let result = self
            .http
            .post(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => debug!("Logged out"),
            Ok(response) => warn!("Logout returned HTTP {}", response.status().as_u16()),
            Err(e) => warn!("Logout failed: {e}"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::decode(response, endpoint).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl serde::Serialize,
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{endpoint}", self.base_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::decode(response, endpoint).await
    }

    async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
        if !response.status().is_success() {
            return Err(SnapError::api_status(
                endpoint,
                response.status().as_u16(),
            ));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatClient for MattermostClient {
    async fn user_teams(&self) -> Result<Vec<Team>> {
        self.get_json("/api/v4/users/me/teams").await
    }

    async fn user_channels(&self, team_id: &str) -> Result<Vec<Channel>> {
        let endpoint = format!("/api/v4/users/{}/teams/{team_id}/channels", self.user_id);
        self.get_json(&endpoint).await
    }

    async fn channel_members_page(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Member>> {
        let endpoint =
            format!("/api/v4/channels/{channel_id}/members?page={page}&per_page={per_page}");
        self.get_json(&endpoint).await
    }

    async fn statuses_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserStatus>> {
        self.post_json("/api/v4/users/status/ids", &user_ids).await
    }

    async fn users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>> {
        self.post_json("/api/v4/users/ids", &user_ids).await
    }
}
