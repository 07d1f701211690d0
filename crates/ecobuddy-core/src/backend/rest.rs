use std::time::Duration;

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::rows::*;
use super::RowStore;
use crate::error::{EcoError, Result};
use crate::model::*;

const PREVIEW_LEN: usize = 300;
const ALL_COLUMNS: &str = "*";
/// Posts embed the author's display fields.
const POST_COLUMNS: &str = "*,users(name,avatar_url)";

/// Client for a hosted PostgREST row store with a GoTrue-style auth service.
pub struct RestBackend {
    base_url: String,
    anon_key: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Session payload from the auth endpoints. Sign-up without auto-confirm
/// returns the bare user instead, so every field is optional.
#[derive(Deserialize)]
struct AuthSession {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
}

impl RestBackend {
    pub fn new(url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| EcoError::Backend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let raw = format!("{}{path}", self.base_url);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        url.map_err(|e| EcoError::Config(format!("invalid remote url {raw}: {e}")))
    }

    /// Builder with `apikey` and a bearer token (the user's, else the anon key).
    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    /// Send and decode. Non-2xx and undecodable bodies carry the status and a body preview.
    async fn send<R: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<R> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(EcoError::Backend(format!(
                "{what} returned {status}: {}",
                preview(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            EcoError::Backend(format!(
                "failed to deserialize {what} response: {e}\nBody: {}",
                preview(&body)
            ))
        })
    }

    async fn send_empty(&self, what: &str, req: RequestBuilder) -> Result<()> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EcoError::Backend(format!(
                "{what} returned {status}: {}",
                preview(&body)
            )));
        }
        Ok(())
    }

    /// `GET /rest/v1/{table}?select={columns}&{col}=eq.{val}&order=created_at.desc`
    async fn select<R: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, &str)],
        token: Option<&str>,
    ) -> Result<Vec<R>> {
        let mut params = vec![("select", columns.to_string())];
        params.extend(filters.iter().map(|(col, val)| (*col, format!("eq.{val}"))));
        params.push(("order", "created_at.desc".to_string()));

        let url = self.url(&format!("/rest/v1/{table}"), &params)?;
        tracing::debug!(table, "select");
        self.send(table, self.request(Method::GET, url, token)).await
    }

    async fn insert<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
        token: &str,
    ) -> Result<Vec<R>> {
        let url = self.url(&format!("/rest/v1/{table}"), &[])?;
        tracing::debug!(table, "insert");
        let req = self
            .request(Method::POST, url, Some(token))
            .header("Prefer", "return=representation")
            .json(row);
        self.send(table, req).await
    }

    async fn update<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        patch: &T,
        token: &str,
    ) -> Result<Vec<R>> {
        let params: Vec<(&str, String)> = filters
            .iter()
            .map(|(col, val)| (*col, format!("eq.{val}")))
            .collect();
        let url = self.url(&format!("/rest/v1/{table}"), &params)?;
        tracing::debug!(table, "update");
        let req = self
            .request(Method::PATCH, url, Some(token))
            .header("Prefer", "return=representation")
            .json(patch);
        self.send(table, req).await
    }

    async fn auth(&self, what: &str, url: Url, email: &str, password: &str) -> Result<Identity> {
        let req = self
            .request(Method::POST, url, None)
            .json(&Credentials { email, password });
        let session: AuthSession = self.send(what, req).await.map_err(|e| match e {
            EcoError::Backend(msg) => EcoError::Auth(msg),
            other => other,
        })?;

        match (session.access_token, session.user) {
            (Some(access_token), Some(user)) => Ok(Identity {
                user_id: user.id,
                email: user.email.unwrap_or_else(|| email.to_string()),
                access_token,
            }),
            _ => Err(EcoError::Auth(format!(
                "{what} did not return a session (email confirmation required?)"
            ))),
        }
    }
}

fn preview(body: &str) -> &str {
    if body.len() <= PREVIEW_LEN {
        return body;
    }
    let mut end = PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

impl RowStore for RestBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let url = self.url("/auth/v1/signup", &[])?;
        self.auth("signup", url, email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let url = self.url("/auth/v1/token", &[("grant_type", "password".to_string())])?;
        self.auth("token", url, email, password).await
    }

    async fn sign_out(&self, identity: &Identity) -> Result<()> {
        let url = self.url("/auth/v1/logout", &[])?;
        self.send_empty(
            "logout",
            self.request(Method::POST, url, Some(identity.access_token.as_str())),
        )
        .await
    }

    async fn get_profile(&self, identity: &Identity) -> Result<Option<UserProfile>> {
        let rows: Vec<UserProfile> = self
            .select(
                "users",
                ALL_COLUMNS,
                &[("id", identity.user_id.as_str())],
                Some(identity.access_token.as_str()),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, identity: &Identity, profile: &UserProfile) -> Result<UserProfile> {
        let rows: Vec<UserProfile> = self
            .insert("users", profile, &identity.access_token)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| EcoError::Backend("users insert returned no row".to_string()))
    }

    async fn update_profile(&self, identity: &Identity, update: &ProfileUpdate) -> Result<UserProfile> {
        let rows: Vec<UserProfile> = self
            .update(
                "users",
                &[("id", identity.user_id.as_str())],
                update,
                &identity.access_token,
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| EcoError::NotFound(format!("users row {}", identity.user_id)))
    }

    async fn open_user_challenges(&self, identity: &Identity) -> Result<Vec<UserChallengeRow>> {
        self.select(
            "user_challenges",
            ALL_COLUMNS,
            &[("user_id", identity.user_id.as_str()), ("completed", "false")],
            Some(identity.access_token.as_str()),
        )
        .await
    }

    async fn insert_user_challenge(&self, identity: &Identity, row: &UserChallengeRow) -> Result<()> {
        let _: Vec<UserChallengeRow> = self
            .insert("user_challenges", row, &identity.access_token)
            .await?;
        Ok(())
    }

    async fn update_user_challenge(
        &self,
        identity: &Identity,
        challenge_id: &str,
        update: &UserChallengeUpdate,
    ) -> Result<()> {
        let _: Vec<UserChallengeRow> = self
            .update(
                "user_challenges",
                &[
                    ("user_id", identity.user_id.as_str()),
                    ("challenge_id", challenge_id),
                    ("completed", "false"),
                ],
                update,
                &identity.access_token,
            )
            .await?;
        Ok(())
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>> {
        let rows: Vec<ChallengeRow> = self.select("challenges", ALL_COLUMNS, &[], None).await?;
        Ok(rows.into_iter().map(Challenge::from).collect())
    }

    async fn list_eco_actions(&self) -> Result<Vec<EcoAction>> {
        let rows: Vec<EcoActionRow> = self.select("eco_actions", ALL_COLUMNS, &[], None).await?;
        Ok(actions_from_rows(rows))
    }

    async fn list_community_posts(&self) -> Result<Vec<CommunityPost>> {
        let rows: Vec<CommunityPostRow> = self
            .select("community_posts", POST_COLUMNS, &[], None)
            .await?;
        Ok(rows.into_iter().map(CommunityPost::from).collect())
    }
}
