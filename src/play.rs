use std::{
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result, anyhow};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use log::debug;
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    config::Config,
    error::PublishError,
    model::{Edit, Listing, Track, UploadedApk, UploadedBundle},
    util::api_error_message,
};

const SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: usize,
    iat: usize,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// An open edit. Every edit-scoped call takes one of these instead of
/// reading package and edit id from shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditContext {
    pub package_name: String,
    pub edit_id: String,
}

impl EditContext {
    fn path(&self, suffix: &str) -> String {
        format!(
            "androidpublisher/v3/applications/{}/edits/{}{}",
            self.package_name, self.edit_id, suffix
        )
    }

    fn upload_path(&self, suffix: &str) -> String {
        format!("upload/{}", self.path(suffix))
    }
}

pub struct GooglePlayClient {
    http: Client,
    base_url: Url,
    config: Config,
    cached_token: tokio::sync::Mutex<Option<(String, SystemTime)>>,
    static_token: Option<String>,
}

impl GooglePlayClient {
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("gplay/", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls()
            .build()?;
        let base_url = Url::parse("https://androidpublisher.googleapis.com/")?;
        Ok(Self {
            http,
            base_url,
            config,
            cached_token: tokio::sync::Mutex::new(None),
            static_token: None,
        })
    }

    pub fn with_static_token(mut self, token: impl Into<String>) -> Self {
        self.static_token = Some(token.into());
        self
    }

    /// Overrides the base URL for API requests. Useful for tests with a mock server.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn access_token(&self) -> Result<String> {
        if let Some(tok) = &self.static_token {
            return Ok(tok.clone());
        }
        {
            let guard = self.cached_token.lock().await;
            if let Some((token, exp_time)) = &*guard
                && SystemTime::now() + Duration::from_secs(60) < *exp_time
            {
                return Ok(token.clone());
            }
        }

        let key = &self.config.key;
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
        // Google caps assertion lifetime at one hour.
        let claims = Claims {
            iss: key.client_email.clone(),
            scope: SCOPE.to_string(),
            aud: key.token_uri.clone(),
            exp: now + 3600,
            iat: now,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            PublishError::Credentials(format!("private key is not a valid RSA PEM key: {}", e))
        })?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?;

        let res = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Token request failed")?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(PublishError::Authentication(format!(
                "{} {}",
                status,
                api_error_message(&text)
            ))
            .into());
        }
        let token: TokenResponse =
            serde_json::from_str(&text).context("Failed to parse token response")?;
        debug!("Obtained access token for {}", key.client_email);
        {
            let mut guard = self.cached_token.lock().await;
            guard.replace((
                token.access_token.clone(),
                SystemTime::now() + Duration::from_secs(token.expires_in),
            ));
        }
        Ok(token.access_token)
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.base_url.join(path)?;
        let token = self.access_token().await?;
        let mut req = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(anyhow!(
                "{} {} failed {}: {}",
                method,
                path,
                status,
                api_error_message(&text)
            ));
        }
        debug!("{} {} ok: {} bytes", method, path, text.len());
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).context("Failed to parse JSON response")
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.send(Method::DELETE, path, None).await
    }

    async fn upload(&self, path: &str, file: &Path) -> Result<Value> {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut().append_pair("uploadType", "media");
        let token = self.access_token().await?;
        let res = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(anyhow!(
                "upload failed {}: {}",
                status,
                api_error_message(&text)
            ));
        }
        debug!("Uploaded {} to {}", file.display(), path);
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).context("Failed to parse upload response")
    }

    fn parse<T: DeserializeOwned>(v: Value) -> Result<T> {
        serde_json::from_value(v).context("Unexpected response shape")
    }

    pub async fn insert_edit(&self, package_name: &str) -> Result<EditContext> {
        let path = format!("androidpublisher/v3/applications/{}/edits", package_name);
        let edit: Edit = Self::parse(self.post(&path, json!({})).await?)?;
        if edit.id.is_empty() {
            return Err(anyhow!("Google Play returned an edit without an id"));
        }
        debug!("Opened edit {} for {}", edit.id, package_name);
        Ok(EditContext {
            package_name: package_name.to_string(),
            edit_id: edit.id,
        })
    }

    pub async fn delete_edit(&self, ctx: &EditContext) -> Result<()> {
        self.delete(&ctx.path("")).await?;
        Ok(())
    }

    pub async fn commit_edit(
        &self,
        ctx: &EditContext,
        changes_not_sent_for_review: bool,
    ) -> Result<Edit> {
        let mut path = ctx.path(":commit");
        if changes_not_sent_for_review {
            path.push_str("?changesNotSentForReview=true");
        }
        let v = self
            .post(&path, json!({}))
            .await
            .with_context(|| format!("Failed to commit edit {}", ctx.edit_id))?;
        Self::parse(v)
    }

    pub async fn get_track(&self, ctx: &EditContext, track: &str) -> Result<Track> {
        let res = self.get(&ctx.path(&format!("/tracks/{}", track))).await;
        res.and_then(Self::parse)
            .map_err(|e| PublishError::track_read(track, e).into())
    }

    pub async fn update_track(&self, ctx: &EditContext, track: &Track) -> Result<Track> {
        let body = serde_json::to_value(track)?;
        let res = self
            .put(&ctx.path(&format!("/tracks/{}", track.track)), body)
            .await;
        res.and_then(Self::parse)
            .map_err(|e| PublishError::track_update(&track.track, e).into())
    }

    pub async fn upload_apk(&self, ctx: &EditContext, file: &Path) -> Result<i64> {
        let res = self.upload(&ctx.upload_path("/apks"), file).await;
        let apk: UploadedApk = res
            .and_then(Self::parse)
            .map_err(|e| PublishError::upload(file, e))?;
        Ok(apk.version_code)
    }

    pub async fn upload_bundle(&self, ctx: &EditContext, file: &Path) -> Result<i64> {
        let res = self.upload(&ctx.upload_path("/bundles"), file).await;
        let bundle: UploadedBundle = res
            .and_then(Self::parse)
            .map_err(|e| PublishError::upload(file, e))?;
        if let Some(sha) = &bundle.sha256 {
            debug!("Bundle {} sha256 {}", bundle.version_code, sha);
        }
        Ok(bundle.version_code)
    }

    pub async fn upload_expansion_file(
        &self,
        ctx: &EditContext,
        version_code: i64,
        file: &Path,
    ) -> Result<()> {
        let path = ctx.upload_path(&format!("/apks/{}/expansionFiles/main", version_code));
        self.upload(&path, file)
            .await
            .map_err(|e| PublishError::upload(file, e))?;
        Ok(())
    }

    pub async fn upload_deobfuscation(
        &self,
        ctx: &EditContext,
        version_code: i64,
        file: &Path,
    ) -> Result<()> {
        let path = ctx.upload_path(&format!(
            "/apks/{}/deobfuscationFiles/proguard",
            version_code
        ));
        self.upload(&path, file)
            .await
            .map_err(|e| PublishError::upload(file, e))?;
        Ok(())
    }

    pub async fn update_listing(&self, ctx: &EditContext, listing: &Listing) -> Result<()> {
        let body = serde_json::to_value(listing)?;
        self.put(&ctx.path(&format!("/listings/{}", listing.language)), body)
            .await
            .map_err(|e| PublishError::Listing {
                language: listing.language.clone(),
                source: e.into(),
            })?;
        Ok(())
    }

    pub async fn delete_all_images(
        &self,
        ctx: &EditContext,
        language: &str,
        image_type: &str,
    ) -> Result<()> {
        self.delete(&ctx.path(&format!("/listings/{}/{}", language, image_type)))
            .await
            .with_context(|| format!("Failed to delete {} images for {}", image_type, language))?;
        Ok(())
    }

    pub async fn upload_image(
        &self,
        ctx: &EditContext,
        language: &str,
        image_type: &str,
        file: &Path,
    ) -> Result<()> {
        let path = ctx.upload_path(&format!("/listings/{}/{}", language, image_type));
        self.upload(&path, file)
            .await
            .map_err(|e| PublishError::upload(file, e))?;
        Ok(())
    }
}
