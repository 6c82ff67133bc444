//! GitHub REST client.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shipyard_git::RepoInfo;
use shipyard_plugin::{PluginError, PluginResult, RemoteError};
use tracing::debug;
use url::Url;

/// Host of the public service.
pub const DEFAULT_HOST: &str = "github.com";

/// Returns the REST API root for a host.
///
/// Enterprise installations serve the API under `/api/v3`.
pub fn api_base(host: &str) -> String {
    if host == DEFAULT_HOST {
        "https://api.github.com".to_string()
    } else {
        format!("https://{host}/api/v3")
    }
}

/// Payload for a new release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDraft {
    /// Tag the release points at.
    pub tag_name: String,
    /// Display name.
    pub name: String,
    /// Release notes.
    pub body: String,
    /// Marks the release as a pre-release.
    pub prerelease: bool,
}

/// A release as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Release id.
    pub id: u64,
    /// Web page of the release.
    pub html_url: String,
    /// URI template for asset uploads.
    pub upload_url: String,
    /// `true` while the release is a draft.
    #[serde(default)]
    pub draft: bool,
}

/// An uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    /// File name.
    pub name: String,
    /// Download URL.
    pub browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Operations on a code-hosting release API.
///
/// Failures carry the HTTP status so callers can classify them for retry.
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    /// Returns the login of the token's owner.
    async fn authenticate(&self) -> Result<String, RemoteError>;

    /// Returns `true` if `user` may push to the repository.
    async fn check_collaborator(&self, repo: &RepoInfo, user: &str) -> Result<bool, RemoteError>;

    /// Creates an unpublished release.
    async fn create_draft_release(
        &self,
        repo: &RepoInfo,
        draft: &ReleaseDraft,
    ) -> Result<Release, RemoteError>;

    /// Publishes a draft release.
    async fn publish_release(&self, repo: &RepoInfo, id: u64) -> Result<Release, RemoteError>;

    /// Uploads one asset to a release.
    async fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        content: Vec<u8>,
    ) -> Result<Asset, RemoteError>;
}

/// [`ReleaseApi`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpReleaseApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpReleaseApi {
    /// Creates a client for the given host.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: &str, token: impl Into<String>) -> PluginResult<Self> {
        Self::with_base_url(api_base(host), token)
    }

    /// Creates a client against an explicit API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> PluginResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| PluginError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn repo_url(&self, repo: &RepoInfo, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.base_url, repo.owner, repo.name)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        debug!(status = status.as_u16(), %message, "API request failed");
        Err(RemoteError::new(Some(status.as_u16()), message))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    RemoteError::new(err.status().map(|s| s.as_u16()), err.to_string())
}

/// Expands the `{?name,label}` upload URI template.
fn upload_url(template: &str, name: &str) -> Result<Url, RemoteError> {
    let base = template.split('{').next().unwrap_or(template);
    let mut url = Url::parse(base)
        .map_err(|e| RemoteError::new(None, format!("invalid upload url {base}: {e}")))?;
    url.query_pairs_mut().append_pair("name", name);
    Ok(url)
}

#[async_trait]
impl ReleaseApi for HttpReleaseApi {
    async fn authenticate(&self) -> Result<String, RemoteError> {
        let url = format!("{}/user", self.base_url);
        let user: User = self.json(self.request(Method::GET, &url)).await?;
        Ok(user.login)
    }

    async fn check_collaborator(&self, repo: &RepoInfo, user: &str) -> Result<bool, RemoteError> {
        let url = self.repo_url(repo, &format!("/collaborators/{user}"));
        match self.send(self.request(Method::GET, &url)).await {
            Ok(_) => Ok(true),
            Err(err) if err.status == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn create_draft_release(
        &self,
        repo: &RepoInfo,
        draft: &ReleaseDraft,
    ) -> Result<Release, RemoteError> {
        let url = self.repo_url(repo, "/releases");
        let body = serde_json::json!({
            "tag_name": draft.tag_name,
            "name": draft.name,
            "body": draft.body,
            "prerelease": draft.prerelease,
            "draft": true,
        });
        self.json(self.request(Method::POST, &url).json(&body)).await
    }

    async fn publish_release(&self, repo: &RepoInfo, id: u64) -> Result<Release, RemoteError> {
        let url = self.repo_url(repo, &format!("/releases/{id}"));
        let body = serde_json::json!({ "draft": false });
        self.json(self.request(Method::PATCH, &url).json(&body)).await
    }

    async fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        content: Vec<u8>,
    ) -> Result<Asset, RemoteError> {
        let url = upload_url(&release.upload_url, name)?;
        let request = self
            .request(Method::POST, url.as_str())
            .header("Content-Type", "application/octet-stream")
            .body(content);
        self.json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoInfo {
        RepoInfo::from_slug(DEFAULT_HOST, "acme/rocket").unwrap()
    }

    fn release_json(server: &MockServer, draft: bool) -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "html_url": "https://github.com/acme/rocket/releases/tag/v2.0.2",
            "upload_url": format!("{}/uploads/7/assets{{?name,label}}", server.uri()),
            "draft": draft,
        })
    }

    #[test]
    fn test_api_base() {
        assert_eq!(api_base("github.com"), "https://api.github.com");
        assert_eq!(api_base("git.example.com"), "https://git.example.com/api/v3");
    }

    #[test]
    fn test_upload_url_expands_template() {
        let url = upload_url(
            "https://uploads.github.com/repos/acme/rocket/releases/7/assets{?name,label}",
            "app v1.tar.gz",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://uploads.github.com/repos/acme/rocket/releases/7/assets?name=app+v1.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_authenticate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "login": "john" })))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpReleaseApi::with_base_url(server.uri(), "secret").unwrap();
        assert_eq!(api.authenticate().await.unwrap(), "john");
    }

    #[tokio::test]
    async fn test_bad_credentials_carry_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "message": "Bad credentials" })),
            )
            .mount(&server)
            .await;

        let api = HttpReleaseApi::with_base_url(server.uri(), "wrong").unwrap();
        let err = api.authenticate().await.unwrap_err();
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "Bad credentials");
    }

    #[tokio::test]
    async fn test_check_collaborator() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/rocket/collaborators/john"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/rocket/collaborators/mallory"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = HttpReleaseApi::with_base_url(server.uri(), "secret").unwrap();
        assert!(api.check_collaborator(&repo(), "john").await.unwrap());
        assert!(!api.check_collaborator(&repo(), "mallory").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_publish_and_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/rocket/releases"))
            .and(body_partial_json(serde_json::json!({ "tag_name": "v2.0.2", "draft": true })))
            .respond_with(ResponseTemplate::new(201).set_body_json(release_json(&server, true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/acme/rocket/releases/7"))
            .and(body_partial_json(serde_json::json!({ "draft": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(release_json(&server, false)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/uploads/7/assets"))
            .and(query_param("name", "app.zip"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "name": "app.zip",
                "browser_download_url": "https://github.com/acme/rocket/releases/download/v2.0.2/app.zip",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpReleaseApi::with_base_url(server.uri(), "secret").unwrap();
        let draft = ReleaseDraft {
            tag_name: "v2.0.2".to_string(),
            name: "Release 2.0.2".to_string(),
            body: "* fix (abc123)".to_string(),
            prerelease: false,
        };
        let release = api.create_draft_release(&repo(), &draft).await.unwrap();
        assert!(release.draft);

        let asset = api
            .upload_asset(&release, "app.zip", b"zip".to_vec())
            .await
            .unwrap();
        assert_eq!(asset.name, "app.zip");

        let published = api.publish_release(&repo(), release.id).await.unwrap();
        assert!(!published.draft);
        assert_eq!(
            published.html_url,
            "https://github.com/acme/rocket/releases/tag/v2.0.2"
        );
    }

    #[tokio::test]
    async fn test_server_error_message_is_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let api = HttpReleaseApi::with_base_url(server.uri(), "secret").unwrap();
        let err = api.publish_release(&repo(), 7).await.unwrap_err();
        assert_eq!(err.status, Some(502));
        assert_eq!(err.message, "Bad Gateway");
    }
}
