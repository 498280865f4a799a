//! The GitHub REST API client.
//!
//! Requests go through a [`Transport`], which the production code backs with
//! Octocrab's raw request methods. Every operation answers with a `bool`, a
//! `String`, or a `Vec`; HTTP and network failures never escape as errors.

use std::fmt;

use anyhow::Result;
use http::HeaderName;
use http_body_util::BodyExt;
use log::{debug, warn};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::{Octocrab, OctocrabBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{API_BASE_URL, API_REPOS_PER_PAGE};

/// Status reported when no HTTP response was received at all (DNS, connect, TLS, ...)
pub const TRANSPORT_FAILURE: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

/// A status code, the raw `Link` header if there was one, and the body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub link: Option<String>,
    pub body: String,
}

impl ApiResponse {
    pub fn transport_failure(e: impl fmt::Display) -> ApiResponse {
        ApiResponse {
            status: TRANSPORT_FAILURE,
            link: None,
            body: e.to_string(),
        }
    }
}

/// Sends one request to the GitHub API and reports what came back.
///
/// Implementations attach the credentials and the GitHub media-type headers.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> ApiResponse;
}

/// The production transport
pub struct OctocrabTransport {
    octocrab: Octocrab,
}

impl OctocrabTransport {
    pub fn new(access_token: &str) -> Result<OctocrabTransport> {
        OctocrabTransport::with_base_uri(access_token, API_BASE_URL)
    }

    pub fn with_base_uri(access_token: &str, base_uri: &str) -> Result<OctocrabTransport> {
        let mut builder = OctocrabBuilder::default()
            .base_uri(base_uri)?
            .personal_token(access_token.to_owned())
            .add_header(
                HeaderName::from_static("accept"),
                "application/vnd.github+json".to_string(),
            )
            .add_header(
                HeaderName::from_static("x-github-api-version"),
                "2022-11-28".to_string(),
            );
        // Octocrab retries 5xx and connection errors by default
        builder.add_retry_config(RetryConfig::None);
        let octocrab = builder.build()?;
        Ok(OctocrabTransport { octocrab })
    }
}

impl Transport for OctocrabTransport {
    async fn send(&self, request: ApiRequest) -> ApiResponse {
        let result = match request.method {
            Method::Get => self.octocrab._get(request.url).await,
            Method::Post => self.octocrab._post(request.url, request.body.as_ref()).await,
            Method::Delete => self.octocrab._delete(request.url, None::<&()>).await,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("{}", e);
                return ApiResponse::transport_failure(e);
            }
        };

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(http::header::LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        match response.into_body().collect().await {
            Ok(collected) => ApiResponse {
                status,
                link,
                body: String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
            },
            Err(e) => {
                warn!("{}", e);
                ApiResponse::transport_failure(e)
            }
        }
    }
}

/// The subset of a GitHub user we need
#[derive(Debug, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub login: String,
}

/// The subset of a GitHub repository we read back from `/user/repos`
#[derive(Debug, Deserialize)]
pub struct RepositoryItem {
    name: String,
    description: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    html_url: String,
}

/// A repository to create, or one read back from the API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub name: String,
    pub description: String,
    pub private: bool,
    /// Only populated when read back from the API
    pub html_url: String,
}

impl RepositoryDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        private: bool,
    ) -> RepositoryDescriptor {
        RepositoryDescriptor {
            name: name.into(),
            description: description.into(),
            private,
            html_url: String::new(),
        }
    }

    /// The SSH clone URL for this repository under `owner`
    pub fn ssh_url(&self, owner: &str) -> String {
        format!("git@github.com:{owner}/{}.git", self.name)
    }

    pub fn visibility(&self) -> &'static str {
        if self.private {
            "private"
        } else {
            "public"
        }
    }
}

impl From<RepositoryItem> for RepositoryDescriptor {
    fn from(item: RepositoryItem) -> Self {
        RepositoryDescriptor {
            name: item.name,
            description: item.description.unwrap_or_default(),
            private: item.private,
            html_url: item.html_url,
        }
    }
}

/// Extract the `rel="next"` target from an RFC 5988 `Link` header
pub fn next_page_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = parts.any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });
        is_next.then(|| url.to_owned())
    })
}

/// A GitHub API session for one token.
///
/// The authenticated username is looked up once and kept for the life of the
/// client; authenticating with another token means building a new client.
pub struct GitHubClient<T: Transport> {
    transport: T,
    api_base: String,
    username: Option<String>,
    username_fallback: Box<dyn Fn() -> Option<String>>,
}

impl GitHubClient<OctocrabTransport> {
    pub fn connect(access_token: &str) -> Result<GitHubClient<OctocrabTransport>> {
        Ok(GitHubClient::new(OctocrabTransport::new(access_token)?))
    }
}

impl<T: Transport> GitHubClient<T> {
    pub fn new(transport: T) -> GitHubClient<T> {
        GitHubClient {
            transport,
            api_base: API_BASE_URL.to_string(),
            username: None,
            username_fallback: Box::new(|| None),
        }
    }

    /// Where to find a username when the API cannot tell us
    pub fn with_username_fallback(
        mut self,
        fallback: impl Fn() -> Option<String> + 'static,
    ) -> GitHubClient<T> {
        self.username_fallback = Box::new(fallback);
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> ApiResponse {
        debug!("{method} {url}");
        let response = self.transport.send(ApiRequest { method, url, body }).await;
        debug!("-> {}", response.status);
        response
    }

    async fn fetch_login(&self) -> Option<String> {
        let response = self.send(Method::Get, self.url("/user"), None).await;
        if response.status != 200 {
            warn!("GET /user returned {}", response.status);
            return None;
        }
        match serde_json::from_str::<Account>(&response.body) {
            Ok(account) => Some(account.login),
            Err(e) => {
                warn!("Could not parse /user response: {e}");
                None
            }
        }
    }

    /// Check the token against `/user`, remembering the login on success
    pub async fn authenticate(&mut self) -> bool {
        match self.fetch_login().await {
            Some(login) => {
                self.username = Some(login);
                true
            }
            None => false,
        }
    }

    /// The authenticated username: cached, else from the API, else from the git
    /// configuration. Empty when none of them know.
    pub async fn username(&mut self) -> String {
        if let Some(username) = self.username.as_ref().filter(|u| !u.is_empty()) {
            return username.clone();
        }
        if let Some(login) = self.fetch_login().await.filter(|l| !l.is_empty()) {
            self.username = Some(login.clone());
            return login;
        }
        match (self.username_fallback)() {
            Some(username) => {
                debug!("Using username {username} from git configuration");
                username
            }
            None => String::new(),
        }
    }

    /// Create a repository under the authenticated user, with an initial commit
    pub async fn create_repository(&self, repository: &RepositoryDescriptor) -> bool {
        let body = serde_json::json!({
            "name": repository.name,
            "description": repository.description,
            "private": repository.private,
            "auto_init": true,
        });
        let response = self.send(Method::Post, self.url("/user/repos"), Some(body)).await;
        if response.status != 201 {
            warn!(
                "Creating {} returned {}: {}",
                repository.name, response.status, response.body
            );
        }
        response.status == 201
    }

    /// Whether `name` is among the user's repositories.
    ///
    /// Only the first page (100 repositories) is inspected, so larger accounts can
    /// get a false `false`.
    pub async fn repository_exists(&self, name: &str) -> bool {
        let url = self.url(&format!("/user/repos?per_page={API_REPOS_PER_PAGE}"));
        let response = self.send(Method::Get, url, None).await;
        if response.status != 200 {
            return false;
        }
        match serde_json::from_str::<Vec<serde_json::Value>>(&response.body) {
            Ok(repositories) => repositories
                .iter()
                .any(|repository| repository.get("name").and_then(|n| n.as_str()) == Some(name)),
            Err(e) => {
                warn!("Could not parse repository list: {e}");
                false
            }
        }
    }

    /// Every repository of the user, following `Link: rel="next"` page by page.
    ///
    /// A failed or unparseable page ends the walk; what was collected so far is returned.
    pub async fn list_repositories(&self) -> Vec<RepositoryDescriptor> {
        let mut repositories = Vec::new();
        let mut next = Some(self.url(&format!("/user/repos?per_page={API_REPOS_PER_PAGE}")));

        while let Some(url) = next.take() {
            let response = self.send(Method::Get, url.clone(), None).await;
            if response.status != 200 {
                warn!("Listing repositories stopped at {url}: status {}", response.status);
                break;
            }
            let page: Vec<RepositoryItem> = match serde_json::from_str(&response.body) {
                Ok(page) => page,
                Err(e) => {
                    warn!("Listing repositories stopped at {url}: {e}");
                    break;
                }
            };
            repositories.extend(page.into_iter().map(RepositoryDescriptor::from));

            next = response
                .link
                .as_deref()
                .and_then(next_page_link)
                .and_then(|link| resolve(&url, &link));
        }

        repositories
    }

    /// Delete `name` from the authenticated user's account
    pub async fn delete_repository(&mut self, name: &str) -> bool {
        let owner = self.username().await;
        if owner.is_empty() {
            warn!("Cannot delete {name}: unable to determine the GitHub username");
            return false;
        }
        let response = self
            .send(Method::Delete, self.url(&format!("/repos/{owner}/{name}")), None)
            .await;
        if response.status != 204 {
            warn!("Deleting {owner}/{name} returned {}: {}", response.status, response.body);
        }
        response.status == 204
    }
}

/// Resolve a possibly relative link against the page it came from
fn resolve(current: &str, link: &str) -> Option<String> {
    match Url::parse(current).and_then(|base| base.join(link)) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            warn!("Ignoring unusable pagination link {link}: {e}");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{repositories_json, FakeTransport};
    use super::*;

    const USER: &str = "https://api.github.com/user";
    const REPOS: &str = "https://api.github.com/user/repos?per_page=100";

    fn init() {
        env_logger::builder()
            .target(env_logger::Target::Stdout)
            .is_test(true)
            .try_init()
            .unwrap_or_default();
    }

    #[test]
    fn test_next_page_link() {
        let header = r#"<https://api.github.com/user/repos?per_page=100&page=2>; rel="next", <https://api.github.com/user/repos?per_page=100&page=5>; rel="last""#;
        assert_eq!(
            next_page_link(header).as_deref(),
            Some("https://api.github.com/user/repos?per_page=100&page=2")
        );

        let last_page = r#"<https://api.github.com/user/repos?per_page=100&page=1>; rel="prev", <https://api.github.com/user/repos?per_page=100&page=1>; rel="first""#;
        assert_eq!(next_page_link(last_page), None);
        assert_eq!(next_page_link(""), None);
        assert_eq!(next_page_link("garbage; rel=\"next\""), None);
    }

    #[test]
    fn test_ssh_url() {
        let repository = RepositoryDescriptor::new("hello", "", true);
        assert_eq!(repository.ssh_url("octocat"), "git@github.com:octocat/hello.git");
        assert_eq!(repository.visibility(), "private");
    }

    #[tokio::test]
    async fn test_authenticate_caches_login() {
        init();
        let transport =
            FakeTransport::new().route(Method::Get, USER, 200, r#"{"login": "octocat", "id": 1}"#);
        let mut client = GitHubClient::new(transport);

        assert!(client.authenticate().await);
        assert_eq!(client.username().await, "octocat");
        assert_eq!(client.transport().sent(Method::Get).len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_fails_on_bad_status_or_body() {
        let transport =
            FakeTransport::new().route(Method::Get, USER, 401, r#"{"message": "Bad credentials"}"#);
        let mut client = GitHubClient::new(transport);
        assert!(!client.authenticate().await);

        let mut client = GitHubClient::new(FakeTransport::new().route(Method::Get, USER, 200, "<html>"));
        assert!(!client.authenticate().await);

        let mut client = GitHubClient::new(FakeTransport::new());
        assert!(!client.authenticate().await);
    }

    #[tokio::test]
    async fn test_username_from_api() {
        let transport = FakeTransport::new().route(Method::Get, USER, 200, r#"{"login": "octocat"}"#);
        let mut client =
            GitHubClient::new(transport).with_username_fallback(|| Some("from-git".to_string()));
        assert_eq!(client.username().await, "octocat");
        // cached
        assert_eq!(client.username().await, "octocat");
        assert_eq!(client.transport().sent(Method::Get).len(), 1);
    }

    #[tokio::test]
    async fn test_username_falls_back_to_git_config() {
        let transport = FakeTransport::new().route(Method::Get, USER, 503, "");
        let mut client =
            GitHubClient::new(transport).with_username_fallback(|| Some("from-git".to_string()));
        assert_eq!(client.username().await, "from-git");
    }

    #[tokio::test]
    async fn test_username_empty_when_all_sources_fail() {
        let mut client = GitHubClient::new(FakeTransport::new()).with_username_fallback(|| None);
        assert_eq!(client.username().await, "");
    }

    #[tokio::test]
    async fn test_create_repository() {
        let transport =
            FakeTransport::new().route(Method::Post, "https://api.github.com/user/repos", 201, "{}");
        let client = GitHubClient::new(transport);
        let repository = RepositoryDescriptor::new("hello", "Hello, world", true);

        assert!(client.create_repository(&repository).await);
        let posts = client.transport().sent(Method::Post);
        assert_eq!(
            posts[0].body,
            Some(serde_json::json!({
                "name": "hello",
                "description": "Hello, world",
                "private": true,
                "auto_init": true,
            }))
        );
    }

    #[tokio::test]
    async fn test_create_repository_requires_201() {
        let transport = FakeTransport::new().route(
            Method::Post,
            "https://api.github.com/user/repos",
            422,
            r#"{"message": "Repository creation failed."}"#,
        );
        let client = GitHubClient::new(transport);
        assert!(!client.create_repository(&RepositoryDescriptor::new("hello", "", false)).await);
    }

    #[tokio::test]
    async fn test_repository_exists_checks_first_page_only() {
        let transport = FakeTransport::new()
            .page(
                REPOS,
                &repositories_json("first", 100),
                Some(r#"<https://api.github.com/user/repos?per_page=100&page=2>; rel="next""#),
            )
            .page(
                "https://api.github.com/user/repos?per_page=100&page=2",
                &repositories_json("second", 5),
                None,
            );
        let client = GitHubClient::new(transport);

        assert!(client.repository_exists("first-0").await);
        assert!(client.repository_exists("first-99").await);
        assert!(!client.repository_exists("first-100").await);
        assert!(!client.repository_exists("second-0").await);
        assert!(client
            .transport()
            .sent(Method::Get)
            .iter()
            .all(|request| request.url == REPOS));
    }

    #[tokio::test]
    async fn test_repository_exists_false_on_error() {
        let client = GitHubClient::new(FakeTransport::new().route(Method::Get, REPOS, 500, ""));
        assert!(!client.repository_exists("anything").await);
    }

    #[tokio::test]
    async fn test_list_repositories_follows_pagination() {
        init();
        let transport = FakeTransport::new()
            .page(
                REPOS,
                &repositories_json("first", 100),
                Some(r#"<https://api.github.com/user/repos?per_page=100&page=2>; rel="next", <https://api.github.com/user/repos?per_page=100&page=2>; rel="last""#),
            )
            .page(
                "https://api.github.com/user/repos?per_page=100&page=2",
                &repositories_json("second", 37),
                Some(r#"<https://api.github.com/user/repos?per_page=100&page=1>; rel="first""#),
            );
        let client = GitHubClient::new(transport);

        let repositories = client.list_repositories().await;
        assert_eq!(repositories.len(), 137);
        assert_eq!(client.transport().sent(Method::Get).len(), 2);

        assert_eq!(repositories[0].name, "first-0");
        assert_eq!(repositories[0].description, "");
        assert!(repositories[0].private);
        assert_eq!(repositories[1].description, "repo 1");
        assert_eq!(repositories[136].name, "second-36");
        assert_eq!(repositories[136].html_url, "https://github.com/octocat/second-36");
    }

    #[tokio::test]
    async fn test_list_repositories_keeps_partial_results() {
        let transport = FakeTransport::new()
            .page(
                REPOS,
                &repositories_json("first", 100),
                Some(r#"<https://api.github.com/user/repos?per_page=100&page=2>; rel="next""#),
            )
            .page(
                "https://api.github.com/user/repos?per_page=100&page=2",
                "[{\"broken\": ",
                Some(r#"<https://api.github.com/user/repos?per_page=100&page=3>; rel="next""#),
            );
        let client = GitHubClient::new(transport);

        assert_eq!(client.list_repositories().await.len(), 100);
        assert_eq!(client.transport().sent(Method::Get).len(), 2);
    }

    #[tokio::test]
    async fn test_list_repositories_stops_on_error_status() {
        let transport = FakeTransport::new().route(Method::Get, REPOS, 401, "");
        let client = GitHubClient::new(transport);
        assert!(client.list_repositories().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_repository() {
        let transport = FakeTransport::new()
            .route(Method::Get, USER, 200, r#"{"login": "octocat"}"#)
            .route(Method::Delete, "https://api.github.com/repos/octocat/old-repo", 204, "");
        let mut client = GitHubClient::new(transport);

        assert!(client.delete_repository("old-repo").await);
        assert!(!client.delete_repository("missing").await);
    }

    #[tokio::test]
    async fn test_delete_repository_without_username_sends_nothing() {
        let mut client = GitHubClient::new(FakeTransport::new().route(Method::Get, USER, 401, ""))
            .with_username_fallback(|| None);

        assert!(!client.delete_repository("old-repo").await);
        assert!(client.transport().sent(Method::Delete).is_empty());
    }

    /// Accept one connection, answer it with `response`, and hand back the request head
    async fn serve_once(
        listener: tokio::net::TcpListener,
        response: &'static str,
    ) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).to_lowercase()
    }

    #[tokio::test]
    async fn test_octocrab_transport_sends_github_headers() {
        init();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 200 OK\r\n\
             content-type: application/json\r\n\
             link: <https://api.github.com/user/repos?page=2>; rel=\"next\"\r\n\
             content-length: 19\r\n\
             connection: close\r\n\r\n\
             {\"login\":\"octocat\"}",
        ));

        let transport = OctocrabTransport::with_base_uri("test-token", &base).unwrap();
        let response = transport
            .send(ApiRequest {
                method: Method::Get,
                url: format!("{base}/user"),
                body: None,
            })
            .await;
        let head = server.await.unwrap();

        assert!(head.starts_with("get /user "), "{head}");
        assert!(head.contains("authorization: bearer test-token\r\n"), "{head}");
        assert!(head.contains("accept: application/vnd.github+json\r\n"), "{head}");
        assert!(head.contains("x-github-api-version: 2022-11-28\r\n"), "{head}");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"login":"octocat"}"#);
        assert_eq!(
            response.link.as_deref().and_then(next_page_link).as_deref(),
            Some("https://api.github.com/user/repos?page=2")
        );
    }

    #[tokio::test]
    async fn test_octocrab_transport_reports_connection_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let transport = OctocrabTransport::with_base_uri("test-token", &base).unwrap();
        let response = transport
            .send(ApiRequest {
                method: Method::Get,
                url: format!("{base}/user"),
                body: None,
            })
            .await;
        assert_eq!(response.status, TRANSPORT_FAILURE);
    }

    /// Requires a real token in GITHUB_TOKEN and performs actual GitHub API calls.
    ///
    /// To run ignored tests locally, use `cargo test -- --ignored`
    #[tokio::test]
    #[ignore = "Don't run this test unless you have a valid GitHub token in the GITHUB_TOKEN environment variable"]
    async fn test_github_authenticate() {
        init();

        let github_token = std::env::var("GITHUB_TOKEN").unwrap();
        let mut client = GitHubClient::connect(&github_token).unwrap();
        assert!(client.authenticate().await);
        assert!(!client.username().await.is_empty());
    }
}
