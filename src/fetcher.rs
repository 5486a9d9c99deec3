// Paginated listing of a user's project records

use anyhow::anyhow;
use std::sync::Arc;

use crate::error::Result;
use crate::http_client::IntraHttpClient;
use crate::models::intra::ProjectUser;
use crate::models::{Me, ProjectRecord};

/// Stop paging after this many pages even if the API keeps answering
pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// Fetches project records for one login
pub struct Fetcher {
    http: Arc<IntraHttpClient>,
    login: Option<String>,
    per_page: u32,
    max_pages: u32,
}

impl Fetcher {
    pub fn new(http: Arc<IntraHttpClient>, login: Option<String>, per_page: u32) -> Self {
        Self {
            http,
            login,
            per_page,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Override the runaway-pagination cap
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Configured login, or the owner of the token via `/v2/me`
    pub async fn resolve_login(&self, token: &str) -> Result<String> {
        if let Some(ref login) = self.login {
            return Ok(login.clone());
        }

        let me: Me = self.http.get_json("/v2/me", &[], token).await?;
        tracing::info!("Resolved login from token owner: {} (id {})", me.login, me.id);
        Ok(me.login)
    }

    /// List every project record, page by page, until an empty page
    pub async fn list_records(&self, token: &str) -> Result<Vec<ProjectRecord>> {
        let login = self.resolve_login(token).await?;
        let path = projects_path(&login)?;
        let mut records = Vec::new();

        for page in 1..=self.max_pages {
            let query = [
                ("page", page.to_string()),
                ("per_page", self.per_page.to_string()),
            ];
            let batch: Vec<ProjectUser> = self.http.get_json(&path, &query, token).await?;

            if batch.is_empty() {
                tracing::debug!("Page {} is empty, pagination done", page);
                break;
            }

            tracing::debug!("Page {}: {} records", page, batch.len());
            records.extend(batch.into_iter().map(ProjectRecord::from));

            if page == self.max_pages {
                tracing::warn!(
                    "Stopped after {} pages without an empty page",
                    self.max_pages
                );
            }
        }

        tracing::info!("Fetched {} project records for {}", records.len(), login);
        Ok(records)
    }
}

/// `/v2/users/{login}/projects_users` with the login percent-encoded as one segment
fn projects_path(login: &str) -> Result<String> {
    let mut url = reqwest::Url::parse("http://localhost/")
        .map_err(|e| anyhow!("Failed to build projects path: {}", e))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Failed to build projects path for {}", login))?
        .clear()
        .extend(["v2", "users", login, "projects_users"]);
    Ok(url.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use mockito::Matcher;
    use serde_json::json;

    fn page_body(prefix: &str, count: usize) -> String {
        let items: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "final_mark": 100,
                    "status": "finished",
                    "validated?": true,
                    "cursus_ids": [21],
                    "project": {"name": format!("{}{:03}", prefix, i)}
                })
            })
            .collect();
        serde_json::Value::Array(items).to_string()
    }

    async fn mock_page(
        server: &mut mockito::Server,
        login: &str,
        page: u32,
        body: String,
    ) -> mockito::Mock {
        server
            .mock("GET", format!("/v2/users/{}/projects_users", login).as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), page.to_string()),
                Matcher::UrlEncoded("per_page".into(), "50".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    fn fetcher(server: &mockito::Server, login: Option<&str>) -> Fetcher {
        let http = IntraHttpClient::new(&server.url(), 5, 3)
            .unwrap()
            .with_base_delay(1);
        Fetcher::new(Arc::new(http), login.map(str::to_string), 50)
    }

    #[tokio::test]
    async fn test_pagination_concatenates_until_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let p1 = mock_page(&mut server, "danjose-", 1, page_body("a", 50)).await;
        let p2 = mock_page(&mut server, "danjose-", 2, page_body("b", 50)).await;
        let p3 = mock_page(&mut server, "danjose-", 3, page_body("c", 12)).await;
        let p4 = mock_page(&mut server, "danjose-", 4, "[]".to_string()).await;

        let records = fetcher(&server, Some("danjose-"))
            .list_records("token")
            .await
            .unwrap();

        assert_eq!(records.len(), 112);
        assert_eq!(records[0].name, "a000");
        assert_eq!(records[50].name, "b000");
        assert_eq!(records[111].name, "c011");
        for mock in [p1, p2, p3, p4] {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_first_page_empty() {
        let mut server = mockito::Server::new_async().await;
        let p1 = mock_page(&mut server, "nobody", 1, "[]".to_string()).await;

        let records = fetcher(&server, Some("nobody"))
            .list_records("token")
            .await
            .unwrap();
        assert!(records.is_empty());
        p1.assert_async().await;
    }

    #[tokio::test]
    async fn test_page_cap_stops_endless_listing() {
        let mut server = mockito::Server::new_async().await;
        let pages = server
            .mock("GET", "/v2/users/danjose-/projects_users")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page_body("p", 2))
            .expect(3)
            .create_async()
            .await;

        let records = fetcher(&server, Some("danjose-"))
            .with_max_pages(3)
            .list_records("token")
            .await
            .unwrap();

        assert_eq!(records.len(), 6);
        pages.assert_async().await;
    }

    #[test]
    fn test_projects_path_encodes_login() {
        assert_eq!(
            projects_path("danjose-").unwrap(),
            "/v2/users/danjose-/projects_users"
        );
        assert_eq!(
            projects_path("a b/c").unwrap(),
            "/v2/users/a%20b%2Fc/projects_users"
        );
    }

    #[tokio::test]
    async fn test_login_resolved_from_me() {
        let mut server = mockito::Server::new_async().await;
        let me = server
            .mock("GET", "/v2/me")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 99, "login": "marvin"}"#)
            .expect(1)
            .create_async()
            .await;
        let p1 = mock_page(&mut server, "marvin", 1, page_body("x", 2)).await;
        let p2 = mock_page(&mut server, "marvin", 2, "[]".to_string()).await;

        let records = fetcher(&server, None).list_records("token").await.unwrap();
        assert_eq!(records.len(), 2);
        me.assert_async().await;
        p1.assert_async().await;
        p2.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_fetch() {
        let mut server = mockito::Server::new_async().await;
        mock_page(&mut server, "danjose-", 1, page_body("a", 50)).await;
        server
            .mock("GET", "/v2/users/danjose-/projects_users")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(403)
            .with_body("Forbidden")
            .expect(1)
            .create_async()
            .await;

        let err = fetcher(&server, Some("danjose-"))
            .list_records("token")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/v2/users/danjose-/projects_users")
            .match_query(Matcher::Any)
            .with_status(502)
            .expect(3)
            .create_async()
            .await;

        let err = fetcher(&server, Some("danjose-"))
            .list_records("token")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Transient { attempts: 3, .. }));
        failing.assert_async().await;
    }
}
