// Token endpoint exchanges

use chrono::Utc;

use super::types::{Credential, GrantType, OAuthErrorBody, TokenResponse};
use crate::error::{Result, SyncError};
use crate::http_client::IntraHttpClient;

/// Token endpoint path
pub const TOKEN_PATH: &str = "/oauth/token";

/// OAuth application identity
#[derive(Debug, Clone)]
pub struct ClientAuth<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

/// Exchange an authorization code captured by the loopback callback
pub async fn authorization_code(
    http: &IntraHttpClient,
    client: &ClientAuth<'_>,
    code: &str,
    redirect_uri: &str,
) -> Result<Credential> {
    tracing::info!("Exchanging authorization code...");
    request_token(
        http,
        GrantType::AuthorizationCode,
        &[
            ("client_id", client.client_id),
            ("client_secret", client.client_secret),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ],
    )
    .await
}

/// Obtain an application token
pub async fn client_credentials(http: &IntraHttpClient, client: &ClientAuth<'_>) -> Result<Credential> {
    tracing::info!("Requesting token via client credentials...");
    request_token(
        http,
        GrantType::ClientCredentials,
        &[
            ("client_id", client.client_id),
            ("client_secret", client.client_secret),
        ],
    )
    .await
}

/// Renew a user token
pub async fn refresh_token(
    http: &IntraHttpClient,
    client: &ClientAuth<'_>,
    refresh_token: &str,
) -> Result<Credential> {
    tracing::info!("Refreshing access token...");
    request_token(
        http,
        GrantType::RefreshToken,
        &[
            ("client_id", client.client_id),
            ("client_secret", client.client_secret),
            ("refresh_token", refresh_token),
        ],
    )
    .await
}

async fn request_token(
    http: &IntraHttpClient,
    grant: GrantType,
    params: &[(&str, &str)],
) -> Result<Credential> {
    let mut form = vec![("grant_type", grant.as_str())];
    form.extend_from_slice(params);

    let response: TokenResponse = match http.post_form(TOKEN_PATH, &form).await {
        Ok(response) => response,
        Err(SyncError::Api { status, message }) if (400..500).contains(&status) => {
            // Doorkeeper answers with {"error": ..., "error_description": ...}
            let detail = match serde_json::from_str::<OAuthErrorBody>(&message) {
                Ok(body) => match body.error_description {
                    Some(desc) => format!("{} ({})", body.error, desc),
                    None => body.error,
                },
                Err(_) => message,
            };
            tracing::error!(grant = grant.as_str(), status, "Token request rejected: {}", detail);
            return Err(SyncError::Auth(format!(
                "{} grant rejected: {} - {}",
                grant.as_str(),
                status,
                detail
            )));
        }
        Err(e) => return Err(e),
    };

    if response.access_token.is_empty() {
        return Err(SyncError::Auth(format!(
            "{} response does not contain access_token",
            grant.as_str()
        )));
    }

    let credential = Credential::from_response(response, Utc::now());
    match credential.expires_at {
        Some(exp) => tracing::info!(
            "Token obtained via {}, expires: {}",
            grant.as_str(),
            exp.to_rfc3339()
        ),
        None => tracing::info!("Token obtained via {}", grant.as_str()),
    }

    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const CLIENT: ClientAuth<'static> = ClientAuth {
        client_id: "uid",
        client_secret: "secret",
    };

    fn http(server: &mockito::Server) -> IntraHttpClient {
        IntraHttpClient::new(&server.url(), 5, 2)
            .unwrap()
            .with_base_delay(1)
    }

    #[tokio::test]
    async fn test_client_credentials_exchange() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "uid".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"app-token","token_type":"bearer","expires_in":7200,"scope":"public","created_at":1700000000}"#)
            .create_async()
            .await;

        let cred = client_credentials(&http(&server), &CLIENT).await.unwrap();
        assert_eq!(cred.access_token, "app-token");
        assert!(cred.refresh_token.is_none());
        assert!(cred.expires_at.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_token_exchange() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "old-refresh".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"fresh","refresh_token":"new-refresh","expires_in":7200}"#)
            .create_async()
            .await;

        let cred = refresh_token(&http(&server), &CLIENT, "old-refresh").await.unwrap();
        assert_eq!(cred.access_token, "fresh");
        assert_eq!(cred.refresh_token.as_deref(), Some("new-refresh"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authorization_code_exchange_sends_redirect_uri() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "http://localhost:8080/callback".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"user-token","refresh_token":"r","expires_in":7200}"#)
            .create_async()
            .await;

        let cred = authorization_code(
            &http(&server),
            &CLIENT,
            "the-code",
            "http://localhost:8080/callback",
        )
        .await
        .unwrap();
        assert_eq!(cred.access_token, "user-token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_grant_maps_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", TOKEN_PATH)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#)
            .create_async()
            .await;

        let err = client_credentials(&http(&server), &CLIENT).await.unwrap_err();
        match err {
            SyncError::Auth(msg) => {
                assert!(msg.contains("invalid_client"));
                assert!(msg.contains("Client authentication failed"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_access_token_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":""}"#)
            .create_async()
            .await;

        let err = client_credentials(&http(&server), &CLIENT).await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }
}
