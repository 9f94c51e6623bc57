use anyhow::{Context, Result};
use log::debug;
use reqwest::{Method, StatusCode};
use std::io::Write;

use crate::{
    config::AppConfig,
    http::{ApiClient, Endpoint},
    notify::ConsoleNotifier,
    platform::ConsolePlatform,
    runtime::Runtime,
    session::FileSessionStore,
};

/// What to send, as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub data: Option<String>,
    pub query: Vec<(String, String)>,
    pub auth_endpoint: bool,
}

/// Sends one request with the stored session and prints the response body.
#[tracing::instrument(skip(runtime, config))]
pub async fn request<R: Runtime + Clone>(
    runtime: R,
    config: &AppConfig,
    spec: &RequestSpec,
) -> Result<()> {
    let session = FileSessionStore::in_dir(runtime.clone(), &config.app_dir);
    let client = ApiClient::new(
        config.client_config()?,
        session,
        ConsolePlatform::new(runtime),
        ConsoleNotifier,
    )?;

    let mut builder = client.request(spec.method.clone(), &spec.path);
    if let Some(data) = &spec.data {
        let body: serde_json::Value =
            serde_json::from_str(data).context("--data must be valid JSON")?;
        builder = builder.json(&body);
    }
    if !spec.query.is_empty() {
        builder = builder.query(spec.query.as_slice());
    }
    if spec.auth_endpoint {
        builder = builder.endpoint(Endpoint::Auth);
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = client.read_text(response).await?;
    debug!("Received {} byte(s) with status {}", body.len(), status);

    let stdout = std::io::stdout();
    print_response(&mut stdout.lock(), status, &body)
}

/// Writes a response body, pretty-printing it when it is JSON.
pub(crate) fn print_response<W: Write>(out: &mut W, status: StatusCode, body: &str) -> Result<()> {
    if body.trim().is_empty() {
        writeln!(out, "{}", status)?;
        return Ok(());
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?,
        Err(_) => writeln!(out, "{}", body)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::session::{FileSessionStore, SessionStore, TOKEN_KEY};
    use mockito::{Matcher, Server};
    use std::time::Duration;
    use tempfile::tempdir;

    fn app_config(app_dir: &std::path::Path, base_url: String) -> AppConfig {
        AppConfig {
            app_dir: app_dir.to_path_buf(),
            base_url,
            timeout: Duration::from_secs(5),
            headers: Default::default(),
        }
    }

    fn spec(method: Method, path: &str) -> RequestSpec {
        RequestSpec {
            method,
            path: path.to_string(),
            data: None,
            query: Vec::new(),
            auth_endpoint: false,
        }
    }

    #[test]
    fn test_print_response_pretty_prints_json() {
        let mut out = Vec::new();
        print_response(&mut out, StatusCode::OK, r#"{"id":5}"#).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"id\": 5\n}\n");
    }

    #[test]
    fn test_print_response_raw_and_empty() {
        let mut out = Vec::new();
        print_response(&mut out, StatusCode::OK, "plain text").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "plain text\n");

        let mut out = Vec::new();
        print_response(&mut out, StatusCode::NO_CONTENT, "").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "204 No Content\n");
    }

    #[tokio::test]
    async fn test_request_uses_stored_token() {
        let dir = tempdir().unwrap();
        FileSessionStore::in_dir(RealRuntime, dir.path())
            .set(TOKEN_KEY, "stored-token")
            .unwrap();

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/users?role=admin")
            .match_header("authorization", "Bearer stored-token")
            .match_body(Matcher::Json(serde_json::json!({ "name": "dave" })))
            .with_status(201)
            .with_body(r#"{"id":7}"#)
            .create_async()
            .await;

        let config = app_config(dir.path(), format!("{}/api", server.url()));
        let mut spec = spec(Method::POST, "/users");
        spec.data = Some(r#"{"name":"dave"}"#.to_string());
        spec.query = vec![("role".to_string(), "admin".to_string())];

        request(RealRuntime, &config, &spec).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_rejects_invalid_json_data() {
        let dir = tempdir().unwrap();
        let config = app_config(dir.path(), "http://127.0.0.1:9".to_string());
        let mut spec = spec(Method::POST, "/users");
        spec.data = Some("{oops".to_string());

        let err = request(RealRuntime, &config, &spec).await.unwrap_err();

        assert!(err.to_string().contains("--data"));
    }

    #[tokio::test]
    async fn test_request_expired_session_clears_file() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::in_dir(RealRuntime, dir.path());
        store.set(TOKEN_KEY, "old-token").unwrap();

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/5")
            .with_status(401)
            .create_async()
            .await;

        let config = app_config(dir.path(), server.url());
        let err = request(RealRuntime, &config, &spec(Method::GET, "/users/5"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_request_auth_endpoint_keeps_session() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::in_dir(RealRuntime, dir.path());
        store.set(TOKEN_KEY, "old-token").unwrap();

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/sessions")
            .with_status(401)
            .create_async()
            .await;

        let config = app_config(dir.path(), server.url());
        let mut spec = spec(Method::POST, "/sessions");
        spec.auth_endpoint = true;

        assert!(request(RealRuntime, &config, &spec).await.is_err());
        assert_eq!(
            store.get(TOKEN_KEY).unwrap().as_deref(),
            Some("old-token")
        );
    }
}
