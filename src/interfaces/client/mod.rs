// ============================================================
// HTTP API CLIENT
// ============================================================
// Typed client for the equipment API. Authenticated calls take the
// caller's Session explicitly; the client itself holds no login state.

use crate::domain::dataset::{Dataset, DatasetDetail};
use crate::domain::summary::DatasetSummary;
use crate::domain::user::{AuthResponse, PublicUser};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Debug)]
pub enum ClientError {
    /// Non-2xx response with the server's `error` message.
    Api { status: u16, message: String },
    Transport(String),
    Io(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            ClientError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ClientError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// A logged-in user and the token sent with each request.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Self {
            token: response.token,
            user: response.user,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.header(AUTHORIZATION, format!("Token {}", session.token))
    }

    pub async fn register(
        &self,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> ClientResult<Session> {
        let body = json!({ "username": username, "email": email, "password": password });
        let response = self.http.post(self.url("auth/register/")).json(&body).send().await?;
        let auth: AuthResponse = read_json(response).await?;
        Ok(auth.into())
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Session> {
        let body = json!({ "username": username, "password": password });
        let response = self.http.post(self.url("auth/login/")).json(&body).send().await?;
        let auth: AuthResponse = read_json(response).await?;
        Ok(auth.into())
    }

    pub async fn upload_csv(&self, session: &Session, path: &Path) -> ClientResult<DatasetDetail> {
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        debug!(path = %path.display(), bytes = content.len(), "Uploading CSV");

        let part = Part::bytes(content).file_name(filename).mime_str("text/csv")?;
        let form = Form::new().part("file", part);
        let response = self
            .authed(self.http.post(self.url("upload/")), session)
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn list_datasets(&self, session: &Session) -> ClientResult<Vec<Dataset>> {
        let response = self
            .authed(self.http.get(self.url("datasets/")), session)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn get_dataset(&self, session: &Session, dataset_id: i64) -> ClientResult<DatasetDetail> {
        let response = self
            .authed(self.http.get(self.url(&format!("datasets/{}/", dataset_id))), session)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn delete_dataset(&self, session: &Session, dataset_id: i64) -> ClientResult<()> {
        let response = self
            .authed(self.http.delete(self.url(&format!("datasets/{}/", dataset_id))), session)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn get_summary(&self, session: &Session, dataset_id: i64) -> ClientResult<DatasetSummary> {
        let response = self
            .authed(
                self.http.get(self.url(&format!("datasets/{}/summary/", dataset_id))),
                session,
            )
            .send()
            .await?;
        read_json(response).await
    }

    /// Save the PDF report to `destination`. Returns the number of bytes written.
    pub async fn download_report(
        &self,
        session: &Session,
        dataset_id: i64,
        destination: &Path,
    ) -> ClientResult<usize> {
        let response = self
            .authed(
                self.http.get(self.url(&format!("datasets/{}/report/", dataset_id))),
                session,
            )
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;
        tokio::fs::write(destination, &bytes).await?;
        Ok(bytes.len())
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| fallback_message(status, text));
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

fn fallback_message(status: StatusCode, text: String) -> String {
    if text.trim().is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        text
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    Ok(check_status(response).await?.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{AuthUseCase, DatasetUseCase};
    use crate::domain::retention::RetentionPolicy;
    use crate::infrastructure::db::connection::init_db;
    use crate::infrastructure::db::{SqliteDatasetRepository, SqliteUserRepository};
    use crate::interfaces::http::{start_server, HttpState};
    use std::sync::Arc;

    const VALID_CSV: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                             Pump-001,Pump,150.5,25.3,45.2\n\
                             Reactor-001,Reactor,0,15.8,180.5\n";

    #[actix_web::test]
    async fn test_client_round_trip_against_server() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let state = HttpState {
            auth: Arc::new(AuthUseCase::new(Arc::new(SqliteUserRepository::new(pool.clone())))),
            datasets: Arc::new(DatasetUseCase::new(
                Arc::new(SqliteDatasetRepository::new(pool)),
                RetentionPolicy::default(),
                1024 * 1024,
                50,
            )),
        };
        let (server, addr) = start_server(state, "127.0.0.1", 0).unwrap();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let client = ApiClient::new(format!("http://{}/", addr));
        let session = client
            .register("testuser", Some("test@example.com"), "testpass123")
            .await
            .unwrap();
        assert_eq!(session.user.username, "testuser");

        let err = client.login("testuser", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 401, ref message } if message == "Invalid credentials"));

        let dir = std::env::temp_dir().join(format!("equiview-client-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("test.csv");
        std::fs::write(&csv_path, VALID_CSV).unwrap();

        let detail = client.upload_csv(&session, &csv_path).await.unwrap();
        assert_eq!(detail.dataset.filename, "test.csv");
        assert_eq!(detail.equipment_items.len(), 2);

        let listed = client.list_datasets(&session).await.unwrap();
        assert_eq!(listed.len(), 1);

        let summary = client.get_summary(&session, detail.dataset.id).await.unwrap();
        assert_eq!(summary.avg_temperature, 112.85);

        let pdf_path = dir.join("report.pdf");
        let written = client
            .download_report(&session, detail.dataset.id, &pdf_path)
            .await
            .unwrap();
        assert!(written > 0);
        assert!(std::fs::read(&pdf_path).unwrap().starts_with(b"%PDF-"));

        client.delete_dataset(&session, detail.dataset.id).await.unwrap();
        let err = client.get_dataset(&session, detail.dataset.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));

        let _ = std::fs::remove_dir_all(&dir);
        handle.stop(true).await;
    }
}
