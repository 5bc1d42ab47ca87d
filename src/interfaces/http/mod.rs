mod auth;
mod error;

pub use auth::AuthenticatedUser;

use crate::application::{AuthUseCase, DatasetUseCase, LoginRequest, RegisterRequest};
use crate::domain::error::{AppError, Result};
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{
    delete, dev::Server, get, middleware, post, web, App, HttpResponse, HttpServer,
};
use futures::TryStreamExt;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub struct HttpState {
    pub auth: Arc<AuthUseCase>,
    pub datasets: Arc<DatasetUseCase>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { status: "ok" })
}

#[post("/auth/register")]
async fn register(
    data: web::Data<HttpState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let response = data.auth.register(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/auth/login")]
async fn login(data: web::Data<HttpState>, req: web::Json<LoginRequest>) -> Result<HttpResponse> {
    let response = data.auth.login(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/upload")]
async fn upload(
    data: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let (filename, content) = read_file_field(payload, data.datasets.max_upload_bytes()).await?;
    info!(
        owner_id = user.0.id,
        filename = %filename,
        bytes = content.len(),
        "Received dataset upload"
    );

    let detail = data.datasets.upload(user.0.id, &filename, &content).await?;
    Ok(HttpResponse::Created().json(detail))
}

#[get("/datasets")]
async fn list_datasets(data: web::Data<HttpState>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let datasets = data.datasets.list(user.0.id).await?;
    Ok(HttpResponse::Ok().json(datasets))
}

#[get("/datasets/{id}")]
async fn get_dataset(
    data: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let detail = data.datasets.detail(user.0.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[delete("/datasets/{id}")]
async fn delete_dataset(
    data: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    data.datasets.delete(user.0.id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/datasets/{id}/summary")]
async fn dataset_summary(
    data: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let summary = data.datasets.summary(user.0.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/datasets/{id}/report")]
async fn dataset_report(
    data: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let dataset_id = path.into_inner();
    let pdf = data.datasets.report(user.0.id, dataset_id).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"equipment_report_{}.pdf\"", dataset_id),
        ))
        .body(pdf))
}

/// Pull the `file` upload out of a multipart form, stopping as soon as it
/// grows past `limit`.
async fn read_file_field(mut payload: Multipart, limit: usize) -> Result<(String, Vec<u8>)> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await.map_err(invalid_form)? {
        // a `file` part without a filename is a plain form value, not an upload
        let filename = field
            .content_disposition()
            .filter(|d| d.get_name() == Some("file"))
            .and_then(|d| d.get_filename())
            .map(|name| name.to_string());

        let filename = match filename {
            Some(name) if file.is_none() => name,
            _ => {
                while field.try_next().await.map_err(invalid_form)?.is_some() {}
                continue;
            }
        };

        let mut content = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(invalid_form)? {
            if content.len() + chunk.len() > limit {
                return Err(AppError::ValidationError(format!(
                    "File exceeds the maximum upload size of {} bytes",
                    limit
                )));
            }
            content.extend_from_slice(&chunk);
        }
        file = Some((filename, content));
    }

    file.ok_or_else(|| AppError::ValidationError("No file provided".to_string()))
}

fn invalid_form(err: actix_multipart::MultipartError) -> AppError {
    AppError::ValidationError(format!("Invalid multipart form: {}", err))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

/// Registers the `/api` routes. Paths are declared without a trailing
/// slash; `NormalizePath::trim` strips it from incoming requests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::scope("/api")
            .service(health)
            .service(register)
            .service(login)
            .service(upload)
            .service(list_datasets)
            .service(get_dataset)
            .service(delete_dataset)
            .service(dataset_summary)
            .service(dataset_report),
    );
}

/// Bind the API server. Returns the server future and the bound address,
/// which differs from the requested one when port 0 is used.
pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<(Server, SocketAddr)> {
    let state = web::Data::new(state);

    let bound = HttpServer::new(move || {
        let cors = Cors::permissive(); // local tool, any origin

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?;

    let addr = bound.addrs().first().copied().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "server bound no address")
    })?;
    info!(%addr, "HTTP API listening");

    Ok((bound.run(), addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{Dataset, DatasetDetail};
    use crate::domain::retention::RetentionPolicy;
    use crate::domain::summary::DatasetSummary;
    use crate::domain::user::AuthResponse;
    use crate::infrastructure::db::connection::init_db;
    use crate::infrastructure::db::{SqliteDatasetRepository, SqliteUserRepository};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use sqlx::SqlitePool;

    const VALID_CSV: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                             Pump-001,Pump,150.5,25.3,45.2\n\
                             Reactor-001,Reactor,0,15.8,180.5\n";
    const BOUNDARY: &str = "----equiviewTestBoundary";

    async fn test_state() -> (web::Data<HttpState>, SqlitePool) {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let users = Arc::new(SqliteUserRepository::new(pool.clone()));
        let datasets = Arc::new(SqliteDatasetRepository::new(pool.clone()));
        let state = HttpState {
            auth: Arc::new(AuthUseCase::new(users)),
            datasets: Arc::new(DatasetUseCase::new(
                datasets,
                RetentionPolicy::default(),
                1024 * 1024,
                50,
            )),
        };
        (web::Data::new(state), pool)
    }

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .wrap(middleware::NormalizePath::trim())
                    .app_data($state.clone())
                    .configure(configure),
            )
            .await
        };
    }

    fn multipart(filename: &str, content: &str) -> (String, String) {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content
        );
        (format!("multipart/form-data; boundary={}", BOUNDARY), body)
    }

    fn upload_request(token: &str, filename: &str, content: &str) -> test::TestRequest {
        let (content_type, body) = multipart(filename, content);
        test::TestRequest::post()
            .uri("/api/upload/")
            .insert_header((header::CONTENT_TYPE, content_type))
            .insert_header((header::AUTHORIZATION, format!("Token {}", token)))
            .set_payload(body)
    }

    fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
        req.insert_header((header::AUTHORIZATION, format!("Token {}", token)))
    }

    fn register_body(username: &str) -> serde_json::Value {
        serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "testpass123"
        })
    }

    macro_rules! register {
        ($app:expr, $username:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/auth/register/")
                .set_json(register_body($username))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let auth: AuthResponse = test::read_body_json(resp).await;
            auth.token
        }};
    }

    #[actix_web::test]
    async fn test_health() {
        let (state, _) = test_state().await;
        let app = init_app!(state);

        let req = test::TestRequest::get().uri("/api/health/").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn test_register_and_login() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");
        assert_eq!(token.len(), 40);

        let req = test::TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(serde_json::json!({"username": "testuser", "password": "testpass123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let auth: AuthResponse = test::read_body_json(resp).await;
        assert_eq!(auth.token, token);
        assert_eq!(auth.user.username, "testuser");

        let req = test::TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(serde_json::json!({"username": "testuser", "password": "nope"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(serde_json::json!({"username": "testuser"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Please provide both username and password");
    }

    #[actix_web::test]
    async fn test_duplicate_registration_is_bad_request() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        register!(app, "testuser");

        let req = test::TestRequest::post()
            .uri("/api/auth/register/")
            .set_json(register_body("testuser"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_upload_valid_csv() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let resp = test::call_service(&app, upload_request(&token, "test.csv", VALID_CSV).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let detail: DatasetDetail = test::read_body_json(resp).await;
        assert_eq!(detail.dataset.filename, "test.csv");
        assert_eq!(detail.dataset.total_count, 2);
        assert_eq!(detail.dataset.avg_flowrate, 75.25);
        assert_eq!(detail.equipment_items.len(), 2);
    }

    #[actix_web::test]
    async fn test_upload_rejections() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let cases = [
            ("bad.csv", "Equipment Name,Type\nPump-001,Pump\n", "Missing columns: Flowrate, Pressure, Temperature"),
            ("empty.csv", "", "CSV file is empty"),
            ("test.txt", VALID_CSV, "File must be a CSV"),
        ];
        for (filename, content, message) in cases {
            let resp = test::call_service(&app, upload_request(&token, filename, content).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{filename}");
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], message);
        }

        let req = authed(test::TestRequest::get().uri("/api/datasets/"), &token).to_request();
        let listed: Vec<Dataset> = test::call_and_read_body_json(&app, req).await;
        assert!(listed.is_empty());
    }

    #[actix_web::test]
    async fn test_upload_without_file_field() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        let req = authed(test::TestRequest::post().uri("/api/upload/"), &token)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No file provided");
    }

    #[actix_web::test]
    async fn test_file_field_without_filename_is_not_an_upload() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            c = VALID_CSV
        );
        let req = authed(test::TestRequest::post().uri("/api/upload/"), &token)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No file provided");
    }

    #[actix_web::test]
    async fn test_seven_uploads_keep_five_newest() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let mut ids = Vec::new();
        for i in 0..7 {
            let req = upload_request(&token, &format!("file{}.csv", i), VALID_CSV).to_request();
            let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;
            ids.push(detail.dataset.id);
        }

        let req = authed(test::TestRequest::get().uri("/api/datasets/"), &token).to_request();
        let listed: Vec<Dataset> = test::call_and_read_body_json(&app, req).await;
        let listed_ids: Vec<i64> = listed.iter().map(|d| d.id).collect();
        let expected: Vec<i64> = ids.iter().rev().take(5).copied().collect();
        assert_eq!(listed_ids, expected);

        let req = authed(test::TestRequest::get().uri(&format!("/api/datasets/{}/", ids[0])), &token)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_requests_without_token_are_unauthorized() {
        let (state, _) = test_state().await;
        let app = init_app!(state);

        let req = test::TestRequest::get().uri("/api/datasets/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = authed(test::TestRequest::get().uri("/api/datasets/"), "0000").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid token.");
    }

    #[actix_web::test]
    async fn test_other_owner_sees_not_found() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let owner = register!(app, "owner");
        let intruder = register!(app, "intruder");

        let req = upload_request(&owner, "test.csv", VALID_CSV).to_request();
        let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;
        let id = detail.dataset.id;

        for uri in [
            format!("/api/datasets/{}/", id),
            format!("/api/datasets/{}/summary/", id),
            format!("/api/datasets/{}/report/", id),
        ] {
            let req = authed(test::TestRequest::get().uri(&uri), &intruder).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }

        let req = authed(test::TestRequest::delete().uri(&format!("/api/datasets/{}/", id)), &intruder)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_delete_removes_equipment_rows() {
        let (state, pool) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let req = upload_request(&token, "test.csv", VALID_CSV).to_request();
        let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;
        let id = detail.dataset.id;

        let req = authed(test::TestRequest::delete().uri(&format!("/api/datasets/{}/", id)), &token)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment WHERE dataset_id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[actix_web::test]
    async fn test_summary_values() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let req = upload_request(&token, "test.csv", VALID_CSV).to_request();
        let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;

        let req = authed(
            test::TestRequest::get().uri(&format!("/api/datasets/{}/summary/", detail.dataset.id)),
            &token,
        )
        .to_request();
        let summary: DatasetSummary = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.avg_flowrate, 75.25);
        assert_eq!(summary.avg_pressure, 20.55);
        assert_eq!(summary.avg_temperature, 112.85);
        assert_eq!(summary.type_distribution.get("Pump"), Some(&1));
        assert_eq!(summary.type_distribution.get("Reactor"), Some(&1));
        assert_eq!(summary.min_values.flowrate, 0.0);
        assert_eq!(summary.max_values.temperature, 180.5);
    }

    #[actix_web::test]
    async fn test_report_is_pdf_attachment() {
        let (state, _) = test_state().await;
        let app = init_app!(state);
        let token = register!(app, "testuser");

        let req = upload_request(&token, "test.csv", VALID_CSV).to_request();
        let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;
        let id = detail.dataset.id;

        let req = authed(test::TestRequest::get().uri(&format!("/api/datasets/{}/report/", id)), &token)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            format!("attachment; filename=\"equipment_report_{}.pdf\"", id).as_str()
        );

        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"%PDF-"));
    }
}
