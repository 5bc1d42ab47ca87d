use crate::domain::error::AppError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error"
        } else {
            self.message()
        };
        HttpResponse::build(status).json(ErrorBody { error: message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_client_errors_carry_message() {
        let err = AppError::ValidationError("CSV file is empty".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"CSV file is empty"}"#);
    }

    #[actix_web::test]
    async fn test_storage_errors_are_hidden() {
        let err = AppError::DatabaseError("disk I/O error".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"Internal server error"}"#);
    }
}
