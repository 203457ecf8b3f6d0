use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentinel_core::error::SentinelError;
use serde::Serialize;

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            details: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SentinelError> for ApiError {
    fn from(err: SentinelError) -> Self {
        match &err {
            e if e.is_client_error() => Self::bad_request(err.to_string()),
            SentinelError::NoImagery { layer, hint } => {
                Self::not_found(format!("Nenhuma imagem encontrada para {}", layer))
                    .with_details(hint.clone())
            }
            SentinelError::MissingStatistic { .. } => {
                Self::not_found("Dados insuficientes para a área e o período")
                    .with_details(err.to_string())
            }
            SentinelError::DatasetNotFound { name } => {
                Self::not_found(format!("Arquivo não encontrado: {}", name))
            }
            SentinelError::ConfigMissing { key } => {
                Self::unavailable(format!("Serviço não configurado: defina {}", key))
            }
            SentinelError::GeneratorUnavailable { .. } | SentinelError::RateLimited { .. } => {
                Self::unavailable("Modelo de linguagem indisponível").with_details(err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "Request failed");
                Self::internal("Internal error").with_details(err.to_string())
            }
        }
    }
}
