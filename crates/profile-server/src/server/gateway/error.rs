use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use profile_core::Error;
use serde::Serialize;
use tonic::Code;

/// HTTP status a gRPC code is reported with by the gateway.
const fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::InvalidArgument | Code::OutOfRange | Code::FailedPrecondition => {
            StatusCode::BAD_REQUEST
        }
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::Cancelled | Code::Unknown | Code::Internal | Code::DataLoss => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: i32,
    message: String,
}

/// A service [`Error`] rendered as `{"code": <grpc code>, "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = tonic::Status::from(self.0);
        let body = ErrorBody {
            code: status.code() as i32,
            message: status.message().to_owned(),
        };
        (http_status(status.code()), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_onto_http_statuses() {
        let cases = [
            (Error::invalid_argument("bad"), StatusCode::BAD_REQUEST),
            (Error::NotFound { id: 1 }, StatusCode::NOT_FOUND),
            (
                Error::Storage {
                    op: "insert",
                    cause: "boom".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (Error::RowCount { op: "update", rows: 3 }, StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Unimplemented { method: "Replace" }, StatusCode::NOT_IMPLEMENTED),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
