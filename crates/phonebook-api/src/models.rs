//! Request and response bodies

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use phonebook_db::entities::{phone, user};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::accounts::NewAccount;

/// Envelope wrapping every JSON response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// HTTP status code, repeated in the body
    pub status: u16,
    /// Short description of the outcome
    pub description: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, description: impl Into<String>, data: T) -> Self {
        Self {
            status: status.as_u16(),
            description: description.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Registration (and `POST /v1/user`) request
#[derive(Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    /// At least 6 characters, unique
    pub login: String,
    /// At least 6 characters
    pub password: String,
    #[serde(default)]
    pub age: i32,
}

impl From<RegisterRequest> for NewAccount {
    fn from(req: RegisterRequest) -> Self {
        Self {
            name: req.name,
            login: req.login,
            password: req.password,
            age: req.age,
        }
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Session token issued on login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Signed session token
    pub token: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Full replacement of an account's fields
#[derive(Clone, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub name: String,
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub age: i32,
}

impl From<UpdateAccountRequest> for NewAccount {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            name: req.name,
            login: req.login,
            password: req.password,
            age: req.age,
        }
    }
}

/// Account as returned by the API (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub login: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for Account {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            login: model.login,
            age: model.age,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountList {
    /// Total matching accounts, ignoring pagination
    pub count: u64,
    pub users: Vec<Account>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePhoneRequest {
    /// Phone number, at most 12 characters
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_fax: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePhoneRequest {
    /// Phone number, at most 12 characters
    pub phone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_fax: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Phone {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone: String,
    pub description: String,
    pub is_fax: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<phone::Model> for Phone {
    fn from(model: phone::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            phone: model.phone,
            description: model.description,
            is_fax: model.is_fax,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhoneList {
    /// Total matching phones, ignoring pagination
    pub count: u64,
    pub phones: Vec<Phone>,
}

/// Pagination and search for list endpoints.
///
/// `offset` and `limit` stay strings so an unparsable value can be reported
/// as such instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Rows to skip (default 0)
    pub offset: Option<String>,
    /// Page size (default 10)
    pub limit: Option<String>,
    /// Substring filter
    pub search: Option<String>,
}
