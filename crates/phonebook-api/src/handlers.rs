use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use phonebook_auth::SESSION_TTL_HOURS;
use phonebook_db::{NewPhone, PhoneUpdate};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{AuthUser, TokenSource};
use crate::models::*;
use crate::AppState;

/// Longest phone number accepted, in characters
pub const MAX_PHONE_LEN: usize = 12;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = ApiResponse<HealthResponse>)
    ),
    tag = "system"
)]
pub async fn health_check() -> ApiResponse<HealthResponse> {
    ApiResponse::new(
        StatusCode::OK,
        "health",
        HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<Account>),
        (status = 400, description = "Invalid input or login taken", body = ApiResponse<String>),
        (status = 500, description = "Internal server error", body = ApiResponse<String>)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiResponse<Account>, ApiError> {
    let Json(req) = payload?;

    let user = state.accounts.register(req.into()).await?;

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        "register user",
        user.into(),
    ))
}

/// Log in and receive a session token
///
/// The token is always returned in the body. When the server reads tokens
/// from a cookie, the cookie is set as well.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Session token issued", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Invalid login or password", body = ApiResponse<String>),
        (status = 500, description = "Internal server error", body = ApiResponse<String>)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;

    let issued = state.accounts.login(&req.login, &req.password).await?;

    let cookie = match &state.token_source {
        TokenSource::Cookie { name } => Some(
            HeaderValue::from_str(&format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                name,
                issued.token,
                SESSION_TTL_HOURS * 3600
            ))
            .map_err(|e| ApiError::Internal(format!("invalid session cookie: {}", e)))?,
        ),
        TokenSource::Bearer => None,
    };

    let mut response = ApiResponse::new(
        StatusCode::CREATED,
        "login user",
        LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        },
    )
    .into_response();

    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(response)
}

/// Accounts are self-service: a caller may only address their own record
fn ensure_own_account(caller: AuthUser, id: Uuid) -> Result<(), ApiError> {
    if caller.user_id != id {
        debug!(caller = %caller.user_id, target = %id, "Refused access to another account");
        return Err(ApiError::Forbidden(
            "cannot access another user's account".to_string(),
        ));
    }
    Ok(())
}

/// Create an account
#[utoipa::path(
    post,
    path = "/v1/user",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<Account>),
        (status = 400, description = "Invalid input or login taken", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiResponse<Account>, ApiError> {
    let Json(req) = payload?;

    let user = state.accounts.register(req.into()).await?;
    info!(caller = %caller.user_id, user_id = %user.id, "Account created via API");

    Ok(ApiResponse::new(StatusCode::CREATED, "create user", user.into()))
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/v1/user/{id}",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account", body = ApiResponse<Account>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>),
        (status = 403, description = "Not the caller's account", body = ApiResponse<String>),
        (status = 404, description = "Account not found", body = ApiResponse<String>)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Account>, ApiError> {
    let Path(id) = path?;
    ensure_own_account(caller, id)?;

    let user = state.accounts.get(id).await?;

    Ok(ApiResponse::new(StatusCode::OK, "get user by id", user.into()))
}

/// List accounts visible to the caller
#[utoipa::path(
    get,
    path = "/v1/user",
    params(ListQuery),
    responses(
        (status = 200, description = "Accounts", body = ApiResponse<AccountList>),
        (status = 400, description = "Invalid offset or limit", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<ApiResponse<AccountList>, ApiError> {
    let Query(query) = query?;
    let filter = state.pagination.filter(query, caller.user_id)?;

    let page = state.accounts.list(filter).await?;

    Ok(ApiResponse::new(
        StatusCode::OK,
        "get list user",
        AccountList {
            count: page.count,
            users: page.items.into_iter().map(Account::from).collect(),
        },
    ))
}

/// Replace an account's fields
#[utoipa::path(
    put,
    path = "/v1/user/{id}",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    request_body = UpdateAccountRequest,
    responses(
        (status = 202, description = "Account updated", body = ApiResponse<Account>),
        (status = 400, description = "Invalid input or login taken", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>),
        (status = 403, description = "Not the caller's account", body = ApiResponse<String>),
        (status = 404, description = "Account not found", body = ApiResponse<String>)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<ApiResponse<Account>, ApiError> {
    let Path(id) = path?;
    ensure_own_account(caller, id)?;
    let Json(req) = payload?;

    let user = state.accounts.update(id, req.into()).await?;

    Ok(ApiResponse::new(StatusCode::ACCEPTED, "update user", user.into()))
}

/// Delete an account and its phones
#[utoipa::path(
    delete,
    path = "/v1/user/{id}",
    params(
        ("id" = Uuid, Path, description = "Account ID")
    ),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>),
        (status = 403, description = "Not the caller's account", body = ApiResponse<String>),
        (status = 404, description = "Account not found", body = ApiResponse<String>)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    ensure_own_account(caller, id)?;

    state.accounts.delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn validate_phone(phone: &str) -> Result<(), ApiError> {
    if phone.chars().count() > MAX_PHONE_LEN {
        return Err(ApiError::Validation(format!(
            "invalid phone number: at most {} characters",
            MAX_PHONE_LEN
        )));
    }
    Ok(())
}

/// Fetch a phone, hiding other users' phones behind 404
async fn owned_phone(state: &AppState, caller: AuthUser, id: Uuid) -> Result<Phone, ApiError> {
    let phone = state.phones.get_by_id(id).await?;

    if phone.user_id != caller.user_id {
        debug!(caller = %caller.user_id, phone_id = %id, "Phone belongs to another account");
        return Err(ApiError::NotFound("record not found".to_string()));
    }

    Ok(phone.into())
}

/// Add a phone number to the caller's account
#[utoipa::path(
    post,
    path = "/v1/user/phone",
    request_body = CreatePhoneRequest,
    responses(
        (status = 201, description = "Phone created", body = ApiResponse<Phone>),
        (status = 400, description = "Invalid phone number", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>)
    ),
    tag = "phones"
)]
pub async fn create_phone(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    payload: Result<Json<CreatePhoneRequest>, JsonRejection>,
) -> Result<ApiResponse<Phone>, ApiError> {
    let Json(req) = payload?;
    validate_phone(&req.phone)?;

    let id = state
        .phones
        .create(NewPhone {
            user_id: caller.user_id,
            phone: req.phone,
            description: req.description,
            is_fax: req.is_fax,
        })
        .await?;

    info!(user_id = %caller.user_id, phone_id = %id, "Phone created");

    let phone = owned_phone(&state, caller, id).await?;

    Ok(ApiResponse::new(StatusCode::CREATED, "create phone", phone))
}

/// Get one of the caller's phones
#[utoipa::path(
    get,
    path = "/v1/user/phone/{id}",
    params(
        ("id" = Uuid, Path, description = "Phone ID")
    ),
    responses(
        (status = 200, description = "Phone", body = ApiResponse<Phone>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>),
        (status = 404, description = "Phone not found", body = ApiResponse<String>)
    ),
    tag = "phones"
)]
pub async fn get_phone(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<Phone>, ApiError> {
    let Path(id) = path?;

    let phone = owned_phone(&state, caller, id).await?;

    Ok(ApiResponse::new(StatusCode::OK, "get phone by id", phone))
}

/// List the caller's phones
#[utoipa::path(
    get,
    path = "/v1/user/phone",
    params(ListQuery),
    responses(
        (status = 200, description = "Phones", body = ApiResponse<PhoneList>),
        (status = 400, description = "Invalid offset or limit", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>)
    ),
    tag = "phones"
)]
pub async fn list_phones(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<ApiResponse<PhoneList>, ApiError> {
    let Query(query) = query?;
    let filter = state.pagination.filter(query, caller.user_id)?;

    let page = state.phones.get_list(filter).await?;

    Ok(ApiResponse::new(
        StatusCode::OK,
        "get list phone",
        PhoneList {
            count: page.count,
            phones: page.items.into_iter().map(Phone::from).collect(),
        },
    ))
}

/// Replace one of the caller's phones
#[utoipa::path(
    put,
    path = "/v1/user/phone/{id}",
    params(
        ("id" = Uuid, Path, description = "Phone ID")
    ),
    request_body = UpdatePhoneRequest,
    responses(
        (status = 202, description = "Phone updated", body = ApiResponse<Phone>),
        (status = 400, description = "Invalid phone number", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>),
        (status = 404, description = "Phone not found", body = ApiResponse<String>)
    ),
    tag = "phones"
)]
pub async fn update_phone(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePhoneRequest>, JsonRejection>,
) -> Result<ApiResponse<Phone>, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    validate_phone(&req.phone)?;

    let affected = state
        .phones
        .update(PhoneUpdate {
            id,
            user_id: caller.user_id,
            phone: req.phone,
            description: req.description,
            is_fax: req.is_fax,
        })
        .await?;

    if affected == 0 {
        return Err(ApiError::NotFound("record not found".to_string()));
    }

    let phone = owned_phone(&state, caller, id).await?;

    Ok(ApiResponse::new(StatusCode::ACCEPTED, "update phone", phone))
}

/// Delete one of the caller's phones
#[utoipa::path(
    delete,
    path = "/v1/user/phone/{id}",
    params(
        ("id" = Uuid, Path, description = "Phone ID")
    ),
    responses(
        (status = 204, description = "Phone deleted"),
        (status = 401, description = "Not authenticated", body = ApiResponse<String>),
        (status = 404, description = "Phone not found", body = ApiResponse<String>)
    ),
    tag = "phones"
)]
pub async fn delete_phone(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;

    if state.phones.delete(id, caller.user_id).await? == 0 {
        return Err(ApiError::NotFound("record not found".to_string()));
    }

    info!(user_id = %caller.user_id, phone_id = %id, "Phone deleted");

    Ok(StatusCode::NO_CONTENT)
}
