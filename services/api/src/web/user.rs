//! services/api/src/web/user.rs

use axum::{Extension, Json};
use docchat_core::Identity;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub auth_provider: String,
    pub is_account_verified: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDataResponse {
    pub success: bool,
    pub user_data: UserData,
}

/// GET /user/me - The signed-in user's public profile
#[utoipa::path(
    get,
    path = "/api/user/me",
    responses(
        (status = 200, description = "Profile of the token's owner", body = UserDataResponse),
        (status = 401, description = "Missing, invalid or expired access token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(Extension(identity): Extension<Identity>) -> Json<UserDataResponse> {
    Json(UserDataResponse {
        success: true,
        user_data: UserData {
            id: identity.id,
            name: identity.name,
            email: identity.email,
            photo: identity.photo,
            auth_provider: identity.auth_provider.as_str().to_string(),
            is_account_verified: identity.is_account_verified,
        },
    })
}
