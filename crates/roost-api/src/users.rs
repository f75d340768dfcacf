use axum::extract::State;

use roost_types::models::User;

use crate::convert::{self, parse_id};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::state::{AppState, blocking};

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id = parse_id(&user_id, "User not found")?.to_string();
    let row = blocking(&state, move |db| {
        db.get_user_by_id(&user_id)?
            .ok_or(ApiError::NotFound("User not found"))
    })
    .await?;
    Ok(Json(convert::user(row)))
}
