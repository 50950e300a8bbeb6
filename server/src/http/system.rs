use axum::Json;

use super::schema::HealthResponse;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
