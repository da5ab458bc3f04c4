// handlers/attendance.rs - GET /api/attendance/stats handler

use axum::{
    extract::{Request, State},
    response::Response,
};
use serde_json::{json, Value};

use crate::proxy::{ProxyEndpoint, QueryPolicy};
use crate::state::AppState;

/// Stats shown before a student is selected.
pub fn empty_stats() -> Value {
    json!({
        "totalLessons": 0,
        "presentCount": 0,
        "absentCount": 0,
        "lateCount": 0,
        "attendanceRate": 0
    })
}

/// `studentId` only selects the upstream path; without it nothing is fetched.
pub const ATTENDANCE_STATS: ProxyEndpoint = ProxyEndpoint {
    name: "attendance.stats",
    upstream: "/api/attendance/students/{studentId}/stats",
    query: QueryPolicy::ExcludeConsumed,
    missing_param: Some(empty_stats),
    error_message: "Devamsızlık bilgisi alınamadı",
    ..ProxyEndpoint::DEFAULTS
};

pub async fn stats(State(state): State<AppState>, req: Request) -> Response {
    ATTENDANCE_STATS.forward(&state, &[], req).await
}
