// handlers/classes.rs - classes, class rosters and student profiles

use axum::{
    extract::{Path, Request, State},
    response::Response,
};

use crate::proxy::ProxyEndpoint;
use crate::state::AppState;

pub const CLASSES: ProxyEndpoint = ProxyEndpoint {
    name: "classes",
    upstream: "/api/classes",
    ..ProxyEndpoint::DEFAULTS
};

pub const CLASS_STUDENTS: ProxyEndpoint = ProxyEndpoint {
    name: "classes.students",
    upstream: "/api/classes/{id}/students",
    ..ProxyEndpoint::DEFAULTS
};

pub const STUDENT: ProxyEndpoint = ProxyEndpoint {
    name: "students.item",
    upstream: "/api/students/{id}",
    ..ProxyEndpoint::DEFAULTS
};

/// GET /api/classes
pub async fn list(State(state): State<AppState>, req: Request) -> Response {
    CLASSES.forward(&state, &[], req).await
}

/// GET /api/classes/:id/students
pub async fn students(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    CLASS_STUDENTS.forward(&state, &[("id", id)], req).await
}

/// GET|PATCH /api/students/:id
pub async fn student(State(state): State<AppState>, Path(id): Path<String>, req: Request) -> Response {
    STUDENT.forward(&state, &[("id", id)], req).await
}
