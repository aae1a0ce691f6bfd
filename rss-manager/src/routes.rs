//! RSS 管理服务路由模块

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

/// 创建 RSS 资源管理路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/provider", get(get_provider))
        .route("/api/environments", get(list_environments))
        .route("/api/instances", get(list_all_instances))
        .route(
            "/api/environments/{env}/instances",
            get(list_instances).post(add_instance),
        )
        .route(
            "/api/environments/{env}/instances/{name}",
            get(get_instance).put(update_instance).delete(remove_instance),
        )
        .route(
            "/api/environments/{env}/databases",
            get(list_databases).post(add_database),
        )
        .route(
            "/api/environments/{env}/instances/{instance}/databases/{name}",
            get(get_database).delete(remove_database),
        )
        .route(
            "/api/environments/{env}/instances/{instance}/databases/{name}/exists",
            get(database_exists),
        )
        .route("/api/environments/{env}/users", get(list_users).post(add_user))
        .route(
            "/api/environments/{env}/instances/{instance}/users/{username}",
            get(get_user).put(edit_user).delete(remove_user),
        )
        .route(
            "/api/environments/{env}/instances/{instance}/users/{username}/exists",
            get(user_exists),
        )
        .route(
            "/api/environments/{env}/privileges",
            get(get_privileges).put(update_privileges),
        )
        .route(
            "/api/environments/{env}/attachments",
            get(list_attachments).post(attach_user).delete(detach_user),
        )
        .route(
            "/api/environments/{env}/templates",
            get(list_templates).post(add_template),
        )
        .route(
            "/api/environments/{env}/templates/{name}",
            get(get_template).put(update_template).delete(remove_template),
        )
        .route(
            "/api/environments/{env}/templates/{name}/exists",
            get(template_exists),
        )
        .route(
            "/api/environments/{env}/snapshots",
            post(create_snapshot),
        )
        .route(
            "/api/environments/{env}/datasources",
            post(register_datasource),
        )
        .route("/api/datasources", get(list_datasources))
        .route("/api/datasources/{name}", delete(remove_datasource))
}
