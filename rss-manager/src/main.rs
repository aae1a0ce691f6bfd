//! RSS 资源管理服务
//!
//! 提供多环境数据库资源管理功能，包括：
//! - RSS 实例的增删改查
//! - 数据库与数据库用户管理
//! - 权限模板与用户挂载
//! - 数据源注册与快照

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use rss_manager::{handlers, routes, AppState};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "rss-manager";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RSS 管理服务 API",
        version = "0.1.0",
        description = "多环境数据库资源管理微服务"
    ),
    paths(
        handlers::health_check,
        handlers::get_provider,
        handlers::list_environments,
        handlers::list_all_instances,
        handlers::list_instances,
        handlers::add_instance,
        handlers::get_instance,
        handlers::update_instance,
        handlers::remove_instance,
        handlers::list_databases,
        handlers::add_database,
        handlers::get_database,
        handlers::remove_database,
        handlers::database_exists,
        handlers::list_users,
        handlers::add_user,
        handlers::get_user,
        handlers::edit_user,
        handlers::remove_user,
        handlers::user_exists,
        handlers::get_privileges,
        handlers::update_privileges,
        handlers::list_attachments,
        handlers::attach_user,
        handlers::detach_user,
        handlers::list_templates,
        handlers::add_template,
        handlers::get_template,
        handlers::update_template,
        handlers::remove_template,
        handlers::template_exists,
        handlers::create_snapshot,
        handlers::list_datasources,
        handlers::register_datasource,
        handlers::remove_datasource,
    ),
    components(schemas(
        common::models::RssInstance,
        common::models::RssInstanceRequest,
        common::models::Database,
        common::models::CreateDatabaseRequest,
        common::models::DatabaseUser,
        common::models::DatabaseUserRequest,
        common::models::EngineType,
        common::models::Privilege,
        common::models::PrivilegeSet,
        common::models::PrivilegeTemplate,
        common::models::PrivilegeTemplateEntry,
        common::models::PrivilegeTemplateRequest,
        common::models::UpdatePrivilegesRequest,
        common::models::UserDatabaseEntry,
        common::models::AttachUserRequest,
        common::models::DetachUserRequest,
        common::models::DatasourceDescriptor,
        common::models::RegisterDatasourceRequest,
        common::models::Snapshot,
        common::models::SnapshotRequest,
        handlers::HealthResponse,
        handlers::ProviderInfo,
        handlers::UserAttachments,
        handlers::EditUserRequest,
    )),
    tags(
        (name = "environments", description = "环境端点"),
        (name = "instances", description = "RSS 实例端点"),
        (name = "databases", description = "数据库端点"),
        (name = "users", description = "数据库用户端点"),
        (name = "privileges", description = "权限端点"),
        (name = "attachments", description = "用户挂载端点"),
        (name = "templates", description = "权限模板端点"),
        (name = "snapshots", description = "快照端点"),
        (name = "datasources", description = "数据源端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 创建应用状态（读取环境配置文件）
    let state = AppState::from_config(config.clone())
        .await
        .with_context(|| format!("加载 RSS 配置失败: {}", config.rss_config_path.display()))?;

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_address();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr).await.context("绑定地址失败")?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            // Only set if not already set by the environment
            if std::env::var(key).is_err() {
                std::env::set_var(key, value.trim().trim_matches('"'));
            }
        }
    }
}
