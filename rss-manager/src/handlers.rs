//! Handler模块

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use common::errors::AppError;
use common::models::{
    AttachUserRequest, CreateDatabaseRequest, Database, DatabaseUser, DatabaseUserRequest,
    DatasourceDescriptor, DetachUserRequest, EngineType, PrivilegeSet, PrivilegeTemplate,
    PrivilegeTemplateRequest, RegisterDatasourceRequest, RssInstance, RssInstanceRequest, Snapshot,
    SnapshotRequest, UpdatePrivilegesRequest, UserDatabaseEntry,
};
use common::response::ApiResponse;

use crate::state::AppState;

const SERVICE: &str = "rss-manager";

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE)))
}

/// 健康检查响应
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// RSS 提供方信息
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    pub provider: String,
    pub environments: Vec<String>,
}

/// 数据库上的已挂载用户与可挂载用户
#[derive(Debug, Serialize, ToSchema)]
pub struct UserAttachments {
    pub attached: Vec<DatabaseUser>,
    pub available: Vec<DatabaseUser>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EngineQuery {
    /// 数据库引擎类型，如 mysql
    pub engine: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PrivilegeQuery {
    pub instance: String,
    pub database: String,
    pub username: String,
    pub engine: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttachmentQuery {
    pub instance: String,
    pub database: String,
    pub engine: String,
}

/// 修改数据库用户请求
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EditUserRequest {
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// 健康检查
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "服务健康", body = ApiResponse<HealthResponse>))
)]
pub async fn health_check() -> ApiResult<HealthResponse> {
    ok(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE.to_string(),
        timestamp: Utc::now(),
    })
}

/// 获取 RSS 提供方及环境列表
#[utoipa::path(
    get,
    path = "/api/provider",
    tag = "environments",
    responses((status = 200, description = "提供方信息", body = ApiResponse<ProviderInfo>))
)]
pub async fn get_provider(State(state): State<AppState>) -> ApiResult<ProviderInfo> {
    ok(ProviderInfo {
        provider: state.manager.get_rss_provider().to_string(),
        environments: state.manager.get_environments().into_iter().collect(),
    })
}

/// 列出所有环境
#[utoipa::path(
    get,
    path = "/api/environments",
    tag = "environments",
    responses((status = 200, description = "环境名称列表", body = ApiResponse<Vec<String>>))
)]
pub async fn list_environments(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    ok(state.manager.get_environments().into_iter().collect())
}

/// 列出所有环境中的 RSS 实例
#[utoipa::path(
    get,
    path = "/api/instances",
    tag = "instances",
    responses((status = 200, description = "全部 RSS 实例", body = ApiResponse<Vec<RssInstance>>))
)]
pub async fn list_all_instances(State(state): State<AppState>) -> ApiResult<Vec<RssInstance>> {
    ok(state.manager.get_rss_instances_list())
}

/// 列出环境中的 RSS 实例
#[utoipa::path(
    get,
    path = "/api/environments/{env}/instances",
    tag = "instances",
    params(("env" = String, Path, description = "环境名称")),
    responses(
        (status = 200, description = "RSS 实例列表", body = ApiResponse<Vec<RssInstance>>),
        (status = 404, description = "环境未找到")
    )
)]
pub async fn list_instances(
    State(state): State<AppState>,
    Path(env): Path<String>,
) -> ApiResult<Vec<RssInstance>> {
    ok(state.manager.get_rss_instances(&env)?)
}

/// 添加 RSS 实例
#[utoipa::path(
    post,
    path = "/api/environments/{env}/instances",
    tag = "instances",
    params(("env" = String, Path, description = "环境名称")),
    request_body = RssInstanceRequest,
    responses(
        (status = 200, description = "RSS 实例已添加", body = ApiResponse<RssInstance>),
        (status = 403, description = "无权限"),
        (status = 409, description = "实例已存在")
    )
)]
pub async fn add_instance(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<RssInstanceRequest>,
) -> ApiResult<RssInstance> {
    let instance = req.into_instance(&env)?;
    ok(state.manager.add_rss_instance(&env, instance).await?)
}

/// 获取 RSS 实例
#[utoipa::path(
    get,
    path = "/api/environments/{env}/instances/{name}",
    tag = "instances",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("name" = String, Path, description = "实例名称")
    ),
    responses(
        (status = 200, description = "RSS 实例", body = ApiResponse<RssInstance>),
        (status = 404, description = "实例未找到")
    )
)]
pub async fn get_instance(
    State(state): State<AppState>,
    Path((env, name)): Path<(String, String)>,
) -> ApiResult<RssInstance> {
    ok(state.manager.get_rss_instance(&env, &name)?)
}

/// 修改 RSS 实例，可迁移到其他环境
#[utoipa::path(
    put,
    path = "/api/environments/{env}/instances/{name}",
    tag = "instances",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("name" = String, Path, description = "实例名称")
    ),
    request_body = RssInstanceRequest,
    responses(
        (status = 200, description = "RSS 实例已修改", body = ApiResponse<RssInstance>),
        (status = 409, description = "配置定义的实例不可修改")
    )
)]
pub async fn update_instance(
    State(state): State<AppState>,
    Path((env, name)): Path<(String, String)>,
    Json(req): Json<RssInstanceRequest>,
) -> ApiResult<RssInstance> {
    let instance = req.into_instance(&env)?;
    ok(state.manager.update_rss_instance(&env, &name, instance).await?)
}

/// 删除 RSS 实例
#[utoipa::path(
    delete,
    path = "/api/environments/{env}/instances/{name}",
    tag = "instances",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("name" = String, Path, description = "实例名称")
    ),
    responses(
        (status = 200, description = "RSS 实例已删除"),
        (status = 409, description = "配置定义的实例不可删除")
    )
)]
pub async fn remove_instance(
    State(state): State<AppState>,
    Path((env, name)): Path<(String, String)>,
) -> ApiResult<()> {
    state.manager.remove_rss_instance(&env, &name).await?;
    ok(())
}

/// 列出环境中的数据库
#[utoipa::path(
    get,
    path = "/api/environments/{env}/databases",
    tag = "databases",
    params(("env" = String, Path, description = "环境名称")),
    responses((status = 200, description = "数据库列表", body = ApiResponse<Vec<Database>>))
)]
pub async fn list_databases(
    State(state): State<AppState>,
    Path(env): Path<String>,
) -> ApiResult<Vec<Database>> {
    ok(state.manager.get_databases(&env).await?)
}

/// 创建数据库
#[utoipa::path(
    post,
    path = "/api/environments/{env}/databases",
    tag = "databases",
    params(("env" = String, Path, description = "环境名称")),
    request_body = CreateDatabaseRequest,
    responses(
        (status = 200, description = "数据库已创建", body = ApiResponse<Database>),
        (status = 502, description = "数据库服务器错误")
    )
)]
pub async fn add_database(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<CreateDatabaseRequest>,
) -> ApiResult<Database> {
    let database = req.into_database()?;
    ok(state.manager.add_database(&env, database).await?)
}

/// 获取数据库
#[utoipa::path(
    get,
    path = "/api/environments/{env}/instances/{instance}/databases/{name}",
    tag = "databases",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("instance" = String, Path, description = "实例名称"),
        ("name" = String, Path, description = "数据库名称"),
        EngineQuery
    ),
    responses(
        (status = 200, description = "数据库", body = ApiResponse<Database>),
        (status = 404, description = "数据库未找到")
    )
)]
pub async fn get_database(
    State(state): State<AppState>,
    Path((env, instance, name)): Path<(String, String, String)>,
    Query(query): Query<EngineQuery>,
) -> ApiResult<Database> {
    let engine = EngineType::clean(&query.engine)?;
    ok(state.manager.get_database(&env, &instance, &name, engine).await?)
}

/// 删除数据库
#[utoipa::path(
    delete,
    path = "/api/environments/{env}/instances/{instance}/databases/{name}",
    tag = "databases",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("instance" = String, Path, description = "实例名称"),
        ("name" = String, Path, description = "数据库名称"),
        EngineQuery
    ),
    responses((status = 200, description = "数据库已删除"))
)]
pub async fn remove_database(
    State(state): State<AppState>,
    Path((env, instance, name)): Path<(String, String, String)>,
    Query(query): Query<EngineQuery>,
) -> ApiResult<()> {
    let engine = EngineType::clean(&query.engine)?;
    state.manager.remove_database(&env, &instance, &name, engine).await?;
    ok(())
}

/// 判断数据库是否存在
#[utoipa::path(
    get,
    path = "/api/environments/{env}/instances/{instance}/databases/{name}/exists",
    tag = "databases",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("instance" = String, Path, description = "实例名称"),
        ("name" = String, Path, description = "数据库名称"),
        EngineQuery
    ),
    responses((status = 200, description = "是否存在", body = ApiResponse<bool>))
)]
pub async fn database_exists(
    State(state): State<AppState>,
    Path((env, instance, name)): Path<(String, String, String)>,
    Query(query): Query<EngineQuery>,
) -> ApiResult<bool> {
    let engine = EngineType::clean(&query.engine)?;
    ok(state.manager.database_exists(&env, &instance, &name, engine).await?)
}

/// 列出环境中的数据库用户
#[utoipa::path(
    get,
    path = "/api/environments/{env}/users",
    tag = "users",
    params(("env" = String, Path, description = "环境名称")),
    responses((status = 200, description = "数据库用户列表", body = ApiResponse<Vec<DatabaseUser>>))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Path(env): Path<String>,
) -> ApiResult<Vec<DatabaseUser>> {
    let mut users: Vec<_> = state.manager.get_database_users(&env).await?.into_iter().collect();
    users.sort_by(|a, b| {
        (&a.rss_instance_name, &a.username).cmp(&(&b.rss_instance_name, &b.username))
    });
    ok(users)
}

/// 创建数据库用户
#[utoipa::path(
    post,
    path = "/api/environments/{env}/users",
    tag = "users",
    params(("env" = String, Path, description = "环境名称")),
    request_body = DatabaseUserRequest,
    responses((status = 200, description = "数据库用户已创建", body = ApiResponse<DatabaseUser>))
)]
pub async fn add_user(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<DatabaseUserRequest>,
) -> ApiResult<DatabaseUser> {
    let user = req.into_user()?;
    ok(state.manager.add_database_user(&env, user).await?)
}

/// 获取数据库用户
#[utoipa::path(
    get,
    path = "/api/environments/{env}/instances/{instance}/users/{username}",
    tag = "users",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("instance" = String, Path, description = "实例名称"),
        ("username" = String, Path, description = "用户名"),
        EngineQuery
    ),
    responses(
        (status = 200, description = "数据库用户", body = ApiResponse<DatabaseUser>),
        (status = 404, description = "用户未找到")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path((env, instance, username)): Path<(String, String, String)>,
    Query(query): Query<EngineQuery>,
) -> ApiResult<DatabaseUser> {
    let engine = EngineType::clean(&query.engine)?;
    ok(state.manager.get_database_user(&env, &instance, &username, engine).await?)
}

/// 修改数据库用户密码
#[utoipa::path(
    put,
    path = "/api/environments/{env}/instances/{instance}/users/{username}",
    tag = "users",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("instance" = String, Path, description = "实例名称"),
        ("username" = String, Path, description = "用户名"),
        EngineQuery
    ),
    request_body = EditUserRequest,
    responses((status = 200, description = "数据库用户已修改", body = ApiResponse<DatabaseUser>))
)]
pub async fn edit_user(
    State(state): State<AppState>,
    Path((env, instance, username)): Path<(String, String, String)>,
    Query(query): Query<EngineQuery>,
    Json(req): Json<EditUserRequest>,
) -> ApiResult<DatabaseUser> {
    req.validate()?;
    let engine = EngineType::clean(&query.engine)?;
    let user = DatabaseUser::new(instance, username, engine).with_password(req.password);
    ok(state.manager.edit_database_user(&env, user).await?)
}

/// 删除数据库用户
#[utoipa::path(
    delete,
    path = "/api/environments/{env}/instances/{instance}/users/{username}",
    tag = "users",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("instance" = String, Path, description = "实例名称"),
        ("username" = String, Path, description = "用户名"),
        EngineQuery
    ),
    responses((status = 200, description = "数据库用户已删除"))
)]
pub async fn remove_user(
    State(state): State<AppState>,
    Path((env, instance, username)): Path<(String, String, String)>,
    Query(query): Query<EngineQuery>,
) -> ApiResult<()> {
    let engine = EngineType::clean(&query.engine)?;
    state.manager.remove_database_user(&env, &instance, &username, engine).await?;
    ok(())
}

/// 判断数据库用户是否存在
#[utoipa::path(
    get,
    path = "/api/environments/{env}/instances/{instance}/users/{username}/exists",
    tag = "users",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("instance" = String, Path, description = "实例名称"),
        ("username" = String, Path, description = "用户名"),
        EngineQuery
    ),
    responses((status = 200, description = "是否存在", body = ApiResponse<bool>))
)]
pub async fn user_exists(
    State(state): State<AppState>,
    Path((env, instance, username)): Path<(String, String, String)>,
    Query(query): Query<EngineQuery>,
) -> ApiResult<bool> {
    let engine = EngineType::clean(&query.engine)?;
    ok(state.manager.database_user_exists(&env, &instance, &username, engine).await?)
}

/// 查询用户在数据库上的权限
#[utoipa::path(
    get,
    path = "/api/environments/{env}/privileges",
    tag = "privileges",
    params(("env" = String, Path, description = "环境名称"), PrivilegeQuery),
    responses((status = 200, description = "权限集合", body = ApiResponse<PrivilegeSet>))
)]
pub async fn get_privileges(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Query(query): Query<PrivilegeQuery>,
) -> ApiResult<PrivilegeSet> {
    let engine = EngineType::clean(&query.engine)?;
    ok(state
        .manager
        .get_user_database_privileges(&env, &query.instance, &query.database, &query.username, engine)
        .await?)
}

/// 替换用户在数据库上的权限
#[utoipa::path(
    put,
    path = "/api/environments/{env}/privileges",
    tag = "privileges",
    params(("env" = String, Path, description = "环境名称")),
    request_body = UpdatePrivilegesRequest,
    responses((status = 200, description = "权限已更新"))
)]
pub async fn update_privileges(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<UpdatePrivilegesRequest>,
) -> ApiResult<()> {
    let (user, database, privileges) = req.into_parts()?;
    state
        .manager
        .update_database_user_privileges(&env, &privileges, &user, &database)
        .await?;
    ok(())
}

/// 列出数据库的已挂载与可挂载用户
#[utoipa::path(
    get,
    path = "/api/environments/{env}/attachments",
    tag = "attachments",
    params(("env" = String, Path, description = "环境名称"), AttachmentQuery),
    responses((status = 200, description = "挂载情况", body = ApiResponse<UserAttachments>))
)]
pub async fn list_attachments(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Query(query): Query<AttachmentQuery>,
) -> ApiResult<UserAttachments> {
    let engine = EngineType::clean(&query.engine)?;
    let attached = state
        .manager
        .get_attached_users(&env, &query.instance, &query.database, engine)
        .await?;
    let available = state
        .manager
        .get_available_users(&env, &query.instance, &query.database, engine)
        .await?;
    ok(UserAttachments { attached, available })
}

/// 按权限模板将用户挂载到数据库
#[utoipa::path(
    post,
    path = "/api/environments/{env}/attachments",
    tag = "attachments",
    params(("env" = String, Path, description = "环境名称")),
    request_body = AttachUserRequest,
    responses(
        (status = 200, description = "用户已挂载", body = ApiResponse<UserDatabaseEntry>),
        (status = 404, description = "权限模板未找到")
    )
)]
pub async fn attach_user(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<AttachUserRequest>,
) -> ApiResult<UserDatabaseEntry> {
    req.validate()?;
    let engine = EngineType::clean(&req.engine)?;
    ok(state
        .manager
        .attach_user(
            &env,
            engine,
            &req.template_name,
            &req.username,
            &req.database_name,
            &req.rss_instance_name,
        )
        .await?)
}

/// 解除用户与数据库的挂载
#[utoipa::path(
    delete,
    path = "/api/environments/{env}/attachments",
    tag = "attachments",
    params(("env" = String, Path, description = "环境名称")),
    request_body = DetachUserRequest,
    responses((status = 200, description = "用户已解除挂载"))
)]
pub async fn detach_user(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<DetachUserRequest>,
) -> ApiResult<()> {
    let entry = req.into_entry(&env)?;
    state.manager.detach_user(&entry).await?;
    ok(())
}

/// 列出权限模板
#[utoipa::path(
    get,
    path = "/api/environments/{env}/templates",
    tag = "templates",
    params(("env" = String, Path, description = "环境名称")),
    responses((status = 200, description = "权限模板列表", body = ApiResponse<Vec<PrivilegeTemplate>>))
)]
pub async fn list_templates(
    State(state): State<AppState>,
    Path(env): Path<String>,
) -> ApiResult<Vec<PrivilegeTemplate>> {
    ok(state.manager.get_privilege_templates(&env).await?)
}

/// 添加权限模板
#[utoipa::path(
    post,
    path = "/api/environments/{env}/templates",
    tag = "templates",
    params(("env" = String, Path, description = "环境名称")),
    request_body = PrivilegeTemplateRequest,
    responses(
        (status = 200, description = "权限模板已添加", body = ApiResponse<PrivilegeTemplate>),
        (status = 409, description = "模板已存在")
    )
)]
pub async fn add_template(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<PrivilegeTemplateRequest>,
) -> ApiResult<PrivilegeTemplate> {
    let template = req.into_template(&env)?;
    ok(state.manager.add_privilege_template(&env, template).await?)
}

/// 获取权限模板
#[utoipa::path(
    get,
    path = "/api/environments/{env}/templates/{name}",
    tag = "templates",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("name" = String, Path, description = "模板名称")
    ),
    responses(
        (status = 200, description = "权限模板", body = ApiResponse<PrivilegeTemplate>),
        (status = 404, description = "模板未找到")
    )
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path((env, name)): Path<(String, String)>,
) -> ApiResult<PrivilegeTemplate> {
    ok(state.manager.get_privilege_template(&env, &name).await?)
}

/// 修改权限模板
#[utoipa::path(
    put,
    path = "/api/environments/{env}/templates/{name}",
    tag = "templates",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("name" = String, Path, description = "模板名称")
    ),
    request_body = PrivilegeTemplateRequest,
    responses((status = 200, description = "权限模板已修改", body = ApiResponse<PrivilegeTemplate>))
)]
pub async fn update_template(
    State(state): State<AppState>,
    Path((env, name)): Path<(String, String)>,
    Json(mut req): Json<PrivilegeTemplateRequest>,
) -> ApiResult<PrivilegeTemplate> {
    req.name = name;
    let template = req.into_template(&env)?;
    ok(state.manager.update_privilege_template(&env, template).await?)
}

/// 删除权限模板
#[utoipa::path(
    delete,
    path = "/api/environments/{env}/templates/{name}",
    tag = "templates",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("name" = String, Path, description = "模板名称")
    ),
    responses((status = 200, description = "权限模板已删除"))
)]
pub async fn remove_template(
    State(state): State<AppState>,
    Path((env, name)): Path<(String, String)>,
) -> ApiResult<()> {
    state.manager.remove_privilege_template(&env, &name).await?;
    ok(())
}

/// 判断权限模板是否存在
#[utoipa::path(
    get,
    path = "/api/environments/{env}/templates/{name}/exists",
    tag = "templates",
    params(
        ("env" = String, Path, description = "环境名称"),
        ("name" = String, Path, description = "模板名称")
    ),
    responses((status = 200, description = "是否存在", body = ApiResponse<bool>))
)]
pub async fn template_exists(
    State(state): State<AppState>,
    Path((env, name)): Path<(String, String)>,
) -> ApiResult<bool> {
    ok(state.manager.privilege_template_exists(&env, &name).await?)
}

/// 创建数据库快照
#[utoipa::path(
    post,
    path = "/api/environments/{env}/snapshots",
    tag = "snapshots",
    params(("env" = String, Path, description = "环境名称")),
    request_body = SnapshotRequest,
    responses((status = 200, description = "快照已创建", body = ApiResponse<Snapshot>))
)]
pub async fn create_snapshot(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<SnapshotRequest>,
) -> ApiResult<Snapshot> {
    req.validate()?;
    let engine = EngineType::clean(&req.engine)?;
    ok(state.manager.create_snapshot(&env, &req.database_name, engine).await?)
}

/// 列出已注册的数据源
#[utoipa::path(
    get,
    path = "/api/datasources",
    tag = "datasources",
    responses((status = 200, description = "数据源列表", body = ApiResponse<Vec<DatasourceDescriptor>>))
)]
pub async fn list_datasources(State(state): State<AppState>) -> ApiResult<Vec<DatasourceDescriptor>> {
    ok(state.manager.catalog().list_all().await?)
}

/// 注册数据源
#[utoipa::path(
    post,
    path = "/api/environments/{env}/datasources",
    tag = "datasources",
    params(("env" = String, Path, description = "环境名称")),
    request_body = RegisterDatasourceRequest,
    responses(
        (status = 200, description = "数据源已注册", body = ApiResponse<DatasourceDescriptor>),
        (status = 409, description = "数据源名称已存在")
    )
)]
pub async fn register_datasource(
    State(state): State<AppState>,
    Path(env): Path<String>,
    Json(req): Json<RegisterDatasourceRequest>,
) -> ApiResult<DatasourceDescriptor> {
    req.validate()?;
    let mut entry = req.entry;
    entry.environment_name = env.clone();
    ok(state.manager.add_datasource(&env, &req.name, &entry).await?)
}

/// 删除数据源，不存在时同样成功
#[utoipa::path(
    delete,
    path = "/api/datasources/{name}",
    tag = "datasources",
    params(("name" = String, Path, description = "数据源名称")),
    responses((status = 200, description = "数据源已删除"))
)]
pub async fn remove_datasource(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    state.manager.remove_datasource(&name).await?;
    ok(())
}
