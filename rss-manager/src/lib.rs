//! RSS 资源管理
//!
//! 多环境下数据库实例、数据库、用户、权限模板与数据源的统一管理：
//! - 环境与 RSS 实例注册表
//! - 变更操作的权限校验
//! - 基于权限模板的用户挂载
//! - 数据源注册

pub mod adaptor;
pub mod attachment;
pub mod authorization;
pub mod config;
pub mod datasource;
pub mod environment;
pub mod handlers;
pub mod keyed_lock;
pub mod manager;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

pub use manager::ResourceManager;
pub use state::AppState;
