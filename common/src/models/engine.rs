//! Database engine types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Engine backing an RSS instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    MySql,
    MariaDb,
    Postgres,
    SqlServer,
    Oracle,
    H2,
}

impl EngineType {
    /// Normalizes a raw engine name (trimmed, case-insensitive, common aliases).
    pub fn clean(raw: &str) -> Result<Self, AppError> {
        raw.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::MySql => "mysql",
            EngineType::MariaDb => "mariadb",
            EngineType::Postgres => "postgres",
            EngineType::SqlServer => "sqlserver",
            EngineType::Oracle => "oracle",
            EngineType::H2 => "h2",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            EngineType::MySql | EngineType::MariaDb => 3306,
            EngineType::Postgres => 5432,
            EngineType::SqlServer => 1433,
            EngineType::Oracle => 1521,
            EngineType::H2 => 9092,
        }
    }

    /// Driver name published with datasource descriptors.
    pub fn driver(&self) -> &'static str {
        match self {
            EngineType::MySql => "mysql",
            EngineType::MariaDb => "mariadb",
            EngineType::Postgres => "postgresql",
            EngineType::SqlServer => "sqlserver",
            EngineType::Oracle => "oracle",
            EngineType::H2 => "h2",
        }
    }

    /// Connection URL for a server, optionally pointing at one database.
    pub fn connection_url(&self, host: &str, port: u16, database: Option<&str>) -> String {
        let base = format!("{}://{}:{}", self.driver(), host, port);
        match database {
            Some(db) if *self == EngineType::SqlServer => format!("{};databaseName={}", base, db),
            Some(db) => format!("{}/{}", base, db),
            None => base,
        }
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(EngineType::MySql),
            "mariadb" => Ok(EngineType::MariaDb),
            "postgres" | "postgresql" => Ok(EngineType::Postgres),
            "sqlserver" | "mssql" => Ok(EngineType::SqlServer),
            "oracle" => Ok(EngineType::Oracle),
            "h2" => Ok(EngineType::H2),
            other => Err(AppError::Validation(format!("unknown engine type '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_normalizes_case_and_aliases() {
        assert_eq!(EngineType::clean(" MySQL ").unwrap(), EngineType::MySql);
        assert_eq!(EngineType::clean("PostgreSQL").unwrap(), EngineType::Postgres);
        assert!(EngineType::clean("sybase").is_err());
    }

    #[test]
    fn test_connection_url() {
        assert_eq!(
            EngineType::MySql.connection_url("db1", 3306, Some("orders")),
            "mysql://db1:3306/orders"
        );
        assert_eq!(
            EngineType::SqlServer.connection_url("mssql", 1433, Some("crm")),
            "sqlserver://mssql:1433;databaseName=crm"
        );
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&EngineType::Postgres).unwrap();
        assert_eq!(json, "\"postgres\"");
    }
}
