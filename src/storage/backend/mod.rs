mod catalog;
mod click_sink;
mod connection;
mod counter_store;
pub mod retry;

use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::errors::{Result, ShortspanError};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use retry::RetryPolicy;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(ShortspanError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry: RetryPolicy,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(ShortspanError::database_config(
                "DATABASE_URL 未设置".to_string(),
            ));
        }

        // 根据不同数据库类型配置连接选项
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        let config = crate::config::get_config();
        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry: RetryPolicy::from_config(&config.database),
        };

        // 运行迁移
        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// 从 DATABASE_URL 自动推断 backend 并初始化
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let backend = normalize_backend_name(&infer_backend_from_url(database_url)?);
        Self::new(database_url, &backend).await
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 存储健康检查（就绪探针用）
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::{ConnectionTrait, Statement};

        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await
            .map_err(|e| ShortspanError::database_connection(format!("存储探活失败: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(
            infer_backend_from_url("sqlite://data.db").unwrap(),
            "sqlite"
        );
        assert_eq!(infer_backend_from_url("shortspan.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mysql://root@localhost/s").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://root@localhost/s").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgres://root@localhost/s").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn test_normalize_backend_name() {
        assert_eq!(normalize_backend_name("mariadb"), "mysql");
        assert_eq!(normalize_backend_name("sqlite"), "sqlite");
    }
}
