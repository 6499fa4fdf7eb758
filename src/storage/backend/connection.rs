//! 数据库连接
//!
//! 连接参数围绕两类负载定参：
//! - 重定向路径的目录点查要快速失败（解析错误降级为 404），
//!   获取连接的等待必须明显短于边缘的 5s 客户端超时
//! - 点击管道、计数落盘和聚合事务是持续的小批量写入方，
//!   SQLite 用 WAL 让目录读不被它们阻塞

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::errors::{Result, ShortspanError};
use migration::{Migrator, MigratorTrait};

/// 连接 SQLite 数据库
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
    };
    use std::str::FromStr;

    let config = crate::config::get_config();

    let opt = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| ShortspanError::database_config(format!("SQLite URL 解析失败: {}", e)))?
        .create_if_missing(true)
        // WAL：目录点查与点击批量写并行，互不阻塞
        .journal_mode(SqliteJournalMode::Wal)
        // 点击日志的 at-least-once 由重投递 + click_id 幂等保证，
        // 最后一刻的持久性可以换写入吞吐
        .synchronous(SqliteSynchronous::Normal)
        // 写锁冲突先忙等 2s；仍然失败的交给 RetryPolicy 退避重试
        .busy_timeout(std::time::Duration::from_secs(2))
        .pragma("cache_size", "-64000")
        .pragma("temp_store", "memory");

    // 池大小与服务端数据库共用一个配置项
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.pool_size)
        .connect_with(opt)
        .await
        .map_err(|e| {
            ShortspanError::database_connection(format!("无法连接到 SQLite 数据库: {}", e))
        })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接服务端数据库（MySQL/PostgreSQL）
pub async fn connect_generic(database_url: &str, backend_name: &str) -> Result<DatabaseConnection> {
    let config = crate::config::get_config();
    let pool_size = config.database.pool_size;

    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(pool_size)
        // 空闲时不养连接：定时任务之间常有长静默期
        .min_connections(1)
        .connect_timeout(std::time::Duration::from_secs(5))
        // 获取连接最多等 3s，给重定向路径留出降级为 404 的余量
        .acquire_timeout(std::time::Duration::from_secs(3))
        .idle_timeout(std::time::Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        ShortspanError::database_connection(format!(
            "无法连接到 {} 数据库: {}",
            backend_name.to_uppercase(),
            e
        ))
    })
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| ShortspanError::database_operation(format!("迁移失败: {}", e)))?;

    info!("Database migrations completed");
    Ok(())
}
