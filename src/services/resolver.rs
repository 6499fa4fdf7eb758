//! 链接解析
//!
//! (hostname, slug) → 完整定位，纯查询逻辑：
//! 1. hostname 规范化为小写（剥离端口）
//! 2. 查 verified 域名，无则未解析
//! 3. 查 (domain_id, slug) 链接，无则未解析
//! 4. 非 active 链接视同不存在（paused 与 missing 不可区分）
//!
//! "未解析"是值不是错误；目录 I/O 错误向上传播，由重定向层降级为 404。

use std::sync::Arc;

use crate::errors::Result;
use crate::storage::{ResolvedLink, SeaOrmStorage};

/// 解析结果
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(ResolvedLink),
    Unresolved,
}

pub struct Resolver {
    storage: Arc<SeaOrmStorage>,
}

impl Resolver {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn resolve(&self, hostname: &str, slug: &str) -> Result<Resolution> {
        let hostname = normalize_hostname(hostname);
        let slug = slug.to_ascii_lowercase();

        let Some(domain) = self.storage.find_verified_domain(&hostname).await? else {
            return Ok(Resolution::Unresolved);
        };

        let Some(link) = self.storage.find_link(&domain.id, &slug).await? else {
            return Ok(Resolution::Unresolved);
        };

        if link.status != "active" {
            return Ok(Resolution::Unresolved);
        }

        Ok(Resolution::Resolved(ResolvedLink {
            workspace_id: link.workspace_id,
            link_id: link.id,
            domain_id: domain.id,
            hostname: domain.hostname,
            slug: link.slug,
            destination_url: link.destination_url,
        }))
    }
}

/// Host 头规范化：去端口、转小写
pub fn normalize_hostname(hostname: &str) -> String {
    hostname
        .split(':')
        .next()
        .unwrap_or(hostname)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(normalize_hostname("Example.Test"), "example.test");
        assert_eq!(normalize_hostname("example.test:8080"), "example.test");
        assert_eq!(normalize_hostname(" example.test "), "example.test");
    }
}
