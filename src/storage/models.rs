use serde::{Deserialize, Serialize};

/// 套餐
///
/// 重定向路径上读取的唯一套餐权威；未知值按 Free 处理（宁可少计，不可多收）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Plan {
        match s {
            "pro" => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 解析结果
///
/// (hostname, slug) 命中 verified 域名 + active 链接后得到的完整定位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub workspace_id: String,
    pub link_id: String,
    pub domain_id: String,
    pub hostname: String,
    pub slug: String,
    pub destination_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parse() {
        assert_eq!(Plan::parse("free"), Plan::Free);
        assert_eq!(Plan::parse("pro"), Plan::Pro);
        // 未知值按 Free 处理
        assert_eq!(Plan::parse("enterprise"), Plan::Free);
        assert_eq!(Plan::parse(""), Plan::Free);
    }
}
