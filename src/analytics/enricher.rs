//! 点击富化
//!
//! 从请求元数据做纯函数派生：
//! - click_id：SHA-256(link_id | ts_millis | unique_part)，确定性，重复投递折叠
//! - ip_hash：SHA-256(IP 字符串)，原始 IP 不出此函数
//! - 设备分类：固定 token 表的大小写不敏感子串匹配
//! - bot 判定：固定爬虫 token 表
//!
//! hash 输入格式是离线语料的契约，不可变更。

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::storage::ResolvedLink;

use super::ClickEvent;

// ============ 固定 token 表 ============

/// 平板 token（先于 mobile 检查：iPad UA 同时含 "mobile"）
const TABLET_TOKENS: &[&str] = &["ipad", "tablet", "kindle", "silk", "playbook"];

const MOBILE_TOKENS: &[&str] = &[
    "mobile",
    "iphone",
    "ipod",
    "android",
    "phone",
    "blackberry",
    "opera mini",
];

const DESKTOP_TOKENS: &[&str] = &["windows nt", "macintosh", "mac os x", "x11", "cros", "linux"];

const BOT_TOKENS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "scraper",
    "crawling",
    "slurp",
    "facebookexternalhit",
    "whatsapp",
    "telegram",
    "preview",
    "headless",
    "curl",
    "wget",
    "python-requests",
    "go-http-client",
];

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// click_id = hex(SHA-256("{link_id}|{ts_millis}|{unique_part}"))
///
/// unique_part 优先取边缘提供的请求 id；缺失时退化为
/// SHA-256(user_agent) 的前 16 位十六进制。
pub fn click_id(link_id: &str, ts: DateTime<Utc>, request_id: Option<&str>, user_agent: Option<&str>) -> String {
    let unique_part = match request_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => sha256_hex(user_agent.unwrap_or(""))[..16].to_string(),
    };
    sha256_hex(&format!(
        "{}|{}|{}",
        link_id,
        ts.timestamp_millis(),
        unique_part
    ))
}

/// ip_hash = hex(SHA-256(ip))，定长 64 字符
pub fn ip_hash(ip: &str) -> String {
    sha256_hex(ip)
}

fn contains_any(haystack: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| haystack.contains(t))
}

/// 设备分类：tablet → mobile → desktop → unknown
pub fn device_class(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent else {
        return "unknown";
    };
    let ua = ua.to_ascii_lowercase();
    if contains_any(&ua, TABLET_TOKENS) {
        "tablet"
    } else if contains_any(&ua, MOBILE_TOKENS) {
        "mobile"
    } else if contains_any(&ua, DESKTOP_TOKENS) {
        "desktop"
    } else {
        "unknown"
    }
}

/// bot 判定：命中即排除于计数与入队之外
pub fn is_bot(user_agent: Option<&str>) -> bool {
    match user_agent {
        Some(ua) => contains_any(&ua.to_ascii_lowercase(), BOT_TOKENS),
        None => false,
    }
}

/// 请求元数据（富化的全部输入）
#[derive(Debug, Clone, Default)]
pub struct ClickRequestContext {
    pub ts: DateTime<Utc>,
    /// 客户端 IP 字符串（只用于派生 ip_hash）
    pub remote_ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// 边缘提供的每请求唯一 id（X-Request-Id）
    pub request_id: Option<String>,
    /// 边缘注入的粗粒度地理头
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// 富化：解析结果 + 请求元数据 → 队列事件
pub fn enrich(link: &ResolvedLink, ctx: &ClickRequestContext) -> ClickEvent {
    ClickEvent {
        click_id: click_id(
            &link.link_id,
            ctx.ts,
            ctx.request_id.as_deref(),
            ctx.user_agent.as_deref(),
        ),
        ts: ctx.ts,
        workspace_id: link.workspace_id.clone(),
        link_id: link.link_id.clone(),
        domain: link.hostname.clone(),
        slug: link.slug.clone(),
        destination_url: link.destination_url.clone(),
        referrer: ctx.referrer.clone(),
        user_agent: ctx.user_agent.clone(),
        ip_hash: ctx.remote_ip.as_deref().map(ip_hash),
        country: ctx.country.clone(),
        region: ctx.region.clone(),
        city: ctx.city.clone(),
        device_class: device_class(ctx.user_agent.as_deref()).to_string(),
        bot_suspected: is_bot(ctx.user_agent.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_link() -> ResolvedLink {
        ResolvedLink {
            workspace_id: "ws1".to_string(),
            link_id: "lnk1".to_string(),
            domain_id: "dom1".to_string(),
            hostname: "example.test".to_string(),
            slug: "x".to_string(),
            destination_url: "https://dest.example/path".to_string(),
        }
    }

    #[test]
    fn test_click_id_is_deterministic() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let a = click_id("lnk1", ts, Some("req-1"), None);
        let b = click_id("lnk1", ts, Some("req-1"), None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_click_id_varies_by_inputs() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let base = click_id("lnk1", ts, Some("req-1"), None);
        assert_ne!(base, click_id("lnk2", ts, Some("req-1"), None));
        assert_ne!(base, click_id("lnk1", ts + chrono::Duration::milliseconds(1), Some("req-1"), None));
        assert_ne!(base, click_id("lnk1", ts, Some("req-2"), None));
    }

    #[test]
    fn test_click_id_falls_back_to_user_agent_hash() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let with_ua = click_id("lnk1", ts, None, Some("Mozilla/5.0"));
        let same_ua = click_id("lnk1", ts, None, Some("Mozilla/5.0"));
        let other_ua = click_id("lnk1", ts, None, Some("curl/8.0"));
        assert_eq!(with_ua, same_ua);
        assert_ne!(with_ua, other_ua);
        // 空 request_id 同样退化
        assert_eq!(with_ua, click_id("lnk1", ts, Some(""), Some("Mozilla/5.0")));
    }

    #[test]
    fn test_ip_hash_is_fixed_length_hex() {
        let hash = ip_hash("203.0.113.7");
        assert_eq!(hash.len(), 64);
        assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
        // 不同 IP 不同 hash
        assert_ne!(hash, ip_hash("203.0.113.8"));
    }

    #[test]
    fn test_device_class_order() {
        // iPad UA 同时含 Mobile token，tablet 优先
        assert_eq!(
            device_class(Some(
                "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) Mobile/15E148"
            )),
            "tablet"
        );
        assert_eq!(
            device_class(Some(
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148"
            )),
            "mobile"
        );
        assert_eq!(
            device_class(Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")),
            "desktop"
        );
        assert_eq!(device_class(Some("something unrecognizable")), "unknown");
        assert_eq!(device_class(None), "unknown");
    }

    #[test]
    fn test_bot_detection() {
        assert!(is_bot(Some("Mozilla/5.0 (compatible; Googlebot/2.1)")));
        assert!(is_bot(Some("curl/8.4.0")));
        assert!(is_bot(Some("python-requests/2.31")));
        assert!(!is_bot(Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")));
        assert!(!is_bot(None));
    }

    #[test]
    fn test_enrich_excludes_raw_ip() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let ctx = ClickRequestContext {
            ts,
            remote_ip: Some("203.0.113.7".to_string()),
            user_agent: Some("Mozilla/5.0 (Windows NT 10.0)".to_string()),
            ..Default::default()
        };
        let event = enrich(&sample_link(), &ctx);

        let serialized = serde_json::to_string(&event).unwrap();
        assert!(!serialized.contains("203.0.113.7"));
        assert_eq!(event.ip_hash.as_ref().unwrap().len(), 64);
        assert_eq!(event.device_class, "desktop");
        assert!(!event.bot_suspected);
    }
}
