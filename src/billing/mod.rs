//! 用量计费
//!
//! - reporter：周期结束后快照 Pro 计数器，计算超额并记账
//! - reconciler：对比已上报值与在线计数器，只记录漂移，绝不改数
//! - invoice：外部发票项的最小接口（PSP 胶水在核心之外）

pub mod invoice;
pub mod reconciler;
pub mod reporter;

pub use invoice::{InvoiceClient, NullInvoiceClient};
pub use reconciler::Reconciler;
pub use reporter::UsageReporter;

/// 超额单位数：超出部分向上取整到下一个计费单位
pub fn overage_units(total_clicks: i64, included_clicks: i64, unit_clicks: i64) -> i64 {
    let over = total_clicks - included_clicks;
    if over <= 0 || unit_clicks <= 0 {
        return 0;
    }
    (over + unit_clicks - 1) / unit_clicks
}

/// 超额金额（最小货币单位）
pub fn overage_amount(units: i64, unit_price: i64) -> i64 {
    units.saturating_mul(unit_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_overage_under_allotment() {
        assert_eq!(overage_units(1_999_999, 2_000_000, 100_000), 0);
        assert_eq!(overage_units(2_000_000, 2_000_000, 100_000), 0);
    }

    #[test]
    fn test_overage_rounds_up_to_unit() {
        // 150,000 超额 → 2 个单位
        assert_eq!(overage_units(2_150_000, 2_000_000, 100_000), 2);
        // 恰好 1 个单位
        assert_eq!(overage_units(2_100_000, 2_000_000, 100_000), 1);
        // 1 次点击的超额也按整单位计
        assert_eq!(overage_units(2_000_001, 2_000_000, 100_000), 1);
    }

    #[test]
    fn test_overage_amount() {
        // ceil(150000/100000) * 100 = 200
        let units = overage_units(2_150_000, 2_000_000, 100_000);
        assert_eq!(overage_amount(units, 100), 200);
    }
}
