// ==========================================
// 订单处理系统 - 数据质量校验器实现
// ==========================================
// 阶段 2: DQ 校验
// 规则: 主键必填且为正 / 状态必填且可解析 / 金额范围
// ==========================================

use crate::domain::order::{DqLevel, DqReport, DqViolation, RawOrderRecord};
use crate::domain::types::OrderStatus;
use crate::importer::order_importer_trait::DqValidator;

// ==========================================
// OrderDqValidator 实现
// ==========================================
pub struct OrderDqValidator;

impl DqValidator for OrderDqValidator {
    /// 校验主键（order_id 非空且为正）
    fn validate_primary_key(&self, records: &[RawOrderRecord]) -> Vec<DqViolation> {
        let mut violations = Vec::new();

        for record in records {
            match record.order_id {
                None => violations.push(DqViolation {
                    row_number: record.row_number,
                    order_id: None,
                    level: DqLevel::Error,
                    field: "order_id".to_string(),
                    message: "order_id 为空".to_string(),
                }),
                Some(id) if id <= 0 => violations.push(DqViolation {
                    row_number: record.row_number,
                    order_id: Some(id),
                    level: DqLevel::Error,
                    field: "order_id".to_string(),
                    message: format!("order_id 必须为正: {}", id),
                }),
                Some(_) => {}
            }
        }

        violations
    }

    /// 校验状态字面量（必填且可解析）
    fn validate_status(&self, record: &RawOrderRecord) -> Vec<DqViolation> {
        let mut violations = Vec::new();

        match &record.status {
            None => violations.push(DqViolation {
                row_number: record.row_number,
                order_id: record.order_id,
                level: DqLevel::Error,
                field: "status".to_string(),
                message: "status 为空".to_string(),
            }),
            Some(raw) => {
                if OrderStatus::parse(raw).is_none() {
                    violations.push(DqViolation {
                        row_number: record.row_number,
                        order_id: record.order_id,
                        level: DqLevel::Error,
                        field: "status".to_string(),
                        message: format!("未知订单状态字面量: {}", raw),
                    });
                }
            }
        }

        violations
    }

    /// 校验金额范围（负值阻断，超阈值警告）
    fn validate_amount(&self, record: &RawOrderRecord, threshold: f64) -> Vec<DqViolation> {
        let mut violations = Vec::new();

        if let Some(amount) = record.total_amount {
            if amount < 0.0 {
                violations.push(DqViolation {
                    row_number: record.row_number,
                    order_id: record.order_id,
                    level: DqLevel::Error,
                    field: "total_amount".to_string(),
                    message: format!("订单金额不得为负: {}", amount),
                });
            } else if amount > threshold {
                violations.push(DqViolation {
                    row_number: record.row_number,
                    order_id: record.order_id,
                    level: DqLevel::Warning,
                    field: "total_amount".to_string(),
                    message: format!("订单金额异常 (> {}): {}", threshold, amount),
                });
            }
        }

        violations
    }

    /// 生成 DQ 报告
    fn generate_dq_report(&self, batch_id: String, violations: Vec<DqViolation>) -> DqReport {
        let error_count = violations
            .iter()
            .filter(|v| v.level == DqLevel::Error)
            .count();
        let warning_count = violations
            .iter()
            .filter(|v| v.level == DqLevel::Warning)
            .count();

        DqReport {
            batch_id,
            violations,
            error_count,
            warning_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(order_id: Option<i64>, status: Option<&str>, amount: Option<f64>) -> RawOrderRecord {
        RawOrderRecord {
            order_id,
            customer_code: None,
            total_amount: amount,
            placed_at: None,
            status: status.map(|s| s.to_string()),
            row_number: 1,
        }
    }

    #[test]
    fn test_missing_primary_key_blocks() {
        let validator = OrderDqValidator;
        let violations = validator.validate_primary_key(&[record(None, Some("Pending"), None)]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].level, DqLevel::Error);
    }

    #[test]
    fn test_non_positive_primary_key_blocks() {
        let validator = OrderDqValidator;
        let violations = validator.validate_primary_key(&[record(Some(0), Some("Pending"), None)]);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_unknown_status_blocks() {
        let validator = OrderDqValidator;
        let violations = validator.validate_status(&record(Some(1), Some("Delivered"), None));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].level, DqLevel::Error);

        let violations = validator.validate_status(&record(Some(1), None, None));
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_amount_rules() {
        let validator = OrderDqValidator;

        // 负值阻断
        let violations = validator.validate_amount(&record(Some(1), None, Some(-5.0)), 1000.0);
        assert_eq!(violations[0].level, DqLevel::Error);

        // 超阈值警告
        let violations = validator.validate_amount(&record(Some(1), None, Some(2000.0)), 1000.0);
        assert_eq!(violations[0].level, DqLevel::Warning);

        // 正常范围无违规
        let violations = validator.validate_amount(&record(Some(1), None, Some(500.0)), 1000.0);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_dq_report_counts() {
        let validator = OrderDqValidator;
        let violations = vec![
            DqViolation {
                row_number: 1,
                order_id: Some(1),
                level: DqLevel::Error,
                field: "status".to_string(),
                message: "status 为空".to_string(),
            },
            DqViolation {
                row_number: 2,
                order_id: Some(2),
                level: DqLevel::Warning,
                field: "total_amount".to_string(),
                message: "金额异常".to_string(),
            },
        ];

        let report = validator.generate_dq_report("B001".to_string(), violations);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.warning_count, 1);
    }
}
