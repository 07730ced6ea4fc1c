// ==========================================
// 订单处理系统 - 字段映射器实现
// ==========================================
// 阶段 1: 字段映射与类型转换
// 源列: order_id / customer_code / total_amount / placed_at / status
// ==========================================

use crate::domain::order::RawOrderRecord;
use crate::importer::error::ImportError;
use crate::importer::order_importer_trait::FieldMapper;
use std::collections::HashMap;

// ==========================================
// OrderFieldMapper 实现
// ==========================================
pub struct OrderFieldMapper;

impl OrderFieldMapper {
    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(value: Option<&String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 解析整数字段
    fn parse_i64(
        value: Option<String>,
        row: usize,
        field: &str,
    ) -> Result<Option<i64>, ImportError> {
        match value {
            None => Ok(None),
            Some(v) => v
                .parse::<i64>()
                .map(Some)
                .map_err(|e| ImportError::TypeConversionError {
                    row,
                    field: field.to_string(),
                    message: format!("{} ({})", e, v),
                }),
        }
    }

    /// 解析浮点字段
    fn parse_f64(
        value: Option<String>,
        row: usize,
        field: &str,
    ) -> Result<Option<f64>, ImportError> {
        match value {
            None => Ok(None),
            Some(v) => v
                .parse::<f64>()
                .map(Some)
                .map_err(|e| ImportError::TypeConversionError {
                    row,
                    field: field.to_string(),
                    message: format!("{} ({})", e, v),
                }),
        }
    }

    /// 解析日期字段（YYYY-MM-DD）
    fn parse_date(
        value: Option<String>,
        row: usize,
        field: &str,
    ) -> Result<Option<chrono::NaiveDate>, ImportError> {
        match value {
            None => Ok(None),
            Some(v) => chrono::NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| ImportError::TypeConversionError {
                    row,
                    field: field.to_string(),
                    message: format!("期望 YYYY-MM-DD，实际 {}", v),
                }),
        }
    }
}

impl FieldMapper for OrderFieldMapper {
    fn map_to_raw_order(
        &self,
        row: HashMap<String, String>,
        row_number: usize,
    ) -> Result<RawOrderRecord, Box<dyn std::error::Error>> {
        let order_id = Self::parse_i64(
            Self::normalize_null(row.get("order_id")),
            row_number,
            "order_id",
        )?;
        let total_amount = Self::parse_f64(
            Self::normalize_null(row.get("total_amount")),
            row_number,
            "total_amount",
        )?;
        let placed_at = Self::parse_date(
            Self::normalize_null(row.get("placed_at")),
            row_number,
            "placed_at",
        )?;

        Ok(RawOrderRecord {
            order_id,
            customer_code: Self::normalize_null(row.get("customer_code")),
            total_amount,
            placed_at,
            status: Self::normalize_null(row.get("status")),
            row_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_map_full_row() {
        let mapper = OrderFieldMapper;
        let record = mapper
            .map_to_raw_order(
                row(&[
                    ("order_id", "42"),
                    ("customer_code", "C001"),
                    ("total_amount", "199.9"),
                    ("placed_at", "2026-08-01"),
                    ("status", "Processing"),
                ]),
                1,
            )
            .unwrap();

        assert_eq!(record.order_id, Some(42));
        assert_eq!(record.customer_code.as_deref(), Some("C001"));
        assert_eq!(record.total_amount, Some(199.9));
        assert_eq!(record.status.as_deref(), Some("Processing"));
        assert_eq!(record.row_number, 1);
    }

    #[test]
    fn test_map_blank_values_to_none() {
        let mapper = OrderFieldMapper;
        let record = mapper
            .map_to_raw_order(row(&[("order_id", "7"), ("customer_code", "  ")]), 2)
            .unwrap();

        assert_eq!(record.order_id, Some(7));
        assert_eq!(record.customer_code, None);
        assert_eq!(record.status, None);
    }

    #[test]
    fn test_map_invalid_number_is_error() {
        let mapper = OrderFieldMapper;
        let result = mapper.map_to_raw_order(row(&[("order_id", "abc")]), 3);
        assert!(result.is_err());
    }

    #[test]
    fn test_map_invalid_date_is_error() {
        let mapper = OrderFieldMapper;
        let result =
            mapper.map_to_raw_order(row(&[("order_id", "1"), ("placed_at", "20260801")]), 4);
        assert!(result.is_err());
    }
}
