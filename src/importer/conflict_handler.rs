// ==========================================
// 订单处理系统 - 导入冲突处理器实现
// ==========================================
// 阶段 3: 冲突检测
// 规则: 批内重复首次出现为准，其余行记为冲突
// ==========================================

use crate::domain::order::RawOrderRecord;
use crate::importer::order_importer_trait::ConflictHandler;
use std::collections::HashSet;

// ==========================================
// OrderConflictHandler 实现
// ==========================================
pub struct OrderConflictHandler;

impl ConflictHandler for OrderConflictHandler {
    /// 检测同批次内重复订单号（首次出现之外的行）
    fn detect_duplicates(&self, records: &[RawOrderRecord]) -> Vec<(usize, i64)> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();

        for record in records {
            if let Some(id) = record.order_id {
                if !seen.insert(id) {
                    duplicates.push((record.row_number, id));
                }
            }
        }

        duplicates
    }

    /// 检测跨批次重复订单号（数据库已存在）
    fn detect_cross_batch_duplicates(
        &self,
        records: &[RawOrderRecord],
        existing_ids: &[i64],
    ) -> Vec<(usize, i64)> {
        let existing: HashSet<i64> = existing_ids.iter().copied().collect();

        records
            .iter()
            .filter_map(|r| {
                r.order_id
                    .filter(|id| existing.contains(id))
                    .map(|id| (r.row_number, id))
            })
            .collect()
    }
}
