// ==========================================
// 订单处理系统 - 订单数据导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 映射 → 校验 → 冲突检测 → 落库
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::order::{
    DqLevel, DqViolation, ImportBatch, ImportReport, ImportSummary, Order, RawOrderRecord,
};
use crate::domain::transition_log::{ActionType, TransitionLog};
use crate::domain::types::OrderStatus;
use crate::importer::order_importer_trait::{
    ConflictHandler, DqValidator, FieldMapper, FileParser, OrderImporter,
};
use crate::repository::{ImportBatchRepository, OrderRepository, TransitionLogRepository};
use chrono::Utc;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 导入操作的系统标识（写入 updated_by / actor）
const IMPORT_ACTOR: &str = "importer";

// ==========================================
// OrderImporterImpl - 订单数据导入器实现
// ==========================================
pub struct OrderImporterImpl<C>
where
    C: ImportConfigReader,
{
    // 数据访问层
    order_repo: Arc<OrderRepository>,
    batch_repo: Arc<ImportBatchRepository>,
    log_repo: Arc<TransitionLogRepository>,

    // 配置读取器
    config: Arc<C>,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    dq_validator: Box<dyn DqValidator>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl<C> OrderImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建新的 OrderImporter 实例
    ///
    /// # 参数
    /// - order_repo: 订单数据仓储
    /// - batch_repo: 导入批次仓储
    /// - log_repo: 流转审计日志仓储
    /// - config: 配置读取器
    /// - file_parser: 文件解析器
    /// - field_mapper: 字段映射器
    /// - dq_validator: DQ 校验器
    /// - conflict_handler: 冲突处理器
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_repo: Arc<OrderRepository>,
        batch_repo: Arc<ImportBatchRepository>,
        log_repo: Arc<TransitionLogRepository>,
        config: Arc<C>,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        dq_validator: Box<dyn DqValidator>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            order_repo,
            batch_repo,
            log_repo,
            config,
            file_parser,
            field_mapper,
            dq_validator,
            conflict_handler,
        }
    }

    /// RawOrderRecord → Order 转换（仅对已通过 DQ 校验的行调用）
    fn convert_to_orders(&self, records: Vec<RawOrderRecord>) -> Vec<Order> {
        let now = Utc::now();
        let mut orders = Vec::with_capacity(records.len());

        for record in records {
            let status = record.status.as_deref().and_then(OrderStatus::parse);
            match (record.order_id, status) {
                (Some(order_id), Some(status)) => orders.push(Order {
                    order_id,
                    customer_code: record.customer_code,
                    total_amount: record.total_amount,
                    placed_at: record.placed_at,
                    status,
                    created_at: now,
                    updated_at: now,
                    updated_by: Some(IMPORT_ACTOR.to_string()),
                }),
                // DQ 校验已阻断非法行，此处只会在校验遗漏时触发
                _ => warn!(row_number = record.row_number, "已校验记录仍缺少主键/状态，跳过"),
            }
        }

        orders
    }
}

#[async_trait::async_trait]
impl<C> OrderImporter for OrderImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    /// 从 CSV 文件导入订单数据
    #[instrument(skip(self, file_path), fields(batch_id))]
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> Result<ImportReport, Box<dyn Error>> {
        use std::time::Instant;
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();

        let file_name = file_path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        let file_path_str = file_path.as_ref().to_str().unwrap_or("unknown");
        info!(batch_id = %batch_id, file_path = %file_path_str, "开始导入订单数据");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let raw_rows = self
            .file_parser
            .parse_to_raw_records(file_path.as_ref())
            .map_err(|e| {
                error!(error = %e, "文件解析失败");
                format!("文件解析失败: {}", e)
            })?;

        let total_rows = raw_rows.len();
        info!(total_rows = total_rows, "文件解析完成");

        // === 步骤 2: 字段映射 ===
        debug!("步骤 2: 字段映射");
        let mut records = Vec::new();
        let mut violations: Vec<DqViolation> = Vec::new();
        for (idx, row) in raw_rows.into_iter().enumerate() {
            match self.field_mapper.map_to_raw_order(row, idx + 1) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // 映射失败：转为 DQ 阻断记录（转换为字符串以避免 Send 问题）
                    warn!(row_number = idx + 1, error = %e, "字段映射失败");
                    violations.push(DqViolation {
                        row_number: idx + 1,
                        order_id: None,
                        level: DqLevel::Error,
                        field: "row".to_string(),
                        message: format!("字段映射失败: {}", e),
                    });
                }
            }
        }
        info!(
            success = records.len(),
            failed = violations.len(),
            "字段映射完成"
        );

        // === 步骤 3: 读取导入配置 ===
        debug!("步骤 3: 读取导入配置");
        let threshold = self
            .config
            .get_amount_anomaly_threshold()
            .await
            .map_err(|e| e.to_string())?;
        let update_existing = self
            .config
            .get_import_update_existing()
            .await
            .map_err(|e| e.to_string())?;

        // === 步骤 4: DQ 校验 ===
        debug!("步骤 4: DQ 校验");
        violations.extend(self.dq_validator.validate_primary_key(&records));
        for record in &records {
            violations.extend(self.dq_validator.validate_status(record));
            violations.extend(self.dq_validator.validate_amount(record, threshold));
        }

        // Error 级违规行整体阻断（Warning 级照常落库）
        let blocked_row_set: HashSet<usize> = violations
            .iter()
            .filter(|v| v.level == DqLevel::Error)
            .map(|v| v.row_number)
            .collect();
        let blocked_rows = blocked_row_set.len();
        let mut candidates: Vec<RawOrderRecord> = records
            .into_iter()
            .filter(|r| !blocked_row_set.contains(&r.row_number))
            .collect();
        info!(
            blocked = blocked_rows,
            candidates = candidates.len(),
            "DQ 校验完成"
        );

        // === 步骤 5: 批内冲突检测 ===
        debug!("步骤 5: 批内冲突检测");
        let duplicates = self.conflict_handler.detect_duplicates(&candidates);
        let duplicate_rows: HashSet<usize> = duplicates.iter().map(|(row, _)| *row).collect();
        candidates.retain(|r| !duplicate_rows.contains(&r.row_number));
        let mut conflict_rows = duplicates.len();

        // === 步骤 6: 跨批次冲突检测 ===
        debug!("步骤 6: 跨批次冲突检测");
        let candidate_ids: Vec<i64> = candidates.iter().filter_map(|r| r.order_id).collect();
        let existing_ids = self
            .order_repo
            .batch_check_exists(&candidate_ids)
            .map_err(|e| e.to_string())?;
        if !update_existing {
            // 不允许更新已存在订单：已存在行记为冲突并跳过
            let cross = self
                .conflict_handler
                .detect_cross_batch_duplicates(&candidates, &existing_ids);
            let cross_rows: HashSet<usize> = cross.iter().map(|(row, _)| *row).collect();
            candidates.retain(|r| !cross_rows.contains(&r.row_number));
            conflict_rows += cross.len();
        }
        info!(
            conflicts = conflict_rows,
            existing = existing_ids.len(),
            "冲突检测完成"
        );

        // === 步骤 7: 转换并落库（事务化）===
        debug!("步骤 7: 转换并落库");
        let orders = self.convert_to_orders(candidates);
        let success_rows = self
            .order_repo
            .batch_upsert_orders(orders, update_existing)
            .map_err(|e| e.to_string())?;
        info!(count = success_rows, "订单落库完成");

        // === 步骤 8: 写入审计日志 ===
        debug!("步骤 8: 写入审计日志");
        let audit = TransitionLog {
            log_id: Uuid::new_v4().to_string(),
            order_id: None,
            action_type: ActionType::Import.to_string(),
            from_status: None,
            to_status: None,
            action_ts: Utc::now().naive_utc(),
            actor: IMPORT_ACTOR.to_string(),
            payload_json: Some(serde_json::json!({
                "batch_id": batch_id.clone(),
                "file_name": file_name.clone(),
                "success_rows": success_rows,
            })),
            detail: Some(format!("导入订单文件: {}", file_path_str)),
        };
        self.log_repo.insert(&audit).map_err(|e| e.to_string())?;

        // === 步骤 9: 记录批次信息 + DQ 报告 ===
        debug!("步骤 9: 记录批次信息");
        let dq_report = self
            .dq_validator
            .generate_dq_report(batch_id.clone(), violations);
        let elapsed = start_time.elapsed();

        let batch = ImportBatch {
            batch_id,
            file_name,
            total_rows: total_rows as i32,
            success_rows: success_rows as i32,
            blocked_rows: blocked_rows as i32,
            conflict_rows: conflict_rows as i32,
            imported_at: Some(Utc::now()),
            imported_by: Some(IMPORT_ACTOR.to_string()),
            elapsed_ms: Some(elapsed.as_millis() as i32),
            dq_report_json: serde_json::to_string(&dq_report).ok(),
        };
        self.batch_repo.insert(&batch).map_err(|e| e.to_string())?;

        info!(
            total = total_rows,
            success = success_rows,
            blocked = blocked_rows,
            conflicts = conflict_rows,
            elapsed_ms = elapsed.as_millis() as i64,
            "订单导入完成"
        );

        Ok(ImportReport {
            batch,
            dq_report,
            summary: ImportSummary {
                total_rows,
                success: success_rows,
                blocked: blocked_rows,
                conflict: conflict_rows,
            },
        })
    }

    /// 批量导入多个文件
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Result<Vec<Result<ImportReport, String>>, Box<dyn Error>> {
        info!(file_count = file_paths.len(), "开始批量导入");

        let imports = file_paths.iter().map(|path| async move {
            self.import_from_csv(path.as_ref())
                .await
                .map_err(|e| e.to_string())
        });

        let results = futures::future::join_all(imports).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            total = results.len(),
            failed = failed,
            "批量导入完成"
        );

        Ok(results)
    }
}
