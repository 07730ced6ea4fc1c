// ==========================================
// 订单导入API
// ==========================================
// 职责: 封装订单导入相关功能
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfigReader;
use crate::domain::order::{DqViolation, ImportBatch, ImportSummary};
use crate::importer::{OrderImporter, OrderImporterImpl};
use crate::repository::ImportBatchRepository;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 批次ID（由导入器生成，用于批次追溯）
    pub batch_id: String,
    /// 汇总统计（总行数/成功/阻断/冲突）
    pub summary: ImportSummary,
    /// DQ 违规明细（用于定位问题行）
    pub dq_violations: Vec<DqViolation>,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

/// 订单导入API
pub struct ImportApi<C>
where
    C: ImportConfigReader,
{
    importer: OrderImporterImpl<C>,
    batch_repo: Arc<ImportBatchRepository>,
}

impl<C> ImportApi<C>
where
    C: ImportConfigReader + Send + Sync,
{
    /// 创建新的ImportApi实例
    pub fn new(importer: OrderImporterImpl<C>, batch_repo: Arc<ImportBatchRepository>) -> Self {
        Self {
            importer,
            batch_repo,
        }
    }

    /// 导入订单数据
    ///
    /// # 参数
    /// - file_path: 文件路径（仅支持 .csv）
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 导入结果
    /// - Err(ApiError): 错误信息
    pub async fn import_orders(&self, file_path: &str) -> ApiResult<ImportApiResponse> {
        if !file_path.ends_with(".csv") {
            return Err(ApiError::ImportError(
                "当前仅支持 .csv 格式文件导入".to_string(),
            ));
        }

        let report = self
            .importer
            .import_from_csv(file_path)
            .await
            .map_err(|e| ApiError::ImportError(format!("导入失败: {}", e)))?;

        info!(
            batch_id = %report.batch.batch_id,
            success = report.summary.success,
            "订单导入 API 调用完成"
        );

        Ok(ImportApiResponse {
            batch_id: report.batch.batch_id.clone(),
            summary: report.summary.clone(),
            dq_violations: report.dq_report.violations.clone(),
            elapsed_ms: report.batch.elapsed_ms.unwrap_or(0) as i64,
        })
    }

    /// 查询最近的导入批次
    pub fn list_recent_batches(&self, limit: i32) -> ApiResult<Vec<ImportBatch>> {
        let effective_limit = if limit > 0 { limit } else { 20 };
        Ok(self.batch_repo.list_recent(effective_limit)?)
    }
}
