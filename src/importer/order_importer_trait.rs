// ==========================================
// 订单处理系统 - 订单导入 Trait
// ==========================================
// 职责: 定义订单导入接口（不包含实现）
// ==========================================

use crate::domain::order::{DqReport, DqViolation, ImportReport, RawOrderRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

// ==========================================
// OrderImporter Trait
// ==========================================
// 用途: 订单导入主接口
// 实现者: OrderImporterImpl
#[async_trait]
pub trait OrderImporter: Send + Sync {
    /// 从 CSV 文件导入订单数据
    ///
    /// # 参数
    /// - file_path: CSV 文件路径（.csv）
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入结果（批次信息、DQ 报告、汇总统计）
    /// - Err: 文件读取错误、数据库错误等
    ///
    /// # 导入流程
    /// 1. 文件读取与解析
    /// 2. 字段映射与类型转换
    /// 3. DQ 校验（主键/状态/金额）
    /// 4. 冲突检测（批内重复、跨批次重复）
    /// 5. 落库（事务化）+ 批次记录 + DQ 报告生成
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> Result<ImportReport, Box<dyn Error>>;

    /// 批量导入多个文件
    ///
    /// # 参数
    /// - file_paths: 文件路径列表
    ///
    /// # 返回
    /// - Ok(Vec<Result<ImportReport, String>>): 每个文件的导入结果
    ///
    /// # 说明
    /// - 每个文件的导入是独立的，互不影响
    /// - 如果某个文件导入失败，不影响其他文件
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
    ) -> Result<Vec<Result<ImportReport, String>>, Box<dyn Error>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>）
    ///
    /// # 返回
    /// - Ok(Vec<HashMap<String, String>>): 行记录列表
    /// - Err: 文件读取错误、格式错误
    fn parse_to_raw_records(
        &self,
        file_path: &Path,
    ) -> Result<Vec<HashMap<String, String>>, Box<dyn Error>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 1）
// 实现者: OrderFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 将原始行记录映射为 RawOrderRecord
    ///
    /// # 参数
    /// - row: 原始行记录（HashMap<列名, 值>）
    /// - row_number: 行号（用于 DQ 报告）
    ///
    /// # 返回
    /// - Ok(RawOrderRecord): 映射后的中间结构体
    /// - Err: 类型转换错误
    fn map_to_raw_order(
        &self,
        row: HashMap<String, String>,
        row_number: usize,
    ) -> Result<RawOrderRecord, Box<dyn Error>>;
}

// ==========================================
// DqValidator Trait
// ==========================================
// 用途: 数据质量校验接口（阶段 2）
// 实现者: OrderDqValidator
pub trait DqValidator: Send + Sync {
    /// 校验主键（order_id 非空且为正）
    fn validate_primary_key(&self, records: &[RawOrderRecord]) -> Vec<DqViolation>;

    /// 校验状态字面量（必填且可解析）
    fn validate_status(&self, record: &RawOrderRecord) -> Vec<DqViolation>;

    /// 校验金额范围（负值阻断，超阈值警告）
    fn validate_amount(&self, record: &RawOrderRecord, threshold: f64) -> Vec<DqViolation>;

    /// 生成 DQ 报告
    fn generate_dq_report(&self, batch_id: String, violations: Vec<DqViolation>) -> DqReport;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 冲突处理接口（阶段 3）
// 实现者: OrderConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检测同批次内重复订单号（首次出现之外的行）
    ///
    /// # 返回
    /// - Vec<(usize, i64)>: (行号, order_id) 重复记录列表
    fn detect_duplicates(&self, records: &[RawOrderRecord]) -> Vec<(usize, i64)>;

    /// 检测跨批次重复订单号（数据库已存在）
    ///
    /// # 返回
    /// - Vec<(usize, i64)>: (行号, order_id) 跨批次重复记录列表
    fn detect_cross_batch_duplicates(
        &self,
        records: &[RawOrderRecord],
        existing_ids: &[i64],
    ) -> Vec<(usize, i64)>;
}
