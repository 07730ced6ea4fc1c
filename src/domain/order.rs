// ==========================================
// 订单处理系统 - 订单领域模型
// ==========================================
// 用途: 导入层写入，流转引擎只改 status
// 对齐: orders 表
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 订单主数据
// ==========================================
// 红线: 订单由外部创建（导入层），本核心只做状态流转，不删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    // ===== 主键 =====
    pub order_id: i64, // 订单唯一标识

    // ===== 基础信息 =====
    pub customer_code: Option<String>, // 客户代码
    pub total_amount: Option<f64>,     // 订单金额
    pub placed_at: Option<NaiveDate>,  // 下单日期（ISO DATE）

    // ===== 状态 =====
    pub status: OrderStatus, // 当前状态（唯一事实层）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,  // 记录创建时间
    pub updated_at: DateTime<Utc>,  // 记录更新时间
    pub updated_by: Option<String>, // 操作人/系统标识
}

// ==========================================
// RawOrderRecord - 导入中间结构体
// ==========================================
// 用途: 导入管道中间产物（文件解析 → 字段映射 → 此结构）
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOrderRecord {
    // 源字段（已类型转换）
    pub order_id: Option<i64>,
    pub customer_code: Option<String>,
    pub total_amount: Option<f64>,
    pub placed_at: Option<NaiveDate>,
    pub status: Option<String>, // 源状态字面量，落库前必须通过解析校验

    // 元信息
    pub row_number: usize, // 原始文件行号（用于 DQ 报告）
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
// 用途: 记录导入批次元信息
// 对齐: import_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,                   // 批次 ID（UUID）
    pub file_name: Option<String>,          // 源文件名
    pub total_rows: i32,                    // 总行数
    pub success_rows: i32,                  // 成功导入行数
    pub blocked_rows: i32,                  // 阻断行数（DQ ERROR）
    pub conflict_rows: i32,                 // 冲突行数（批内重复）
    pub imported_at: Option<DateTime<Utc>>, // 导入时间
    pub imported_by: Option<String>,        // 导入人
    pub elapsed_ms: Option<i32>,            // 导入耗时（毫秒）
    pub dq_report_json: Option<String>,     // DQ 报告 JSON
}

// ==========================================
// DqLevel - 数据质量违规级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DqLevel {
    Error,   // 阻断：该行不落库
    Warning, // 警告：落库但记录
}

// ==========================================
// DqViolation - 数据质量违规记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqViolation {
    pub row_number: usize,     // 原始文件行号
    pub order_id: Option<i64>, // 订单号（如果可解析）
    pub level: DqLevel,        // 违规级别
    pub field: String,         // 违规字段
    pub message: String,       // 违规描述
}

// ==========================================
// DqReport - 数据质量报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqReport {
    pub batch_id: String,
    pub violations: Vec<DqViolation>,
    pub error_count: usize,
    pub warning_count: usize,
}

// ==========================================
// ImportSummary / ImportReport - 导入结果
// ==========================================
// 用途: 导入管道最终输出（批次信息 + DQ 报告 + 汇总统计）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub success: usize,
    pub blocked: usize,  // DQ ERROR 阻断行
    pub conflict: usize, // 批内重复行
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch: ImportBatch,
    pub dq_report: DqReport,
    pub summary: ImportSummary,
}
