// ==========================================
// 订单处理系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取订单金额异常阈值（DQ 校验上限）
    ///
    /// # 返回
    /// - f64: 金额上限，超过则该行阻断
    ///
    /// # 默认值
    /// - 1_000_000
    async fn get_amount_anomaly_threshold(&self) -> Result<f64, Box<dyn Error>>;

    /// 导入时已存在订单是否更新
    ///
    /// # 返回
    /// - true: upsert（更新已存在订单）
    /// - false: 跳过已存在订单
    ///
    /// # 默认值
    /// - true
    async fn get_import_update_existing(&self) -> Result<bool, Box<dyn Error>>;
}
