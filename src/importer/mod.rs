// ==========================================
// 订单处理系统 - 导入层
// ==========================================
// 职责: 外部订单数据导入（订单由外部创建，流转核心不造单）
// 支持: CSV
// ==========================================

// 模块声明
pub mod conflict_handler;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod order_importer_impl;
pub mod order_importer_trait;

// 重导出核心类型
pub use conflict_handler::OrderConflictHandler;
pub use dq_validator::OrderDqValidator;
pub use error::{ImportError, ImportResult};
pub use field_mapper::OrderFieldMapper;
pub use file_parser::CsvParser;
pub use order_importer_impl::OrderImporterImpl;

// 重导出 Trait 接口
pub use order_importer_trait::{
    ConflictHandler, DqValidator, FieldMapper, FileParser, OrderImporter,
};
