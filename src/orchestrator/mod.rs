//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次完整运行的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 打开浏览器会话
//! - 组装数据源、观察者、人工确认通道
//!
//! ### `run_coordinator` - 运行编排器
//! - 登录（带重试）
//! - 读取一次数据源
//! - 按顺序逐条处理学员，每条之前回到首页
//! - 汇总结果，保证只清理一次会话
//!
//! ### `interrupt` - Ctrl-C 处理
//! - 第一次中断在两条记录之间停止，第二次立即退出
//!
//! ## 层次关系
//!
//! ```text
//! app (组装)
//!     ↓
//! run_coordinator (处理 Batch)
//!     ↓
//! workflow::RecordFlow (处理单个 Record)
//!     ↓
//! services (能力层：session / mapper / gate / observer)
//!     ↓
//! infrastructure (基础设施：BrowserSession)
//! ```
//!
//! ## 设计原则
//!
//! 1. **顺序处理**：同一时间只处理一位学员
//! 2. **资源隔离**：浏览器会话只由 SessionController 持有
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做字段转换

pub mod app;
pub mod interrupt;
pub mod run_coordinator;

// 重新导出主要类型
pub use app::App;
pub use run_coordinator::RunCoordinator;
