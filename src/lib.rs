//! # Student Form Submit
//!
//! 一个用于把表格中的学员信息逐条录入报名网站的 Rust 应用程序
//!
//! 程序只负责填写表单；照片上传和最终提交由操作员在浏览器中手动完成。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器页面），只暴露能力
//! - `BrowserSession` - 页面操作接口，便于替换为测试实现
//! - `CdpSession` - 基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `SessionController` - 登录、导航、填写单个字段、退出
//! - `FieldMapper` - 表格列到表单字段的转换
//! - `OperatorGate` - 等待操作员确认
//! - `RunObserver` - 运行事件记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一位学员"的完整处理流程
//! - `RecordCtx` - 上下文封装（序号 + 行号 + 姓名）
//! - `RecordFlow` - 状态机（导航 → 填写 → 截图 → 人工确认）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 组装组件
//! - `orchestrator/run_coordinator` - 登录、读取数据、逐条处理、清理
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::open_session;
pub use config::{Config, Credentials};
pub use error::{AppError, AppResult};
pub use infrastructure::{BrowserSession, CdpSession};
pub use models::{Batch, Record, RecordOutcome, RunAbort, RunResult};
pub use orchestrator::{App, RunCoordinator};
pub use workflow::{RecordCtx, RecordFlow};
