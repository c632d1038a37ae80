//! 运行观察者 - 业务能力层
//!
//! 只负责"记录发生了什么"，不参与流程控制

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

/// 事件级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

impl EventLevel {
    fn as_str(self) -> &'static str {
        match self {
            EventLevel::Info => "INFO",
            EventLevel::Warn => "WARN",
            EventLevel::Error => "ERROR",
        }
    }
}

/// 一条结构化事件，可附带截图路径
#[derive(Debug, Clone)]
pub struct ObserverEvent {
    pub timestamp: DateTime<Local>,
    pub level: EventLevel,
    pub message: String,
    pub snapshot: Option<PathBuf>,
}

impl ObserverEvent {
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
            snapshot: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, message)
    }

    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }
}

/// 事件接收方，实现不得影响流程
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &ObserverEvent);
}

/// 默认观察者：输出到 tracing，并可追加写入审计文件
pub struct TracingObserver {
    audit_path: Option<PathBuf>,
}

impl TracingObserver {
    pub fn new(audit_path: Option<impl Into<PathBuf>>) -> Self {
        Self {
            audit_path: audit_path.map(Into::into),
        }
    }

    fn append(&self, event: &ObserverEvent) -> std::io::Result<()> {
        let Some(path) = &self.audit_path else {
            return Ok(());
        };

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut line = format!(
            "{} [{}] {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.level.as_str(),
            event.message
        );
        if let Some(snapshot) = &event.snapshot {
            line.push_str(&format!(" | 截图: {}", snapshot.display()));
        }
        line.push('\n');
        file.write_all(line.as_bytes())
    }
}

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &ObserverEvent) {
        match (event.level, &event.snapshot) {
            (EventLevel::Info, None) => info!("{}", event.message),
            (EventLevel::Info, Some(path)) => info!("{} (截图: {})", event.message, path.display()),
            (EventLevel::Warn, None) => warn!("{}", event.message),
            (EventLevel::Warn, Some(path)) => warn!("{} (截图: {})", event.message, path.display()),
            (EventLevel::Error, None) => error!("{}", event.message),
            (EventLevel::Error, Some(path)) => {
                error!("{} (截图: {})", event.message, path.display())
            }
        }

        if let Err(e) = self.append(event) {
            warn!("写入审计文件失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_file_gets_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let observer = TracingObserver::new(Some(&path));

        observer.on_event(&ObserverEvent::info("登录成功"));
        observer.on_event(
            &ObserverEvent::error("无法进入表单页").with_snapshot(PathBuf::from("snapshots/error_3.png")),
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO] 登录成功"));
        assert!(lines[1].contains("[ERROR] 无法进入表单页"));
        assert!(lines[1].contains("error_3.png"));
    }

    #[test]
    fn test_without_audit_file_nothing_is_written() {
        let observer = TracingObserver::new(None::<PathBuf>);
        assert!(observer.append(&ObserverEvent::warn("x")).is_ok());
    }
}
