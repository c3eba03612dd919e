//! TUI 应用模块
//!
//! 提供基于 Ratatui 的终端用户界面：身份界面输入名字，目录界面查看
//! 在线节点并发起呼叫，会话界面收发消息。

pub mod app;
pub mod components;
pub mod event;
pub mod ui;

pub use app::{Screen, TuiApp};
pub use event::{AppResult, Event};

/// 运行 TUI 应用的便捷函数
pub use app::run_tui;
