//! 事件处理模块
//!
//! 统一键盘输入、网络事件和定时刷新为一个事件流。

use crossterm::event::KeyEvent;
use peernet::{PeerEvent, PeernetError};

/// 应用事件
#[derive(Debug, Clone)]
pub enum Event {
    /// 键盘输入事件
    Input(KeyEvent),
    /// 网络事件
    Net(PeerEvent),
    /// 定时刷新事件
    Tick,
}

/// 应用错误类型
#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Send(String),
    Net(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "IO 错误: {}", err),
            AppError::Send(err) => write!(f, "发送错误: {}", err),
            AppError::Net(err) => write!(f, "网络错误: {}", err),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<tokio::sync::mpsc::error::SendError<Event>> for AppError {
    fn from(err: tokio::sync::mpsc::error::SendError<Event>) -> Self {
        AppError::Send(err.to_string())
    }
}

impl From<PeernetError> for AppError {
    fn from(err: PeernetError) -> Self {
        AppError::Net(err.to_string())
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;
