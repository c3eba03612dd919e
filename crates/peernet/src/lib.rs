//! 点对点聊天网络层
//!
//! 基于 libp2p 实现：mDNS 负责局域网内的节点发现（相当于信令服务器的角色），
//! identify 负责交换显示名称，request-response 协议负责聊天数据通道。
//!
//! 上层应用通过 [`PeerClient`] 与网络交互：命令从 [`PeerCommand`] 通道进入，
//! 事件从 [`PeerEvent`] 通道流出，所有 Swarm 细节都封装在本 crate 内。

use thiserror::Error;

pub mod client;
pub mod codec;
pub mod config;
pub mod directory;
pub mod message;

pub use client::{PeerClient, PeerCommand, PeerEvent};
pub use config::NodeConfig;
pub use directory::{PeerDirectory, PeerEntry};
pub use message::{SessionMessage, SessionResponse, TextMessage, CHAT_PROTOCOL};

/// 网络层错误
#[derive(Error, Debug)]
pub enum PeernetError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("Swarm 构建失败: {0}")]
    SwarmBuild(String),

    #[error("未找到名为 {0} 的节点")]
    PeerNotFound(String),

    #[error("已有进行中的通话")]
    Busy,
}

/// 网络层结果类型
pub type Result<T> = std::result::Result<T, PeernetError>;
