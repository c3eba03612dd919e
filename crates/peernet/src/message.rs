//! 会话消息协议
//!
//! 定义聊天会话使用的消息类型。呼叫建立、文本传输、挂断都走同一个
//! request-response 协议。

use serde::{Deserialize, Serialize};

/// 聊天协议名称
pub const CHAT_PROTOCOL: &str = "/peerchat/chat/1.0.0";

/// 会话消息（请求方向）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionMessage {
    /// 呼叫建立请求，携带呼叫方的显示名称
    Hello { name: String },
    /// 文本消息
    Text(TextMessage),
    /// 挂断通知
    Bye,
}

/// 会话响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionResponse {
    /// 接受呼叫，携带被叫方的显示名称
    Accepted { name: String },
    /// 对方已有进行中的会话
    Busy,
    /// 已收到（传输层确认，不向上层暴露投递保证）
    Received,
}

/// 文本消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextMessage {
    /// 消息 ID（由发送时刻的毫秒时间戳派生）
    pub id: i64,

    /// 发送者的显示名称
    pub sender_name: String,

    /// 消息内容
    pub content: String,

    /// Unix 时间戳（毫秒）
    pub timestamp: i64,
}

impl TextMessage {
    /// 创建新的文本消息，ID 与时间戳取自当前时刻
    pub fn new(sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: now,
            sender_name: sender_name.into(),
            content: content.into(),
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_creation() {
        let msg = TextMessage::new("alice", "hello");
        assert_eq!(msg.sender_name, "alice");
        assert_eq!(msg.content, "hello");
        assert!(msg.timestamp > 0);
        assert_eq!(msg.id, msg.timestamp);
    }

    #[test]
    fn test_session_message_serialization() {
        let original = SessionMessage::Text(TextMessage::new("alice", "你好"));
        let json = serde_json::to_vec(&original).unwrap();
        let decoded: SessionMessage = serde_json::from_slice(&json).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_hello_serialization() {
        let hello = SessionMessage::Hello {
            name: "bob".to_string(),
        };
        let json = serde_json::to_string(&hello).unwrap();
        assert!(json.contains("bob"));

        let decoded: SessionMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(hello, decoded);
    }

    #[test]
    fn test_response_variants() {
        let accepted = SessionResponse::Accepted {
            name: "bob".to_string(),
        };
        let json = serde_json::to_vec(&accepted).unwrap();
        let decoded: SessionResponse = serde_json::from_slice(&json).unwrap();
        assert_eq!(accepted, decoded);

        assert_ne!(SessionResponse::Busy, SessionResponse::Received);
    }
}
