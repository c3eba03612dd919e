//! 会话记录组件
//!
//! 会话界面的消息历史，自己的消息靠右，对方的消息靠左。

use peernet::TextMessage;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

/// 最大保留的消息条数
const MAX_ENTRIES: usize = 200;

/// 会话记录条目
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    /// 消息 ID（毫秒时间戳）
    pub id: i64,
    /// 消息内容
    pub text: String,
    /// 是否为本地发送
    pub mine: bool,
    /// 格式化后的本地时间
    pub time: String,
    /// 发送者名称
    pub user: String,
}

impl TranscriptEntry {
    /// 从本地发送的内容创建条目
    pub fn local(user: impl Into<String>, text: impl Into<String>) -> Self {
        let now = chrono::Local::now();
        Self {
            id: now.timestamp_millis(),
            text: text.into(),
            mine: true,
            time: now.format("%H:%M:%S").to_string(),
            user: user.into(),
        }
    }

    /// 从对方的消息创建条目
    pub fn remote(message: &TextMessage) -> Self {
        Self {
            id: message.id,
            text: message.content.clone(),
            mine: false,
            time: format_timestamp(message.timestamp),
            user: message.sender_name.clone(),
        }
    }
}

/// 毫秒时间戳转本地时间显示
fn format_timestamp(timestamp_millis: i64) -> String {
    use chrono::{DateTime, Local, Utc};
    match DateTime::<Utc>::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => String::from("--:--:--"),
    }
}

/// 会话记录状态
#[derive(Debug, Clone, Default)]
pub struct TranscriptState {
    /// 消息条目
    entries: Vec<TranscriptEntry>,
    /// 滚动偏移（从底部算起，0 表示跟随最新消息）
    scroll_offset: usize,
}

impl TranscriptState {
    /// 创建空记录
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加消息
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
        while self.entries.len() > MAX_ENTRIES {
            self.entries.remove(0);
        }
        // 新消息到达时回到底部
        self.scroll_offset = 0;
    }

    /// 清空记录（会话结束时调用）
    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll_offset = 0;
    }

    /// 向上滚动
    pub fn scroll_up(&mut self) {
        if self.scroll_offset < self.entries.len().saturating_sub(1) {
            self.scroll_offset += 1;
        }
    }

    /// 向下滚动
    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    /// 获取所有条目
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// 记录是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 当前滚动偏移
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }
}

/// 会话记录组件
pub struct Transcript<'a> {
    /// 记录状态
    pub state: &'a TranscriptState,
    /// 标题
    pub title: String,
    /// 边框样式
    pub border_style: Style,
}

impl<'a> Transcript<'a> {
    /// 创建新的会话记录
    pub fn new(state: &'a TranscriptState) -> Self {
        Self {
            state,
            title: "会话".to_string(),
            border_style: Style::default().fg(Color::Blue),
        }
    }

    /// 设置标题
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// 设置边框样式
    pub fn border_style(mut self, style: Style) -> Self {
        self.border_style = style;
        self
    }
}

impl<'a> Widget for Transcript<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(self.border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        if self.state.is_empty() {
            let hint = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "暂无消息，输入内容后按 Enter 发送",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            hint.render(inner, buf);
            return;
        }

        // 从底部往上布置消息，尊重滚动偏移
        let visible = inner.height as usize;
        let entries = self.state.entries();
        let end = entries.len().saturating_sub(self.state.scroll_offset());
        let start = end.saturating_sub(visible);

        let mut y = inner.top();
        for entry in &entries[start..end] {
            if y >= inner.bottom() {
                break;
            }

            let (style, alignment) = if entry.mine {
                (Style::default().fg(Color::Cyan), Alignment::Right)
            } else {
                (
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    Alignment::Left,
                )
            };

            let line = format!("[{}] {}: {}", entry.time, entry.user, entry.text);
            let line_area = Rect {
                x: inner.left(),
                y,
                width: inner.width,
                height: 1,
            };

            Paragraph::new(Line::from(Span::styled(line, style)))
                .alignment(alignment)
                .render(line_area, buf);
            y += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_clear() {
        let mut state = TranscriptState::new();
        state.push(TranscriptEntry::local("alice", "你好"));
        assert_eq!(state.entries().len(), 1);
        assert!(state.entries()[0].mine);

        state.clear();
        assert!(state.is_empty());
    }

    #[test]
    fn test_remote_entry_from_message() {
        let message = TextMessage::new("bob", "hello");
        let entry = TranscriptEntry::remote(&message);
        assert!(!entry.mine);
        assert_eq!(entry.user, "bob");
        assert_eq!(entry.text, "hello");
        assert_eq!(entry.id, message.id);
    }

    #[test]
    fn test_entries_capped() {
        let mut state = TranscriptState::new();
        for i in 0..(MAX_ENTRIES + 10) {
            state.push(TranscriptEntry::local("alice", format!("msg {}", i)));
        }
        assert_eq!(state.entries().len(), MAX_ENTRIES);
        // 最旧的消息被丢弃
        assert_eq!(state.entries()[0].text, "msg 10");
    }

    #[test]
    fn test_scroll_resets_on_push() {
        let mut state = TranscriptState::new();
        state.push(TranscriptEntry::local("alice", "a"));
        state.push(TranscriptEntry::local("alice", "b"));
        state.scroll_up();
        assert_eq!(state.scroll_offset(), 1);

        state.push(TranscriptEntry::local("alice", "c"));
        assert_eq!(state.scroll_offset(), 0);
    }

    #[test]
    fn test_format_timestamp_invalid() {
        assert_eq!(format_timestamp(i64::MAX), "--:--:--");
    }
}
