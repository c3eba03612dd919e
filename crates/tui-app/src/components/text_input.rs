//! 单行文本输入组件
//!
//! 身份界面的名字输入、目录界面的呼叫输入和会话界面的消息输入
//! 共用同一个输入状态。

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// 文本输入状态
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    /// 输入框内容
    buffer: String,
    /// 光标位置（字符偏移）
    cursor: usize,
}

impl TextInputState {
    /// 创建新的输入状态
    pub fn new() -> Self {
        Self::default()
    }

    /// 以预填内容创建输入状态，光标落在行尾
    pub fn with_text(text: impl Into<String>) -> Self {
        let buffer = text.into();
        let cursor = buffer.chars().count();
        Self { buffer, cursor }
    }

    /// 处理输入字符
    pub fn handle_char(&mut self, c: char) {
        let byte_pos = self.byte_position(self.cursor);
        self.buffer.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// 处理退格键
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let byte_pos = self.byte_position(self.cursor - 1);
            self.buffer.remove(byte_pos);
            self.cursor -= 1;
        }
    }

    /// 处理删除键
    pub fn handle_delete(&mut self) {
        if self.cursor < self.buffer.chars().count() {
            let byte_pos = self.byte_position(self.cursor);
            self.buffer.remove(byte_pos);
        }
    }

    /// 左移光标
    pub fn move_cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// 右移光标
    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.buffer.chars().count() {
            self.cursor += 1;
        }
    }

    /// 移动光标到行首
    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    /// 移动光标到行尾
    pub fn move_cursor_end(&mut self) {
        self.cursor = self.buffer.chars().count();
    }

    /// 获取输入内容并清空
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }

    /// 获取输入内容（不清空）
    pub fn input(&self) -> &str {
        &self.buffer
    }

    /// 光标位置
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 输入是否为空
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 字符偏移转字节偏移（支持多字节字符）
    fn byte_position(&self, char_pos: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }
}

/// 输入框组件
pub struct InputBox<'a> {
    /// 输入状态
    pub state: &'a TextInputState,
    /// 标题
    pub title: String,
    /// 占位提示（输入为空时显示）
    pub placeholder: String,
    /// 是否有焦点
    pub focused: bool,
}

impl<'a> InputBox<'a> {
    /// 创建新的输入框
    pub fn new(state: &'a TextInputState) -> Self {
        Self {
            state,
            title: String::new(),
            placeholder: String::new(),
            focused: false,
        }
    }

    /// 设置标题
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// 设置占位提示
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// 设置是否有焦点
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl<'a> Widget for InputBox<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let content = if self.state.is_empty() && !self.placeholder.is_empty() {
            Line::from(Span::styled(
                self.placeholder.clone(),
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            let cursor = if self.focused { "█" } else { "" };
            Line::from(Span::styled(
                format!("> {}{}", self.state.input(), cursor),
                Style::default().fg(Color::White),
            ))
        };

        let paragraph = Paragraph::new(content)
            .block(
                Block::default()
                    .title(self.title)
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .alignment(Alignment::Left);

        paragraph.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_char() {
        let mut state = TextInputState::new();
        state.handle_char('H');
        state.handle_char('i');
        assert_eq!(state.input(), "Hi");
        assert_eq!(state.cursor(), 2);
    }

    #[test]
    fn test_handle_backspace() {
        let mut state = TextInputState::new();
        state.handle_char('H');
        state.handle_char('i');
        state.handle_backspace();
        assert_eq!(state.input(), "H");
        assert_eq!(state.cursor(), 1);
    }

    #[test]
    fn test_take() {
        let mut state = TextInputState::new();
        state.handle_char('H');
        state.handle_char('i');
        let input = state.take();
        assert_eq!(input, "Hi");
        assert!(state.is_empty());
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn test_multibyte_input() {
        let mut state = TextInputState::new();
        state.handle_char('你');
        state.handle_char('好');
        assert_eq!(state.input(), "你好");

        state.move_cursor_left();
        state.handle_char('们');
        assert_eq!(state.input(), "你们好");

        state.handle_backspace();
        assert_eq!(state.input(), "你好");
    }

    #[test]
    fn test_with_text() {
        let state = TextInputState::with_text("客厅电视");
        assert_eq!(state.input(), "客厅电视");
        assert_eq!(state.cursor(), 4);
    }

    #[test]
    fn test_cursor_movement() {
        let mut state = TextInputState::new();
        state.handle_char('A');
        state.handle_char('B');
        state.handle_char('C');
        assert_eq!(state.cursor(), 3);

        state.move_cursor_home();
        assert_eq!(state.cursor(), 0);

        state.move_cursor_end();
        assert_eq!(state.cursor(), 3);

        state.move_cursor_left();
        assert_eq!(state.cursor(), 2);

        state.move_cursor_right();
        assert_eq!(state.cursor(), 3);
    }
}
