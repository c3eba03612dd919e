//! UI 渲染模块
//!
//! 按当前界面分发渲染：身份界面、目录界面、会话界面。

use crate::components::{InputBox, PeerList, Transcript};
use crate::{Screen, TuiApp};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// 绘制 UI
pub fn draw_ui(f: &mut Frame, app: &TuiApp) {
    match app.screen() {
        Screen::Identity => draw_identity(f, app),
        Screen::Directory => draw_directory(f, app),
        Screen::Conversation => draw_conversation(f, app),
    }
}

/// 身份界面：居中的名字输入框
fn draw_identity(f: &mut Frame, app: &TuiApp) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    let prompt = Paragraph::new(Line::from(Span::styled(
        "输入你的名字",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(prompt, chunks[1]);

    // 输入框水平居中
    let input_area = centered_horizontal(chunks[2], 40);
    let input = InputBox::new(app.name_input()).focused(true);
    f.render_widget(input, input_area);

    draw_footer(f, chunks[4], app, "[Enter] 确认 | [Esc] 退出");
}

/// 目录界面：节点列表 + 呼叫输入框
fn draw_directory(f: &mut Frame, app: &TuiApp) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(size);

    // Header：问候语 + 本地 Peer ID
    let peer_id_text = match app.local_peer_id() {
        Some(peer_id) => format!(" ({})", peer_id),
        None => String::new(),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("你好, {}", app.local_name()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(peer_id_text, Style::default().fg(Color::DarkGray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    )
    .alignment(Alignment::Left);
    f.render_widget(header, chunks[0]);

    // Body：节点列表
    let peer_list = PeerList::new(app.peer_list())
        .title("在线节点 (↑↓ 选择)")
        .border_style(Style::default().fg(Color::Blue));
    f.render_widget(peer_list, chunks[1]);

    // 呼叫输入框
    let call_input = InputBox::new(app.call_input())
        .title("呼叫")
        .placeholder("输入名称，或直接 Enter 呼叫选中的节点")
        .focused(true);
    f.render_widget(call_input, chunks[2]);

    draw_footer(f, chunks[3], app, "[Enter] 呼叫 | [↑↓] 选择 | [Esc] 退出");
}

/// 会话界面：消息记录 + 消息输入框
fn draw_conversation(f: &mut Frame, app: &TuiApp) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(size);

    // Header：双方名称
    let remote = app.remote_name().unwrap_or("未知节点");
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            app.local_name().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ⬄ "),
        Span::styled(
            remote.to_string(),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    )
    .alignment(Alignment::Center);
    f.render_widget(header, chunks[0]);

    // Body：会话记录
    let transcript = Transcript::new(app.transcript())
        .title("会话")
        .border_style(Style::default().fg(Color::Blue));
    f.render_widget(transcript, chunks[1]);

    // 消息输入框
    let message_input = InputBox::new(app.message_input())
        .title("消息")
        .focused(true);
    f.render_widget(message_input, chunks[2]);

    draw_footer(f, chunks[3], app, "[Enter] 发送 | [↑↓] 滚动 | [Esc] 挂断");
}

/// 绘制底部状态栏：优先显示状态提示，否则显示按键帮助
fn draw_footer(f: &mut Frame, area: Rect, app: &TuiApp, help: &str) {
    let (text, style) = match app.status() {
        Some(status) => (status.to_string(), Style::default().fg(Color::Yellow)),
        None => (help.to_string(), Style::default().fg(Color::Gray)),
    };

    let footer = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

/// 在给定区域内水平居中一个固定宽度的子区域
fn centered_horizontal(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y,
        width,
        height: area.height,
    }
}
