//! 节点列表组件
//!
//! 目录界面的在线节点列表，显示已发现节点及其名称。

use libp2p::PeerId;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Widget},
};

/// 节点列表项
#[derive(Debug, Clone)]
pub struct PeerItem {
    pub peer_id: PeerId,
    /// 显示名称（identify 完成前为 None）
    pub name: Option<String>,
}

impl PeerItem {
    /// 获取显示名称（未命名时退回 Peer ID）
    pub fn display_name(&self) -> String {
        match self.name {
            Some(ref name) => name.clone(),
            None => self.peer_id.to_string(),
        }
    }
}

/// 节点列表状态
#[derive(Debug, Clone, Default)]
pub struct PeerListState {
    /// 节点列表
    pub items: Vec<PeerItem>,
    /// 光标位置
    pub cursor: usize,
}

impl PeerListState {
    /// 创建空列表
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点（已存在时忽略）
    pub fn add_peer(&mut self, peer_id: PeerId) {
        if !self.items.iter().any(|n| n.peer_id == peer_id) {
            self.items.push(PeerItem {
                peer_id,
                name: None,
            });
        }
    }

    /// 设置节点名称，必要时创建条目
    pub fn set_name(&mut self, peer_id: PeerId, name: String) {
        match self.items.iter_mut().find(|n| n.peer_id == peer_id) {
            Some(item) => item.name = Some(name),
            None => self.items.push(PeerItem {
                peer_id,
                name: Some(name),
            }),
        }
    }

    /// 移除节点
    pub fn remove_peer(&mut self, peer_id: &PeerId) {
        if let Some(pos) = self.items.iter().position(|n| n.peer_id == *peer_id) {
            self.items.remove(pos);
            if self.cursor >= self.items.len() && !self.items.is_empty() {
                self.cursor = self.items.len() - 1;
            }
        }
    }

    /// 获取当前光标项
    pub fn get_current(&self) -> Option<&PeerItem> {
        self.items.get(self.cursor)
    }

    /// 移动光标向上
    pub fn move_up(&mut self) {
        if !self.items.is_empty() && self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    /// 移动光标向下
    pub fn move_down(&mut self) {
        if !self.items.is_empty() && self.cursor < self.items.len() - 1 {
            self.cursor += 1;
        }
    }

    /// 列表是否为空
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 节点列表组件
pub struct PeerList<'a> {
    /// 列表状态
    pub state: &'a PeerListState,
    /// 标题
    pub title: String,
    /// 边框样式
    pub border_style: Style,
}

impl<'a> PeerList<'a> {
    /// 创建新的节点列表
    pub fn new(state: &'a PeerListState) -> Self {
        Self {
            state,
            title: "在线节点".to_string(),
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

impl<'a> Widget for PeerList<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let items: Vec<ListItem> = self
            .state
            .items
            .iter()
            .enumerate()
            .map(|(i, peer)| {
                let cursor = if i == self.state.cursor { ">" } else { " " };
                // 已命名的节点可以呼叫，未命名的只显示 Peer ID
                let style = if peer.name.is_some() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let label = match peer.name {
                    Some(ref name) => format!("{} {}", cursor, name),
                    None => format!("{} {} (识别中...)", cursor, peer.peer_id),
                };
                ListItem::new(label).style(style)
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(self.title)
                    .borders(Borders::ALL)
                    .border_style(self.border_style),
            )
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

        list.render(area, buf);
    }
}
