//! TUI 应用主逻辑
//!
//! 管理三个界面（身份、目录、会话）的状态和主事件循环。
//! 网络任务在用户提交名字后才启动，显示名称随身份一起公布。

use crate::components::{PeerListState, TextInputState, TranscriptEntry, TranscriptState};
use crate::event::{AppResult, Event};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use libp2p::PeerId;
use peernet::{NodeConfig, PeerClient, PeerCommand, PeerEvent};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::time::Duration;
use tokio::sync::mpsc;

/// 当前界面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// 身份界面：输入显示名称
    Identity,
    /// 目录界面：查看在线节点并发起呼叫
    Directory,
    /// 会话界面：与单个节点收发消息
    Conversation,
}

/// TUI 应用
pub struct TuiApp {
    /// 当前界面
    screen: Screen,
    /// 本地显示名称（身份界面提交后设置）
    local_name: String,
    /// 本地 Peer ID（网络任务启动后设置）
    local_peer_id: Option<PeerId>,
    /// 名字输入框
    name_input: TextInputState,
    /// 呼叫输入框
    call_input: TextInputState,
    /// 消息输入框
    message_input: TextInputState,
    /// 节点列表状态
    peer_list: PeerListState,
    /// 会话记录状态
    transcript: TranscriptState,
    /// 会话对端名称
    remote_name: Option<String>,
    /// 状态栏提示
    status: Option<String>,
    /// 网络命令发送器
    cmd_tx: Option<mpsc::Sender<PeerCommand>>,
    /// 应用事件发送器（在 run() 中设置）
    event_tx: Option<mpsc::Sender<Event>>,
    /// 运行状态
    running: bool,
}

impl TuiApp {
    /// 创建新的 TUI 应用
    ///
    /// `initial_name` 会预填到身份界面的输入框，用户确认后生效。
    pub fn new(initial_name: Option<String>) -> Self {
        let name_input = match initial_name {
            Some(name) => TextInputState::with_text(name),
            None => TextInputState::new(),
        };

        Self {
            screen: Screen::Identity,
            local_name: String::new(),
            local_peer_id: None,
            name_input,
            call_input: TextInputState::new(),
            message_input: TextInputState::new(),
            peer_list: PeerListState::new(),
            transcript: TranscriptState::new(),
            remote_name: None,
            status: None,
            cmd_tx: None,
            event_tx: None,
            running: true,
        }
    }

    /// 运行应用
    pub async fn run(&mut self) -> AppResult<()> {
        use crossterm::event::EventStream;

        // 启用原始模式并进入备用屏幕
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;

        // 创建事件通道
        let (event_tx, mut event_rx) = mpsc::channel(100);
        self.event_tx = Some(event_tx.clone());

        // 启动键盘监听
        let event_tx_clone = event_tx.clone();
        tokio::spawn(async move {
            let mut reader = EventStream::new();
            while let Some(event) = reader.next().await {
                match event {
                    Ok(crossterm::event::Event::Key(key_event)) => {
                        if key_event.kind == crossterm::event::KeyEventKind::Press
                            && event_tx_clone.send(Event::Input(key_event)).await.is_err()
                        {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!("键盘事件错误: {:?}", err);
                        break;
                    }
                }
            }
        });

        // 启动定时器
        let event_tx_clone = event_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(250));
            loop {
                interval.tick().await;
                if event_tx_clone.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        });

        // 主事件循环
        while self.running {
            terminal.draw(|f| {
                crate::ui::draw_ui(f, self);
            })?;

            match event_rx.recv().await {
                Some(Event::Input(key_event)) => {
                    self.handle_key_event(key_event);
                }
                Some(Event::Net(net_event)) => {
                    self.handle_net_event(net_event);
                }
                Some(Event::Tick) => {}
                None => break,
            }
        }

        // 清理
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;

        Ok(())
    }

    /// 处理键盘事件
    fn handle_key_event(&mut self, key_event: KeyEvent) {
        // Ctrl+C 在任何界面都退出
        if key_event.code == KeyCode::Char('c')
            && key_event.modifiers.contains(KeyModifiers::CONTROL)
        {
            self.running = false;
            return;
        }

        match self.screen {
            Screen::Identity => self.handle_identity_key(key_event),
            Screen::Directory => self.handle_directory_key(key_event),
            Screen::Conversation => self.handle_conversation_key(key_event),
        }
    }

    /// 身份界面按键
    fn handle_identity_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Enter => self.submit_name(),
            KeyCode::Esc => self.running = false,
            KeyCode::Backspace => self.name_input.handle_backspace(),
            KeyCode::Delete => self.name_input.handle_delete(),
            KeyCode::Left => self.name_input.move_cursor_left(),
            KeyCode::Right => self.name_input.move_cursor_right(),
            KeyCode::Home => self.name_input.move_cursor_home(),
            KeyCode::End => self.name_input.move_cursor_end(),
            KeyCode::Char(c) => self.name_input.handle_char(c),
            _ => {}
        }
    }

    /// 目录界面按键
    fn handle_directory_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Enter => self.submit_call(),
            KeyCode::Esc => self.running = false,
            KeyCode::Up => self.peer_list.move_up(),
            KeyCode::Down => self.peer_list.move_down(),
            KeyCode::Backspace => self.call_input.handle_backspace(),
            KeyCode::Delete => self.call_input.handle_delete(),
            KeyCode::Left => self.call_input.move_cursor_left(),
            KeyCode::Right => self.call_input.move_cursor_right(),
            KeyCode::Home => self.call_input.move_cursor_home(),
            KeyCode::End => self.call_input.move_cursor_end(),
            KeyCode::Char(c) => self.call_input.handle_char(c),
            _ => {}
        }
    }

    /// 会话界面按键
    fn handle_conversation_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Enter => self.submit_message(),
            KeyCode::Esc => self.hang_up(),
            KeyCode::Up => self.transcript.scroll_up(),
            KeyCode::Down => self.transcript.scroll_down(),
            KeyCode::Backspace => self.message_input.handle_backspace(),
            KeyCode::Delete => self.message_input.handle_delete(),
            KeyCode::Left => self.message_input.move_cursor_left(),
            KeyCode::Right => self.message_input.move_cursor_right(),
            KeyCode::Home => self.message_input.move_cursor_home(),
            KeyCode::End => self.message_input.move_cursor_end(),
            KeyCode::Char(c) => self.message_input.handle_char(c),
            _ => {}
        }
    }

    /// 提交显示名称，启动网络任务并进入目录界面
    fn submit_name(&mut self) {
        let name = self.name_input.input().trim().to_string();
        if name.is_empty() {
            self.status = Some("名字不能为空".to_string());
            return;
        }

        self.local_name = name;
        self.status = None;
        self.start_network();
        self.screen = Screen::Directory;
    }

    /// 发起呼叫：优先使用输入框中的名称，否则呼叫列表中选中的节点
    fn submit_call(&mut self) {
        let typed = self.call_input.input().trim().to_string();
        let target = if !typed.is_empty() {
            Some(typed)
        } else {
            self.peer_list
                .get_current()
                .and_then(|peer| peer.name.clone())
        };

        let name = match target {
            Some(name) => name,
            None => {
                self.status = Some("请输入或选择要呼叫的名称".to_string());
                return;
            }
        };

        if name == self.local_name {
            self.status = Some("不能呼叫自己".to_string());
            return;
        }

        self.call_input.take();
        self.status = Some(format!("正在呼叫 {} ...", name));
        self.send_command(PeerCommand::Call { name });
    }

    /// 发送消息：本地立即上屏，同时交给网络任务投递
    fn submit_message(&mut self) {
        let content = self.message_input.take();
        if content.trim().is_empty() {
            return;
        }

        self.transcript
            .push(TranscriptEntry::local(self.local_name.clone(), content.clone()));
        self.send_command(PeerCommand::SendText { content });
    }

    /// 挂断当前会话并返回目录界面
    fn hang_up(&mut self) {
        self.send_command(PeerCommand::HangUp);
        self.leave_conversation();
        self.status = Some("通话已结束".to_string());
    }

    /// 处理网络事件
    fn handle_net_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Ready { peer_id } => {
                self.local_peer_id = Some(peer_id);
            }
            PeerEvent::ListenAddr(addr) => {
                tracing::debug!("监听地址: {}", addr);
            }
            PeerEvent::PeerFound { peer_id } => {
                self.peer_list.add_peer(peer_id);
            }
            PeerEvent::PeerNamed { peer_id, name } => {
                self.peer_list.set_name(peer_id, name);
            }
            PeerEvent::PeerLost { peer_id } => {
                self.peer_list.remove_peer(&peer_id);
            }
            PeerEvent::NameConflict { name, .. } => {
                self.status = Some(format!("警告: 网络中已有节点使用名称 {}", name));
            }
            PeerEvent::CallEstablished { name, .. } => {
                self.remote_name = Some(name);
                self.transcript.clear();
                self.message_input.take();
                self.status = None;
                self.screen = Screen::Conversation;
            }
            PeerEvent::MessageReceived { message, .. } => {
                self.transcript.push(TranscriptEntry::remote(&message));
            }
            PeerEvent::CallFailed { name, reason } => {
                self.status = Some(format!("呼叫 {} 失败: {}", name, reason));
            }
            PeerEvent::CallClosed { .. } => {
                if self.screen == Screen::Conversation {
                    self.leave_conversation();
                    self.status = Some("通话已结束".to_string());
                }
            }
        }
    }

    /// 返回目录界面并丢弃会话状态
    fn leave_conversation(&mut self) {
        self.screen = Screen::Directory;
        self.remote_name = None;
        self.transcript.clear();
        self.message_input.take();
    }

    /// 启动网络任务（事件通道未就绪时跳过）
    fn start_network(&mut self) {
        let event_tx = match self.event_tx {
            Some(ref tx) => tx.clone(),
            None => return,
        };

        let config = NodeConfig::new(self.local_name.clone());
        let (cmd_tx, cmd_rx) = mpsc::channel(100);

        let (client, mut net_rx) = match PeerClient::new(config, cmd_rx) {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!("网络任务启动失败: {}", err);
                self.status = Some(format!("网络启动失败: {}", err));
                return;
            }
        };

        self.cmd_tx = Some(cmd_tx);

        tokio::spawn(client.run());

        // 把网络事件转发进应用事件循环
        tokio::spawn(async move {
            while let Some(net_event) = net_rx.recv().await {
                if event_tx.send(Event::Net(net_event)).await.is_err() {
                    break;
                }
            }
        });
    }

    /// 向网络任务发送命令
    fn send_command(&mut self, cmd: PeerCommand) {
        if let Some(ref cmd_tx) = self.cmd_tx {
            if let Err(err) = cmd_tx.try_send(cmd) {
                tracing::error!("命令发送失败: {:?}", err);
                self.status = Some("网络任务不可用".to_string());
            }
        } else {
            tracing::warn!("网络任务尚未启动，忽略命令");
        }
    }

    /// 当前界面
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// 本地显示名称
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// 本地 Peer ID
    pub fn local_peer_id(&self) -> Option<PeerId> {
        self.local_peer_id
    }

    /// 名字输入框状态
    pub fn name_input(&self) -> &TextInputState {
        &self.name_input
    }

    /// 呼叫输入框状态
    pub fn call_input(&self) -> &TextInputState {
        &self.call_input
    }

    /// 消息输入框状态
    pub fn message_input(&self) -> &TextInputState {
        &self.message_input
    }

    /// 节点列表状态
    pub fn peer_list(&self) -> &PeerListState {
        &self.peer_list
    }

    /// 会话记录状态
    pub fn transcript(&self) -> &TranscriptState {
        &self.transcript
    }

    /// 会话对端名称
    pub fn remote_name(&self) -> Option<&str> {
        self.remote_name.as_deref()
    }

    /// 状态栏提示
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

/// 运行 TUI 应用的便捷函数
pub async fn run_tui(initial_name: Option<String>) -> AppResult<()> {
    let mut app = TuiApp::new(initial_name);
    app.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use peernet::TextMessage;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut TuiApp, text: &str) {
        for c in text.chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_starts_on_identity_screen() {
        let app = TuiApp::new(None);
        assert_eq!(app.screen(), Screen::Identity);
        assert!(app.local_name().is_empty());
    }

    #[test]
    fn test_initial_name_prefilled() {
        let app = TuiApp::new(Some("客厅电视".to_string()));
        assert_eq!(app.name_input().input(), "客厅电视");
        // 预填不代表确认，仍停留在身份界面
        assert_eq!(app.screen(), Screen::Identity);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut app = TuiApp::new(None);
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.screen(), Screen::Identity);
        assert!(app.status().is_some());

        type_text(&mut app, "   ");
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.screen(), Screen::Identity);
    }

    #[test]
    fn test_submit_name_enters_directory() {
        let mut app = TuiApp::new(None);
        type_text(&mut app, "alice");
        app.handle_key_event(key(KeyCode::Enter));

        assert_eq!(app.screen(), Screen::Directory);
        assert_eq!(app.local_name(), "alice");
        assert!(app.status().is_none());
    }

    #[test]
    fn test_call_requires_target() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));

        app.handle_key_event(key(KeyCode::Enter));
        assert!(app.status().is_some());
        assert_eq!(app.screen(), Screen::Directory);
    }

    #[test]
    fn test_cannot_call_self() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));

        type_text(&mut app, "alice");
        app.handle_key_event(key(KeyCode::Enter));
        assert_eq!(app.status(), Some("不能呼叫自己"));
    }

    #[test]
    fn test_call_established_enters_conversation() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));

        let peer_id = PeerId::random();
        app.handle_net_event(PeerEvent::CallEstablished {
            peer_id,
            name: "bob".to_string(),
        });

        assert_eq!(app.screen(), Screen::Conversation);
        assert_eq!(app.remote_name(), Some("bob"));
        assert!(app.transcript().is_empty());
    }

    #[test]
    fn test_sent_message_appears_in_transcript() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));
        app.handle_net_event(PeerEvent::CallEstablished {
            peer_id: PeerId::random(),
            name: "bob".to_string(),
        });

        type_text(&mut app, "你好");
        app.handle_key_event(key(KeyCode::Enter));

        let entries = app.transcript().entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].mine);
        assert_eq!(entries[0].text, "你好");
        assert_eq!(entries[0].user, "alice");
        assert!(app.message_input().is_empty());
    }

    #[test]
    fn test_received_message_appears_in_transcript() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));
        let peer_id = PeerId::random();
        app.handle_net_event(PeerEvent::CallEstablished {
            peer_id,
            name: "bob".to_string(),
        });

        app.handle_net_event(PeerEvent::MessageReceived {
            from: peer_id,
            message: TextMessage::new("bob", "hello"),
        });

        let entries = app.transcript().entries();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].mine);
        assert_eq!(entries[0].user, "bob");
    }

    #[test]
    fn test_call_closed_returns_to_directory() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));
        let peer_id = PeerId::random();
        app.handle_net_event(PeerEvent::CallEstablished {
            peer_id,
            name: "bob".to_string(),
        });
        app.handle_net_event(PeerEvent::MessageReceived {
            from: peer_id,
            message: TextMessage::new("bob", "hello"),
        });

        app.handle_net_event(PeerEvent::CallClosed { peer_id });

        assert_eq!(app.screen(), Screen::Directory);
        assert!(app.remote_name().is_none());
        // 会话记录随会话一起丢弃
        assert!(app.transcript().is_empty());
    }

    #[test]
    fn test_hang_up_returns_to_directory() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));
        app.handle_net_event(PeerEvent::CallEstablished {
            peer_id: PeerId::random(),
            name: "bob".to_string(),
        });

        app.handle_key_event(key(KeyCode::Esc));
        assert_eq!(app.screen(), Screen::Directory);
        assert!(app.transcript().is_empty());
    }

    #[test]
    fn test_peer_events_update_list() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));

        let peer_id = PeerId::random();
        app.handle_net_event(PeerEvent::PeerFound { peer_id });
        assert_eq!(app.peer_list().items.len(), 1);

        app.handle_net_event(PeerEvent::PeerNamed {
            peer_id,
            name: "bob".to_string(),
        });
        assert_eq!(app.peer_list().items[0].display_name(), "bob");

        app.handle_net_event(PeerEvent::PeerLost { peer_id });
        assert!(app.peer_list().is_empty());
    }

    #[test]
    fn test_call_failed_sets_status() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));

        app.handle_net_event(PeerEvent::CallFailed {
            name: "bob".to_string(),
            reason: "对方正忙".to_string(),
        });
        assert!(app.status().map(|s| s.contains("bob")).unwrap_or(false));
        assert_eq!(app.screen(), Screen::Directory);
    }

    #[test]
    fn test_name_conflict_warning() {
        let mut app = TuiApp::new(Some("alice".to_string()));
        app.handle_key_event(key(KeyCode::Enter));

        app.handle_net_event(PeerEvent::NameConflict {
            peer_id: PeerId::random(),
            name: "alice".to_string(),
        });
        assert!(app.status().map(|s| s.contains("alice")).unwrap_or(false));
    }
}
