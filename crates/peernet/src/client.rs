//! 点对点聊天客户端
//!
//! 组合 mDNS（发现）、identify（名称交换）和 request-response（会话）
//! 三个 behaviour，在单个网络任务中驱动 Swarm。上层通过命令通道下发
//! 呼叫/发送/挂断，通过事件通道接收状态变化。
//!
//! ## 会话不变式
//!
//! 任一时刻至多存在一个活动会话。出站呼叫与入站 Hello 中先完成的一方
//! 占据会话槽位；会话期间收到的其他 Hello 一律回复 Busy。

use futures::StreamExt;
use libp2p::{
    identify, mdns, request_response,
    request_response::ProtocolSupport,
    swarm::SwarmEvent,
    identity::Keypair,
    Multiaddr, PeerId, Swarm, SwarmBuilder,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::codec::{chat_protocol, SessionCodec};
use crate::config::NodeConfig;
use crate::directory::{parse_peer_name, PeerDirectory};
use crate::message::{SessionMessage, SessionResponse, TextMessage};
use crate::{PeernetError, Result};

/// 上层下发给网络任务的命令
#[derive(Debug, Clone)]
pub enum PeerCommand {
    /// 呼叫指定名称的节点
    Call { name: String },
    /// 通过活动会话发送文本
    SendText { content: String },
    /// 挂断当前会话
    HangUp,
}

/// 网络任务上报给上层的事件
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// 客户端已启动
    Ready { peer_id: PeerId },
    /// 新增监听地址
    ListenAddr(Multiaddr),
    /// 发现新节点（名称尚未交换）
    PeerFound { peer_id: PeerId },
    /// 节点公布了显示名称
    PeerNamed { peer_id: PeerId, name: String },
    /// 节点离开
    PeerLost { peer_id: PeerId },
    /// 有节点占用了与本地相同的名称
    NameConflict { peer_id: PeerId, name: String },
    /// 会话建立（出站被接受或入站被采纳）
    CallEstablished { peer_id: PeerId, name: String },
    /// 收到会话内的文本消息
    MessageReceived { from: PeerId, message: TextMessage },
    /// 呼叫失败
    CallFailed { name: String, reason: String },
    /// 会话结束（本地挂断、对方挂断或连接断开）
    CallClosed { peer_id: PeerId },
}

/// 会话对端
#[derive(Debug, Clone)]
struct RemotePeer {
    peer_id: PeerId,
    name: String,
}

/// 入站 Hello 的裁决结果
#[derive(Debug, PartialEq, Eq)]
enum InboundVerdict {
    /// 采纳为活动会话
    Accepted,
    /// 与同一节点的重复 Hello，确认但不重复上报
    AlreadyActive,
    /// 已有会话，拒绝
    Busy,
}

/// 会话槽位
///
/// 持有"至多一个活动会话"的全部状态：当前会话与未决的出站呼叫。
#[derive(Debug, Default)]
struct CallSlot {
    active: Option<RemotePeer>,
    pending: Option<RemotePeer>,
}

impl CallSlot {
    fn active(&self) -> Option<&RemotePeer> {
        self.active.as_ref()
    }

    fn is_active_with(&self, peer_id: &PeerId) -> bool {
        self.active
            .as_ref()
            .map(|r| r.peer_id == *peer_id)
            .unwrap_or(false)
    }

    /// 登记出站呼叫，已有会话时拒绝
    fn begin_outbound(&mut self, peer_id: PeerId, name: String) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.pending = Some(RemotePeer { peer_id, name });
        true
    }

    /// 裁决入站 Hello：空闲则采纳（并放弃未决的出站呼叫），否则拒绝
    fn adopt_inbound(&mut self, peer_id: PeerId, name: String) -> InboundVerdict {
        match self.active {
            Some(ref remote) if remote.peer_id == peer_id => InboundVerdict::AlreadyActive,
            Some(_) => InboundVerdict::Busy,
            None => {
                self.pending = None;
                self.active = Some(RemotePeer { peer_id, name });
                InboundVerdict::Accepted
            }
        }
    }

    /// 出站呼叫被接受，提升为活动会话
    fn confirm_outbound(&mut self, peer_id: PeerId, name: String) -> Option<RemotePeer> {
        match self.pending {
            Some(ref p) if p.peer_id == peer_id => {
                self.pending = None;
                // 入站会话抢先建立时，迟到的接受被忽略
                if self.active.is_some() {
                    return None;
                }
                let remote = RemotePeer { peer_id, name };
                self.active = Some(remote.clone());
                Some(remote)
            }
            _ => None,
        }
    }

    /// 放弃未决的出站呼叫，返回当初呼叫的名称
    fn fail_pending(&mut self, peer_id: &PeerId) -> Option<String> {
        match self.pending {
            Some(ref p) if p.peer_id == *peer_id => self.pending.take().map(|p| p.name),
            _ => None,
        }
    }

    /// 关闭与指定节点的活动会话
    fn close_active(&mut self, peer_id: &PeerId) -> Option<RemotePeer> {
        if self.is_active_with(peer_id) {
            self.active.take()
        } else {
            None
        }
    }

    /// 无条件挂断当前会话
    fn hang_up(&mut self) -> Option<RemotePeer> {
        self.active.take()
    }
}

/// 组合的 Behaviour
#[derive(libp2p::swarm::NetworkBehaviour)]
struct ChatBehaviour {
    mdns: mdns::tokio::Behaviour,
    identify: identify::Behaviour,
    session: request_response::Behaviour<SessionCodec>,
}

/// 点对点聊天客户端
pub struct PeerClient {
    swarm: Swarm<ChatBehaviour>,
    config: NodeConfig,
    directory: PeerDirectory,
    calls: CallSlot,
    /// 每个节点的活跃连接数
    connections: HashMap<PeerId, u32>,
    cmd_rx: mpsc::Receiver<PeerCommand>,
    event_tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerClient {
    /// 创建新客户端
    ///
    /// 身份使用临时生成的 ed25519 密钥对，与进程同寿命，不做持久化。
    /// 返回客户端本体和事件接收器；命令接收器由调用方创建并传入。
    pub fn new(
        config: NodeConfig,
        cmd_rx: mpsc::Receiver<PeerCommand>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PeerEvent>)> {
        let local_key = Keypair::generate_ed25519();

        let protocol_version = config.protocol_version.clone();
        let agent_version = config.build_agent_version();

        let mut swarm = SwarmBuilder::with_existing_identity(local_key)
            .with_tokio()
            .with_tcp(
                libp2p::tcp::Config::default(),
                libp2p::noise::Config::new,
                libp2p::yamux::Config::default,
            )
            .map_err(|e| PeernetError::SwarmBuild(e.to_string()))?
            .with_behaviour(|key| {
                let mdns = mdns::tokio::Behaviour::new(
                    mdns::Config::default(),
                    key.public().to_peer_id(),
                )?;

                let identify = identify::Behaviour::new(
                    identify::Config::new(protocol_version.clone(), key.public())
                        .with_agent_version(agent_version.clone()),
                );

                let session = request_response::Behaviour::new(
                    [(chat_protocol(), ProtocolSupport::Full)],
                    request_response::Config::default()
                        .with_request_timeout(Duration::from_secs(15)),
                );

                Ok(ChatBehaviour {
                    mdns,
                    identify,
                    session,
                })
            })
            .map_err(|e| PeernetError::SwarmBuild(e.to_string()))?
            .with_swarm_config(|c| c.with_idle_connection_timeout(Duration::from_secs(60)))
            .build();

        for addr in &config.listen_addresses {
            swarm
                .listen_on(addr.clone())
                .map_err(|e| PeernetError::SwarmBuild(e.to_string()))?;
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                swarm,
                config,
                directory: PeerDirectory::new(),
                calls: CallSlot::default(),
                connections: HashMap::new(),
                cmd_rx,
                event_tx,
            },
            event_rx,
        ))
    }

    /// 获取本地 Peer ID
    pub fn local_peer_id(&self) -> PeerId {
        *self.swarm.local_peer_id()
    }

    /// 获取本地显示名称
    pub fn local_name(&self) -> &str {
        &self.config.display_name
    }

    /// 运行网络任务
    ///
    /// 持续驱动 Swarm 与命令通道，直到命令通道关闭（上层退出）
    /// 或事件接收方被丢弃。
    pub async fn run(mut self) {
        let peer_id = self.local_peer_id();
        tracing::info!("客户端启动: {} ({})", self.config.display_name, peer_id);

        if !self.emit(PeerEvent::Ready { peer_id }) {
            return;
        }

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => {
                            tracing::info!("命令通道关闭，网络任务退出");
                            break;
                        }
                    }
                }
                event = self.swarm.select_next_some() => {
                    if !self.handle_swarm_event(event) {
                        break;
                    }
                }
            }
        }
    }

    /// 发送事件，接收方已丢弃时返回 false
    fn emit(&self, event: PeerEvent) -> bool {
        self.event_tx.send(event).is_ok()
    }

    fn handle_command(&mut self, cmd: PeerCommand) {
        match cmd {
            PeerCommand::Call { name } => self.handle_call(name),
            PeerCommand::SendText { content } => self.handle_send_text(content),
            PeerCommand::HangUp => self.handle_hang_up(),
        }
    }

    fn handle_call(&mut self, name: String) {
        if self.calls.active().is_some() {
            self.emit(PeerEvent::CallFailed {
                name,
                reason: PeernetError::Busy.to_string(),
            });
            return;
        }

        let (peer_id, addresses) = match self.directory.find_by_name(&name) {
            Some(entry) => (entry.peer_id, entry.addresses.clone()),
            None => {
                tracing::warn!("呼叫失败，目录中没有名为 {} 的节点", name);
                self.emit(PeerEvent::CallFailed {
                    reason: PeernetError::PeerNotFound(name.clone()).to_string(),
                    name,
                });
                return;
            }
        };

        tracing::info!("呼叫 {} ({})", name, peer_id);

        // 确保存在可用连接；已连接时 dial 失败无碍
        for addr in addresses {
            if let Err(e) = self.swarm.dial(addr.clone()) {
                tracing::debug!("拨号 {} 失败: {}", addr, e);
            }
        }

        let hello = SessionMessage::Hello {
            name: self.config.display_name.clone(),
        };
        self.swarm
            .behaviour_mut()
            .session
            .send_request(&peer_id, hello);
        self.calls.begin_outbound(peer_id, name);
    }

    fn handle_send_text(&mut self, content: String) {
        let peer_id = match self.calls.active() {
            Some(remote) => remote.peer_id,
            None => {
                tracing::warn!("没有活动会话，丢弃消息");
                return;
            }
        };

        let message = TextMessage::new(self.config.display_name.clone(), content);
        self.swarm
            .behaviour_mut()
            .session
            .send_request(&peer_id, SessionMessage::Text(message));
    }

    fn handle_hang_up(&mut self) {
        if let Some(remote) = self.calls.hang_up() {
            tracing::info!("挂断与 {} 的会话", remote.name);
            self.swarm
                .behaviour_mut()
                .session
                .send_request(&remote.peer_id, SessionMessage::Bye);
            self.emit(PeerEvent::CallClosed {
                peer_id: remote.peer_id,
            });
        }
    }

    /// 处理单个 Swarm 事件，事件接收方已丢弃时返回 false
    fn handle_swarm_event(&mut self, event: SwarmEvent<ChatBehaviourEvent>) -> bool {
        match event {
            SwarmEvent::NewListenAddr { address, .. } => {
                tracing::info!("开始监听: {}", address);
                return self.emit(PeerEvent::ListenAddr(address));
            }
            SwarmEvent::Behaviour(ChatBehaviourEvent::Mdns(event)) => {
                return self.handle_mdns_event(event);
            }
            SwarmEvent::Behaviour(ChatBehaviourEvent::Identify(event)) => {
                return self.handle_identify_event(event);
            }
            SwarmEvent::Behaviour(ChatBehaviourEvent::Session(event)) => {
                return self.handle_session_event(event);
            }
            SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                tracing::debug!("与 {} 建立连接", peer_id);
                *self.connections.entry(peer_id).or_insert(0) += 1;
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                tracing::debug!("与 {} 的连接关闭", peer_id);
                let count = self.connections.entry(peer_id).or_insert(0);
                *count = count.saturating_sub(1);

                if *count == 0 {
                    self.connections.remove(&peer_id);

                    // 会话对端失联等同于对方挂断
                    if let Some(remote) = self.calls.close_active(&peer_id) {
                        tracing::info!("与 {} 的连接全部断开，会话结束", remote.name);
                        if !self.emit(PeerEvent::CallClosed { peer_id }) {
                            return false;
                        }
                    }

                    if self.directory.remove(&peer_id).is_some() {
                        return self.emit(PeerEvent::PeerLost { peer_id });
                    }
                }
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                if let Some(peer_id) = peer_id {
                    if let Some(name) = self.calls.fail_pending(&peer_id) {
                        tracing::warn!("呼叫 {} 失败: {}", name, error);
                        return self.emit(PeerEvent::CallFailed {
                            name,
                            reason: error.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
        true
    }

    fn handle_mdns_event(&mut self, event: mdns::Event) -> bool {
        match event {
            mdns::Event::Discovered(list) => {
                for (peer_id, addr) in list {
                    tracing::info!("通过 mDNS 发现节点: {} at {}", peer_id, addr);

                    // 主动连接以触发 identify 名称交换
                    if let Err(e) = self.swarm.dial(addr.clone()) {
                        tracing::debug!("无法连接节点 {}: {}", peer_id, e);
                    }

                    if self.directory.record_address(peer_id, addr)
                        && !self.emit(PeerEvent::PeerFound { peer_id })
                    {
                        return false;
                    }
                }
            }
            mdns::Event::Expired(list) => {
                for (peer_id, _addr) in list {
                    tracing::debug!("节点 mDNS 记录过期: {}", peer_id);

                    // 仍有活跃连接的节点保留在目录中
                    if self.connections.get(&peer_id).copied().unwrap_or(0) == 0
                        && self.directory.remove(&peer_id).is_some()
                        && !self.emit(PeerEvent::PeerLost { peer_id })
                    {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn handle_identify_event(&mut self, event: identify::Event) -> bool {
        if let identify::Event::Received { peer_id, info, .. } = event {
            if info.protocol_version != self.config.protocol_version {
                tracing::debug!(
                    "忽略协议版本不匹配的节点 {}: {}",
                    peer_id,
                    info.protocol_version
                );
                return true;
            }

            for addr in &info.listen_addrs {
                self.directory.record_address(peer_id, addr.clone());
            }

            if let Some(name) = parse_peer_name(&info.agent_version) {
                if name == self.config.display_name
                    && !self.emit(PeerEvent::NameConflict {
                        peer_id,
                        name: name.clone(),
                    })
                {
                    return false;
                }

                if self.directory.set_name(peer_id, name.clone()) {
                    tracing::info!("节点 {} 的名称为 {}", peer_id, name);
                    return self.emit(PeerEvent::PeerNamed { peer_id, name });
                }
            }
        }
        true
    }

    fn handle_session_event(
        &mut self,
        event: request_response::Event<SessionMessage, SessionResponse>,
    ) -> bool {
        match event {
            request_response::Event::Message { peer, message, .. } => match message {
                request_response::Message::Request {
                    request, channel, ..
                } => {
                    return self.handle_session_request(peer, request, channel);
                }
                request_response::Message::Response { response, .. } => {
                    return self.handle_session_response(peer, response);
                }
            },
            request_response::Event::OutboundFailure { peer, error, .. } => {
                if let Some(name) = self.calls.fail_pending(&peer) {
                    tracing::warn!("呼叫 {} 失败: {}", name, error);
                    return self.emit(PeerEvent::CallFailed {
                        name,
                        reason: error.to_string(),
                    });
                }

                // 会话内发送失败视为链路断开，不做重试
                if let Some(remote) = self.calls.close_active(&peer) {
                    tracing::warn!("向 {} 发送失败: {}，会话结束", remote.name, error);
                    return self.emit(PeerEvent::CallClosed { peer_id: peer });
                }

                tracing::debug!("对 {} 的请求失败: {}", peer, error);
            }
            request_response::Event::InboundFailure { peer, error, .. } => {
                tracing::debug!("来自 {} 的请求失败: {}", peer, error);
            }
            request_response::Event::ResponseSent { .. } => {}
        }
        true
    }

    fn handle_session_request(
        &mut self,
        peer: PeerId,
        request: SessionMessage,
        channel: request_response::ResponseChannel<SessionResponse>,
    ) -> bool {
        match request {
            SessionMessage::Hello { name } => {
                let verdict = self.calls.adopt_inbound(peer, name.clone());
                let response = match verdict {
                    InboundVerdict::Accepted | InboundVerdict::AlreadyActive => {
                        SessionResponse::Accepted {
                            name: self.config.display_name.clone(),
                        }
                    }
                    InboundVerdict::Busy => SessionResponse::Busy,
                };
                self.respond(channel, response);

                if verdict == InboundVerdict::Accepted {
                    tracing::info!("接受来自 {} ({}) 的呼叫", name, peer);
                    return self.emit(PeerEvent::CallEstablished { peer_id: peer, name });
                }
                if verdict == InboundVerdict::Busy {
                    tracing::info!("忙线中，拒绝来自 {} 的呼叫", peer);
                }
            }
            SessionMessage::Text(message) => {
                if self.calls.is_active_with(&peer) {
                    self.respond(channel, SessionResponse::Received);
                    return self.emit(PeerEvent::MessageReceived {
                        from: peer,
                        message,
                    });
                }
                // 非会话节点发来的消息一律拒绝
                tracing::warn!("丢弃来自非会话节点 {} 的消息", peer);
                self.respond(channel, SessionResponse::Busy);
            }
            SessionMessage::Bye => {
                self.respond(channel, SessionResponse::Received);
                if let Some(remote) = self.calls.close_active(&peer) {
                    tracing::info!("对方 {} 挂断", remote.name);
                    return self.emit(PeerEvent::CallClosed { peer_id: peer });
                }
            }
        }
        true
    }

    fn handle_session_response(&mut self, peer: PeerId, response: SessionResponse) -> bool {
        match response {
            SessionResponse::Accepted { name } => {
                if let Some(remote) = self.calls.confirm_outbound(peer, name) {
                    tracing::info!("呼叫被 {} 接受", remote.name);
                    return self.emit(PeerEvent::CallEstablished {
                        peer_id: peer,
                        name: remote.name,
                    });
                }
            }
            SessionResponse::Busy => {
                if let Some(name) = self.calls.fail_pending(&peer) {
                    tracing::info!("{} 正忙，呼叫失败", name);
                    return self.emit(PeerEvent::CallFailed {
                        name,
                        reason: PeernetError::Busy.to_string(),
                    });
                }
            }
            SessionResponse::Received => {}
        }
        true
    }

    fn respond(
        &mut self,
        channel: request_response::ResponseChannel<SessionResponse>,
        response: SessionResponse,
    ) {
        if self
            .swarm
            .behaviour_mut()
            .session
            .send_response(channel, response)
            .is_err()
        {
            tracing::debug!("响应发送失败，连接可能已关闭");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_slot_single_session() {
        let mut slot = CallSlot::default();
        let caller = PeerId::random();
        let other = PeerId::random();

        // 入站采纳后占据槽位
        assert_eq!(
            slot.adopt_inbound(caller, "alice".to_string()),
            InboundVerdict::Accepted
        );
        assert!(slot.is_active_with(&caller));

        // 会话期间的第二个呼叫被拒绝
        assert_eq!(
            slot.adopt_inbound(other, "bob".to_string()),
            InboundVerdict::Busy
        );
        assert!(!slot.begin_outbound(other, "bob".to_string()));
    }

    #[test]
    fn test_call_slot_repeat_hello() {
        let mut slot = CallSlot::default();
        let caller = PeerId::random();

        slot.adopt_inbound(caller, "alice".to_string());
        // 同一节点的重复 Hello 不会重复建立会话
        assert_eq!(
            slot.adopt_inbound(caller, "alice".to_string()),
            InboundVerdict::AlreadyActive
        );
    }

    #[test]
    fn test_call_slot_outbound_flow() {
        let mut slot = CallSlot::default();
        let callee = PeerId::random();

        assert!(slot.begin_outbound(callee, "bob".to_string()));
        assert!(slot.active().is_none());

        let remote = slot.confirm_outbound(callee, "bob".to_string()).unwrap();
        assert_eq!(remote.peer_id, callee);
        assert!(slot.is_active_with(&callee));
    }

    #[test]
    fn test_call_slot_inbound_wins_over_pending() {
        let mut slot = CallSlot::default();
        let callee = PeerId::random();
        let caller = PeerId::random();

        // 出站呼叫未决时收到入站 Hello，入站先到先得
        slot.begin_outbound(callee, "bob".to_string());
        assert_eq!(
            slot.adopt_inbound(caller, "carol".to_string()),
            InboundVerdict::Accepted
        );
        assert!(slot.is_active_with(&caller));

        // 迟到的出站接受被忽略
        assert!(slot.confirm_outbound(callee, "bob".to_string()).is_none());
        assert!(slot.is_active_with(&caller));
    }

    #[test]
    fn test_call_slot_fail_pending() {
        let mut slot = CallSlot::default();
        let callee = PeerId::random();
        let other = PeerId::random();

        slot.begin_outbound(callee, "bob".to_string());
        // 无关节点的失败不影响未决呼叫
        assert!(slot.fail_pending(&other).is_none());
        assert_eq!(slot.fail_pending(&callee), Some("bob".to_string()));
        assert!(slot.fail_pending(&callee).is_none());
    }

    #[test]
    fn test_call_slot_close_and_hang_up() {
        let mut slot = CallSlot::default();
        let caller = PeerId::random();
        let other = PeerId::random();

        slot.adopt_inbound(caller, "alice".to_string());

        // 非会话节点的关闭不影响会话
        assert!(slot.close_active(&other).is_none());
        assert!(slot.is_active_with(&caller));

        assert!(slot.close_active(&caller).is_some());
        assert!(slot.active().is_none());

        // 挂断空槽位是幂等的
        assert!(slot.hang_up().is_none());
    }

    #[tokio::test]
    async fn test_client_creation() {
        let (_cmd_tx, cmd_rx) = mpsc::channel(8);
        let config = NodeConfig::new("测试节点");
        let (client, _event_rx) = PeerClient::new(config, cmd_rx).unwrap();

        assert_eq!(client.local_name(), "测试节点");
        assert!(client.directory.is_empty());
    }
}
