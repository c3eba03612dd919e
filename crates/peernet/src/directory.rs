//! 节点目录模块
//!
//! 维护通过 mDNS 发现、identify 命名的节点列表，支持按显示名称查找，
//! 供"呼叫指定名称"的出站路径解析目标。

use libp2p::{Multiaddr, PeerId};
use std::collections::HashMap;
use std::time::Instant;

/// 目录中的节点条目
#[derive(Debug, Clone)]
pub struct PeerEntry {
    /// 节点 Peer ID
    pub peer_id: PeerId,

    /// 节点地址列表
    pub addresses: Vec<Multiaddr>,

    /// 显示名称（从 agent_version 解析，identify 完成前为 None）
    pub name: Option<String>,

    /// 首次发现时间
    pub first_seen: Instant,

    /// 最后活跃时间
    pub last_seen: Instant,
}

impl PeerEntry {
    /// 创建新条目
    pub fn new(peer_id: PeerId) -> Self {
        let now = Instant::now();
        Self {
            peer_id,
            addresses: Vec::new(),
            name: None,
            first_seen: now,
            last_seen: now,
        }
    }

    /// 获取显示名称（未命名时退回 Peer ID）
    pub fn display_name(&self) -> String {
        match self.name {
            Some(ref name) => name.clone(),
            None => self.peer_id.to_string(),
        }
    }
}

/// 节点目录
///
/// 由网络任务独占持有，单线程读写，无需加锁。
#[derive(Debug, Default)]
pub struct PeerDirectory {
    entries: HashMap<PeerId, PeerEntry>,
}

impl PeerDirectory {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个发现的地址，必要时创建条目
    ///
    /// 返回 true 表示这是一个新节点。
    pub fn record_address(&mut self, peer_id: PeerId, addr: Multiaddr) -> bool {
        let is_new = !self.entries.contains_key(&peer_id);
        let entry = self
            .entries
            .entry(peer_id)
            .or_insert_with(|| PeerEntry::new(peer_id));
        entry.last_seen = Instant::now();
        if !entry.addresses.contains(&addr) {
            entry.addresses.push(addr);
        }
        is_new
    }

    /// 设置节点的显示名称
    ///
    /// 返回 true 表示名称发生了变化。
    pub fn set_name(&mut self, peer_id: PeerId, name: String) -> bool {
        let entry = self
            .entries
            .entry(peer_id)
            .or_insert_with(|| PeerEntry::new(peer_id));
        entry.last_seen = Instant::now();
        if entry.name.as_deref() == Some(name.as_str()) {
            false
        } else {
            entry.name = Some(name);
            true
        }
    }

    /// 移除节点
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<PeerEntry> {
        self.entries.remove(peer_id)
    }

    /// 获取节点条目
    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerEntry> {
        self.entries.get(peer_id)
    }

    /// 按显示名称精确查找节点
    ///
    /// 多个节点使用同一名称时返回最近活跃的那个。
    pub fn find_by_name(&self, name: &str) -> Option<&PeerEntry> {
        self.entries
            .values()
            .filter(|e| e.name.as_deref() == Some(name))
            .max_by_key(|e| e.last_seen)
    }

    /// 列出所有条目
    pub fn list(&self) -> Vec<&PeerEntry> {
        self.entries.values().collect()
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 目录是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 从 agent_version 中解析显示名称
///
/// 支持格式: `prefix/version (name)`，例如
/// `peerchat-rust/0.1.0 (客厅电视)` → "客厅电视"
pub fn parse_peer_name(agent_version: &str) -> Option<String> {
    let start = agent_version.find('(')?;
    let end = agent_version.rfind(')')?;
    if start >= end {
        return None;
    }
    let name = agent_version[start + 1..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer_name() {
        assert_eq!(
            parse_peer_name("peerchat-rust/0.1.0 (我的电脑)"),
            Some("我的电脑".to_string())
        );
        assert_eq!(parse_peer_name("peerchat-rust/0.1.0"), None);
        assert_eq!(parse_peer_name("peerchat-rust/0.1.0 ()"), None);
    }

    #[test]
    fn test_record_address() {
        let mut dir = PeerDirectory::new();
        let peer_id = PeerId::random();
        let addr: Multiaddr = "/ip4/192.168.1.2/tcp/4001".parse().unwrap();

        assert!(dir.record_address(peer_id, addr.clone()));
        // 重复记录同一地址不会新增
        assert!(!dir.record_address(peer_id, addr));
        assert_eq!(dir.get(&peer_id).unwrap().addresses.len(), 1);
    }

    #[test]
    fn test_set_name_and_find() {
        let mut dir = PeerDirectory::new();
        let peer_id = PeerId::random();

        assert!(dir.set_name(peer_id, "alice".to_string()));
        assert!(!dir.set_name(peer_id, "alice".to_string()));

        let found = dir.find_by_name("alice").unwrap();
        assert_eq!(found.peer_id, peer_id);
        assert!(dir.find_by_name("bob").is_none());
    }

    #[test]
    fn test_find_by_name_prefers_recent() {
        let mut dir = PeerDirectory::new();
        let old = PeerId::random();
        let new = PeerId::random();

        dir.set_name(old, "dup".to_string());
        dir.set_name(new, "dup".to_string());

        // 两个同名节点，返回最近活跃的
        assert_eq!(dir.find_by_name("dup").unwrap().peer_id, new);
    }

    #[test]
    fn test_remove() {
        let mut dir = PeerDirectory::new();
        let peer_id = PeerId::random();
        dir.set_name(peer_id, "alice".to_string());

        assert!(dir.remove(&peer_id).is_some());
        assert!(dir.is_empty());
        assert!(dir.remove(&peer_id).is_none());
    }

    #[test]
    fn test_display_name_fallback() {
        let peer_id = PeerId::random();
        let entry = PeerEntry::new(peer_id);
        assert_eq!(entry.display_name(), peer_id.to_string());
    }
}
