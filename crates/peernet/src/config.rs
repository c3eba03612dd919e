//! 节点配置模块

use libp2p::Multiaddr;

/// 协议版本，identify 交换时用于过滤非本应用的节点
pub const PROTOCOL_VERSION: &str = "/peerchat/1.0.0";

/// 代理版本前缀，显示名称会编码在其后的括号中
pub const AGENT_PREFIX: &str = "peerchat-rust/";

/// 节点配置
///
/// 描述本地节点的身份与监听方式。显示名称由用户在身份界面输入，
/// 通过 identify 的 agent_version 字段向其他节点公布。
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// 本地显示名称
    pub display_name: String,

    /// 监听地址列表
    pub listen_addresses: Vec<Multiaddr>,

    /// 期望的协议版本（用于过滤节点）
    pub protocol_version: String,

    /// 代理版本前缀
    pub agent_prefix: String,
}

impl NodeConfig {
    /// 以给定显示名称创建配置
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            listen_addresses: vec!["/ip4/0.0.0.0/tcp/0".parse().expect("静态地址合法")],
            protocol_version: PROTOCOL_VERSION.to_string(),
            agent_prefix: AGENT_PREFIX.to_string(),
        }
    }

    /// 设置监听地址
    pub fn with_listen_addresses(mut self, addrs: Vec<Multiaddr>) -> Self {
        self.listen_addresses = addrs;
        self
    }

    /// 设置期望的协议版本
    pub fn with_protocol_version(mut self, version: String) -> Self {
        self.protocol_version = version;
        self
    }

    /// 设置代理版本前缀
    pub fn with_agent_prefix(mut self, prefix: String) -> Self {
        self.agent_prefix = prefix;
        self
    }

    /// 构建完整的 agent_version（包含显示名称）
    ///
    /// 格式: `peerchat-rust/0.1.0 (名称)`
    pub fn build_agent_version(&self) -> String {
        format!("{}0.1.0 ({})", self.agent_prefix, self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listen_addresses() {
        let config = NodeConfig::new("测试");
        assert_eq!(config.listen_addresses.len(), 1);
        assert_eq!(config.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_build_agent_version() {
        let config = NodeConfig::new("我的电脑");
        assert_eq!(config.build_agent_version(), "peerchat-rust/0.1.0 (我的电脑)");
    }

    #[test]
    fn test_builder() {
        let config = NodeConfig::new("a")
            .with_protocol_version("/other/2.0.0".to_string())
            .with_agent_prefix("other/".to_string());
        assert_eq!(config.protocol_version, "/other/2.0.0");
        assert!(config.build_agent_version().starts_with("other/"));
    }
}
