//! Node configuration: environment-derived identity, fixed peer-address
//! convention, and the consensus defaults named throughout the design.

use std::time::Duration;

use crate::consensus::ConsensusConfig;

/// Number of nodes in the permissioned cluster. Peer URLs are derived from
/// this, not discovered.
pub const CLUSTER_SIZE: u16 = 6;

/// Base HTTP port; node `i` listens on `BASE_PORT + i`.
const BASE_PORT: u16 = 5000;

#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub node_id: String,
    pub port: u16,
    pub peers: Vec<String>,
    pub consensus: ConsensusConfig,
    pub health_check_interval: Duration,
    pub verify_interval: Duration,
}

impl NodeConfig {
    /// Builds configuration from `NODE_ID` and `PORT`, falling back to
    /// `node1`/`5001` for running a single node outside the cluster
    /// convention (e.g. locally, under a debugger).
    pub fn from_env() -> Self {
        let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| "node1".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(BASE_PORT + 1);
        let peers = derive_peer_urls(&node_id);
        Self {
            node_id,
            port,
            peers,
            consensus: ConsensusConfig::default(),
            health_check_interval: Duration::from_secs(30),
            verify_interval: Duration::from_secs(30),
        }
    }

    pub fn self_url(&self) -> String {
        format!("http://{}:{}", self.node_id, self.port)
    }
}

/// Peer URLs follow `http://node{i}:500{i}` for `i` in `1..=CLUSTER_SIZE`,
/// excluding this node's own id.
fn derive_peer_urls(node_id: &str) -> Vec<String> {
    (1..=CLUSTER_SIZE)
        .map(|i| (format!("node{i}"), BASE_PORT + i))
        .filter(|(id, _)| id != node_id)
        .map(|(id, port)| format!("http://{id}:{port}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_urls_exclude_self_and_follow_the_fixed_convention() {
        let peers = derive_peer_urls("node3");
        assert_eq!(peers.len(), (CLUSTER_SIZE - 1) as usize);
        assert!(!peers.iter().any(|p| p == "http://node3:5003"));
        assert!(peers.contains(&"http://node1:5001".to_string()));
        assert!(peers.contains(&"http://node6:5006".to_string()));
    }
}
