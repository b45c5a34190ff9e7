//! List-based JSON document for a built network

use super::CitationNetwork;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `{"nodes": [...], "edges": [[citing, cited], ...]}`, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDocument {
    pub nodes: Vec<String>,
    pub edges: Vec<[String; 2]>,
}

impl NetworkDocument {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Write the document to `path`
    pub async fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let body = self.to_json_pretty()?;
        tokio::fs::write(path, body).await
    }

    /// Read a document written by [`NetworkDocument::save`]
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_json(&raw)?)
    }
}

impl From<&CitationNetwork> for NetworkDocument {
    fn from(network: &CitationNetwork) -> Self {
        let mut nodes: Vec<String> = network.nodes.iter().map(|id| id.to_string()).collect();
        nodes.sort();

        let mut edges: Vec<[String; 2]> = network
            .edges
            .iter()
            .map(|e| [e.citing.to_string(), e.cited.to_string()])
            .collect();
        edges.sort();

        Self { nodes, edges }
    }
}
