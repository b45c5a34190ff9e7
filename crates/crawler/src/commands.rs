//! `build` and `download` commands

use crate::services::Services;
use anyhow::{Context, Result};
use citeforge_network::{BuildParams, CitationNetwork, NetworkDocument, WorkId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn network_path(dir: &Path, root: &WorkId) -> PathBuf {
    dir.join(format!("network_{}.json", root))
}

pub fn works_path(dir: &Path, root: &WorkId) -> PathBuf {
    dir.join(format!("works_{}.json", root))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

/// Build the network around `root`, save it and optionally fetch papers
pub async fn build(
    services: &Services,
    root: &str,
    params: &BuildParams,
    output: &Path,
    download: bool,
) -> Result<()> {
    let network = services.builder.build(root, params).await?;
    info!(
        root = %network.root,
        nodes = network.nodes.len(),
        edges = network.edges.len(),
        failures = network.failures.len(),
        levels = network.stats.levels,
        "Network built"
    );

    tokio::fs::create_dir_all(output).await?;
    let path = network_path(output, &network.root);
    NetworkDocument::from(&network)
        .save(&path)
        .await
        .with_context(|| format!("saving network to {}", path.display()))?;
    info!(path = %path.display(), "Saved network");

    if !download {
        return Ok(());
    }

    let mut works: Vec<WorkId> = network.nodes.iter().cloned().collect();
    works.sort();
    info!(count = works.len(), "Downloading papers");
    services.downloader().download(&works).await?;

    let dois = doi_map(services, &network).await;
    let path = works_path(output, &network.root);
    write_json(&path, &dois).await?;
    info!(path = %path.display(), "Saved work DOIs");
    Ok(())
}

/// Download papers for every node of a saved network
pub async fn download(services: &Services, network_file: &Path) -> Result<()> {
    let document = NetworkDocument::load(network_file)
        .await
        .with_context(|| format!("reading {}", network_file.display()))?;

    let works = parse_nodes(&document);
    info!(count = works.len(), "Downloading papers");
    let report = services.downloader().download(&works).await?;

    for id in &report.available {
        println!("{}", id);
    }
    Ok(())
}

fn parse_nodes(document: &NetworkDocument) -> Vec<WorkId> {
    document
        .nodes
        .iter()
        .filter_map(|raw| match raw.parse::<WorkId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(node = %raw, error = %e, "Ignoring invalid node id");
                None
            }
        })
        .collect()
}

/// Work id to bare DOI for every node, looking up works the build did not describe
async fn doi_map(services: &Services, network: &CitationNetwork) -> BTreeMap<String, Option<String>> {
    let mut dois = BTreeMap::new();
    for id in &network.nodes {
        let doi = match network.records.get(id) {
            Some(record) => record.bare_doi().map(str::to_string),
            None => match services.fetcher.get_work(id).await {
                Ok(record) => record.bare_doi().map(str::to_string),
                Err(e) => {
                    warn!(work_id = %id, error = %e, "DOI lookup failed");
                    None
                }
            },
        };
        dois.insert(id.to_string(), doi);
    }
    dois
}
