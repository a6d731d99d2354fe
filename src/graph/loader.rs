//! Graph file parsing.
//!
//! Edge lists accept these line forms:
//! - `u v`
//! - `u v 2.5`
//! - `u v {'weight': 2.5}` (attribute dict as written by networkx)
//!
//! Lines starting with `#` are comments; blank lines are skipped.
//!
//! GraphML files (`.graphml` / `.xml`) are read for node ids and the `weight`
//! edge attribute. Their `edgedefault` decides directedness when present.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::store::Graph;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read graph file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed edge list at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Invalid GraphML: {0}")]
    GraphMl(String),
}

/// Parses a weight, rejecting NaN and infinities.
fn finite_weight(raw: &str) -> Result<f64, String> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(format!("non-finite weight '{}'", raw)),
        Err(_) => Err(format!("invalid weight '{}'", raw)),
    }
}

/// Parses edge-list text into a graph.
pub fn parse_edgelist(text: &str, directed: bool) -> Result<Graph, LoadError> {
    let mut graph = Graph::new(directed);

    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let malformed = |reason: &str| LoadError::Malformed {
            line: number + 1,
            reason: reason.to_string(),
        };

        let (from, remainder) = next_token(line).ok_or_else(|| malformed("missing source node"))?;
        let (to, rest) = next_token(remainder).ok_or_else(|| malformed("missing target node"))?;

        let weight = if rest.is_empty() {
            None
        } else if rest.starts_with('{') {
            parse_attributes(rest).map_err(|reason| malformed(&reason))?
        } else {
            let token = rest.split_whitespace().next().unwrap_or(rest);
            Some(finite_weight(token).map_err(|reason| malformed(&reason))?)
        };

        graph.add_edge(from, to, weight);
    }

    debug!(
        "Parsed edge list: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Splits off the first whitespace-delimited token.
fn next_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    Some(match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (text, ""),
    })
}

/// Extracts the `weight` entry of a `{'key': value, ...}` attribute dict.
fn parse_attributes(text: &str) -> Result<Option<f64>, String> {
    let inner = text
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| format!("unterminated attribute dict '{}'", text))?;

    for entry in inner.split(',') {
        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_matches(|c: char| c == '\'' || c == '"');
        if key == "weight" {
            return finite_weight(value).map(Some);
        }
    }
    Ok(None)
}

fn is_element(node: &roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Parses a GraphML document. `directed` applies only when the graph element
/// carries no `edgedefault`.
pub fn parse_graphml(text: &str, directed: bool) -> Result<Graph, LoadError> {
    let doc = roxmltree::Document::parse(text).map_err(|e| LoadError::GraphMl(e.to_string()))?;
    let root = doc.root_element();

    // key id -> default weight
    let mut weight_keys: HashMap<&str, Option<f64>> = HashMap::new();
    for key in root.children().filter(|n| is_element(n, "key")) {
        let for_edges = matches!(key.attribute("for"), None | Some("edge") | Some("all"));
        if !for_edges || key.attribute("attr.name") != Some("weight") {
            continue;
        }
        let id = key
            .attribute("id")
            .ok_or_else(|| LoadError::GraphMl("<key> without id".to_string()))?;
        let default = key
            .children()
            .find(|n| is_element(n, "default"))
            .map(|d| finite_weight(d.text().unwrap_or("")))
            .transpose()
            .map_err(LoadError::GraphMl)?;
        weight_keys.insert(id, default);
    }
    let default_weight = weight_keys.values().find_map(|d| *d);

    let element = root
        .children()
        .find(|n| is_element(n, "graph"))
        .ok_or_else(|| LoadError::GraphMl("missing <graph> element".to_string()))?;
    let directed = match element.attribute("edgedefault") {
        Some("directed") => true,
        Some("undirected") => false,
        _ => directed,
    };

    let mut graph = Graph::new(directed);
    for child in element.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "node" => {
                let id = child
                    .attribute("id")
                    .ok_or_else(|| LoadError::GraphMl("<node> without id".to_string()))?;
                graph.add_node(id);
            }
            "edge" => {
                let (Some(source), Some(target)) =
                    (child.attribute("source"), child.attribute("target"))
                else {
                    return Err(LoadError::GraphMl(
                        "<edge> needs source and target".to_string(),
                    ));
                };
                let data = child.children().find(|n| {
                    is_element(n, "data")
                        && n.attribute("key").map_or(false, |k| weight_keys.contains_key(k))
                });
                let weight = match data {
                    Some(d) => Some(finite_weight(d.text().unwrap_or("")).map_err(LoadError::GraphMl)?),
                    None => default_weight,
                };
                graph.add_edge(source, target, weight);
            }
            _ => {}
        }
    }

    debug!(
        "Parsed GraphML: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Reads and parses an edge-list file.
pub fn load_edgelist(path: impl AsRef<Path>, directed: bool) -> Result<Graph, LoadError> {
    parse_edgelist(&read_file(path.as_ref())?, directed)
}

/// Reads and parses a GraphML file.
pub fn load_graphml(path: impl AsRef<Path>, directed: bool) -> Result<Graph, LoadError> {
    parse_graphml(&read_file(path.as_ref())?, directed)
}

/// Loads a graph file, choosing the format from its extension.
pub fn load_graph(path: impl AsRef<Path>, directed: bool) -> Result<Graph, LoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("graphml") | Some("xml") => load_graphml(path, directed),
        _ => load_edgelist(path, directed),
    }
}
