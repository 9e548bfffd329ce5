use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const K8S_GROUP: &str = "k8s";
pub const CONFIG_GROUP: &str = "config";
pub const LOGS_GROUP: &str = "logs";

/// Cluster resources the collector knows how to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Nodes,
    Pods,
    Deployments,
    StatefulSets,
    Namespaces,
    Services,
    Events,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Nodes,
        ResourceKind::Pods,
        ResourceKind::Deployments,
        ResourceKind::StatefulSets,
        ResourceKind::Namespaces,
        ResourceKind::Services,
        ResourceKind::Events,
    ];

    /// Artifact name used inside the `k8s` group.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ResourceKind::Nodes => "nodes",
            ResourceKind::Pods => "pods",
            ResourceKind::Deployments => "deployments",
            ResourceKind::StatefulSets => "stateful-sets",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::Services => "services",
            ResourceKind::Events => "events",
        }
    }
}

/// Configuration snapshots kept for the platform instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Latest,
    Applied,
    Spec,
}

impl ConfigKind {
    pub const ALL: [ConfigKind; 3] = [ConfigKind::Latest, ConfigKind::Applied, ConfigKind::Spec];

    pub fn artifact_name(&self) -> &'static str {
        match self {
            ConfigKind::Latest => "latest",
            ConfigKind::Applied => "applied",
            ConfigKind::Spec => "spec",
        }
    }
}

/// Successful output of a single fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

/// Recorded in place of content when a fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMarker {
    pub error: String,
}

impl FailureMarker {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let error = if message.trim().is_empty() {
            "unknown error".to_string()
        } else {
            message
        };
        Self { error }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactContent {
    Json(Value),
    Text(String),
    Failed(FailureMarker),
}

impl ArtifactContent {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ArtifactContent::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ArtifactContent::Failed(_))
    }

    /// File extension inside the archive.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactContent::Text(_) => "log",
            ArtifactContent::Json(_) | ArtifactContent::Failed(_) => "json",
        }
    }
}

impl From<Payload> for ArtifactContent {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Json(v) => ArtifactContent::Json(v),
            Payload::Text(s) => ArtifactContent::Text(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub content: ArtifactContent,
}

/// Everything gathered by one bundle collection, grouped by artifact group.
#[derive(Debug, Clone)]
pub struct BundleManifest {
    pub started_at: DateTime<Utc>,
    pub groups: BTreeMap<String, Vec<Artifact>>,
}

impl BundleManifest {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            groups: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, group: impl Into<String>, artifact: Artifact) {
        self.groups.entry(group.into()).or_default().push(artifact);
    }

    /// Make sure a group exists even when nothing was collected for it.
    pub fn ensure_group(&mut self, group: &str) {
        self.groups.entry(group.to_string()).or_default();
    }

    pub fn get(&self, group: &str, name: &str) -> Option<&Artifact> {
        self.groups
            .get(group)
            .and_then(|artifacts| artifacts.iter().find(|a| a.name == name))
    }

    pub fn merge(&mut self, other: BundleManifest) {
        for (group, artifacts) in other.groups {
            self.groups.entry(group).or_default().extend(artifacts);
        }
    }

    pub fn artifact_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.groups
            .values()
            .flatten()
            .filter(|a| a.content.is_failure())
            .count()
    }

    /// `(path, artifact)` pairs in group order.
    pub fn entries(&self) -> impl Iterator<Item = (String, &Artifact)> {
        self.groups.iter().flat_map(|(group, artifacts)| {
            artifacts.iter().map(move |a| {
                (
                    format!("{}/{}.{}", group, a.name, a.content.extension()),
                    a,
                )
            })
        })
    }
}

/// A log line with its structured form, parsed once when the log is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub raw: String,
    pub parsed: Option<StructuredLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StructuredLine {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Panic,
    Unclassified,
}

/// Display tier a severity maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Normal,
    Warning,
    Error,
}
