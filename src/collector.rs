//! Diagnostic bundle collection.
//!
//! Every fetch of a phase is started before any is awaited, and the phase
//! ends once all of them have settled. A failed fetch leaves a failure marker
//! in its slot and never aborts the collection.

use crate::archive::{BundleWriter, FileSink};
use crate::error::{FetchError, Result};
use crate::kubernetes::{ResourceSource, pod_names};
use crate::types::{
    Artifact, ArtifactContent, BundleManifest, CONFIG_GROUP, ConfigKind, FailureMarker,
    K8S_GROUP, LOGS_GROUP, Payload, ResourceKind,
};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use std::future::Future;
use std::path::PathBuf;
use tracing::{info, warn};

/// One named fetch that fills one artifact slot.
pub struct NamedFetch<'a> {
    pub group: String,
    pub artifact: String,
    pub run: BoxFuture<'a, std::result::Result<Payload, FetchError>>,
}

impl<'a> NamedFetch<'a> {
    pub fn new<F>(group: impl Into<String>, artifact: impl Into<String>, run: F) -> Self
    where
        F: Future<Output = std::result::Result<Payload, FetchError>> + Send + 'a,
    {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            run: run.boxed(),
        }
    }
}

/// Run all fetches concurrently and record every outcome.
pub async fn collect(started_at: DateTime<Utc>, fetchers: Vec<NamedFetch<'_>>) -> BundleManifest {
    let mut manifest = BundleManifest::new(started_at);

    let (slots, runs): (Vec<_>, Vec<_>) = fetchers
        .into_iter()
        .map(|f| ((f.group, f.artifact), f.run))
        .unzip();

    let outcomes = join_all(runs).await;

    for ((group, name), outcome) in slots.into_iter().zip(outcomes) {
        let content = match outcome {
            Ok(payload) => ArtifactContent::from(payload),
            Err(e) => {
                warn!(group = %group, artifact = %name, error = %e, "Fetch failed, recording failure marker");
                ArtifactContent::Failed(FailureMarker::new(e.to_string()))
            }
        };
        manifest.push(group, Artifact { name, content });
    }

    manifest
}

/// Gathers the fixed set of bundle resources for one platform instance.
pub struct Collector<'s, S> {
    source: &'s S,
    namespace: String,
    instance: String,
}

impl<'s, S: ResourceSource> Collector<'s, S> {
    pub fn new(source: &'s S, namespace: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            source,
            namespace: namespace.into(),
            instance: instance.into(),
        }
    }

    /// Phase one: cluster resources and configuration snapshots.
    pub fn resource_fetchers(&self) -> Vec<NamedFetch<'_>> {
        let mut fetchers = Vec::new();
        for kind in ResourceKind::ALL {
            let namespace = self.namespace.as_str();
            let source = self.source;
            fetchers.push(NamedFetch::new(K8S_GROUP, kind.artifact_name(), async move {
                source.fetch(kind, namespace).await.map(Payload::Json)
            }));
        }
        for kind in ConfigKind::ALL {
            let namespace = self.namespace.as_str();
            let instance = self.instance.as_str();
            let source = self.source;
            fetchers.push(NamedFetch::new(CONFIG_GROUP, kind.artifact_name(), async move {
                source
                    .fetch_config(kind, namespace, instance)
                    .await
                    .map(Payload::Json)
            }));
        }
        fetchers
    }

    /// Phase two: one log fetch per discovered pod.
    pub fn log_fetchers<'a>(&'a self, pods: &'a [String]) -> Vec<NamedFetch<'a>> {
        pods.iter()
            .map(|pod| {
                let namespace = self.namespace.as_str();
                let source = self.source;
                NamedFetch::new(LOGS_GROUP, pod.as_str(), async move {
                    source.fetch_pod_log(pod, namespace).await.map(Payload::Text)
                })
            })
            .collect()
    }

    pub async fn collect_all(&self, started_at: DateTime<Utc>) -> BundleManifest {
        let mut manifest = collect(started_at, self.resource_fetchers()).await;
        manifest.ensure_group(LOGS_GROUP);

        let pods = manifest
            .get(K8S_GROUP, ResourceKind::Pods.artifact_name())
            .and_then(|a| a.content.as_json())
            .map(pod_names);

        match pods {
            Some(pods) => {
                let logs = collect(started_at, self.log_fetchers(&pods)).await;
                manifest.merge(logs);
            }
            None => warn!(
                namespace = %self.namespace,
                "Pod list unavailable, bundle will carry no pod logs"
            ),
        }

        info!(
            artifacts = manifest.artifact_count(),
            failed = manifest.failure_count(),
            "Collection finished"
        );
        manifest
    }

    /// Collect, archive and hand the bundle to `sink`. Only archive or save
    /// failures are returned as errors.
    pub async fn download(&self, sink: &dyn FileSink) -> Result<PathBuf> {
        let started_at = Utc::now();
        let manifest = self.collect_all(started_at).await;
        let bytes = BundleWriter::new(&manifest).write_to_vec()?;
        let path = sink.save(&bytes, &bundle_file_name(started_at))?;
        info!(path = %path.display(), bytes = bytes.len(), "Bundle saved");
        Ok(path)
    }
}

/// `bundle-2024-01-01T00:00:00.000Z.zip`
pub fn bundle_file_name(started_at: DateTime<Utc>) -> String {
    format!(
        "bundle-{}.zip",
        started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
