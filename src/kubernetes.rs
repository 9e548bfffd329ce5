use crate::error::FetchError;
use crate::types::{ConfigKind, ResourceKind};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Event, Namespace, Node, Pod, Service};
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams, LogParams};
use kube::{Api, Client, config};
use serde_json::{Value, json};
use std::fmt::Debug;
use std::future::Future;
use tracing::{debug, info};

const PLATFORM_GROUP: &str = "apps.wandb.com";
const PLATFORM_VERSION: &str = "v1";
const PLATFORM_KIND: &str = "WeightsAndBiases";
const PLATFORM_PLURAL: &str = "weightsandbiases";

/// Read access to the cluster data a diagnostic bundle is made of.
pub trait ResourceSource: Send + Sync {
    fn fetch(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;

    fn fetch_pod_log(
        &self,
        pod: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;

    fn fetch_config(
        &self,
        kind: ConfigKind,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Talks to the API server of one kubeconfig context.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
}

impl KubeSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(context: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self::new(initialize_client(context).await?))
    }

    fn platform_resource() -> ApiResource {
        let gvk = GroupVersionKind::gvk(PLATFORM_GROUP, PLATFORM_VERSION, PLATFORM_KIND);
        ApiResource::from_gvk_with_plural(&gvk, PLATFORM_PLURAL)
    }

    async fn platform_object(&self, namespace: &str, name: &str) -> Result<Value, FetchError> {
        let ar = Self::platform_resource();
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let obj = api.get(name).await?;
        Ok(serde_json::to_value(obj)?)
    }

    async fn latest_config(&self, namespace: &str, name: &str) -> Result<Value, FetchError> {
        let cm_name = latest_config_map_name(name);
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let cm = api.get(&cm_name).await?;
        latest_from_config_map(&cm, &cm_name, namespace)
    }
}

pub async fn initialize_client(context: Option<&str>) -> anyhow::Result<Client> {
    match context {
        None => {
            let config = config::Config::infer().await?;
            info!("Using current kubeconfig context");
            Ok(Client::try_from(config)?)
        }
        Some(ctx) => {
            let config = config::Config::from_kubeconfig(&config::KubeConfigOptions {
                context: Some(ctx.to_string()),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow::anyhow!("Context '{}' not found in kubeconfig: {}", ctx, e))?;
            info!("Initialized client for context: {}", ctx);
            Ok(Client::try_from(config)?)
        }
    }
}

async fn list_namespaced<T>(client: &Client, namespace: &str) -> Result<Value, FetchError>
where
    T: k8s_openapi::Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>
        + serde::de::DeserializeOwned
        + serde::Serialize
        + Clone
        + Debug
        + Send
        + Sync,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;
    debug!(kind = T::KIND, namespace, items = list.items.len(), "Listed resources");
    Ok(serde_json::to_value(list)?)
}

async fn list_cluster<T>(client: &Client) -> Result<Value, FetchError>
where
    T: k8s_openapi::Resource<Scope = k8s_openapi::ClusterResourceScope>
        + k8s_openapi::Metadata<Ty = k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta>
        + serde::de::DeserializeOwned
        + serde::Serialize
        + Clone
        + Debug
        + Send
        + Sync,
{
    let api: Api<T> = Api::all(client.clone());
    let list = api.list(&ListParams::default()).await?;
    debug!(kind = T::KIND, items = list.items.len(), "Listed resources");
    Ok(serde_json::to_value(list)?)
}

impl ResourceSource for KubeSource {
    async fn fetch(&self, kind: ResourceKind, namespace: &str) -> Result<Value, FetchError> {
        let client = &self.client;
        match kind {
            ResourceKind::Nodes => list_cluster::<Node>(client).await,
            ResourceKind::Namespaces => list_cluster::<Namespace>(client).await,
            ResourceKind::Pods => list_namespaced::<Pod>(client, namespace).await,
            ResourceKind::Deployments => list_namespaced::<Deployment>(client, namespace).await,
            ResourceKind::StatefulSets => list_namespaced::<StatefulSet>(client, namespace).await,
            ResourceKind::Services => list_namespaced::<Service>(client, namespace).await,
            ResourceKind::Events => list_namespaced::<Event>(client, namespace).await,
        }
    }

    async fn fetch_pod_log(&self, pod: &str, namespace: &str) -> Result<String, FetchError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let text = api.logs(pod, &LogParams::default()).await?;
        debug!(pod, namespace, bytes = text.len(), "Fetched pod log");
        Ok(text)
    }

    async fn fetch_config(
        &self,
        kind: ConfigKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, FetchError> {
        match kind {
            ConfigKind::Latest => self.latest_config(namespace, name).await,
            ConfigKind::Spec => {
                let obj = self.platform_object(namespace, name).await?;
                Ok(json!({ "wandb": obj }))
            }
            ConfigKind::Applied => {
                let latest = self.latest_config(namespace, name).await?;
                let obj = self.platform_object(namespace, name).await?;
                Ok(applied_config(latest, &obj))
            }
        }
    }
}

pub fn latest_config_map_name(name: &str) -> String {
    format!("{}-config-latest", name)
}

/// `{"release": .., "config": ..}` from the `release` and `config` keys.
pub fn latest_from_config_map(
    cm: &ConfigMap,
    cm_name: &str,
    namespace: &str,
) -> Result<Value, FetchError> {
    let data = cm.data.as_ref();
    let release = data.and_then(|d| d.get("release")).ok_or_else(|| {
        FetchError::Missing(format!(
            "config map {}/{} does not have a `release` key",
            namespace, cm_name
        ))
    })?;
    let config_text = data.and_then(|d| d.get("config")).ok_or_else(|| {
        FetchError::Missing(format!(
            "config map {}/{} does not have a `config` key",
            namespace, cm_name
        ))
    })?;
    let config: Value = serde_json::from_str(config_text)?;
    Ok(json!({ "release": release, "config": config }))
}

/// Overlay the custom resource's `spec.config` and `spec.license` on the
/// latest stored config.
pub fn applied_config(mut latest: Value, platform: &Value) -> Value {
    let spec = platform.get("spec");
    let mut config = latest
        .get_mut("config")
        .map(Value::take)
        .unwrap_or_else(|| json!({}));

    if let Some(overlay) = spec.and_then(|s| s.get("config")) {
        merge_json(&mut config, overlay);
    }
    if let Some(license) = spec
        .and_then(|s| s.get("license"))
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty())
        && let Some(obj) = config.as_object_mut()
    {
        obj.insert("license".to_string(), Value::String(license.to_string()));
    }

    json!({
        "release": latest.get("release").cloned().unwrap_or(Value::Null),
        "config": config,
    })
}

/// Objects merge key by key; any other overlay value replaces the base.
pub fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// `items[].metadata.name` of a serialized pod list.
pub fn pod_names(pods: &Value) -> Vec<String> {
    pods.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p.pointer("/metadata/name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config_map(data: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_latest_from_config_map() {
        let cm = config_map(&[
            ("release", "/cdk8s/dist"),
            ("config", r#"{"bucket":{"name":"b"}}"#),
        ]);
        let value = latest_from_config_map(&cm, "wandb-config-latest", "default").unwrap();
        assert_eq!(value["release"], "/cdk8s/dist");
        assert_eq!(value["config"]["bucket"]["name"], "b");
    }

    #[test]
    fn test_latest_requires_release_key() {
        let cm = config_map(&[("config", "{}")]);
        let err = latest_from_config_map(&cm, "wandb-config-latest", "default").unwrap_err();
        assert!(err.to_string().contains("`release`"));
    }

    #[test]
    fn test_latest_rejects_invalid_config_json() {
        let cm = config_map(&[("release", "r"), ("config", "{not json")]);
        assert!(matches!(
            latest_from_config_map(&cm, "x", "default"),
            Err(FetchError::Json(_))
        ));
    }

    #[test]
    fn test_merge_json_nested() {
        let mut base = json!({"bucket": {"name": "a", "region": "us"}, "replicas": 1});
        merge_json(&mut base, &json!({"bucket": {"name": "b"}, "replicas": 3, "sso": true}));
        assert_eq!(
            base,
            json!({"bucket": {"name": "b", "region": "us"}, "replicas": 3, "sso": true})
        );
    }

    #[test]
    fn test_applied_config_license_override() {
        let latest = json!({"release": "r1", "config": {"license": "old", "db": {"host": "x"}}});
        let platform = json!({"spec": {"license": "new", "config": {"db": {"port": 3306}}}});
        let applied = applied_config(latest, &platform);
        assert_eq!(applied["release"], "r1");
        assert_eq!(applied["config"]["license"], "new");
        assert_eq!(applied["config"]["db"], json!({"host": "x", "port": 3306}));
    }

    #[test]
    fn test_applied_config_keeps_license_when_spec_empty() {
        let latest = json!({"release": "r1", "config": {"license": "keep"}});
        let platform = json!({"spec": {"license": ""}});
        assert_eq!(applied_config(latest, &platform)["config"]["license"], "keep");
    }

    #[test]
    fn test_pod_names() {
        let pods = json!({"items": [
            {"metadata": {"name": "wandb-app-0"}},
            {"metadata": {}},
            {"metadata": {"name": "wandb-console-1"}}
        ]});
        assert_eq!(pod_names(&pods), vec!["wandb-app-0", "wandb-console-1"]);
        assert!(pod_names(&json!({})).is_empty());
    }
}
