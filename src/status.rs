use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use kube::ResourceExt;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Health of the platform's pods, as shown on the console status card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub up_to_date: bool,
    pub applying: bool,
    pub failing: bool,
    pub not_ready: bool,
    pub unready_pods: Vec<String>,
    pub restarted_pods: Vec<String>,
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

fn statuses(pod: &Pod) -> &[ContainerStatus] {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or(&[])
}

fn init_statuses(pod: &Pod) -> &[ContainerStatus] {
    pod.status
        .as_ref()
        .and_then(|s| s.init_container_statuses.as_deref())
        .unwrap_or(&[])
}

fn is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Running")
}

fn has_restarts(pod: &Pod) -> bool {
    statuses(pod)
        .iter()
        .chain(init_statuses(pod))
        .any(|cs| cs.restart_count > 0)
}

pub fn display_name(pod: &str) -> &str {
    pod.strip_prefix("wandb-").unwrap_or(pod)
}

pub fn assess(pods: &[Pod]) -> StatusReport {
    let all_healthy = pods.iter().all(is_running);

    let unready_pods: Vec<String> = pods
        .iter()
        .filter(|p| statuses(p).iter().any(|cs| !cs.ready))
        .map(|p| p.name_any())
        .collect();
    let all_ready = unready_pods.is_empty();

    let restarted_pods: Vec<String> = pods
        .iter()
        .filter(|p| has_restarts(p))
        .map(|p| p.name_any())
        .collect();
    let any_restarts = !restarted_pods.is_empty();

    StatusReport {
        up_to_date: all_healthy && all_ready,
        applying: !all_healthy && !all_ready,
        failing: any_restarts && !all_ready,
        not_ready: all_healthy && !all_ready && !any_restarts,
        unready_pods,
        restarted_pods,
    }
}

/// Assess a serialized pod list (`{"items": [...]}`).
pub fn assess_list(pods: &Value) -> Result<StatusReport, serde_json::Error> {
    let list = PodList::deserialize(pods)?;
    Ok(assess(&list.items))
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.up_to_date {
            writeln!(f, "Up to date")?;
        }
        if self.failing {
            writeln!(f, "Failed to apply configuration.")?;
        }
        if self.not_ready {
            writeln!(f, "Not ready")?;
        }
        if self.applying {
            writeln!(f, "Applying")?;
        }
        if !self.up_to_date {
            for pod in &self.unready_pods {
                writeln!(f, "  unready: {}", display_name(pod))?;
            }
        }
        for pod in &self.restarted_pods {
            writeln!(f, "  restarted: {}", display_name(pod))?;
        }
        Ok(())
    }
}
