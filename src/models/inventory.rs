// ABOUTME: Inventory snapshot of pods and their containers, used to prune vanished sessions
// Parses the Kubernetes PodList shape returned by the inventory feed

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Pod name -> container names, as of one refresh of the inventory feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pods: BTreeMap<String, BTreeSet<String>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pod<I, S>(mut self, pod: impl Into<String>, containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_pod(pod, containers);
        self
    }

    pub fn insert_pod<I, S>(&mut self, pod: impl Into<String>, containers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pods
            .insert(pod.into(), containers.into_iter().map(Into::into).collect());
    }

    pub fn contains(&self, pod: &str, container: &str) -> bool {
        self.pods
            .get(pod)
            .is_some_and(|containers| containers.contains(container))
    }

    pub fn has_pod(&self, pod: &str) -> bool {
        self.pods.contains_key(pod)
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    /// Parse a `PodList` JSON document
    pub fn from_pod_list_json(json: &str) -> serde_json::Result<Self> {
        let list: PodList = serde_json::from_str(json)?;
        Ok(list.into())
    }
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: PodMetadata,
    #[serde(default)]
    spec: Option<PodSpec>,
}

#[derive(Debug, Deserialize)]
struct PodMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct Container {
    name: String,
}

impl From<PodList> for Inventory {
    fn from(list: PodList) -> Self {
        let mut inventory = Inventory::new();
        for pod in list.items {
            let containers = pod
                .spec
                .unwrap_or_default()
                .containers
                .into_iter()
                .map(|c| c.name);
            inventory.insert_pod(pod.metadata.name, containers);
        }
        inventory
    }
}
