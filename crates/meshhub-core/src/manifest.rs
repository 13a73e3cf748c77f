//! Rendered manifest documents

use kube::core::DynamicObject;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resources::{self, UnstructuredResources};

/// One rendered manifest file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Source name (template path, archive member or `kind/name`)
    pub name: String,
    /// YAML content, possibly holding several documents
    pub content: String,
}

impl Manifest {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Ordered collection of rendered manifests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifests(pub Vec<Manifest>);

impl Manifests {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Split a `helm template`-style stream into one manifest per document
    ///
    /// A `# Source: <path>` comment names the manifest; other documents are
    /// named `<default_name>-<index>`.
    pub fn from_stream(default_name: &str, stream: &str) -> Self {
        let manifests = resources::split_documents(stream)
            .into_iter()
            .filter(|doc| !resources::is_empty_manifest(doc))
            .enumerate()
            .map(|(idx, doc)| {
                let name = doc
                    .lines()
                    .find_map(|line| line.trim().strip_prefix("# Source:"))
                    .map(|source| source.trim().to_string())
                    .unwrap_or_else(|| format!("{default_name}-{idx}"));
                Manifest::new(name, doc.trim_matches('\n'))
            })
            .collect();
        Self(manifests)
    }

    /// One manifest per resource
    pub fn from_resources(resources: &[DynamicObject]) -> Result<Self> {
        let manifests = resources
            .iter()
            .map(|resource| {
                let content = serde_yaml::to_string(resource)?;
                Ok(Manifest::new(resources::resource_id(resource), content))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(manifests))
    }

    /// All manifests joined into one YAML stream
    pub fn combined_string(&self) -> String {
        self.0
            .iter()
            .map(|m| m.content.trim_end_matches('\n'))
            .collect::<Vec<_>>()
            .join("\n---\n")
    }

    /// Parse every manifest into resources, keeping order
    pub fn resource_list(&self) -> Result<UnstructuredResources> {
        let mut all = Vec::new();
        for manifest in &self.0 {
            all.extend(resources::yaml_to_resources(&manifest.content)?);
        }
        Ok(all)
    }

    pub fn push(&mut self, manifest: Manifest) {
        self.0.push(manifest);
    }

    pub fn extend(&mut self, other: Manifests) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Manifest> {
        self.0.iter()
    }
}

impl IntoIterator for Manifests {
    type Item = Manifest;
    type IntoIter = std::vec::IntoIter<Manifest>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Manifest> for Manifests {
    fn from_iter<I: IntoIterator<Item = Manifest>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
