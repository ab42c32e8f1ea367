use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;

/// Mapping of dataset class name to the search queries that feed it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct LabelQueries(pub BTreeMap<String, Vec<String>>);

impl LabelQueries {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open label queries file {}", path.display()))?;
        let labels = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse label queries file {}", path.display()))?;
        Ok(labels)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Vec<String>>> for LabelQueries {
    fn from(labels: BTreeMap<String, Vec<String>>) -> Self {
        LabelQueries(labels)
    }
}

/// Target pixel shape, parsed from strings like "224x224".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
}

impl FromStr for ImageShape {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(['x', 'X']) {
            Some((width, height)) => Ok(ImageShape {
                width: width.trim().parse().context("Invalid image width")?,
                height: height.trim().parse().context("Invalid image height")?,
            }),
            None => Err(anyhow::anyhow!(
                "Expected an image shape like 224x224, got {s}"
            )),
        }
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
