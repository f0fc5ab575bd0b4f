//! Build result types.
//!
//! Contains types for representing the outcome of a registry build.

use crate::classify::AssetKind;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Result of building the registry for one manifest.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Generated module source
    pub source: String,
    /// File the source was written to, if any
    pub output: Option<PathBuf>,
    /// Number of assets in the registry, duplicates included
    pub asset_count: usize,
    /// Assets per kind
    pub kinds: BTreeMap<AssetKind, usize>,
    /// Keys that were overwritten by a later asset
    pub collisions: Vec<String>,
    /// Every file read, sorted, root manifest included
    pub dependencies: Vec<PathBuf>,
    /// Total build duration
    pub duration: Duration,
}

impl BuildOutput {
    /// Number of assets of one kind.
    pub fn count(&self, kind: AssetKind) -> usize {
        self.kinds.get(&kind).copied().unwrap_or(0)
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let kinds: Vec<String> =
            self.kinds.iter().map(|(kind, count)| format!("{} {}", count, kind)).collect();
        let breakdown = if kinds.is_empty() { String::new() } else { format!(" ({})", kinds.join(", ")) };

        lines.push(format!(
            "Built {} assets{} from {} files in {:?}",
            self.asset_count,
            breakdown,
            self.dependencies.len(),
            self.duration
        ));

        if let Some(output) = &self.output {
            lines.push(format!("  -> {}", output.display()));
        }

        if !self.collisions.is_empty() {
            lines.push(format!("Key collisions ({}): ", self.collisions.len()));
            for key in self.collisions.iter().take(5) {
                lines.push(format!("  - {}", key));
            }
            if self.collisions.len() > 5 {
                lines.push(format!("  ... and {} more", self.collisions.len() - 5));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> BuildOutput {
        BuildOutput {
            asset_count: 3,
            kinds: [(AssetKind::Path, 2), (AssetKind::Unclassified, 1)].into_iter().collect(),
            dependencies: vec![
                PathBuf::from("assets.json"),
                PathBuf::from("a.json"),
                PathBuf::from("b.json"),
                PathBuf::from("c.json"),
            ],
            duration: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_count() {
        let result = output();
        assert_eq!(result.count(AssetKind::Path), 2);
        assert_eq!(result.count(AssetKind::Sprite), 0);
    }

    #[test]
    fn test_summary() {
        let summary = output().summary();
        assert!(summary.starts_with("Built 3 assets (2 path, 1 unclassified) from 4 files"));
        assert!(!summary.contains("collisions"));
    }

    #[test]
    fn test_summary_with_output_and_collisions() {
        let mut result = output();
        result.output = Some(PathBuf::from("dist/assets.js"));
        result.collisions = (0..7).map(|i| format!("key{}", i)).collect();

        let summary = result.summary();
        assert!(summary.contains("-> dist/assets.js"));
        assert!(summary.contains("Key collisions (7)"));
        assert!(summary.contains("  - key4"));
        assert!(!summary.contains("  - key5"));
        assert!(summary.contains("... and 2 more"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = BuildOutput::default().summary();
        assert!(summary.starts_with("Built 0 assets from 0 files"));
    }
}
