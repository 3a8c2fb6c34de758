//! Ordered fallback chain for model asset paths

use crate::tier::PerfTier;
use serde::{Deserialize, Serialize};

/// Configured asset locations: one primary path plus ordered fallbacks,
/// tried strictly in sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetCatalog {
    pub primary: String,
    pub fallbacks: Vec<String>,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self {
            primary: "models/house.glb".to_string(),
            fallbacks: vec![
                "models/house_draft.glb".to_string(),
                "models/placeholder.glb".to_string(),
            ],
        }
    }
}

impl AssetCatalog {
    /// Candidate paths for a tier: the tier-appropriate variant of the
    /// primary first, then the fallbacks in configured order.
    pub fn candidates(&self, tier: PerfTier) -> FallbackChain {
        let first = if tier == PerfTier::Low {
            low_detail_variant(&self.primary)
        } else {
            self.primary.clone()
        };
        let mut paths = vec![first];
        paths.extend(self.fallbacks.iter().cloned());
        FallbackChain::new(paths)
    }
}

/// Derive the lower-detail variant path: `house.glb` -> `house_low.glb`.
/// Paths without an extension get the suffix appended.
pub fn low_detail_variant(path: &str) -> String {
    match path.rfind('.') {
        Some(dot) if dot > path.rfind('/').map_or(0, |s| s + 1) => {
            format!("{}_low{}", &path[..dot], &path[dot..])
        }
        _ => format!("{path}_low"),
    }
}

/// Candidate paths consumed one at a time. The loader takes the next path,
/// attempts it, and comes back only on failure; exhaustion is the signal for
/// the "could not load model" error.
#[derive(Debug, Clone, Default)]
pub struct FallbackChain {
    paths: Vec<String>,
    next: usize,
}

impl FallbackChain {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths, next: 0 }
    }

    /// Number of candidates already handed out.
    pub fn attempts(&self) -> usize {
        self.next
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.paths.len()
    }
}

impl Iterator for FallbackChain {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let path = self.paths.get(self.next)?.clone();
        self.next += 1;
        tracing::info!(attempt = self.next, path = %path, "trying model path");
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_yields_in_order_then_exhausts() {
        let mut chain = FallbackChain::new(vec![
            "a.glb".to_string(),
            "b.glb".to_string(),
            "c.glb".to_string(),
        ]);

        // A and B fail, C is attempted
        assert_eq!(chain.next().as_deref(), Some("a.glb"));
        assert_eq!(chain.next().as_deref(), Some("b.glb"));
        assert_eq!(chain.next().as_deref(), Some("c.glb"));
        assert_eq!(chain.attempts(), 3);

        // all failed: no further attempts
        assert!(chain.is_exhausted());
        assert_eq!(chain.next(), None);
        assert_eq!(chain.next(), None);
    }

    #[test]
    fn test_low_tier_prefers_low_detail_variant() {
        let catalog = AssetCatalog {
            primary: "models/house.glb".to_string(),
            fallbacks: vec!["models/placeholder.glb".to_string()],
        };

        let mut low = catalog.candidates(PerfTier::Low);
        assert_eq!(low.next().as_deref(), Some("models/house_low.glb"));
        assert_eq!(low.next().as_deref(), Some("models/placeholder.glb"));
        assert!(low.is_exhausted());

        let mut high = catalog.candidates(PerfTier::High);
        assert_eq!(high.next().as_deref(), Some("models/house.glb"));
    }

    #[test]
    fn test_low_detail_variant_paths() {
        assert_eq!(low_detail_variant("house.glb"), "house_low.glb");
        assert_eq!(low_detail_variant("a/b/model.gltf"), "a/b/model_low.gltf");
        assert_eq!(low_detail_variant("noext"), "noext_low");
        // a dot in a directory name is not an extension
        assert_eq!(low_detail_variant("v1.2/model"), "v1.2/model_low");
    }
}
