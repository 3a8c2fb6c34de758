//! Device capability classification and per-tier render profiles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rendering capability tier. Runtime transitions are downgrade-only: once a
/// session drops to `Low` it never climbs back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerfTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for PerfTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerfTier::Low => write!(f, "low"),
            PerfTier::Medium => write!(f, "medium"),
            PerfTier::High => write!(f, "high"),
        }
    }
}

/// User-facing tier selection: automatic detection or an explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TierChoice {
    #[default]
    Auto,
    Forced(PerfTier),
}

impl TierChoice {
    /// Resolve the choice against a device probe. Returns the tier and
    /// whether it came from auto-detection.
    pub fn resolve(self, probe: &DeviceProbe) -> (PerfTier, bool) {
        match self {
            TierChoice::Auto => (probe.classify(), true),
            TierChoice::Forced(tier) => (tier, false),
        }
    }
}

impl FromStr for TierChoice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(TierChoice::Auto),
            "low" => Ok(TierChoice::Forced(PerfTier::Low)),
            "medium" => Ok(TierChoice::Forced(PerfTier::Medium)),
            "high" => Ok(TierChoice::Forced(PerfTier::High)),
            _ => Err(()),
        }
    }
}

/// GPU renderer substrings that mark a device as low tier. Matched
/// case-insensitively against the WEBGL_debug_renderer_info string.
pub const LOW_END_GPU_MARKERS: &[&str] = &[
    "adreno 3",
    "adreno 4",
    "adreno 505",
    "adreno 506",
    "mali-4",
    "mali-t6",
    "mali-t7",
    "mali-t8",
    "powervr",
    "videocore",
    "intel hd graphics",
    "swiftshader",
    "llvmpipe",
];

/// Device memory below this (GB) forces the low tier.
pub const LOW_MEMORY_FLOOR_GB: f64 = 4.0;

/// Device memory at or above this (GB) allows the high tier.
pub const HIGH_MEMORY_FLOOR_GB: f64 = 6.0;

/// Synthesized device facts, gathered once at startup. The classification
/// itself is pure so it can be exercised with synthetic inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceProbe {
    /// Renderer string from WEBGL_debug_renderer_info; `None` when no GPU
    /// context could be created at all.
    pub gpu_renderer: Option<String>,
    /// `navigator.deviceMemory` in GB, when the browser reports it.
    pub device_memory_gb: Option<f64>,
}

impl DeviceProbe {
    /// Best-effort heuristic tier. No graphics capability at all forces
    /// `Low`; a known low-end GPU marker or scarce memory forces `Low`;
    /// plentiful memory with a clean GPU string earns `High`.
    pub fn classify(&self) -> PerfTier {
        let renderer = match &self.gpu_renderer {
            Some(r) => r.to_ascii_lowercase(),
            None => {
                tracing::debug!("no GPU renderer reported, forcing low tier");
                return PerfTier::Low;
            }
        };

        if LOW_END_GPU_MARKERS.iter().any(|m| renderer.contains(m)) {
            tracing::debug!(renderer = %renderer, "low-end GPU marker matched");
            return PerfTier::Low;
        }

        match self.device_memory_gb {
            Some(mem) if mem < LOW_MEMORY_FLOOR_GB => PerfTier::Low,
            Some(mem) if mem >= HIGH_MEMORY_FLOOR_GB => PerfTier::High,
            Some(_) => PerfTier::Medium,
            // deviceMemory is unavailable on some browsers; the GPU string
            // alone is not enough evidence for the high tier
            None => PerfTier::Medium,
        }
    }
}

/// Concrete render parameters derived from a tier. Applied once when the
/// rendering context is constructed and again on a governor downgrade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProfile {
    pub tier: PerfTier,
    /// MSAA on/off.
    pub antialias: bool,
    /// Request the low-power adapter.
    pub low_power: bool,
    /// Clamp on the device pixel ratio; `None` means device-native.
    pub max_pixel_ratio: Option<f32>,
    /// Spawn the secondary directional light.
    pub directional_light: bool,
    /// Normalized size (meters) the model's largest dimension is scaled to.
    pub model_size: f32,
    /// Prefer the lower-detail model variant.
    pub low_detail_model: bool,
    /// Perform per-frame surface hit-testing.
    pub hit_testing: bool,
}

impl RenderProfile {
    pub fn for_tier(tier: PerfTier) -> Self {
        match tier {
            PerfTier::Low => Self {
                tier,
                antialias: false,
                low_power: true,
                max_pixel_ratio: Some(1.0),
                directional_light: false,
                model_size: 0.6,
                low_detail_model: true,
                hit_testing: false,
            },
            PerfTier::Medium => Self {
                tier,
                antialias: true,
                low_power: false,
                max_pixel_ratio: Some(1.5),
                directional_light: true,
                model_size: 0.8,
                low_detail_model: false,
                hit_testing: true,
            },
            PerfTier::High => Self {
                tier,
                antialias: true,
                low_power: false,
                max_pixel_ratio: None,
                directional_light: true,
                model_size: 1.0,
                low_detail_model: false,
                hit_testing: true,
            },
        }
    }

    /// Pixel ratio to use for a given device ratio.
    pub fn clamp_pixel_ratio(&self, device_ratio: f32) -> f32 {
        match self.max_pixel_ratio {
            Some(max) => device_ratio.min(max),
            None => device_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_gpu_forces_low() {
        let probe = DeviceProbe {
            gpu_renderer: None,
            device_memory_gb: Some(16.0),
        };
        assert_eq!(probe.classify(), PerfTier::Low);
    }

    #[test]
    fn test_low_end_gpu_marker() {
        let probe = DeviceProbe {
            gpu_renderer: Some("Qualcomm Adreno 308".to_string()),
            device_memory_gb: Some(8.0),
        };
        assert_eq!(probe.classify(), PerfTier::Low);

        let probe = DeviceProbe {
            gpu_renderer: Some("Google SwiftShader".to_string()),
            device_memory_gb: None,
        };
        assert_eq!(probe.classify(), PerfTier::Low);
    }

    #[test]
    fn test_scarce_memory_forces_low() {
        let probe = DeviceProbe {
            gpu_renderer: Some("Apple GPU".to_string()),
            device_memory_gb: Some(2.0),
        };
        assert_eq!(probe.classify(), PerfTier::Low);
    }

    #[test]
    fn test_memory_splits_medium_and_high() {
        let mut probe = DeviceProbe {
            gpu_renderer: Some("NVIDIA GeForce RTX 3060".to_string()),
            device_memory_gb: Some(4.0),
        };
        assert_eq!(probe.classify(), PerfTier::Medium);

        probe.device_memory_gb = Some(8.0);
        assert_eq!(probe.classify(), PerfTier::High);

        probe.device_memory_gb = None;
        assert_eq!(probe.classify(), PerfTier::Medium);
    }

    #[test]
    fn test_forced_choice_ignores_probe() {
        let probe = DeviceProbe {
            gpu_renderer: None,
            device_memory_gb: None,
        };
        let (tier, auto) = TierChoice::Forced(PerfTier::High).resolve(&probe);
        assert_eq!(tier, PerfTier::High);
        assert!(!auto);

        let (tier, auto) = TierChoice::Auto.resolve(&probe);
        assert_eq!(tier, PerfTier::Low);
        assert!(auto);
    }

    #[test]
    fn test_tier_choice_parsing() {
        assert_eq!("auto".parse::<TierChoice>(), Ok(TierChoice::Auto));
        assert_eq!(
            "LOW".parse::<TierChoice>(),
            Ok(TierChoice::Forced(PerfTier::Low))
        );
        assert_eq!(
            "medium".parse::<TierChoice>(),
            Ok(TierChoice::Forced(PerfTier::Medium))
        );
        assert!("ultra".parse::<TierChoice>().is_err());
    }

    #[test]
    fn test_low_profile_disables_extras() {
        let profile = RenderProfile::for_tier(PerfTier::Low);
        assert!(!profile.antialias);
        assert!(!profile.directional_light);
        assert!(!profile.hit_testing);
        assert!(profile.low_detail_model);
        assert_eq!(profile.clamp_pixel_ratio(3.0), 1.0);
    }

    #[test]
    fn test_pixel_ratio_clamping() {
        assert_eq!(
            RenderProfile::for_tier(PerfTier::Medium).clamp_pixel_ratio(2.0),
            1.5
        );
        assert_eq!(
            RenderProfile::for_tier(PerfTier::High).clamp_pixel_ratio(2.0),
            2.0
        );
        // ratios below the clamp pass through
        assert_eq!(
            RenderProfile::for_tier(PerfTier::Medium).clamp_pixel_ratio(1.0),
            1.0
        );
    }
}
