//! Adaptive quality governor - one-way FPS-triggered downgrade

use crate::tier::PerfTier;

/// FPS below this triggers the downgrade.
pub const MIN_ACCEPTABLE_FPS: u32 = 20;

/// Watches the FPS sample stream and downgrades the tier to `Low` at most
/// once per session. There is no upgrade path: a device that dipped once is
/// assumed to stay marginal.
#[derive(Debug, Clone)]
pub struct QualityGovernor {
    tier: PerfTier,
    downgraded: bool,
}

impl QualityGovernor {
    pub fn new(tier: PerfTier) -> Self {
        Self {
            tier,
            downgraded: false,
        }
    }

    pub fn tier(&self) -> PerfTier {
        self.tier
    }

    /// Feed one FPS sample. Returns the new tier exactly once, on the sample
    /// that causes the downgrade; `None` otherwise.
    pub fn observe_fps(&mut self, fps: u32) -> Option<PerfTier> {
        if self.downgraded || self.tier == PerfTier::Low {
            return None;
        }
        if fps >= MIN_ACCEPTABLE_FPS {
            return None;
        }

        tracing::warn!(fps, from = %self.tier, "sustained low frame rate, dropping to low tier");
        self.tier = PerfTier::Low;
        self.downgraded = true;
        Some(PerfTier::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downgrade_fires_exactly_once() {
        let mut governor = QualityGovernor::new(PerfTier::High);

        assert_eq!(governor.observe_fps(58), None);
        assert_eq!(governor.observe_fps(19), Some(PerfTier::Low));
        assert_eq!(governor.tier(), PerfTier::Low);

        // further bad samples are silent
        assert_eq!(governor.observe_fps(5), None);
        assert_eq!(governor.observe_fps(12), None);
    }

    #[test]
    fn test_never_reverts_within_session() {
        let mut governor = QualityGovernor::new(PerfTier::Medium);
        governor.observe_fps(10);
        assert_eq!(governor.tier(), PerfTier::Low);

        // recovery does not upgrade
        for _ in 0..100 {
            assert_eq!(governor.observe_fps(60), None);
        }
        assert_eq!(governor.tier(), PerfTier::Low);
    }

    #[test]
    fn test_threshold_boundary() {
        let mut governor = QualityGovernor::new(PerfTier::Medium);
        assert_eq!(governor.observe_fps(MIN_ACCEPTABLE_FPS), None);
        assert_eq!(governor.tier(), PerfTier::Medium);
        assert_eq!(
            governor.observe_fps(MIN_ACCEPTABLE_FPS - 1),
            Some(PerfTier::Low)
        );
    }

    #[test]
    fn test_low_tier_never_downgrades() {
        let mut governor = QualityGovernor::new(PerfTier::Low);
        assert_eq!(governor.observe_fps(3), None);
        assert_eq!(governor.tier(), PerfTier::Low);
    }
}
