//! Hearth core - engine-independent AR session logic
//!
//! Everything here is pure data and state transitions: device tier
//! classification, session lifecycle, the asset fallback chain, frame
//! timing, the adaptive quality governor, and the placement/hit-test state
//! machines. The viewer crate drives these from browser events; nothing in
//! this crate touches bevy or the DOM, so all of it is unit-testable with
//! synthetic inputs.

pub mod fallback;
pub mod hittest;
pub mod placement;
pub mod quality;
pub mod session;
pub mod tier;
pub mod timing;

pub use fallback::{AssetCatalog, FallbackChain};
pub use hittest::HitSourceLifecycle;
pub use placement::{PlacementState, Pose, Reticle, TapOutcome};
pub use quality::QualityGovernor;
pub use session::{ArSupport, SessionError, SessionPhase};
pub use tier::{DeviceProbe, PerfTier, RenderProfile, TierChoice};
pub use timing::FrameWindow;
