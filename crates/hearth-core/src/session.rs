//! AR session lifecycle and error kinds

use thiserror::Error;

/// What the capability surface reported for this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArSupport {
    /// Full immersive AR with camera passthrough.
    ImmersiveAr,
    /// Degraded inline session: model on the normal canvas, fixed-forward
    /// placement.
    Inline,
    Unsupported,
}

impl ArSupport {
    pub fn is_supported(&self) -> bool {
        !matches!(self, ArSupport::Unsupported)
    }
}

/// Errors surfaced to the user. Each is caught at the boundary of the
/// operation that produced it and stored as a single message; none are fatal
/// to the process.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("AR not supported")]
    Unsupported,
    #[error("capability check failed: {0}")]
    SupportCheckFailed(String),
    #[error("could not load model")]
    AssetLoadFailed,
    #[error("session start failed: {0}")]
    SessionStartFailed(String),
}

/// Session lifecycle. Single-writer: only the controller mutates it, and the
/// UI renders whatever phase it finds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    CheckingSupport,
    Ready,
    LoadingAsset,
    Active,
    Ended,
    Error(String),
}

impl SessionPhase {
    /// Startup: begin the capability check. Only meaningful from `Idle` or
    /// after a previous session ended.
    pub fn begin_support_check(&mut self) {
        if matches!(self, SessionPhase::Idle | SessionPhase::Ended) {
            *self = SessionPhase::CheckingSupport;
        }
    }

    /// Capability check result.
    pub fn support_checked(&mut self, support: ArSupport) {
        if *self != SessionPhase::CheckingSupport {
            return;
        }
        *self = if support.is_supported() {
            SessionPhase::Ready
        } else {
            SessionPhase::Error(SessionError::Unsupported.to_string())
        };
    }

    /// User triggered session entry. Guarded on `Ready`.
    pub fn begin_session(&mut self) -> bool {
        if *self == SessionPhase::Ready {
            *self = SessionPhase::LoadingAsset;
            true
        } else {
            false
        }
    }

    /// The capability surface granted the session.
    pub fn session_granted(&mut self) {
        if *self == SessionPhase::LoadingAsset {
            *self = SessionPhase::Active;
        }
    }

    /// Session ended (user exit, XR end event, unmount).
    pub fn end(&mut self) {
        if matches!(self, SessionPhase::LoadingAsset | SessionPhase::Active) {
            *self = SessionPhase::Ended;
        }
    }

    /// Record a failure. Errors overwrite any non-terminal phase so the UI
    /// shows the message in place of normal controls.
    pub fn fail(&mut self, err: SessionError) {
        tracing::error!("session error: {}", err);
        *self = SessionPhase::Error(err.to_string());
    }

    /// Leave a terminal phase so the entry UI can be shown again.
    pub fn reset(&mut self) {
        if matches!(self, SessionPhase::Ended | SessionPhase::Error(_)) {
            *self = SessionPhase::Idle;
        }
    }

    pub fn is_active(&self) -> bool {
        *self == SessionPhase::Active
    }

    /// The start control is enabled only once the capability check has
    /// completed successfully.
    pub fn can_start(&self) -> bool {
        *self == SessionPhase::Ready
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SessionPhase::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut phase = SessionPhase::default();
        assert_eq!(phase, SessionPhase::Idle);

        phase.begin_support_check();
        assert_eq!(phase, SessionPhase::CheckingSupport);

        phase.support_checked(ArSupport::ImmersiveAr);
        assert!(phase.can_start());

        assert!(phase.begin_session());
        assert_eq!(phase, SessionPhase::LoadingAsset);

        phase.session_granted();
        assert!(phase.is_active());

        phase.end();
        assert_eq!(phase, SessionPhase::Ended);

        // re-entry is possible after a session ends
        phase.reset();
        assert_eq!(phase, SessionPhase::Idle);
    }

    #[test]
    fn test_unsupported_device_reports_message() {
        let mut phase = SessionPhase::Idle;
        phase.begin_support_check();
        phase.support_checked(ArSupport::Unsupported);
        assert_eq!(phase.error_message(), Some("AR not supported"));
        assert!(!phase.can_start());
    }

    #[test]
    fn test_inline_counts_as_supported() {
        let mut phase = SessionPhase::Idle;
        phase.begin_support_check();
        phase.support_checked(ArSupport::Inline);
        assert!(phase.can_start());
    }

    #[test]
    fn test_start_guarded_on_ready() {
        let mut phase = SessionPhase::Idle;
        assert!(!phase.begin_session());
        assert_eq!(phase, SessionPhase::Idle);

        phase = SessionPhase::Error("AR not supported".into());
        assert!(!phase.begin_session());
    }

    #[test]
    fn test_asset_failure_message() {
        let mut phase = SessionPhase::LoadingAsset;
        phase.fail(SessionError::AssetLoadFailed);
        assert_eq!(phase.error_message(), Some("could not load model"));
    }

    #[test]
    fn test_end_is_ignored_outside_session() {
        let mut phase = SessionPhase::Ready;
        phase.end();
        assert_eq!(phase, SessionPhase::Ready);
    }
}
