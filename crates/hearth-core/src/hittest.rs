//! Hit-test source lifecycle

/// Lifecycle of the session's single hit-test source. The async request is
/// issued from the render loop, so the explicit phases replace what would
/// otherwise be a pair of racy booleans: a request in flight must not be
/// re-issued, and release must happen exactly once at teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitSourcePhase {
    #[default]
    Idle,
    Requested,
    Ready,
    Released,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HitSourceLifecycle {
    phase: HitSourcePhase,
}

impl HitSourceLifecycle {
    pub fn phase(&self) -> HitSourcePhase {
        self.phase
    }

    /// Begin the async source request. True only on the first call.
    pub fn request(&mut self) -> bool {
        if self.phase == HitSourcePhase::Idle {
            self.phase = HitSourcePhase::Requested;
            true
        } else {
            false
        }
    }

    /// The request resolved. Ignored unless a request was in flight (a late
    /// resolution after release must not resurrect the source).
    pub fn acquired(&mut self) -> bool {
        if self.phase == HitSourcePhase::Requested {
            self.phase = HitSourcePhase::Ready;
            true
        } else {
            false
        }
    }

    /// Hit-test queries are only meaningful with a live source.
    pub fn is_ready(&self) -> bool {
        self.phase == HitSourcePhase::Ready
    }

    /// Release at session end. True exactly once; the caller frees the
    /// underlying source only on a true return.
    pub fn release(&mut self) -> bool {
        match self.phase {
            HitSourcePhase::Requested | HitSourcePhase::Ready => {
                self.phase = HitSourcePhase::Released;
                true
            }
            HitSourcePhase::Idle => {
                self.phase = HitSourcePhase::Released;
                false
            }
            HitSourcePhase::Released => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_once() {
        let mut source = HitSourceLifecycle::default();
        assert!(source.request());
        assert!(!source.request());
        assert_eq!(source.phase(), HitSourcePhase::Requested);
    }

    #[test]
    fn test_acquire_then_release_exactly_once() {
        let mut source = HitSourceLifecycle::default();
        source.request();
        assert!(source.acquired());
        assert!(source.is_ready());

        assert!(source.release());
        // double-release is a no-op, not a double-free
        assert!(!source.release());
        assert!(!source.is_ready());
        assert_eq!(source.phase(), HitSourcePhase::Released);
    }

    #[test]
    fn test_release_of_in_flight_request() {
        let mut source = HitSourceLifecycle::default();
        source.request();
        assert!(source.release());

        // late resolution after release must not resurrect the source
        assert!(!source.acquired());
        assert!(!source.is_ready());
    }

    #[test]
    fn test_release_without_request() {
        let mut source = HitSourceLifecycle::default();
        assert!(!source.release());
        // and the source cannot be requested afterwards
        assert!(!source.request());
    }
}
