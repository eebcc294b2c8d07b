//! Storage-layer failures and their mapping onto the domain taxonomy.

use classroll_core::CoreError;

/// Constraint the store itself enforces as a last line of defence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Second active row for one (student, class) pair.
    ActiveEnrollmentExists,
    /// `live_enrollment` outside `0..=capacity`.
    CapacityExceeded,
    DuplicateCourseCode,
    /// A referenced row is missing.
    MissingReference,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Lock timeout, deadlock victim, serialization failure, pool exhaustion
    /// or a dropped connection. Safe to retry.
    #[error("transient storage failure: {0}")]
    Transient(String),

    #[error("integrity violation: {0:?}")]
    Integrity(IntegrityViolation),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transient(detail) => {
                tracing::warn!(%detail, "transient storage failure");
                CoreError::Unavailable
            }
            StoreError::Integrity(IntegrityViolation::ActiveEnrollmentExists) => {
                CoreError::AlreadyActive
            }
            StoreError::Integrity(IntegrityViolation::CapacityExceeded) => CoreError::CapacityFull,
            StoreError::Integrity(IntegrityViolation::DuplicateCourseCode) => {
                CoreError::DuplicateCourseCode("course code".to_string())
            }
            StoreError::Integrity(IntegrityViolation::MissingReference) => {
                CoreError::not_found("Referenced record does not exist")
            }
            StoreError::Backend(detail) => {
                tracing::error!(%detail, "storage backend failure");
                CoreError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_detail_never_reaches_core_error() {
        let core: CoreError = StoreError::Backend("relation \"x\" does not exist".into()).into();
        assert_eq!(core, CoreError::Internal);
        assert!(!core.to_string().contains("relation"));
    }

    #[test]
    fn transient_maps_to_unavailable() {
        let core: CoreError = StoreError::Transient("lock timeout".into()).into();
        assert_eq!(core, CoreError::Unavailable);
        assert!(core.is_retryable());
    }

    #[test]
    fn integrity_maps_to_conflicts() {
        let core: CoreError =
            StoreError::Integrity(IntegrityViolation::ActiveEnrollmentExists).into();
        assert_eq!(core, CoreError::AlreadyActive);

        let core: CoreError = StoreError::Integrity(IntegrityViolation::CapacityExceeded).into();
        assert_eq!(core, CoreError::CapacityFull);
    }
}
