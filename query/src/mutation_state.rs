use crate::Error;

/// Lifecycle of a mutation call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MutationStatus {
    /// Nothing has been invoked since creation or the last reset.
    #[default]
    Idle,
    /// An invocation is in flight.
    Pending,
    /// The latest invocation failed.
    Error,
    /// The latest invocation succeeded.
    Success,
}

impl MutationStatus {
    /// Lowercase name, matching Tanstack Query's status strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationStatus::Idle => "idle",
            MutationStatus::Pending => "pending",
            MutationStatus::Error => "error",
            MutationStatus::Success => "success",
        }
    }
}

impl std::fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State held by one mutation call site.
#[derive(Clone, PartialEq)]
pub struct MutationState<R> {
    /// Current status.
    pub status: MutationStatus,
    /// Error of the latest failed invocation.
    pub error: Option<Error>,
    /// Result of the latest successful invocation.
    pub data: Option<R>,
}

impl<R> Default for MutationState<R> {
    fn default() -> Self {
        Self {
            status: MutationStatus::Idle,
            error: None,
            data: None,
        }
    }
}

impl<R> MutationState<R> {
    /// Whether an invocation is in flight.
    pub fn is_pending(&self) -> bool {
        self.status == MutationStatus::Pending
    }

    /// Any state -> pending. Clears the previous outcome.
    pub(crate) fn start(&mut self) {
        self.status = MutationStatus::Pending;
        self.error = None;
        self.data = None;
    }

    /// -> success.
    pub(crate) fn succeed(&mut self, data: R) {
        self.status = MutationStatus::Success;
        self.error = None;
        self.data = Some(data);
    }

    /// -> error.
    pub(crate) fn fail(&mut self, error: Error) {
        self.status = MutationStatus::Error;
        self.error = Some(error);
        self.data = None;
    }

    /// Any state -> idle.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

impl<R> std::fmt::Debug for MutationState<R>
where
    R: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationState")
            .field("status", &self.status)
            .field("error", &self.error)
            .field("data", &self.data)
            .finish()
    }
}
