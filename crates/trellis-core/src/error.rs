use std::fmt;

use crate::root::RootId;

/// Failure reported by a [`HostAdapter`](crate::HostAdapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Missing { id: usize },
    TypeMismatch { id: usize, expected: &'static str },
    Rejected { reason: String },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { id } => write!(f, "host instance {id} missing"),
            HostError::TypeMismatch { id, expected } => {
                write!(f, "host instance {id} type mismatch; expected {expected}")
            }
            HostError::Rejected { reason } => write!(f, "host rejected operation: {reason}"),
        }
    }
}

impl std::error::Error for HostError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A component's render function failed.
    Render {
        component: &'static str,
        message: String,
    },
    /// A component called a different number of hooks than on its previous render.
    HookCountMismatch {
        component: &'static str,
        previous: usize,
        rendered: usize,
    },
    /// The hook at `index` is not the kind it was on the previous render.
    HookKindMismatch {
        component: &'static str,
        index: usize,
        expected: &'static str,
    },
    UnknownRoot(RootId),
    Host(HostError),
}

impl ReconcileError {
    /// Convenience for component render functions.
    pub fn render(component: &'static str, message: impl Into<String>) -> Self {
        ReconcileError::Render {
            component,
            message: message.into(),
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Render { component, message } => {
                write!(f, "{component} failed to render: {message}")
            }
            ReconcileError::HookCountMismatch {
                component,
                previous,
                rendered,
            } => write!(
                f,
                "{component} rendered {rendered} hooks but {previous} on the previous render"
            ),
            ReconcileError::HookKindMismatch {
                component,
                index,
                expected,
            } => write!(f, "{component} hook #{index} changed kind; expected {expected}"),
            ReconcileError::UnknownRoot(id) => write!(f, "root {} does not exist", id.index()),
            ReconcileError::Host(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for ReconcileError {
    fn from(err: HostError) -> Self {
        ReconcileError::Host(err)
    }
}
