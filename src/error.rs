//! Error types for the runtime, scene graph and simulation engine.

use thiserror::Error;

/// Errors raised by flare.
///
/// Construction-time failures ([`MissingCapability`](Error::MissingCapability),
/// [`AllocationFailure`](Error::AllocationFailure) during `init`) are fatal to the
/// instance that raised them. [`CompileFailure`](Error::CompileFailure) is usually
/// logged by the consumer and the affected stage is disabled for the session.
#[derive(Error, Debug)]
pub enum Error {
    /// An offscreen target or buffer could not be created.
    #[error("failed to allocate {label}: {reason}")]
    AllocationFailure { label: String, reason: String },

    /// A program failed to build.
    #[error("failed to compile {label}: {message}")]
    CompileFailure { label: String, message: String },

    /// A required device, adapter or API feature is absent.
    #[error("not supported: {0}")]
    MissingCapability(String),

    /// A reparent would have made a node its own ancestor.
    #[error("cannot parent '{node}' under '{parent}': would create a cycle")]
    HierarchyViolation { node: String, parent: String },

    /// A node id is already registered in the scene.
    #[error("scene node '{0}' already exists")]
    DuplicateNode(String),

    /// No node with this id is registered in the scene.
    #[error("scene node '{0}' not found")]
    UnknownNode(String),

    /// No plugin carries this identity tag.
    #[error("plugin '{0}' not found")]
    UnknownPlugin(String),

    /// A device handle does not refer to a live resource.
    #[error("unknown {0} handle")]
    UnknownResource(&'static str),

    /// The presentation surface could not provide a frame.
    #[error("surface error: {0}")]
    Surface(String),

    /// The window event loop failed.
    #[error("event loop error: {0}")]
    EventLoop(String),

    /// Reading a shader file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn allocation(label: impl Into<String>, reason: impl ToString) -> Self {
        Error::AllocationFailure {
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn compile(label: impl Into<String>, message: impl ToString) -> Self {
        Error::CompileFailure {
            label: label.into(),
            message: message.to_string(),
        }
    }

    /// Returns true for errors that disable a single pipeline stage rather than
    /// the whole engine instance.
    pub fn is_compile_failure(&self) -> bool {
        matches!(self, Error::CompileFailure { .. })
    }
}

/// Result type alias using flare's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
