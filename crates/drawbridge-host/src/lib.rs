//! Host-editor side of the bridge: document model, per-document bindings,
//! the live-binding registry, and the library import flow.

pub mod binding;
pub mod document;
pub mod import;
pub mod pickers;
pub mod registry;
pub mod watch;

pub use binding::EditorBinding;
pub use document::{DocumentChange, DocumentEvents, FileDocument, HostDocument};
pub use import::{run_import, ImportCommand};
pub use registry::BindingRegistry;
pub use watch::DocumentWatcher;
