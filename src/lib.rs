// src/lib.rs
//! Naming contexts exposed as dynamic management beans.
//!
//! A [`BindingContext`] owns the name → value bindings of one logical naming
//! context. Its bindings are surfaced as attributes, and the standard naming
//! operations (`bind`, `lookup`, `rebind`, `unbind`, `rename`, `list`, ...)
//! can be invoked by name and parameter signature through a dispatch table
//! keyed by a deterministic signature hash.

pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod notification;
pub mod registration;
pub mod registry;
pub mod signature;
pub mod value;

pub use context::{Attribute, BindingContext};
pub use error::{InvocationCause, ManagementError, ManagementResult, NamingError, NamingResult};
pub use features::{AttributeInfo, ConstructorInfo, ContextInfo, NotificationInfo, OperationInfo};
pub use notification::{Notification, NotificationKind};
pub use registration::{LocalServer, ManagementServer, ObjectName, RegistrationState};
pub use registry::BindingRegistry;
pub use value::{BindingState, Value};
