mod capabilities;
mod identity;
mod registry;

pub use capabilities::{Constraint, PropertySpec, Requirement, WorkerCapabilities, WorkerType};
pub use identity::{WorkerId, WorkerIdentifier};
pub use registry::{NOT_LOADED_ERROR, WorkerHandle, WorkerLifecycle, WorkerRegistry};
