pub mod command;
pub mod context;
pub mod error;
pub mod event;
pub mod refs;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing_support;

pub use command::{
    AttributeSelectionType, CommandEnvelope, CommandKind, DashboardCommand, DateFilterSelection,
    FilterSelection, ItemDefinition,
};
pub use context::DashboardContext;
pub use error::{BackendError, CommandError};
pub use event::{DashboardEvent, EventKind};
pub use refs::{serialize_obj_ref, ObjRef};
pub use traits::{AnalyticalBackend, BackendCapabilities};
pub use types::*;
