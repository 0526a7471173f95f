//! `tessera-store` - the normalized dashboard store.
//!
//! Slices are plain state structs with an action enum and a pure `reduce`;
//! `DashboardState` composes them and `DashboardStore` is the single point
//! through which they change.

pub mod error;
pub mod memo;
pub mod selectors;
pub mod slices;
pub mod state;
pub mod store;

pub use error::StoreError;
pub use memo::{MemoKey, MemoSelector};
pub use selectors::DashboardSelectors;
pub use state::{DashboardState, StoreAction};
pub use store::DashboardStore;
