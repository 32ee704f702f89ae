//! Driver session and area lifecycle.
//!
//! ```text
//! SessionManager
//! ├─ drivers: ResourceRegistry<DriverSession>   (handle → driver + engine)
//! └─ areas:   ResourceRegistry<Area>            (handle → area engine, parent handle)
//! ```
//!
//! Areas hold only their parent's handle. Quitting a driver evicts every
//! area whose parent it is, after calls in flight against either have
//! finished.

mod manager;
mod types;

pub use manager::SessionManager;
pub use types::{Area, DriverInfo, DriverSession, DriverStarted};
