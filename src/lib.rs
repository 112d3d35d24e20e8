// ============================================================================
// goki: persistence and aggregation core
// ============================================================================

pub mod config;
pub mod core;
pub mod facade;
pub mod storage;

// Re-export main types for convenience
pub use crate::config::{StoreConfig, StoreLocation};
pub use crate::core::{
    Activity, Clock, Counters, ErrorKind, FixedClock, GokiError, MediumError, Result, SystemClock,
    User, aggregate,
};
pub use crate::facade::App;
pub use crate::storage::{
    ActivityStore, FileActivityStore, FileMedium, FileUserStore, HttpMedium, JsonActivityStore,
    JsonUserStore, Medium, MemoryMedium, RemoteActivityStore, RemoteUserStore, UserStore,
    time_window,
};
