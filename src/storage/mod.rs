pub mod activity_store;
mod document;
pub mod http;
pub mod medium;
pub mod store;
pub mod user_store;

pub use activity_store::{
    FileActivityStore, JsonActivityStore, MAX_COLLISION_PROBES, RemoteActivityStore,
};
pub use http::{DEFAULT_ACCESS_TIMEOUT, HttpMedium};
pub use medium::{FileMedium, Medium, MemoryMedium};
pub use store::{ActivityFilter, ActivityStore, UserStore, time_window};
pub use user_store::{FileUserStore, JsonUserStore, RemoteUserStore};
