pub mod aggregate;
pub mod clock;
pub mod error;
pub mod types;

pub use aggregate::aggregate;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorKind, GokiError, MediumError, Result};
pub use types::{Activity, Counters, User};
