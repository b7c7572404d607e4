//! Stream combinators for display consumers

pub mod throttle;

pub use self::throttle::{Throttle, ThrottleExt};
