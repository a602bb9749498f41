//! Trim window containers
//!
//! The data structures the pipeline is built around, leaves first:
//! [`times::TrimTimes`] → [`sections::SectionsContainer`] →
//! [`map::TrimTimesMap`] → [`multimap::TrimTimesMultiMap`].

pub mod map;
pub mod multimap;
pub mod sections;
pub mod times;

pub use map::TrimTimesMap;
pub use multimap::TrimTimesMultiMap;
pub use sections::SectionsContainer;
pub use times::{TrimTimes, INVALID_TRIM_TIMES};
