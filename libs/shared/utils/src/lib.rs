pub mod dates;
pub mod test_utils;

pub use dates::{Clock, FixedClock, SystemClock};
