//! Range math and part planning.

mod range;

pub use range::{effective_part_size, plan_ranges, ByteRange};
