//! Turn probe results into the ordered part list.

use std::path::Path;

use crate::part::Part;
use crate::segmenter::{effective_part_size, plan_ranges};

pub(super) const WHOLE_PART_NAME: &str = "whole";

pub(super) struct PlanInput<'a> {
    pub url: &'a str,
    pub temp_dir: &'a Path,
    pub supports_ranges: bool,
    pub file_size: i64,
    pub part_size: u64,
    pub min_part_size: u64,
    pub connection_count: usize,
}

/// Parts in ascending byte order, which is also the concatenation order.
///
/// Without range support or a known positive size the whole resource is one part.
pub(super) fn build_plan(input: &PlanInput<'_>) -> Vec<Part> {
    let size = u64::try_from(input.file_size).unwrap_or(0);
    if !input.supports_ranges || size == 0 {
        let file = input.temp_dir.join(WHOLE_PART_NAME);
        return vec![Part::new(WHOLE_PART_NAME, input.url, file, None)];
    }
    let part_size = effective_part_size(
        input.part_size,
        input.min_part_size,
        size,
        input.connection_count,
    );
    plan_ranges(size, part_size)
        .into_iter()
        .enumerate()
        .map(|(idx, range)| {
            let name = format!("part{idx}");
            let file = input.temp_dir.join(&name);
            Part::new(name, input.url, file, Some(range))
        })
        .collect()
}
