// Manually chosen exclusion ranges

use super::WindowFilter;
use crate::config::TimeRange;
use crate::core::stream::AlignedStream;
use crate::core::window::ExclusionReason;
use crate::error::{HvsrError, Result};

pub struct ManualFilter {
    ranges: Vec<TimeRange>,
}

impl ManualFilter {
    pub fn new(ranges: Vec<TimeRange>) -> Self {
        Self { ranges }
    }

    /// Well-formed, mutually disjoint ranges sorted by start
    pub fn checked_ranges(&self) -> Result<Vec<TimeRange>> {
        for r in &self.ranges {
            if !(r.start.is_finite() && r.end.is_finite()) || r.start >= r.end {
                return Err(HvsrError::MalformedRange {
                    start: r.start,
                    end: r.end,
                });
            }
        }

        let mut sorted = self.ranges.clone();
        sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
        for pair in sorted.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(HvsrError::OverlappingExclusion {
                    first_start: pair[0].start,
                    first_end: pair[0].end,
                    second_start: pair[1].start,
                    second_end: pair[1].end,
                });
            }
        }
        Ok(sorted)
    }
}

impl WindowFilter for ManualFilter {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn reason(&self) -> ExclusionReason {
        ExclusionReason::Manual
    }

    fn excluded_ranges(&self, _stream: &AlignedStream) -> Result<Vec<TimeRange>> {
        self.checked_ranges()
    }
}
