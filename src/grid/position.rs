//! Playback position mapping
//!
//! Resolves a playback position to the bar and beat under the cursor, and
//! decides when an active loop has run past its last bar.

use log::debug;
use serde::Serialize;

use super::builder::{bar_end, BarGrid};
use super::LoopRegion;
use crate::config::DEFAULT_FALLBACK_BAR_MS;
use crate::error::{Result, TapGridError};
use crate::timing::TimeSignature;

/// Cursor location for one playback sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionInfo {
    pub bar_index: usize,
    /// Beat within the bar, `0..beats_per_bar`
    pub subdivision_index: u32,
    /// Where playback must jump to when a loop wrapped
    pub seek_target: Option<f64>,
}

/// Maps playback positions onto a bar sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionMapper {
    fallback_bar_ms: f64,
}

impl Default for PositionMapper {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_BAR_MS)
    }
}

impl PositionMapper {
    /// `fallback_bar_ms` is the length assumed for the last bar
    pub fn new(fallback_bar_ms: f64) -> Self {
        Self { fallback_bar_ms }
    }

    /// Mapper for `grid` whose last bar runs for the grid's nominal bar
    /// length, so its beats keep the width of every other bar. Falls back to
    /// `fallback_bar_ms` when the grid has no usable bar length.
    pub fn for_grid(grid: &BarGrid, fallback_bar_ms: f64) -> Self {
        let bar_ms = grid.bar_ms();
        if bar_ms.is_finite() && bar_ms > 0.0 {
            Self::new(bar_ms)
        } else {
            Self::new(fallback_bar_ms)
        }
    }

    pub fn fallback_bar_ms(&self) -> f64 {
        self.fallback_bar_ms
    }

    /// Resolve `position_ms` against `bars`
    ///
    /// When `loop_region` is given and the position reached the end of its
    /// last bar, the result points at the loop start and carries a seek
    /// target.
    ///
    /// # Example
    /// ```
    /// use tapgrid::grid::{LoopRegion, PositionMapper};
    /// use tapgrid::timing::TimeSignature;
    ///
    /// let bars = [0.0, 1000.0, 2000.0, 3000.0];
    /// let region = LoopRegion::new(1, 2).unwrap();
    /// let info = PositionMapper::default()
    ///     .map(&bars, TimeSignature::FOUR_FOUR, 3000.0, Some(region))
    ///     .unwrap();
    /// assert_eq!(info.bar_index, 1);
    /// assert_eq!(info.seek_target, Some(1000.0));
    /// ```
    pub fn map(
        &self,
        bars: &[f64],
        time_signature: TimeSignature,
        position_ms: f64,
        loop_region: Option<LoopRegion>,
    ) -> Result<PositionInfo> {
        if bars.is_empty() {
            return Err(TapGridError::EmptyBarSequence);
        }

        let mut bar_index = bars.partition_point(|&start| start <= position_ms).saturating_sub(1);
        let mut position = position_ms;
        let mut seek_target = None;

        if let Some(region) = loop_region {
            region.check_within(bars.len())?;

            let loop_end = self.bar_end(bars, region.end_bar());
            if position_ms >= loop_end {
                let target = bars[region.start_bar()];
                debug!(
                    "[LOOP] {:.1} ms passed loop end {:.1} ms, rewinding to bar {} at {:.1} ms",
                    position_ms,
                    loop_end,
                    region.start_bar(),
                    target
                );
                bar_index = region.start_bar();
                position = target;
                seek_target = Some(target);
            }
        }

        Ok(PositionInfo {
            bar_index,
            subdivision_index: self.subdivision(bars, bar_index, time_signature, position),
            seek_target,
        })
    }

    fn bar_end(&self, bars: &[f64], index: usize) -> f64 {
        bar_end(bars, index, self.fallback_bar_ms).unwrap_or(f64::INFINITY)
    }

    fn subdivision(
        &self,
        bars: &[f64],
        bar_index: usize,
        time_signature: TimeSignature,
        position_ms: f64,
    ) -> u32 {
        let beats = time_signature.beats_per_bar();
        let start = bars[bar_index];
        let beat_ms = (self.bar_end(bars, bar_index) - start) / beats as f64;

        let beat = ((position_ms - start) / beat_ms).floor();
        if !(beat > 0.0) {
            // Before the first bar, or a zero-length bar
            return 0;
        }
        (beat as u32).min(beats - 1)
    }
}

/// Map a position with the default last-bar fallback
pub fn map_position(
    bars: &[f64],
    time_signature: TimeSignature,
    position_ms: f64,
    loop_region: Option<LoopRegion>,
) -> Result<PositionInfo> {
    PositionMapper::default().map(bars, time_signature, position_ms, loop_region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const BARS: [f64; 4] = [0.0, 1000.0, 2000.0, 3000.0];

    fn map(position: f64, region: Option<LoopRegion>) -> PositionInfo {
        map_position(&BARS, TimeSignature::FOUR_FOUR, position, region).unwrap()
    }

    #[test_case(0.0, 0, 0 ; "start of first bar")]
    #[test_case(1000.0, 1, 0 ; "exact bar start")]
    #[test_case(999.999, 0, 3 ; "just before next bar")]
    #[test_case(1250.0, 1, 1 ; "second beat")]
    #[test_case(2749.0, 2, 2 ; "third beat")]
    #[test_case(3500.0, 3, 0 ; "last bar uses fallback length")]
    #[test_case(6999.0, 3, 3 ; "end of fallback bar")]
    fn test_bar_and_beat(position: f64, bar: usize, beat: u32) {
        let info = map(position, None);
        assert_eq!(info.bar_index, bar);
        assert_eq!(info.subdivision_index, beat);
        assert_eq!(info.seek_target, None);
    }

    #[test]
    fn test_position_before_first_bar() {
        let bars = [500.0, 2500.0];
        let info = map_position(&bars, TimeSignature::FOUR_FOUR, 100.0, None).unwrap();
        assert_eq!(info.bar_index, 0);
        assert_eq!(info.subdivision_index, 0);
    }

    #[test]
    fn test_past_fallback_bar_clamps_to_last_beat() {
        let info = map(50_000.0, None);
        assert_eq!(info.bar_index, 3);
        assert_eq!(info.subdivision_index, 3);
    }

    #[test]
    fn test_loop_inside_region_does_not_seek() {
        let region = LoopRegion::new(1, 2).unwrap();
        let info = map(2999.0, Some(region));
        assert_eq!(info.bar_index, 2);
        assert_eq!(info.seek_target, None);
    }

    #[test]
    fn test_loop_end_triggers_seek() {
        let region = LoopRegion::new(1, 2).unwrap();
        let info = map(3000.0, Some(region));
        assert_eq!(info.bar_index, 1);
        assert_eq!(info.subdivision_index, 0);
        assert_eq!(info.seek_target, Some(1000.0));
    }

    #[test]
    fn test_loop_on_last_bar_uses_fallback_boundary() {
        let region = LoopRegion::new(3, 3).unwrap();
        assert_eq!(map(6999.0, Some(region)).seek_target, None);
        assert_eq!(map(7000.0, Some(region)).seek_target, Some(3000.0));
    }

    #[test]
    fn test_custom_fallback() {
        let mapper = PositionMapper::new(2000.0);
        let region = LoopRegion::new(3, 3).unwrap();
        let info = mapper
            .map(&BARS, TimeSignature::FOUR_FOUR, 5000.0, Some(region))
            .unwrap();
        assert_eq!(info.seek_target, Some(3000.0));
    }

    #[test]
    fn test_grid_mapper_uses_nominal_bar_length() {
        use crate::timing::Tempo;

        let grid = BarGrid::from_parts(BARS.to_vec(), Tempo::new(240).unwrap(), TimeSignature::FOUR_FOUR);
        let mapper = PositionMapper::for_grid(&grid, 4000.0);
        assert_eq!(mapper.fallback_bar_ms(), 1000.0);

        let info = mapper.map(grid.bars(), TimeSignature::FOUR_FOUR, 3750.0, None).unwrap();
        assert_eq!((info.bar_index, info.subdivision_index), (3, 3));
    }

    #[test]
    fn test_loop_before_region_does_not_seek() {
        let region = LoopRegion::new(2, 3).unwrap();
        let info = map(500.0, Some(region));
        assert_eq!(info.bar_index, 0);
        assert_eq!(info.seek_target, None);
    }

    #[test]
    fn test_empty_bars_is_an_error() {
        let err = map_position(&[], TimeSignature::FOUR_FOUR, 0.0, None).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_BAR_SEQUENCE");
    }

    #[test]
    fn test_loop_outside_grid_is_an_error() {
        let region = LoopRegion::new(2, 9).unwrap();
        let err = map_position(&BARS, TimeSignature::FOUR_FOUR, 0.0, Some(region)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_LOOP_REGION");
    }

    #[test]
    fn test_waltz_subdivisions() {
        let waltz = TimeSignature::new(3, 4).unwrap();
        let info = map_position(&[0.0, 1500.0, 3000.0], waltz, 1000.0, None).unwrap();
        assert_eq!(info.subdivision_index, 2);
    }
}
