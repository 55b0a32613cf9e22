/// Inclusive interval over a cohort measure. A single value is a range whose
/// start and end coincide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureRange {
    start: f64,
    end: f64,
}

impl MeasureRange {
    pub fn new(start: f64, end: f64) -> Self {
        debug_assert!(start <= end, "range start {start} exceeds end {end}");
        Self { start, end }
    }

    pub fn single(value: f64) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, value: f64) -> bool {
        self.start <= value && value <= self.end
    }
}
