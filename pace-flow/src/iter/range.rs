//! Numeric ranges for `repeat`, `for_ever` and `range`.

use pace_core::{ChainError, Result};

/// `{begin, end, step}` descriptor.
///
/// `begin` is included. `end` is excluded: a positive step runs while the
/// counter is below `end`, a negative step while it is above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// First value.
    pub begin: i64,
    /// Exclusive boundary.
    pub end: i64,
    /// Increment; must not be zero.
    pub step: i64,
}

impl RangeSpec {
    /// A range with step 1.
    pub fn new(begin: i64, end: i64) -> Self {
        Self {
            begin,
            end,
            step: 1,
        }
    }

    /// Replace the step.
    pub fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Iterate the range. A zero step is rejected.
    pub fn iter(&self) -> Result<RangeIter> {
        if self.step == 0 {
            return Err(ChainError::InvalidArgument {
                operation: "range",
                cause: "step must not be zero".to_string(),
            });
        }
        Ok(RangeIter {
            next: Some(self.begin),
            end: self.end,
            step: self.step,
        })
    }
}

/// How many times, or over which numbers, `repeat` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Indices `0..n`.
    Count(usize),
    /// An explicit descriptor.
    Range(RangeSpec),
}

impl Repeat {
    /// The descriptor this repeat covers.
    pub fn spec(&self) -> RangeSpec {
        match *self {
            Self::Count(n) => RangeSpec::new(0, i64::try_from(n).unwrap_or(i64::MAX)),
            Self::Range(spec) => spec,
        }
    }

    /// Iterate the values.
    pub fn iter(&self) -> Result<RangeIter> {
        self.spec().iter()
    }
}

impl From<usize> for Repeat {
    fn from(n: usize) -> Self {
        Self::Count(n)
    }
}

impl From<RangeSpec> for Repeat {
    fn from(spec: RangeSpec) -> Self {
        Self::Range(spec)
    }
}

/// Iterator over a [`RangeSpec`].
#[derive(Debug, Clone)]
pub struct RangeIter {
    next: Option<i64>,
    end: i64,
    step: i64,
}

impl Iterator for RangeIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.next?;
        let inside = if self.step > 0 {
            current < self.end
        } else {
            current > self.end
        };
        if !inside {
            self.next = None;
            return None;
        }
        self.next = current.checked_add(self.step);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(spec: impl Into<Repeat>) -> Vec<i64> {
        spec.into().iter().unwrap().collect()
    }

    #[test]
    fn count_is_zero_based() {
        assert_eq!(collect(4usize), vec![0, 1, 2, 3]);
        assert!(collect(0usize).is_empty());
    }

    #[test]
    fn descriptor_excludes_end_by_step_sign() {
        assert_eq!(collect(RangeSpec::new(2, 5)), vec![2, 3, 4]);
        assert_eq!(collect(RangeSpec::new(0, 10).step(3)), vec![0, 3, 6, 9]);
        assert_eq!(collect(RangeSpec::new(5, 0).step(-2)), vec![5, 3, 1]);
        assert!(collect(RangeSpec::new(5, 0)).is_empty());
    }

    #[test]
    fn zero_step_rejected() {
        let err = RangeSpec::new(0, 3).step(0).iter().unwrap_err();
        assert_eq!(err.code(), "E402");
    }

    #[test]
    fn overflow_stops() {
        let values: Vec<i64> = RangeSpec::new(i64::MAX - 1, i64::MAX)
            .step(5)
            .iter()
            .unwrap()
            .collect();
        assert_eq!(values, vec![i64::MAX - 1]);
    }
}
