//! Python-style `start:stop:step` ranges

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use super::errors::{SliceError, SliceResult};

/// A `start:stop:step` range; negative bounds count from the end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceSpec {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl SliceSpec {
    pub fn new(start: Option<isize>, stop: Option<isize>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    /// `[:]`
    pub fn full() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// Positions selected from a sequence of `len` items, in order.
    ///
    /// Out-of-range bounds are clamped, as in Python; only a zero step fails.
    pub fn indices(&self, len: usize) -> SliceResult<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(SliceError::ZeroStep);
        }
        let len = len as isize;
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: isize| {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };
        let start = self
            .start
            .map(clamp)
            .unwrap_or(if step > 0 { lower } else { upper });
        let stop = self
            .stop
            .map(clamp)
            .unwrap_or(if step > 0 { upper } else { lower });

        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(out)
    }
}

impl fmt::Display for SliceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<isize>| b.map(|v| v.to_string()).unwrap_or_default();
        match self.step {
            Some(step) => write!(f, "[{}:{}:{}]", bound(self.start), bound(self.stop), step),
            None => write!(f, "[{}:{}]", bound(self.start), bound(self.stop)),
        }
    }
}

impl From<Range<isize>> for SliceSpec {
    fn from(r: Range<isize>) -> Self {
        Self::new(Some(r.start), Some(r.end))
    }
}

impl From<RangeFrom<isize>> for SliceSpec {
    fn from(r: RangeFrom<isize>) -> Self {
        Self::new(Some(r.start), None)
    }
}

impl From<RangeTo<isize>> for SliceSpec {
    fn from(r: RangeTo<isize>) -> Self {
        Self::new(None, Some(r.end))
    }
}

impl From<RangeFull> for SliceSpec {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_ranges() {
        assert_eq!(SliceSpec::from(3..7).indices(10).unwrap(), vec![3, 4, 5, 6]);
        assert_eq!(SliceSpec::full().with_step(2).indices(10).unwrap().len(), 5);
        assert_eq!(SliceSpec::from(-5..).indices(10).unwrap(), vec![5, 6, 7, 8, 9]);
        assert_eq!(SliceSpec::from(..2).indices(10).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(SliceSpec::from(0..100).indices(10).unwrap().len(), 10);
        assert!(SliceSpec::from(10..20).indices(10).unwrap().is_empty());
        assert_eq!(SliceSpec::from(-100..2).indices(3).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_negative_step() {
        assert_eq!(
            SliceSpec::full().with_step(-1).indices(4).unwrap(),
            vec![3, 2, 1, 0]
        );
        assert_eq!(
            SliceSpec::new(Some(5), Some(1)).with_step(-2).indices(10).unwrap(),
            vec![5, 3]
        );
    }

    #[test]
    fn test_extreme_steps_take_one_element() {
        assert_eq!(
            SliceSpec::new(Some(1), Some(5)).with_step(isize::MAX).indices(10).unwrap(),
            vec![1]
        );
        assert_eq!(
            SliceSpec::full().with_step(isize::MIN).indices(4).unwrap(),
            vec![3]
        );
    }

    #[test]
    fn test_zero_step() {
        assert_eq!(
            SliceSpec::full().with_step(0).indices(3),
            Err(SliceError::ZeroStep)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SliceSpec::from(5..8).to_string(), "[5:8]");
        assert_eq!(SliceSpec::full().with_step(2).to_string(), "[::2]");
        assert_eq!(SliceSpec::from(1..).to_string(), "[1:]");
    }
}
