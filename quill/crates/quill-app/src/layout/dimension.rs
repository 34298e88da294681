//! Size constraints negotiated between containers and their children.

use crate::context::AppContext;
use std::fmt;
use std::rc::Rc;

/// Stands in for "no upper limit".
pub const UNBOUNDED: usize = 1_000_000_000;

/// A `min..=max` range with a preferred value and a weight used when
/// sharing leftover space.
///
/// Unspecified bounds default to `0` and [`UNBOUNDED`]; an unspecified
/// preferred size defaults to the minimum. The preferred size is clamped
/// into the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    /// Smallest acceptable size.
    pub min: usize,
    /// Largest acceptable size.
    pub max: usize,
    /// Size to aim for.
    pub preferred: usize,
    /// Relative share of leftover space.
    pub weight: usize,
    min_specified: bool,
    max_specified: bool,
    preferred_specified: bool,
}

impl Default for Dimension {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

impl Dimension {
    /// Builds a dimension. When `max < min`, `max` is raised to `min`.
    pub fn new(
        min: Option<usize>,
        max: Option<usize>,
        preferred: Option<usize>,
        weight: Option<usize>,
    ) -> Self {
        let lo = min.unwrap_or(0);
        let hi = max.unwrap_or(UNBOUNDED).max(lo);
        let preferred_value = preferred.unwrap_or(lo).clamp(lo, hi);
        Self {
            min: lo,
            max: hi,
            preferred: preferred_value,
            weight: weight.unwrap_or(1),
            min_specified: min.is_some(),
            max_specified: max.is_some(),
            preferred_specified: preferred.is_some(),
        }
    }

    /// Exactly `amount` cells.
    pub fn exact(amount: usize) -> Self {
        Self::new(Some(amount), Some(amount), Some(amount), None)
    }

    /// Zero cells.
    pub fn zero() -> Self {
        Self::exact(0)
    }

    /// At least `min` cells.
    pub fn at_least(min: usize) -> Self {
        Self::new(Some(min), None, None, None)
    }

    /// At most `max` cells.
    pub fn at_most(max: usize) -> Self {
        Self::new(None, Some(max), None, None)
    }

    /// Any size, preferring `preferred`.
    pub fn preferred(preferred: usize) -> Self {
        Self::new(None, None, Some(preferred), None)
    }

    /// Returns a copy with another minimum.
    pub fn with_min(self, min: usize) -> Self {
        Self::new(
            Some(min),
            self.max_specified.then_some(self.max),
            self.preferred_specified.then_some(self.preferred),
            Some(self.weight),
        )
    }

    /// Returns a copy with another maximum.
    pub fn with_max(self, max: usize) -> Self {
        Self::new(
            self.min_specified.then_some(self.min),
            Some(max),
            self.preferred_specified.then_some(self.preferred),
            Some(self.weight),
        )
    }

    /// Returns a copy with another preferred size.
    pub fn with_preferred(self, preferred: usize) -> Self {
        Self::new(
            self.min_specified.then_some(self.min),
            self.max_specified.then_some(self.max),
            Some(preferred),
            Some(self.weight),
        )
    }

    /// Returns a copy with another weight.
    pub fn with_weight(mut self, weight: usize) -> Self {
        self.weight = weight;
        self
    }

    /// True when the minimum was given explicitly.
    pub fn min_specified(&self) -> bool {
        self.min_specified
    }

    /// True when the maximum was given explicitly.
    pub fn max_specified(&self) -> bool {
        self.max_specified
    }

    /// True when the preferred size was given explicitly.
    pub fn preferred_specified(&self) -> bool {
        self.preferred_specified
    }

    /// A dimension that can only be zero.
    pub fn is_zero(&self) -> bool {
        self.preferred == 0 || self.max == 0
    }
}

impl From<usize> for Dimension {
    fn from(amount: usize) -> Self {
        Self::exact(amount)
    }
}

/// Sums minima, maxima and preferred sizes, as for children stacked along
/// the measured axis.
pub fn sum_layout_dimensions(dimensions: &[Dimension]) -> Dimension {
    let min = dimensions.iter().map(|d| d.min).sum::<usize>();
    let max = dimensions
        .iter()
        .fold(0usize, |acc, d| acc.saturating_add(d.max))
        .min(UNBOUNDED);
    let preferred = dimensions.iter().map(|d| d.preferred).sum::<usize>();
    Dimension::new(Some(min), Some(max), Some(preferred), None)
}

/// Combines dimensions of children placed side by side across the measured
/// axis: the largest minimum, and a maximum that does not cut any child
/// below its preferred size. Zero-sized children are ignored unless all are.
pub fn max_layout_dimensions(dimensions: &[Dimension]) -> Dimension {
    let Some(first) = dimensions.first() else {
        return Dimension::zero();
    };
    if dimensions.iter().all(Dimension::is_zero) {
        return *first;
    }
    let sized: Vec<&Dimension> = dimensions.iter().filter(|d| !d.is_zero()).collect();
    let min = sized.iter().map(|d| d.min).max().unwrap_or(0);
    let preferred = sized.iter().map(|d| d.preferred).max().unwrap_or(0);
    let smallest_max = sized.iter().map(|d| d.max).min().unwrap_or(UNBOUNDED);
    // Overlapping ranges cannot be guaranteed; the minimum wins.
    let max = smallest_max.max(preferred).max(min);
    Dimension::new(Some(min), Some(max), Some(preferred), None)
}

/// A dimension given either as a value or computed on each layout pass.
#[derive(Clone)]
pub enum DimensionSource {
    /// A fixed dimension.
    Fixed(Dimension),
    /// Computed from application state.
    Dynamic(Rc<dyn Fn(&AppContext) -> Dimension>),
}

impl fmt::Debug for DimensionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

impl DimensionSource {
    /// A dimension computed from application state.
    pub fn dynamic(f: impl Fn(&AppContext) -> Dimension + 'static) -> Self {
        Self::Dynamic(Rc::new(f))
    }

    /// Resolves the dimension for this pass.
    pub fn get(&self, ctx: &AppContext) -> Dimension {
        match self {
            Self::Fixed(d) => *d,
            Self::Dynamic(f) => f(ctx),
        }
    }
}

impl From<Dimension> for DimensionSource {
    fn from(d: Dimension) -> Self {
        Self::Fixed(d)
    }
}

impl From<usize> for DimensionSource {
    fn from(amount: usize) -> Self {
        Self::Fixed(Dimension::exact(amount))
    }
}

/// Resolves an optional dimension source, defaulting to an unconstrained
/// dimension.
pub fn to_dimension(source: Option<&DimensionSource>, ctx: &AppContext) -> Dimension {
    source.map_or_else(Dimension::default, |s| s.get(ctx))
}

/// Yields item indices in proportion to their weights, forever. Items with
/// zero weight are never yielded.
#[derive(Debug, Clone)]
pub(crate) struct TakeUsingWeights {
    items: Vec<(usize, usize)>,
    taken: Vec<usize>,
    max_weight: usize,
    round: usize,
    cursor: usize,
    added_this_pass: bool,
}

impl TakeUsingWeights {
    /// `None` when no item has a positive weight.
    pub(crate) fn new(weights: &[usize]) -> Option<Self> {
        let items: Vec<(usize, usize)> = weights
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, w)| *w > 0)
            .collect();
        let max_weight = items.iter().map(|(_, w)| *w).max()?;
        Some(Self {
            taken: vec![0; items.len()],
            items,
            max_weight,
            round: 0,
            cursor: 0,
            added_this_pass: false,
        })
    }
}

impl Iterator for TakeUsingWeights {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.cursor == self.items.len() {
                self.cursor = 0;
                if !self.added_this_pass {
                    self.round += 1;
                }
                self.added_this_pass = false;
            }
            let i = self.cursor;
            self.cursor += 1;
            let (item, weight) = self.items[i];
            // taken < round * weight / max_weight, in integers.
            if self.taken[i] * self.max_weight < self.round * weight {
                self.taken[i] += 1;
                self.added_this_pass = true;
                return Some(item);
            }
        }
    }
}

/// Distributes `available` cells over `dimensions`: everyone starts at
/// their minimum, grows towards their preferred size and then, when
/// `fill` is set, towards their maximum. Growth follows the weights.
/// Returns `None` when the minima do not fit.
pub(crate) fn divide(dimensions: &[Dimension], available: usize, fill: bool) -> Option<Vec<usize>> {
    if dimensions.is_empty() {
        return Some(Vec::new());
    }
    let total = sum_layout_dimensions(dimensions);
    if total.min > available {
        return None;
    }
    let mut sizes: Vec<usize> = dimensions.iter().map(|d| d.min).collect();
    let weights: Vec<usize> = dimensions.iter().map(|d| d.weight).collect();
    let Some(mut order) = TakeUsingWeights::new(&weights) else {
        return Some(sizes);
    };

    let mut grow = |sizes: &mut Vec<usize>, stop: usize, limit: &dyn Fn(&Dimension) -> usize| {
        let growable = |sizes: &[usize]| {
            dimensions
                .iter()
                .zip(sizes)
                .any(|(d, s)| d.weight > 0 && *s < limit(d))
        };
        while sizes.iter().sum::<usize>() < stop && growable(sizes) {
            if let Some(i) = order.next() {
                if sizes[i] < limit(&dimensions[i]) {
                    sizes[i] += 1;
                }
            }
        }
    };

    grow(&mut sizes, available.min(total.preferred), &|d| d.preferred);
    if fill {
        grow(&mut sizes, available.min(total.max), &|d| d.max);
    }
    Some(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preferred_is_clamped() {
        let d = Dimension::new(Some(5), Some(10), Some(20), None);
        assert_eq!(d.preferred, 10);
        let d = Dimension::new(Some(5), None, None, None);
        assert_eq!(d.preferred, 5);
        assert_eq!(d.max, UNBOUNDED);
        assert!(!d.preferred_specified());
    }

    #[test]
    fn test_sum_and_max() {
        let a = Dimension::exact(10);
        let b = Dimension::new(Some(2), Some(4), Some(3), None);
        let sum = sum_layout_dimensions(&[a, b]);
        assert_eq!((sum.min, sum.max, sum.preferred), (12, 14, 13));

        let max = max_layout_dimensions(&[a, b]);
        assert_eq!((max.min, max.max, max.preferred), (10, 10, 10));

        let zero = max_layout_dimensions(&[Dimension::zero(), a]);
        assert_eq!(zero.preferred, 10);
        assert_eq!(max_layout_dimensions(&[]), Dimension::zero());
    }

    #[test]
    fn test_weights_alternate() {
        let taken: Vec<usize> = TakeUsingWeights::new(&[1, 2, 0]).into_iter().flatten().take(6).collect();
        assert_eq!(taken, vec![0, 1, 1, 0, 1, 1]);
    }

    #[test]
    fn test_divide_fills_unbounded_child() {
        let sizes = divide(&[Dimension::exact(10), Dimension::at_least(5)], 80, true);
        assert_eq!(sizes, Some(vec![10, 70]));
    }

    #[test]
    fn test_divide_stops_at_preferred_without_fill() {
        let sizes = divide(&[Dimension::preferred(3), Dimension::preferred(2)], 80, false);
        assert_eq!(sizes, Some(vec![3, 2]));
    }

    #[test]
    fn test_divide_rejects_too_small() {
        assert_eq!(divide(&[Dimension::exact(10), Dimension::exact(10)], 15, true), None);
    }
}
