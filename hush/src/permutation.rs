use crate::HitDistanceReconstruction;

/// Runtime choice a pass can provide separate kernels for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    PerformanceMode,
    Checkerboard,
    ConfidenceInputs,
    HitDistanceReconstruction,
    HistoryReset,
}

impl Axis {
    pub const ALL: [Self; 5] = [
        Self::PerformanceMode,
        Self::Checkerboard,
        Self::ConfidenceInputs,
        Self::HitDistanceReconstruction,
        Self::HistoryReset,
    ];

    /// Returns how many distinct values this axis can take.
    pub fn cardinality(self) -> usize {
        match self {
            Self::HitDistanceReconstruction => 3,
            _ => 2,
        }
    }
}

/// Combination of runtime choices that selects one precompiled kernel
/// variant.
///
/// Each pass varies over a subset of [`Axis`]; values of the remaining axes
/// are ignored (see [`Self::project()`]). Variants are stored at
/// [`Self::offset()`], so the order in which a pass registers them doesn't
/// matter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Permutation {
    pub performance_mode: bool,
    pub checkerboard: bool,
    pub confidence_inputs: bool,
    pub hit_distance_reconstruction: HitDistanceReconstruction,
    pub history_reset: bool,
}

impl Permutation {
    pub fn get(&self, axis: Axis) -> usize {
        match axis {
            Axis::PerformanceMode => self.performance_mode as usize,
            Axis::Checkerboard => self.checkerboard as usize,
            Axis::ConfidenceInputs => self.confidence_inputs as usize,
            Axis::HitDistanceReconstruction => {
                self.hit_distance_reconstruction.index()
            }
            Axis::HistoryReset => self.history_reset as usize,
        }
    }

    fn set(&mut self, axis: Axis, value: usize) {
        debug_assert!(value < axis.cardinality());

        match axis {
            Axis::PerformanceMode => self.performance_mode = value != 0,
            Axis::Checkerboard => self.checkerboard = value != 0,
            Axis::ConfidenceInputs => self.confidence_inputs = value != 0,
            Axis::HitDistanceReconstruction => {
                self.hit_distance_reconstruction =
                    HitDistanceReconstruction::from_index(value);
            }
            Axis::HistoryReset => self.history_reset = value != 0,
        }
    }

    /// Keeps values of given axes, resetting the rest to their defaults.
    pub fn project(&self, axes: &[Axis]) -> Self {
        let mut this = Self::default();

        for &axis in axes {
            this.set(axis, self.get(axis));
        }

        this
    }

    pub fn is_projected(&self, axes: &[Axis]) -> bool {
        *self == self.project(axes)
    }

    /// Returns the mixed-radix encoding of this permutation over given axes,
    /// first axis being the most significant one.
    ///
    /// Always lands in `0..Self::count(axes)`.
    pub fn offset(&self, axes: &[Axis]) -> usize {
        axes.iter().fold(0, |offset, &axis| {
            offset * axis.cardinality() + self.get(axis)
        })
    }

    /// Inverse of [`Self::offset()`].
    pub fn from_offset(axes: &[Axis], mut offset: usize) -> Self {
        let mut this = Self::default();

        for &axis in axes.iter().rev() {
            this.set(axis, offset % axis.cardinality());
            offset /= axis.cardinality();
        }

        this
    }

    /// Returns how many permutations there are over given axes.
    pub fn count(axes: &[Axis]) -> usize {
        axes.iter().map(|axis| axis.cardinality()).product()
    }

    /// Returns all permutations over given axes, ordered by their offsets.
    pub fn enumerate(axes: &[Axis]) -> impl Iterator<Item = Self> + '_ {
        (0..Self::count(axes)).map(|offset| Self::from_offset(axes, offset))
    }

    /// Returns every reachable combination of runtime choices.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::enumerate(&Axis::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_positional() {
        let axes = [Axis::PerformanceMode, Axis::HistoryReset];

        let offset = |performance_mode, history_reset| {
            Permutation {
                performance_mode,
                history_reset,
                ..Default::default()
            }
            .offset(&axes)
        };

        assert_eq!(0, offset(false, false));
        assert_eq!(1, offset(false, true));
        assert_eq!(2, offset(true, false));
        assert_eq!(3, offset(true, true));
    }

    #[test]
    fn offsets_are_mixed_radix() {
        let axes = [Axis::HitDistanceReconstruction, Axis::PerformanceMode];

        let target = Permutation {
            hit_distance_reconstruction: HitDistanceReconstruction::Area5x5,
            performance_mode: true,
            ..Default::default()
        };

        assert_eq!(6, Permutation::count(&axes));
        assert_eq!(5, target.offset(&axes));
        assert_eq!(target, Permutation::from_offset(&axes, 5));
    }

    #[test]
    fn every_permutation_lands_in_range() {
        let axes_sets: [&[Axis]; 4] = [
            &[],
            &[Axis::Checkerboard],
            &[Axis::ConfidenceInputs, Axis::HistoryReset],
            &Axis::ALL,
        ];

        for axes in axes_sets {
            let count = Permutation::count(axes);

            for permutation in Permutation::all() {
                assert!(permutation.offset(axes) < count);

                assert_eq!(
                    permutation.offset(axes),
                    permutation.project(axes).offset(axes)
                );
            }
        }
    }

    #[test]
    fn enumerate() {
        let axes = [Axis::Checkerboard, Axis::ConfidenceInputs];
        let permutations: Vec<_> = Permutation::enumerate(&axes).collect();

        assert_eq!(4, permutations.len());

        for (offset, permutation) in permutations.iter().enumerate() {
            assert_eq!(offset, permutation.offset(&axes));
            assert!(permutation.is_projected(&axes));
        }

        assert_eq!(48, Permutation::all().count());
        assert_eq!(1, Permutation::enumerate(&[]).count());
    }

    #[test]
    fn projection() {
        let target = Permutation {
            performance_mode: true,
            checkerboard: true,
            history_reset: true,
            ..Default::default()
        };

        let projected = target.project(&[Axis::HistoryReset]);

        assert!(!projected.performance_mode);
        assert!(!projected.checkerboard);
        assert!(projected.history_reset);
        assert!(!target.is_projected(&[Axis::HistoryReset]));
    }
}
