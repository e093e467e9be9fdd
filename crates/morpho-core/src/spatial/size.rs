//! Grid extent type shared by images, vector fields and transformations.

use std::fmt;

/// Extent of a D-dimensional sampling grid.
///
/// Dimension 0 is the fastest varying one in linear storage order, so a
/// 2D size reads `[width, height]` and a 3D size `[width, height, depth]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize<const D: usize>(pub [usize; D]);

impl<const D: usize> GridSize<D> {
    /// Create a size from per-dimension extents.
    pub const fn new(dims: [usize; D]) -> Self {
        Self(dims)
    }

    /// Create a size with the same extent along every dimension.
    pub const fn splat(extent: usize) -> Self {
        Self([extent; D])
    }

    /// Per-dimension extents.
    pub fn dims(&self) -> [usize; D] {
        self.0
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.0.iter().product()
    }

    /// True if the grid has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if any dimension has zero extent.
    pub fn is_degenerate(&self) -> bool {
        self.0.iter().any(|&n| n == 0)
    }

    /// Divide every extent by `factor`, truncating.
    ///
    /// # Panics
    /// Panics if `factor` is zero.
    pub fn scale_down(&self, factor: usize) -> Self {
        assert!(factor > 0, "Scale factor must be positive");
        let mut dims = self.0;
        for d in dims.iter_mut() {
            *d /= factor;
        }
        Self(dims)
    }

    /// Per-dimension ratio `other / self`.
    ///
    /// Used when a deformation defined on this grid is carried over to
    /// `other`: displacements scale with this ratio.
    pub fn ratio_to(&self, other: &Self) -> [f64; D] {
        let mut ratio = [1.0; D];
        for d in 0..D {
            ratio[d] = other.0[d] as f64 / self.0[d] as f64;
        }
        ratio
    }

    /// Linear storage offset of a grid index.
    pub fn linear_index(&self, index: [usize; D]) -> usize {
        let mut offset = 0;
        for d in (0..D).rev() {
            debug_assert!(index[d] < self.0[d], "Index out of grid bounds");
            offset = offset * self.0[d] + index[d];
        }
        offset
    }

    /// Grid index of a linear storage offset.
    pub fn index_of(&self, mut offset: usize) -> [usize; D] {
        let mut index = [0; D];
        for d in 0..D {
            index[d] = offset % self.0[d];
            offset /= self.0[d];
        }
        index
    }

    /// True if `index` lies inside the grid.
    pub fn contains(&self, index: &[usize; D]) -> bool {
        index.iter().zip(self.0.iter()).all(|(i, n)| i < n)
    }
}

impl<const D: usize> From<[usize; D]> for GridSize<D> {
    fn from(dims: [usize; D]) -> Self {
        Self(dims)
    }
}

impl<const D: usize> std::ops::Index<usize> for GridSize<D> {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Div<usize> for GridSize<D> {
    type Output = Self;

    fn div(self, factor: usize) -> Self::Output {
        self.scale_down(factor)
    }
}

impl<const D: usize> fmt::Display for GridSize<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", n)?;
        }
        write!(f, ">")
    }
}
