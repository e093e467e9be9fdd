use crate::spatial::GridSize;

/// Iterator over all indices of a grid in linear storage order.
///
/// Dimension 0 varies fastest, matching `GridSize::linear_index`, so the
/// n-th index yielded is the one stored at offset n.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality
#[derive(Debug, Clone)]
pub struct GridIndices<const D: usize> {
    size: GridSize<D>,
    next: Option<[usize; D]>,
}

impl<const D: usize> GridIndices<D> {
    /// Create an iterator over the indices of `size`.
    pub fn new(size: GridSize<D>) -> Self {
        let next = if D == 0 || size.is_degenerate() {
            None
        } else {
            Some([0; D])
        };
        Self { size, next }
    }
}

impl<const D: usize> Iterator for GridIndices<D> {
    type Item = [usize; D];

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let mut successor = current;
        self.next = None;
        for d in 0..D {
            successor[d] += 1;
            if successor[d] < self.size[d] {
                self.next = Some(successor);
                break;
            }
            successor[d] = 0;
        }
        Some(current)
    }
}

/// Generate the indices of a grid as continuous coordinates.
///
/// # Arguments
/// * `size` - The grid extent
///
/// # Returns
/// One `[f64; D]` coordinate per grid point in linear storage order
pub fn generate_grid<const D: usize>(size: GridSize<D>) -> Vec<[f64; D]> {
    GridIndices::new(size)
        .map(|index| {
            let mut point = [0.0; D];
            for d in 0..D {
                point[d] = index[d] as f64;
            }
            point
        })
        .collect()
}
