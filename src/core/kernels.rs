//! Per-pixel raster algebra kernels.
//!
//! Every kernel allocates a fresh output grid. With the `parallel` feature the
//! work is spread over rayon through ndarray's `Zip` integration; results are
//! identical to the sequential path because each pixel is computed independently.

use crate::types::{Grid, Pixel, NO_DATA};
use ndarray::{ArrayView2, Zip};

/// Largest number of input bands a single index formula reads
pub const MAX_KERNEL_INPUTS: usize = 4;

/// Apply `f` to every pixel of `grid`
pub fn map_pixels<F>(grid: &ArrayView2<'_, Pixel>, f: F) -> Grid
where
    F: Fn(Pixel) -> Pixel + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        Zip::from(grid).par_map_collect(|&v| f(v))
    }
    #[cfg(not(feature = "parallel"))]
    {
        Zip::from(grid).map_collect(|&v| f(v))
    }
}

/// Combine two equally shaped grids pixel by pixel
pub fn zip_pixels<F>(a: &ArrayView2<'_, Pixel>, b: &ArrayView2<'_, Pixel>, f: F) -> Grid
where
    F: Fn(Pixel, Pixel) -> Pixel + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        Zip::from(a).and(b).par_map_collect(|&x, &y| f(x, y))
    }
    #[cfg(not(feature = "parallel"))]
    {
        Zip::from(a).and(b).map_collect(|&x, &y| f(x, y))
    }
}

/// Blank out every pixel where `usable` is false
pub fn apply_mask(grid: &ArrayView2<'_, Pixel>, usable: &ArrayView2<'_, bool>) -> Grid {
    #[cfg(feature = "parallel")]
    {
        Zip::from(grid)
            .and(usable)
            .par_map_collect(|&v, &ok| if ok { v } else { NO_DATA })
    }
    #[cfg(not(feature = "parallel"))]
    {
        Zip::from(grid)
            .and(usable)
            .map_collect(|&v, &ok| if ok { v } else { NO_DATA })
    }
}

/// Evaluate a formula over up to `MAX_KERNEL_INPUTS` grids.
///
/// `f` receives the input values for one pixel in the order of `inputs`.
/// All inputs must share `dim`.
pub fn evaluate_pixels<F>(inputs: &[ArrayView2<'_, Pixel>], dim: (usize, usize), f: F) -> Grid
where
    F: Fn(&[Pixel]) -> Pixel + Sync + Send,
{
    debug_assert!(inputs.len() <= MAX_KERNEL_INPUTS);
    debug_assert!(inputs.iter().all(|v| v.dim() == dim));

    let n = inputs.len();
    let mut out = Grid::from_elem(dim, NO_DATA);
    let kernel = |idx: (usize, usize), o: &mut Pixel| {
        let mut values = [NO_DATA; MAX_KERNEL_INPUTS];
        for (slot, view) in values.iter_mut().zip(inputs.iter()) {
            *slot = view[idx];
        }
        *o = f(&values[..n]);
    };

    #[cfg(feature = "parallel")]
    Zip::indexed(&mut out).par_for_each(kernel);
    #[cfg(not(feature = "parallel"))]
    Zip::indexed(&mut out).for_each(kernel);

    out
}

/// Grid filled with no-data
pub fn no_data_grid(dim: (usize, usize)) -> Grid {
    Grid::from_elem(dim, NO_DATA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_evaluate_pixels_passes_values_in_order() {
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let b = array![[10.0f32, 20.0], [30.0, 40.0]];
        let out = evaluate_pixels(&[a.view(), b.view()], (2, 2), |v| v[1] - v[0]);
        assert_eq!(out, array![[9.0f32, 18.0], [27.0, 36.0]]);
    }

    #[test]
    fn test_apply_mask_blanks_unusable() {
        let a = array![[1.0f32, 2.0]];
        let m = array![[true, false]];
        let out = apply_mask(&a.view(), &m.view());
        assert_eq!(out[[0, 0]], 1.0);
        assert!(out[[0, 1]].is_nan());
    }
}
