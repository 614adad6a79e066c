//! Tensor container shared by layers, models and solvers
//!
//! A tensor holds a value buffer and a derivative buffer of identical length,
//! indexed by four axes: width, height, channels and batch. Values are laid out
//! with width varying fastest and batch slowest, so a batch element occupies a
//! contiguous slab of `width × height × channels` values.

use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a tensor.
///
/// Layers keep shared handles to their inputs (owned by whoever produced them)
/// and hand out handles to their own outputs and weights, so that the next layer,
/// the model and the solver can all reach the same buffers.
pub type SharedTensor = Rc<RefCell<Tensor>>;

/// Four-axis tensor with a parallel derivative buffer.
///
/// # Example
///
/// ```
/// use layernet::tensor::Tensor;
///
/// let t = Tensor::new(2, 3, 4, 5);
/// assert_eq!(t.len(), 120);
/// assert_eq!(t.batch(), 5);
/// assert!(t.deriv().iter().all(|&d| d == 0.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    size: [usize; 4],
    data: Vec<f32>,
    deriv: Vec<f32>,
}

impl Tensor {
    /// Creates a zero-filled tensor of the given width, height, channels and batch.
    pub fn new(width: usize, height: usize, channels: usize, batch: usize) -> Self {
        Self::with_size([width, height, channels, batch])
    }

    /// Creates a zero-filled tensor from a `[width, height, channels, batch]` size.
    pub fn with_size(size: [usize; 4]) -> Self {
        let len = size.iter().product();
        Self {
            size,
            data: vec![0.0f32; len],
            deriv: vec![0.0f32; len],
        }
    }

    /// Creates a tensor holding `data`, with a zeroed derivative buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` is not the product of the axes in `size`.
    pub fn from_vec(size: [usize; 4], data: Vec<f32>) -> Self {
        let len: usize = size.iter().product();
        assert_eq!(
            data.len(),
            len,
            "data len mismatch: size {:?} holds {} values, got {}",
            size,
            len,
            data.len()
        );
        Self {
            size,
            deriv: vec![0.0f32; len],
            data,
        }
    }

    /// Wraps the tensor into a shared handle.
    pub fn into_shared(self) -> SharedTensor {
        Rc::new(RefCell::new(self))
    }

    /// `[width, height, channels, batch]`.
    pub fn size(&self) -> [usize; 4] {
        self.size
    }

    pub fn width(&self) -> usize {
        self.size[0]
    }

    pub fn height(&self) -> usize {
        self.size[1]
    }

    pub fn channels(&self) -> usize {
        self.size[2]
    }

    pub fn batch(&self) -> usize {
        self.size[3]
    }

    /// Number of values held by one batch element.
    pub fn sample_len(&self) -> usize {
        self.size[0] * self.size[1] * self.size[2]
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn deriv(&self) -> &[f32] {
        &self.deriv
    }

    pub fn deriv_mut(&mut self) -> &mut [f32] {
        &mut self.deriv
    }

    /// Values and derivatives at once, values read-only.
    ///
    /// Lets a layer read an input tensor while accumulating into its derivative
    /// through a single borrow.
    pub fn data_and_deriv_mut(&mut self) -> (&[f32], &mut [f32]) {
        (&self.data, &mut self.deriv)
    }

    /// Values and derivatives at once, both mutable.
    pub fn split_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.data, &mut self.deriv)
    }

    /// Fills every value with `value`.
    pub fn set(&mut self, value: f32) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Zeroes the derivative buffer.
    pub fn clear_deriv(&mut self) {
        self.deriv.iter_mut().for_each(|d| *d = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let t = Tensor::new(3, 2, 1, 2);
        assert_eq!(t.size(), [3, 2, 1, 2]);
        assert_eq!(t.len(), 12);
        assert_eq!(t.sample_len(), 6);
        assert!(t.data().iter().all(|&v| v == 0.0));
        assert!(t.deriv().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_from_vec_keeps_values() {
        let t = Tensor::from_vec([1, 1, 3, 1], vec![1.0, 2.0, 3.0]);
        assert_eq!(t.data(), &[1.0, 2.0, 3.0]);
        assert_eq!(t.deriv().len(), 3);
    }

    #[test]
    #[should_panic(expected = "data len mismatch")]
    fn test_from_vec_wrong_len() {
        Tensor::from_vec([1, 1, 3, 2], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_set_and_clear_deriv() {
        let mut t = Tensor::new(2, 1, 1, 1);
        t.set(1.5);
        t.deriv_mut()[1] = 4.0;
        assert_eq!(t.data(), &[1.5, 1.5]);

        t.clear_deriv();
        assert_eq!(t.deriv(), &[0.0, 0.0]);
        // Values untouched
        assert_eq!(t.data(), &[1.5, 1.5]);
    }

    #[test]
    fn test_zero_sized_axis() {
        let t = Tensor::new(0, 1, 1, 4);
        assert!(t.is_empty());
        assert_eq!(t.sample_len(), 0);
    }
}
