//! rayon or sequential execution, chosen by the `parallel` feature.
//!
//! Only `into_par_iter()` is used by the kernels in this crate; the
//! sequential build maps it to `into_iter()` so the rest of each chain
//! (`map`, `flat_map`, `collect`) resolves to plain `Iterator` methods with
//! the same output order.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

/// Number of worker threads pixel kernels and k-means restarts run on
#[cfg(feature = "parallel")]
pub fn worker_count() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "parallel"))]
mod sequential {
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }

    pub fn worker_count() -> usize {
        1
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
