/// Compatibility layer for rayon/sequential execution.
///
/// When the `parallel` feature is enabled, this re-exports rayon's parallel
/// iterators and `join`. When disabled, it provides sequential fallbacks
/// with the same call shape: `into_par_iter()` resolves to `into_iter()` and
/// `join` runs both closures on the current thread, left first.
/// `zip_for_each!` drives an `ndarray::Zip` with `par_for_each` or `for_each`.
#[cfg(feature = "parallel")]
pub use rayon::join;
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
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

    /// Sequential stand-in for `rayon::join`.
    pub fn join<A, B, RA, RB>(oper_a: A, oper_b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA,
        B: FnOnce() -> RB,
    {
        let a = oper_a();
        let b = oper_b();
        (a, b)
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

#[cfg(feature = "parallel")]
macro_rules! zip_for_each {
    ($zip:expr, $body:expr) => {
        $zip.par_for_each($body)
    };
}

#[cfg(not(feature = "parallel"))]
macro_rules! zip_for_each {
    ($zip:expr, $body:expr) => {
        $zip.for_each($body)
    };
}

pub(crate) use zip_for_each;
