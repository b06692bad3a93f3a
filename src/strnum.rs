//! Number formatting helpers
//!
//! ```rust
//! use cmapkit::strnum::join_numbers;
//!
//! assert_eq!(join_numbers(&[1, 2, 3]), "1, 2, 3");
//! assert_eq!(join_numbers::<u8>(&[]), "");
//! ```

use core::fmt::{Display, Write};

/// Delimiter placed between consecutive numbers by [`join_numbers`]
pub const SEPARATOR: &str = ", ";

/// Primitive integer types accepted by [`join_numbers`]
pub trait Integer: Copy + Display + sealed::Sealed {}

mod sealed {
    pub trait Sealed {}
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Integer for $ty {}
        )*
    };
}

impl_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Render integers in base 10, separated by [`SEPARATOR`]
///
/// No separator is emitted before the first or after the last element, and an empty
/// slice yields an empty string.
pub fn join_numbers<T: Integer>(nums: &[T]) -> String {
    let mut out = String::with_capacity(nums.len() * 4);
    for (i, n) in nums.iter().enumerate() {
        if i > 0 {
            out.push_str(SEPARATOR);
        }
        write!(out, "{}", n).ok();
    }
    out
}
