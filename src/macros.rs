//! Checked integer conversions for values that are in range by construction
//! (lengths, counts bounded by the coder capacity).
//!
//! With the `unsafe_conversions` feature the check is skipped.

#[macro_export]
macro_rules! cast {
    ($ty:ty, $a:expr) => {
        if cfg!(feature = "unsafe_conversions") {
            unsafe { <$ty>::try_from($a).unwrap_unchecked() }
        } else {
            <$ty>::try_from($a).expect("integer conversion out of range")
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn cast_in_range() {
        let len: usize = 300;
        assert_eq!(cast!(u64, len), 300u64);
        assert_eq!(cast!(u16, len), 300u16);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    #[cfg(not(feature = "unsafe_conversions"))]
    fn cast_out_of_range() {
        let _ = cast!(u8, 300usize);
    }
}
