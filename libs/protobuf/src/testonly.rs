//! Testonly utilities.
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

use crate::{decode, encode, ProtoFmt};

/// Checks that `x` survives an encode/decode cycle and that
/// re-encoding the decoded value reproduces the same bytes.
#[track_caller]
pub fn test_encode<T: ProtoFmt + std::fmt::Debug + PartialEq>(x: &T) {
    let bytes = encode(x);
    let y: T = decode(&bytes).unwrap();
    assert_eq!(x, &y);
    assert_eq!(bytes, encode(&y));
}

/// Syntax sugar for `test_encode`,
/// because `test_encode(&rng.gen())` doesn't infer `T`.
#[track_caller]
pub fn test_encode_random<T: ProtoFmt + std::fmt::Debug + PartialEq>(rng: &mut impl Rng)
where
    Standard: Distribution<T>,
{
    for _ in 0..10 {
        test_encode(&rng.gen::<T>());
    }
}
