use super::*;

use test_strategy::proptest;

#[test]
fn test_zeroes() {
    assert_eq!(Word::ZERO.to_signed(), 0);
    assert_eq!(Word::NEGATIVE_ZERO.to_signed(), 0);
    assert!(Word::NEGATIVE_ZERO.is_negative());
    assert!(Word::NEGATIVE_ZERO.is_negative_zero());
    assert!(!Word::ZERO.is_negative_zero());
}

#[test]
fn test_negative_is_complement() {
    let w = Word::try_from(-1).expect("-1 should fit in a word");
    assert_eq!(w.bits(), 0o177_776);
    assert_eq!(w.to_signed(), -1);
    assert_eq!(w.to_string(), "177776");
}

#[test]
fn test_extremes() {
    assert_eq!(Word::try_from(0o77777), Ok(Word::MAX));
    assert_eq!(Word::try_from(-0o77777).map(|w| w.bits()), Ok(0o100_000));
    assert_eq!(
        Word::try_from(0o100_000),
        Err(ConversionFailed::TooLarge(0o100_000))
    );
    assert_eq!(
        Word::try_from(-0o100_000),
        Err(ConversionFailed::TooSmall(-0o100_000))
    );
}

#[test]
fn test_fraction() {
    assert_eq!(Word::from_bits(0o040_000).to_fraction(), 0.5);
    assert_eq!(Word::from_bits(0o137_777).to_fraction(), -0.5);
    assert_eq!(Word::ZERO.to_fraction(), 0.0);
}

#[proptest]
fn signed_value_survives_conversion(#[strategy(-0o77777i64..=0o77777i64)] n: i64) {
    let w = Word::try_from(n).expect("value should be in range");
    assert_eq!(w.to_signed(), n);
    assert_eq!(w.is_negative(), n < 0);
}
