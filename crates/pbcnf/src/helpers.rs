use crate::linear::PosCoeff;

/// Given coefficient k, return its binary representation, least significant
/// bit first, using `bits` bits or as few as necessary.
pub(crate) fn as_binary(k: PosCoeff, bits: Option<usize>) -> Vec<bool> {
	let k = *k;
	let bits = bits.unwrap_or_else(|| bit_length(k));
	debug_assert!(
		bits >= 63 || k < (1 << bits),
		"{k} cannot be represented in {bits} bits"
	);
	(0..bits).map(|b| b < 64 && k & (1 << b) != 0).collect()
}

/// The number of bits required to represent the non-negative `k`
pub(crate) fn bit_length(k: i64) -> usize {
	debug_assert!(k >= 0);
	(i64::BITS - k.leading_zeros()) as usize
}
