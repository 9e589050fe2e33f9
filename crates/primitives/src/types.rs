//! Scalar aliases and threshold arithmetic shared by every crate.

/// Height of a block, either of the native chain or of an external chain.
pub type BlockHeight = u64;

/// An amount of some asset expressed in its smallest unit (eight decimals for every asset).
pub type Amount = u64;

/// One whole unit of any asset.
pub const ONE: Amount = 100_000_000;

/// Number of basis points in one whole.
pub const BASIS_POINTS: u64 = 10_000;

/// Computes the number of signers required to reach `num/den` of `total`, rounded up.
///
/// With the default `2/3` this is `ceil(2N/3)`, so four active validators require three signers.
/// A zero denominator is treated as unanimity.
pub const fn supermajority_threshold(total: usize, num: u64, den: u64) -> usize {
    if den == 0 {
        return total;
    }

    let scaled = total as u128 * num as u128;
    scaled.div_ceil(den as u128) as usize
}

/// Returns whether `signers` out of `total` meets the `num/den` threshold.
///
/// An empty set never has a majority.
pub const fn has_supermajority(signers: usize, total: usize, num: u64, den: u64) -> bool {
    if total == 0 {
        return false;
    }

    signers >= supermajority_threshold(total, num, den)
}

/// Computes `amount * num / den` without intermediate overflow, saturating at [`Amount::MAX`].
///
/// A zero denominator yields zero.
pub fn mul_div(amount: Amount, num: u64, den: u64) -> Amount {
    if den == 0 {
        return 0;
    }

    let res = amount as u128 * num as u128 / den as u128;
    Amount::try_from(res).unwrap_or(Amount::MAX)
}
