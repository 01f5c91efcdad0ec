//! Integer mixing functions for straw placement.
//!
//! Every placement decision starts from one of these mixers. The mix must be:
//! - Deterministic: same inputs always produce the same output
//! - Avalanched: flipping one input bit flips about half the output bits
//! - Uniform: outputs for sequential inputs show no visible correlation
//!
//! The mixer combines three working registers through nine rounds of
//! subtract/xor/shift operations. Extra inputs (arities 2 through 5) are
//! folded through two fixed auxiliary constants with additional mixing
//! rounds. The exact fold schedule per arity is part of the placement
//! contract: downstream distribution quality was tuned against it, so it
//! must not be reordered.

/// Seed xored into the accumulator so all-zero inputs still decorrelate.
const HASH_SEED: u32 = 1_315_423_911;

/// Auxiliary fold constants for the multi-input arities.
const FOLD_X: u32 = 231_232;
const FOLD_Y: u32 = 1_232;

/// One full mixing round over three registers.
///
/// Nine subtract/xor/shift steps with decreasing shift amounts; every
/// output bit ends up depending nonlinearly on every input bit.
fn hashmix(a: &mut u32, b: &mut u32, c: &mut u32) {
    let (mut x, mut y, mut z) = (*a, *b, *c);
    x = x.wrapping_sub(y);
    x = x.wrapping_sub(z);
    x ^= z >> 13;
    y = y.wrapping_sub(z);
    y = y.wrapping_sub(x);
    y ^= x << 8;
    z = z.wrapping_sub(x);
    z = z.wrapping_sub(y);
    z ^= y >> 13;
    x = x.wrapping_sub(y);
    x = x.wrapping_sub(z);
    x ^= z >> 12;
    y = y.wrapping_sub(z);
    y = y.wrapping_sub(x);
    y ^= x << 16;
    z = z.wrapping_sub(x);
    z = z.wrapping_sub(y);
    z ^= y >> 5;
    x = x.wrapping_sub(y);
    x = x.wrapping_sub(z);
    x ^= z >> 3;
    y = y.wrapping_sub(z);
    y = y.wrapping_sub(x);
    y ^= x << 10;
    z = z.wrapping_sub(x);
    z = z.wrapping_sub(y);
    z ^= y >> 15;
    *a = x;
    *b = y;
    *c = z;
}

/// Mix a single value.
#[inline]
#[must_use]
pub fn mix1(a: u32) -> u32 {
    let mut hash = HASH_SEED ^ a;
    let mut a = a;
    let mut b = a;
    let mut x = FOLD_X;
    let mut y = FOLD_Y;
    hashmix(&mut b, &mut x, &mut hash);
    hashmix(&mut y, &mut a, &mut hash);
    hash
}

/// Mix two values.
#[inline]
#[must_use]
pub fn mix2(a: u32, b: u32) -> u32 {
    let mut hash = HASH_SEED ^ a ^ b;
    let (mut a, mut b) = (a, b);
    let mut x = FOLD_X;
    let mut y = FOLD_Y;
    hashmix(&mut a, &mut b, &mut hash);
    hashmix(&mut x, &mut a, &mut hash);
    hashmix(&mut b, &mut y, &mut hash);
    hash
}

/// Mix three values.
///
/// This is the arity the selectors use: (object id, item id, round).
#[inline]
#[must_use]
pub fn mix3(a: u32, b: u32, c: u32) -> u32 {
    let mut hash = HASH_SEED ^ a ^ b ^ c;
    let (mut a, mut b, mut c) = (a, b, c);
    let mut x = FOLD_X;
    let mut y = FOLD_Y;
    hashmix(&mut a, &mut b, &mut hash);
    hashmix(&mut c, &mut x, &mut hash);
    hashmix(&mut y, &mut a, &mut hash);
    hashmix(&mut b, &mut x, &mut hash);
    hashmix(&mut y, &mut c, &mut hash);
    hash
}

/// Mix four values.
#[inline]
#[must_use]
pub fn mix4(a: u32, b: u32, c: u32, d: u32) -> u32 {
    let mut hash = HASH_SEED ^ a ^ b ^ c ^ d;
    let (mut a, mut b, mut c, mut d) = (a, b, c, d);
    let mut x = FOLD_X;
    let mut y = FOLD_Y;
    hashmix(&mut a, &mut b, &mut hash);
    hashmix(&mut c, &mut d, &mut hash);
    hashmix(&mut a, &mut x, &mut hash);
    hashmix(&mut y, &mut b, &mut hash);
    hashmix(&mut c, &mut x, &mut hash);
    hashmix(&mut y, &mut d, &mut hash);
    hash
}

/// Mix five values.
#[inline]
#[must_use]
pub fn mix5(a: u32, b: u32, c: u32, d: u32, e: u32) -> u32 {
    let mut hash = HASH_SEED ^ a ^ b ^ c ^ d ^ e;
    let (mut a, mut b, mut c, mut d, mut e) = (a, b, c, d, e);
    let mut x = FOLD_X;
    let mut y = FOLD_Y;
    hashmix(&mut a, &mut b, &mut hash);
    hashmix(&mut c, &mut d, &mut hash);
    hashmix(&mut e, &mut x, &mut hash);
    hashmix(&mut y, &mut a, &mut hash);
    hashmix(&mut b, &mut x, &mut hash);
    hashmix(&mut y, &mut c, &mut hash);
    hashmix(&mut d, &mut x, &mut hash);
    hashmix(&mut y, &mut e, &mut hash);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_answers() {
        // Pinned outputs; the fold schedule is part of the contract.
        assert_eq!(mix1(0), 0x17c4_a80b);
        assert_eq!(mix1(1), 0xd508_2851);
        assert_eq!(mix1(0xdead_beef), 0x711d_6883);
        assert_eq!(mix2(1, 2), 0xb78d_ee9c);
        assert_eq!(mix3(1, 2, 3), 0x735a_d42b);
        assert_eq!(mix3(0, 0, 0), 0x7a3b_f3b2);
        assert_eq!(mix4(1, 2, 3, 4), 0x696d_1f16);
        assert_eq!(mix5(1, 2, 3, 4, 5), 0x4b42_a1a1);
    }

    #[test]
    fn deterministic() {
        for i in 0..100 {
            assert_eq!(mix1(i), mix1(i));
            assert_eq!(mix3(i, i + 1, 0), mix3(i, i + 1, 0));
        }
    }

    #[test]
    fn argument_order_matters() {
        assert_ne!(mix2(1, 2), mix2(2, 1));
        assert_ne!(mix3(1, 2, 3), mix3(3, 2, 1));
    }

    #[test]
    fn avalanche() {
        // Flipping any single input bit should flip roughly half of the
        // 32 output bits on average.
        let mut total_flipped = 0u64;
        let mut samples = 0u64;
        for i in 0..256u32 {
            let input = i.wrapping_mul(0x9e37_79b9);
            let base = mix1(input);
            for bit in 0..32 {
                let flipped = mix1(input ^ (1 << bit));
                total_flipped += u64::from((base ^ flipped).count_ones());
                samples += 1;
            }
        }
        let avg = total_flipped as f64 / samples as f64;
        assert!((12.0..20.0).contains(&avg), "poor avalanche: avg {avg} bits flipped");
    }

    #[test]
    fn uniform_over_buckets() {
        // Sequential inputs should spread evenly over the top nibble.
        let mut counts = [0u32; 16];
        let n = 100_000u32;
        for i in 0..n {
            counts[(mix1(i) >> 28) as usize] += 1;
        }
        let expected = n / 16;
        for (nibble, &count) in counts.iter().enumerate() {
            let ratio = f64::from(count) / f64::from(expected);
            assert!(
                (0.9..1.1).contains(&ratio),
                "bucket {nibble} skewed: {count} vs expected {expected}"
            );
        }
    }
}
