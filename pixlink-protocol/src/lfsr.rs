//! Counter pre-image transform for the controller's LFSR counters
//!
//! The display controller implements several counters in its scanout path as
//! 16-bit linear feedback shift registers instead of binary counters, which
//! keeps the clock-tree depth of the hardware bounded. Registers that are
//! compared against those counters must therefore be programmed with the LFSR
//! state reached after the desired number of ticks, not with the count
//! itself. This module computes that pre-image.

/// Compute the LFSR state reached after `actual_count` ticks.
///
/// 16-bit Fibonacci LFSR seeded with `0xFFFF` (the hardware reset value),
/// tap bits 15, 4, 2 and 1, new bit shifted in at the low end.
///
/// Deterministic and injective over counts `0..65535`: the sequence is
/// maximal-length, visiting every nonzero state exactly once, so no two
/// counts within one period map to the same register value. The all-zero
/// state is unreachable and a count of 65535 wraps back to the seed.
pub fn lfsr16(actual_count: u16) -> u16 {
    let mut lv: u32 = 0xFFFF;

    for _ in 0..actual_count {
        lv = ((lv << 1) | (((lv >> 15) ^ (lv >> 4) ^ (lv >> 2) ^ (lv >> 1)) & 1)) & 0xFFFF;
    }

    lv as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_count_is_seed() {
        assert_eq!(lfsr16(0), 0xFFFF);
    }

    #[test]
    fn test_first_steps() {
        // All four taps set on the seed XOR to 0, so the low bit stays clear
        // for the first two steps, then the tap at bit 1 drops out.
        assert_eq!(lfsr16(1), 0xFFFE);
        assert_eq!(lfsr16(2), 0xFFFC);
        assert_eq!(lfsr16(3), 0xFFF9);
    }

    #[test]
    fn test_deterministic() {
        for count in [0u16, 1, 255, 256, 1024, 65535] {
            assert_eq!(lfsr16(count), lfsr16(count));
        }
    }

    #[test]
    fn test_injective_over_period() {
        // Exhaustive check with a 64 Ki bitset: every count within one
        // period yields a distinct state, and the state 0 never appears.
        let mut seen = [0u64; 1024];
        for count in 0..65535u16 {
            let value = lfsr16(count) as usize;
            assert_ne!(value, 0, "all-zero state is unreachable");
            let (word, bit) = (value / 64, value % 64);
            assert_eq!(seen[word] >> bit & 1, 0, "collision at count {}", count);
            seen[word] |= 1 << bit;
        }
    }

    #[test]
    fn test_wraps_to_seed_after_full_period() {
        // Maximal-length sequence: 65535 ticks return to the reset value.
        assert_eq!(lfsr16(65535), lfsr16(0));
        assert_eq!(lfsr16(65535), 0xFFFF);
    }
}
