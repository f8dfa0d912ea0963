//! One's-complement checksum over 16-bit words
//!
//! This is the checksum family used by IP, ICMP and UDP headers. All words are summed with
//! end-around carry, i.e. any carry out of bit 15 is added back into bit 0. The checksum that goes
//! onto the wire is the bitwise complement of that sum. Summing a correct checksum back in with the
//! data it covers always yields all ones.
//!
//! Errors that cancel each other out in the sum are not detected. Adding one to a word and
//! subtracting one from another, or swapping two words, leaves the sum unchanged.

/// Folded sum that signals an intact packet
const ALL_ONES: u16 = 0xFFFF;

/// Add up all words with end-around carry
///
/// The running sum is folded after every addition, so it never exceeds 16 bits regardless of how
/// many words are added.
fn sum(words: &[u16]) -> u16 {
    words.iter().fold(0u32, |acc, &word| {
        let acc = acc + u32::from(word);
        (acc & 0xFFFF) + (acc >> 16)
    }) as u16
}

/// Compute the checksum for a sequence of words
///
/// The slot reserved for the checksum itself must either be left out or be zero.
pub fn compute(words: &[u16]) -> u16 {
    !sum(words)
}

/// Check a sequence of words including its transmitted checksum
///
/// Returns `true` if the one's-complement sum of all words is all ones.
pub fn validate(words: &[u16]) -> bool {
    sum(words) == ALL_ONES
}

/// Split a byte buffer into big-endian 16-bit words
///
/// A trailing odd byte is padded with a zero low byte.
pub fn words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|chunk| match *chunk {
            [hi, lo] => u16::from_be_bytes([hi, lo]),
            [hi] => u16::from_be_bytes([hi, 0]),
            _ => unreachable!("chunks(2) yields one or two bytes"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Append the checksum of `data` to a copy of it
    fn with_checksum(data: &[u16]) -> Vec<u16> {
        let mut words = data.to_vec();
        words.push(compute(data));
        words
    }

    #[test]
    fn end_around_carry() {
        // 0xFFFF + 0x0001 overflows into bit 16, folds back to 0x0001
        assert_eq!(sum(&[0xFFFF, 0x0001]), 0x0001);
        assert_eq!(compute(&[0xFFFF, 0x0001]), 0xFFFE);

        // Folding a second time is needed when the first fold carries again
        assert_eq!(sum(&[0xFFFF, 0xFFFF, 0xFFFF]), 0xFFFF);
    }

    #[test]
    fn empty_input() {
        assert_eq!(compute(&[]), 0xFFFF);
        assert!(!validate(&[]));
        assert!(validate(&[0xFFFF]));
    }

    #[test]
    fn known_header() {
        // Echo request, id 0x1234, seq 1, no timestamp
        let data = [0x0800, 0x1234, 0x0001];
        assert_eq!(compute(&data), !(0x0800u16 + 0x1234 + 0x0001));
        assert!(validate(&with_checksum(&data)));
    }

    #[test]
    fn self_consistent_for_random_words() {
        for len in 0..64 {
            let data: Vec<u16> = (0..len).map(|_| rand::random::<u16>()).collect();
            assert!(validate(&with_checksum(&data)), "failed for {:?}", data);
        }
    }

    #[test]
    fn detects_every_single_bit_flip() {
        for _ in 0..16 {
            let data: Vec<u16> = (0..6).map(|_| rand::random::<u16>()).collect();
            let words = with_checksum(&data);

            for idx in 0..words.len() {
                for bit in 0..16 {
                    let mut corrupted = words.clone();
                    corrupted[idx] ^= 1 << bit;
                    assert!(
                        !validate(&corrupted),
                        "flip of bit {} in word {} went unnoticed: {:?}",
                        bit,
                        idx,
                        words
                    );
                }
            }
        }
    }

    #[test]
    fn cancelling_errors_go_unnoticed() {
        let words = with_checksum(&[0x0800, 0x1234, 0x0001]);

        let mut cancelled = words.clone();
        cancelled[1] += 1;
        cancelled[2] -= 1;
        assert!(validate(&cancelled));

        let mut swapped = words;
        swapped.swap(0, 1);
        assert!(validate(&swapped));
    }

    #[test]
    fn split_into_words() {
        assert_eq!(words(&[0x08, 0x00, 0x12, 0x34]), vec![0x0800, 0x1234]);
        assert_eq!(words(&[0xAB]), vec![0xAB00]);
        assert!(words(&[]).is_empty());
    }
}
