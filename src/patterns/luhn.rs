//! Mod-10 (Luhn) checksum for payment card candidates.

/// Minimum digit count for a card number.
pub const MIN_CARD_DIGITS: usize = 13;

/// Returns true if `candidate` passes the mod-10 checksum.
///
/// Non-digit characters are ignored. Candidates with fewer than
/// [`MIN_CARD_DIGITS`] digits are rejected. Every second digit counted from
/// the rightmost (check) digit is doubled; from the left that is every index
/// whose parity matches the digit count's parity.
#[must_use]
pub fn is_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < MIN_CARD_DIGITS {
        return false;
    }

    let parity = digits.len() % 2;
    let checksum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &digit)| {
            if i % 2 == parity {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();

    checksum % 10 == 0
}
