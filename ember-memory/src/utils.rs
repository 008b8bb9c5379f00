use crate::AllocError;

#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Checked variant of [`align_up`], `None` on address space overflow.
#[inline(always)]
pub const fn checked_align_up(value: usize, alignment: usize) -> Option<usize> {
    match value.checked_add(alignment - 1) {
        Some(v) => Some(v & !(alignment - 1)),
        None => None,
    }
}

/// Smallest `p >= min` such that `(p + offset)` is a multiple of `alignment`.
#[inline(always)]
pub fn align_with_offset(min: usize, alignment: usize, offset: usize) -> Option<usize> {
    let shifted = min.checked_add(offset)?;
    checked_align_up(shifted, alignment).map(|aligned| aligned - offset)
}

#[inline(always)]
pub fn validate_request(size: usize, alignment: usize) -> Result<(), AllocError> {
    if size == 0 {
        return Err(AllocError::ZeroSize);
    }

    if !alignment.is_power_of_two() {
        return Err(AllocError::InvalidAlignment { alignment });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 16), 16);
        assert_eq!(checked_align_up(usize::MAX, 8), None);
    }

    #[test]
    fn test_align_with_offset() {
        // (p + 16) % 32 == 0, p >= 0
        assert_eq!(align_with_offset(0, 32, 16), Some(16));
        assert_eq!(align_with_offset(17, 32, 16), Some(48));
        assert_eq!(align_with_offset(5, 1, 3), Some(5));
    }

    #[test]
    fn test_validate_request() {
        assert_eq!(validate_request(0, 8), Err(AllocError::ZeroSize));
        assert_eq!(
            validate_request(8, 0),
            Err(AllocError::InvalidAlignment { alignment: 0 })
        );
        assert_eq!(
            validate_request(8, 12),
            Err(AllocError::InvalidAlignment { alignment: 12 })
        );
        assert!(validate_request(8, 1).is_ok());
    }
}
