//! Circular address arithmetic.
//!
//! Core memory is a ring: every address is taken modulo the core size and
//! negative offsets wrap to the high end. Nothing here ever yields an
//! address outside `[0, core_size)`.

/// Reduce a signed offset into `[0, core_size)`. Panics if `core_size` is 0.
pub fn wrap(address: i64, core_size: u32) -> u32 {
    if core_size == 0 {
        panic!("wrap: core size must be non-zero");
    }
    address.rem_euclid(core_size as i64) as u32
}

/// Addresses of the closed window `center - radius ..= center + radius`,
/// in ascending ring order starting at `center - radius`.
///
/// A window never revisits an address, so it is clipped to `core_size`
/// addresses when the core is smaller than `2 * radius + 1`. A zero-sized
/// core has no addresses at all.
pub fn window(center: u32, radius: u32, core_size: u32) -> impl Iterator<Item = u32> {
    let span = (2 * radius as u64 + 1).min(core_size as u64);
    let start = if core_size == 0 {
        0
    } else {
        wrap(center as i64 - radius as i64, core_size)
    };
    (0..span).map(move |offset| ((start as u64 + offset) % core_size as u64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_negative() {
        assert_eq!(wrap(-1, 8000), 7999);
        assert_eq!(wrap(-8001, 8000), 7999);
        assert_eq!(wrap(8000, 8000), 0);
        assert_eq!(wrap(42, 8000), 42);
    }

    #[test]
    #[should_panic(expected = "core size must be non-zero")]
    fn wrap_zero_core() {
        wrap(1, 0);
    }

    #[test]
    fn window_interior() {
        let addrs: Vec<u32> = window(100, 2, 8000).collect();
        assert_eq!(addrs, vec![98, 99, 100, 101, 102]);
    }

    #[test]
    fn window_wraps_low_boundary() {
        let addrs: Vec<u32> = window(0, 10, 8000).collect();
        assert_eq!(addrs.len(), 21);
        let expected: Vec<u32> = (7990..8000).chain(0..=10).collect();
        assert_eq!(addrs, expected);
    }

    #[test]
    fn window_wraps_high_boundary() {
        let addrs: Vec<u32> = window(7995, 10, 8000).collect();
        let expected: Vec<u32> = (7985..8000).chain(0..=5).collect();
        assert_eq!(addrs, expected);
    }

    #[test]
    fn window_clipped_to_small_core() {
        let addrs: Vec<u32> = window(3, 10, 8).collect();
        assert_eq!(addrs.len(), 8);
        let mut sorted = addrs.clone();
        sorted.sort();
        assert_eq!(sorted, (0..8).collect::<Vec<u32>>());
    }

    #[test]
    fn window_empty_core() {
        assert_eq!(window(0, 10, 0).count(), 0);
    }

    #[test]
    fn window_always_in_range() {
        for core_size in [1u32, 2, 7, 21, 22, 100, 8000] {
            for center in 0..core_size.min(50) {
                assert!(window(center, 10, core_size).all(|a| a < core_size));
            }
        }
    }
}
