//! Windowed memory sampling for snapshots.
//!
//! Centers of interest are the program counter (when it lies inside the
//! core) followed by the load position of every live warrior. Each center
//! contributes the closed window of `radius` cells on either side, with
//! addresses wrapping around the ring.
//!
//! Windows from different centers are concatenated as-is. An address
//! covered by two centers is emitted twice; consumers that need unique
//! cells must deduplicate on `address` themselves.

use corewar_host::arithmetic::window;
use corewar_host::state::HostState;

use crate::snapshot_types::MemoryEntry;

/// Cells sampled on each side of a center.
pub const DEFAULT_WINDOW_RADIUS: u32 = 10;

pub fn centers_of_interest(host: &HostState) -> Vec<u32> {
    let mut centers = Vec::with_capacity(host.warriors.len() + 1);
    if host.pc < host.core_size() {
        centers.push(host.pc);
    }
    centers.extend(
        host.warriors
            .iter()
            .filter(|w| w.is_alive())
            .map(|w| w.position),
    );
    centers
}

/// Concatenated windows around every center of interest.
pub fn sample(host: &HostState, radius: u32) -> Vec<MemoryEntry> {
    let core_size = host.core_size();
    let warrior_count = host.warriors.len();
    centers_of_interest(host)
        .into_iter()
        .flat_map(|center| window(center % core_size.max(1), radius, core_size))
        .filter_map(|addr| {
            host.cell(addr)
                .map(|cell| MemoryEntry::from_cell(addr, cell, warrior_count))
        })
        .collect()
}

/// Every cell of the core, in address order.
pub fn full_core(host: &HostState) -> Vec<MemoryEntry> {
    let warrior_count = host.warriors.len();
    host.core
        .iter()
        .enumerate()
        .map(|(addr, cell)| MemoryEntry::from_cell(addr as u32, cell, warrior_count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use corewar_host::state::Warrior;

    fn battle() -> HostState {
        let mut host = HostState::new(
            8000,
            vec![Warrior::new("Imp", 0, 1), Warrior::new("Dwarf", 4000, 4)],
        );
        host.pc = 0;
        host
    }

    #[test]
    fn centers_are_pc_then_live_warriors() {
        let mut host = battle();
        host.pc = 17;
        assert_eq!(centers_of_interest(&host), vec![17, 0, 4000]);

        host.warriors[1].tasks = 0;
        assert_eq!(centers_of_interest(&host), vec![17, 0]);
    }

    #[test]
    fn pc_outside_core_is_skipped() {
        let mut host = battle();
        host.pc = 8000;
        assert_eq!(centers_of_interest(&host), vec![0, 4000]);
    }

    #[test]
    fn window_at_zero_wraps_to_high_end() {
        let mut host = battle();
        host.warriors.clear();
        let addrs: Vec<u32> = sample(&host, DEFAULT_WINDOW_RADIUS)
            .iter()
            .map(|e| e.address)
            .collect();
        let expected: Vec<u32> = (7990..8000).chain(0..=10).collect();
        assert_eq!(addrs, expected);
    }

    #[test]
    fn overlapping_windows_are_not_deduplicated() {
        // pc == warrior 0 position: the same 21 cells appear twice.
        let host = battle();
        let entries = sample(&host, DEFAULT_WINDOW_RADIUS);
        assert_eq!(entries.len(), 3 * 21);
        let zero_hits = entries.iter().filter(|e| e.address == 0).count();
        assert_eq!(zero_hits, 2);
        assert_eq!(entries[..21], entries[21..42]);
    }

    #[test]
    fn sampled_addresses_stay_in_range() {
        for core_size in [1u32, 5, 21, 64, 8000] {
            let mut host = HostState::new(core_size, vec![Warrior::new("w", core_size - 1, 1)]);
            for pc in 0..core_size.min(30) {
                host.pc = pc;
                assert!(sample(&host, DEFAULT_WINDOW_RADIUS)
                    .iter()
                    .all(|e| e.address < core_size));
            }
        }
    }

    #[test]
    fn full_core_covers_every_address_in_order() {
        let host = HostState::new(32, Vec::new());
        let entries = full_core(&host);
        assert_eq!(entries.len(), 32);
        assert!(entries.iter().enumerate().all(|(i, e)| e.address == i as u32));
    }
}
