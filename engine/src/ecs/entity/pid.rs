use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// How persistent ids are assigned to new entities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PidType {
    /// The persistent id equals the entity id. No lookup table is kept.
    #[default]
    UsePidAsId,
    /// Persistent ids are random positive numbers mapped to entity ids.
    RandomPids,
}

/// Persistent id assignment and lookup.
pub(crate) struct Pids {
    pid_type: PidType,
    map: HashMap<i64, u32>,
    rng: ChaCha8Rng,
}

impl Pids {
    pub fn new(pid_type: PidType, seed: u64) -> Self {
        Self {
            pid_type,
            map: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Assign a persistent id to a new entity.
    pub fn assign(&mut self, id: u32) -> i64 {
        match self.pid_type {
            PidType::UsePidAsId => id as i64,
            PidType::RandomPids => loop {
                let pid = self.rng.gen_range(1..i64::MAX);
                if let std::collections::hash_map::Entry::Vacant(entry) = self.map.entry(pid) {
                    entry.insert(id);
                    break pid;
                }
            },
        }
    }

    /// Forget the persistent id of a deleted entity.
    pub fn release(&mut self, pid: i64) {
        if self.pid_type == PidType::RandomPids {
            self.map.remove(&pid);
        }
    }

    /// Entity id for a persistent id. Non-positive pids are never assigned.
    pub fn lookup(&self, pid: i64) -> Option<u32> {
        if pid <= 0 {
            return None;
        }
        match self.pid_type {
            PidType::UsePidAsId => u32::try_from(pid).ok(),
            PidType::RandomPids => self.map.get(&pid).copied(),
        }
    }
}
