use crate::ecs::entity::PidType;

/// Configuration of an [`EntityStore`](crate::ecs::EntityStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// How persistent ids are assigned.
    pub pid_type: PidType,
    /// Seed of the random persistent id generator.
    pub seed: u64,
    /// Number of node slots reserved up front.
    pub initial_node_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            pid_type: PidType::UsePidAsId,
            seed: 0,
            initial_node_capacity: 64,
        }
    }
}

impl StoreConfig {
    pub fn with_pid_type(mut self, pid_type: PidType) -> Self {
        self.pid_type = pid_type;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_initial_node_capacity(mut self, capacity: usize) -> Self {
        self.initial_node_capacity = capacity;
        self
    }
}
