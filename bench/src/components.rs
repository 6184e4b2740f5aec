//! Component, tag and relation types used across benchmarks.
//!
//! Sizes are representative of real components in terms of size and access patterns.

use rusty_store::ecs::{Component, Entity, IndexedComponent, Relation, Tag, index::ValueStructIndex};

/// 3D position component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 3D velocity component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Rotation as euler angles (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 4x4 transformation matrix (64 bytes).
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

/// Health component for damageable entities.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

/// Team identifier, indexed for lookups by team.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
#[component(indexed)]
pub struct Team {
    pub id: u32,
}

impl IndexedComponent for Team {
    type Value = u32;
    type Index = ValueStructIndex<u32>;

    fn indexed_value(&self) -> u32 {
        self.id
    }
}

/// Inventory slot relation, keyed by slot number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    pub index: u32,
    pub item: u32,
}

impl Relation for Slot {
    type Key = u32;

    fn relation_key(&self) -> u32 {
        self.index
    }
}

/// Link relation to another entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Follows(pub Entity);

impl Relation for Follows {
    type Key = Entity;

    fn relation_key(&self) -> Entity {
        self.0
    }
}

/// Shared data component for fragmentation tests.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Data {
    pub value: f64,
}

// Tags for spreading entities over many archetypes
macro_rules! define_marker_tags {
    ($($name:ident),*) => {
        $(
            #[derive(Tag)]
            pub struct $name;
        )*
    };
}

define_marker_tags!(
    MarkerA, MarkerB, MarkerC, MarkerD, MarkerE, MarkerF, MarkerG, MarkerH, MarkerI, MarkerJ,
    MarkerK, MarkerL, MarkerM, MarkerN, MarkerO, MarkerP, MarkerQ, MarkerR, MarkerS, MarkerT,
    MarkerU, MarkerV, MarkerW, MarkerX, MarkerY, MarkerZ
);
