use std::collections::BTreeSet;

use proptest::prelude::*;
use rusty_store::ecs::{
    Component, Entity, EntityStore, IndexedComponent,
    index::RangeIndex,
};

#[derive(Component, Clone, Default, Debug, PartialEq)]
#[component(indexed)]
struct Level(i32);

impl IndexedComponent for Level {
    type Value = i32;
    type Index = RangeIndex<i32>;

    fn indexed_value(&self) -> i32 {
        self.0
    }
}

#[derive(Component, Clone, Default, Debug, PartialEq)]
struct Padding(u64);

#[derive(Debug, Clone)]
enum Op {
    Add(usize, i32),
    Set(usize, i32),
    Remove(usize),
    Pad(usize),
    Delete(usize),
    Create,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..16, 0i32..5).prop_map(|(e, v)| Op::Add(e, v)),
        (0usize..16, 0i32..5).prop_map(|(e, v)| Op::Set(e, v)),
        (0usize..16).prop_map(Op::Remove),
        (0usize..16).prop_map(Op::Pad),
        (0usize..16).prop_map(Op::Delete),
        Just(Op::Create),
    ]
}

fn apply(store: &mut EntityStore, entities: &mut Vec<Entity>, op: &Op) {
    let pick = |entities: &Vec<Entity>, i: usize| entities.get(i % entities.len().max(1)).copied();
    match *op {
        Op::Create => entities.push(store.create_entity()),
        Op::Add(i, value) => {
            if let Some(entity) = pick(entities, i) {
                store.add_component(entity, Level(value)).unwrap();
            }
        }
        Op::Set(i, value) => {
            if let Some(entity) = pick(entities, i)
                && store.has_component::<Level>(entity).unwrap()
            {
                store.set_component(entity, Level(value)).unwrap();
            }
        }
        Op::Remove(i) => {
            if let Some(entity) = pick(entities, i) {
                store.remove_component::<Level>(entity).unwrap();
            }
        }
        Op::Pad(i) => {
            if let Some(entity) = pick(entities, i) {
                store.add_component(entity, Padding(i as u64)).unwrap();
            }
        }
        Op::Delete(i) => {
            if !entities.is_empty() {
                let entity = entities.remove(i % entities.len());
                store.delete_entity(entity).unwrap();
            }
        }
    }
}

proptest! {
    #[test]
    fn index_lookups_match_component_values(ops in prop::collection::vec(op(), 1..120)) {
        let mut store = EntityStore::new();
        let mut entities: Vec<Entity> = (0..4).map(|_| store.create_entity()).collect();

        for op in &ops {
            apply(&mut store, &mut entities, op);

            for value in 0..5 {
                let expected: BTreeSet<Entity> = entities
                    .iter()
                    .copied()
                    .filter(|e| store.get_component::<Level>(*e).unwrap() == Some(&Level(value)))
                    .collect();
                let found: BTreeSet<Entity> =
                    store.find_entities::<Level>(&value).unwrap().into_iter().collect();
                prop_assert_eq!(&found, &expected);
            }
            let in_range: BTreeSet<Entity> =
                store.find_in_range::<Level>(&1, &3).unwrap().into_iter().collect();
            let expected: BTreeSet<Entity> = entities
                .iter()
                .copied()
                .filter(|e| {
                    matches!(store.get_component::<Level>(*e).unwrap(), Some(Level(v)) if (1..=3).contains(v))
                })
                .collect();
            prop_assert_eq!(in_range, expected);
        }
        store.verify_invariants();
    }
}
