use rusty_store::ecs::{
    Component, Entity, EntityStore, IndexedComponent, Relation, Tag,
    entity::TreeMembership,
    index::{EntityIndex, ValueStructIndex},
    job::{JobConfig, QueryJob},
};

#[derive(Component, Clone, Default, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Component, Clone, Default, Debug, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Component, Clone, Default, Debug, PartialEq)]
struct Name(String);

#[derive(Tag)]
struct TestTag;

#[derive(Component, Clone, Default, Debug, PartialEq)]
#[component(indexed)]
struct Team(u8);

impl IndexedComponent for Team {
    type Value = u8;
    type Index = ValueStructIndex<u8>;

    fn indexed_value(&self) -> u8 {
        self.0
    }
}

#[derive(Component, Clone, Default, Debug, PartialEq)]
#[component(indexed)]
struct Owner(Entity);

impl IndexedComponent for Owner {
    type Value = Entity;
    type Index = EntityIndex;

    fn indexed_value(&self) -> Entity {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Slot {
    index: u32,
    item: &'static str,
}

impl Relation for Slot {
    type Key = u32;

    fn relation_key(&self) -> u32 {
        self.index
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Watches(Entity);

impl Relation for Watches {
    type Key = Entity;

    fn relation_key(&self) -> Entity {
        self.0
    }
}

fn position(x: f32, y: f32, z: f32) -> Position {
    Position { x, y, z }
}

#[test]
fn create_and_query() {
    // Given
    let mut store = EntityStore::new();
    let entities: Vec<Entity> = (0..5).map(|_| store.create_entity()).collect();
    for i in [0, 2, 4] {
        store.add_component(entities[i], position(1.0, 2.0, 3.0)).unwrap();
    }
    store.add_tag::<TestTag>(entities[2]).unwrap();

    // When
    let mut with_position = store.query::<(Position,)>();
    let mut tagged = store.query::<(Position,)>().all_tags::<TestTag>();

    // Then
    let mut ids: Vec<u32> = with_position.entities(&store).iter().map(Entity::id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 3, 5]);
    let tagged_ids: Vec<u32> = tagged.entities(&store).iter().map(Entity::id).collect();
    assert_eq!(tagged_ids, vec![3]);
    store.verify_invariants();
}

#[test]
fn structural_migration_keeps_values_and_identity() {
    // Given
    let mut store = EntityStore::new();
    let entity = store.create_entity_with(position(1.0, 2.0, 3.0));
    let start = store.archetype_of(entity).unwrap().id();

    // When
    store
        .add_component(entity, Velocity { x: 4.0, y: 5.0, z: 6.0 })
        .unwrap();
    let both = store.archetype_of(entity).unwrap().id();

    // Then
    assert_ne!(start, both);
    assert_eq!(
        store.get_component::<Position>(entity).unwrap(),
        Some(&position(1.0, 2.0, 3.0))
    );

    // When
    store.remove_component::<Position>(entity).unwrap();

    // Then
    let archetype = store.archetype_of(entity).unwrap();
    assert_eq!(archetype.key().components.len(), 1);
    assert_eq!(
        store.get_component::<Velocity>(entity).unwrap(),
        Some(&Velocity { x: 4.0, y: 5.0, z: 6.0 })
    );
    assert_eq!(store.entity_by_id(entity.id()), Some(entity));
    assert_eq!(store.archetypes().get(start).unwrap().len(), 0);
    store.verify_invariants();
}

#[test]
fn relation_removal_patches_the_moved_relation() {
    // Given
    let mut store = EntityStore::new();
    let e = store.create_entity();
    let f = store.create_entity();
    for (index, item) in [(0, "sword"), (1, "shield"), (2, "potion")] {
        store.add_relation(e, Slot { index, item }).unwrap();
    }
    store.add_relation(f, Slot { index: 7, item: "bow" }).unwrap();

    // When
    assert!(store.remove_relation::<Slot>(e, &1).unwrap());

    // Then
    let items: Vec<&str> = store
        .relations::<Slot>(e)
        .unwrap()
        .iter()
        .map(|slot| slot.item)
        .collect();
    assert_eq!(items, vec!["sword", "potion"]);
    assert_eq!(store.get_relation::<Slot>(f, &7).unwrap().item, "bow");
    assert_eq!(store.relation_count::<Slot>(e).unwrap(), 2);
    store.verify_invariants();
}

#[test]
fn relation_keys_are_unique() {
    // Given
    let mut store = EntityStore::new();
    let entity = store.create_entity();
    store.add_relation(entity, Slot { index: 0, item: "a" }).unwrap();

    // When
    let replaced = !store.add_relation(entity, Slot { index: 0, item: "b" }).unwrap();
    let added = store.add_relation(entity, Slot { index: 1, item: "c" }).unwrap();

    // Then
    assert!(replaced && added);
    assert_eq!(store.relation_count::<Slot>(entity).unwrap(), 2);
    assert_eq!(store.relations::<Slot>(entity).unwrap().len(), 2);
    assert_eq!(store.get_relation::<Slot>(entity, &0).unwrap().item, "b");
}

#[test]
fn deletion_cascades_through_tree_indexes_and_relations() {
    // Given
    let mut store = EntityStore::new();
    let root = store.create_entity();
    store.set_store_root(root).unwrap();
    let parent = store.create_entity_with((Team(1), Name("parent".into())));
    store.add_child(root, parent).unwrap();
    let children: Vec<Entity> = (0..3)
        .map(|_| {
            let child = store.create_entity_with(Team(1));
            store.add_child(parent, child).unwrap();
            child
        })
        .collect();
    let owned = store.create_entity_with(Owner(parent));
    let watcher = store.create_entity();
    store.add_relation(watcher, Watches(parent)).unwrap();
    store.add_relation(watcher, Watches(children[0])).unwrap();
    store.add_relation(parent, Slot { index: 0, item: "map" }).unwrap();

    // When
    store.delete_entity(parent).unwrap();

    // Then
    assert!(!store.is_alive(parent));
    assert_eq!(store.child_ids(root).unwrap(), &[] as &[Entity]);
    for child in &children {
        assert_eq!(store.parent(*child).unwrap(), None);
        assert_eq!(store.tree_membership(*child), Some(TreeMembership::Floating));
    }
    assert_eq!(store.find_entities::<Team>(&1).unwrap(), children);
    assert!(store.linked_entities(parent).is_empty());
    assert!(!store.has_component::<Owner>(owned).unwrap());
    assert!(store.incoming_links::<Watches>(parent).is_empty());
    assert_eq!(store.relation_count::<Watches>(watcher).unwrap(), 1);
    assert!(store.entities_with_relations::<Slot>().is_empty());
    assert_eq!(store.tree_membership(parent), None);
    store.verify_invariants();
}

#[test]
fn deleting_a_tree_removes_descendants() {
    // Given
    let mut store = EntityStore::new();
    let parent = store.create_entity();
    let child = store.create_entity();
    let grandchild = store.create_entity_with(Team(2));
    store.add_child(parent, child).unwrap();
    store.add_child(child, grandchild).unwrap();

    // When
    let deleted = store.delete_entity_tree(parent).unwrap();

    // Then
    assert_eq!(deleted, 3);
    assert_eq!(store.entity_count(), 0);
    assert!(store.find_entities::<Team>(&2).unwrap().is_empty());
}

#[test]
fn parallel_job_integrates_velocities() {
    // Given
    let mut store = EntityStore::new();
    let entities: Vec<Entity> = (0..2000)
        .map(|i| {
            store.create_entity_with((
                position(i as f32, 0.0, 0.0),
                Velocity { x: 1.0, y: 2.0, z: 0.0 },
            ))
        })
        .collect();
    let query = store.query::<(Position, Velocity)>();
    let config = JobConfig::default()
        .with_thread_count(3)
        .with_min_parallel_chunk_length(128);
    let mut job = QueryJob::new(query, config);

    // When
    job.run_parallel(&mut store, |mut chunk| {
        let (positions, velocities) = chunk.columns_mut();
        for (p, v) in positions.as_mut_slice().iter_mut().zip(velocities.as_slice()) {
            p.x += v.x;
            p.y += v.y;
        }
    });

    // Then
    for (i, entity) in entities.iter().enumerate() {
        let p = store.get_component::<Position>(*entity).unwrap().unwrap();
        assert_eq!((p.x, p.y), (i as f32 + 1.0, 2.0));
    }
}
