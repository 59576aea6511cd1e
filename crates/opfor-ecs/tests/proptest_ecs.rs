//! Property tests for ECS operations.
//!
//! These tests use `proptest` to generate random sequences of entity-manager
//! operations and verify that the manager's invariants hold after each step.

use std::collections::HashSet;

use opfor_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Pos {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Vel {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Tag(u32);

/// Operations we can perform on the manager.
#[derive(Debug, Clone)]
enum EcsOp {
    Create,
    CreatePos,
    CreatePosVel,
    Delete(usize),
    DeleteTwice(usize),
    AddVel(usize),
    AddTagPos(usize),
    SetPos(usize, f32, f32),
    RemoveVel(usize),
    RemoveAll(usize),
}

/// Strategy that generates finite (non-NaN, non-Inf) f32 values.
fn finite_f32() -> impl Strategy<Value = f32> {
    (-1_000_000i32..1_000_000i32).prop_map(|v| v as f32 * 0.01)
}

fn ecs_op_strategy() -> impl Strategy<Value = EcsOp> {
    prop_oneof![
        Just(EcsOp::Create),
        Just(EcsOp::CreatePos),
        Just(EcsOp::CreatePosVel),
        (0..100usize).prop_map(EcsOp::Delete),
        (0..100usize).prop_map(EcsOp::DeleteTwice),
        (0..100usize).prop_map(EcsOp::AddVel),
        (0..100usize).prop_map(EcsOp::AddTagPos),
        (0..100usize, finite_f32(), finite_f32()).prop_map(|(i, x, y)| EcsOp::SetPos(i, x, y)),
        (0..100usize).prop_map(EcsOp::RemoveVel),
        (0..100usize).prop_map(EcsOp::RemoveAll),
    ]
}

/// Every id ever created: live ones first, then the deleted ones.
struct Tracker {
    alive: Vec<EntityId>,
    dead: Vec<EntityId>,
}

impl Tracker {
    /// Pick any id ever issued, so that dead ids get exercised too.
    fn pick(&self, idx: usize) -> Option<EntityId> {
        let total = self.alive.len() + self.dead.len();
        if total == 0 {
            return None;
        }
        let idx = idx % total;
        Some(if idx < self.alive.len() {
            self.alive[idx]
        } else {
            self.dead[idx - self.alive.len()]
        })
    }
}

fn check_sync<T: Component>(em: &EntityManager, e: EntityId) -> Result<(), TestCaseError> {
    let tagged = em.has_components::<(T,)>(e);
    let stored = em.storage::<T>().is_some_and(|s| s.contains(e));
    prop_assert_eq!(tagged, stored, "tag/storage mismatch for {:?}", e);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_ops_preserve_invariants(ops in prop::collection::vec(ecs_op_strategy(), 1..60)) {
        let mut em = EntityManager::new();
        let mut tracker = Tracker { alive: Vec::new(), dead: Vec::new() };
        let mut issued: HashSet<EntityId> = HashSet::new();

        for op in ops {
            let created = match op {
                EcsOp::Create => Some(em.create_entity()),
                EcsOp::CreatePos => Some(em.create_entity_with::<(Pos,)>()),
                EcsOp::CreatePosVel => Some(em.create_entity_with::<(Pos, Vel)>()),
                EcsOp::Delete(i) => {
                    if let Some(e) = tracker.pick(i) {
                        let was_alive = em.is_alive(e);
                        prop_assert_eq!(em.delete_entity(e), was_alive);
                        if was_alive {
                            tracker.alive.retain(|&x| x != e);
                            tracker.dead.push(e);
                        }
                    }
                    None
                }
                EcsOp::DeleteTwice(i) => {
                    if let Some(e) = tracker.pick(i) {
                        em.delete_entity(e);
                        let count = em.entity_count();
                        let listing = em.entity_ids();
                        prop_assert!(!em.delete_entity(e));
                        prop_assert_eq!(em.entity_count(), count);
                        prop_assert_eq!(em.entity_ids(), listing);
                        if tracker.alive.contains(&e) {
                            tracker.alive.retain(|&x| x != e);
                            tracker.dead.push(e);
                        }
                    }
                    None
                }
                EcsOp::AddVel(i) => {
                    if let Some(e) = tracker.pick(i) {
                        let result = em.add_components::<(Vel,)>(e);
                        prop_assert_eq!(result.is_ok(), em.is_alive(e));
                    }
                    None
                }
                EcsOp::AddTagPos(i) => {
                    if let Some(e) = tracker.pick(i) {
                        let result = em.add_components::<(Tag, Pos)>(e);
                        if result.is_err() {
                            prop_assert!(matches!(result, Err(EcsError::UnknownEntity { .. })), "assertion failed: matches!(result, Err(EcsError::UnknownEntity {{ .. }}))");
                            prop_assert!(em.storage::<Tag>().map_or(true, |s| !s.contains(e)));
                        }
                    }
                    None
                }
                EcsOp::SetPos(i, x, y) => {
                    if let Some(e) = tracker.pick(i) {
                        let had = em.has_components::<(Pos,)>(e);
                        let result = em.set(e, Pos { x, y });
                        prop_assert_eq!(result.is_ok(), had);
                        if had {
                            prop_assert_eq!(em.get::<Pos>(e).unwrap(), &Pos { x, y });
                        }
                    }
                    None
                }
                EcsOp::RemoveVel(i) => {
                    if let Some(e) = tracker.pick(i) {
                        let _ = em.remove_components::<(Vel,)>(e);
                        prop_assert!(!em.has_components::<(Vel,)>(e));
                    }
                    None
                }
                EcsOp::RemoveAll(i) => {
                    if let Some(e) = tracker.pick(i) {
                        let _ = em.remove_components::<(Pos, Vel, Tag)>(e);
                    }
                    None
                }
            };

            if let Some(e) = created {
                // Identity uniqueness: never seen before.
                prop_assert!(issued.insert(e));
                tracker.alive.push(e);
            }

            prop_assert_eq!(em.entity_count(), tracker.alive.len());

            for &e in tracker.alive.iter().chain(tracker.dead.iter()) {
                check_sync::<Pos>(&em, e)?;
                check_sync::<Vel>(&em, e)?;
                check_sync::<Tag>(&em, e)?;
            }

            // Query correctness: exactly the live supersets, creation order.
            let expected: Vec<EntityId> = tracker
                .alive
                .iter()
                .copied()
                .filter(|&e| em.has_components::<(Pos, Vel)>(e))
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
            prop_assert_eq!(em.entities_with::<(Pos, Vel)>(), expected.clone());
            let typed: Vec<EntityId> = em.query::<(&Pos, &Vel)>().map(|(e, _)| e).collect();
            prop_assert_eq!(typed, expected);

            for &e in &tracker.dead {
                prop_assert!(!em.entity_ids().contains(&e));
                prop_assert!(matches!(em.get::<Pos>(e), Err(EcsError::UnknownEntity { .. })), "assertion failed: matches!(em.get::<Pos>(e), Err(EcsError::UnknownEntity {{ .. }}))");
            }

            // Storage sizes match tag counts.
            let pos_tagged = tracker.alive.iter().filter(|&&e| em.has_components::<(Pos,)>(e)).count();
            prop_assert_eq!(em.storage::<Pos>().map_or(0, |s| s.len()), pos_tagged);
        }
    }

    /// Listing order is stable between mutations and equals creation order.
    #[test]
    fn listing_order_is_creation_order(
        count in 1..40usize,
        deletions in prop::collection::vec(0..40usize, 0..10),
    ) {
        let mut em = EntityManager::new();
        let mut ids: Vec<EntityId> = (0..count).map(|_| em.create_entity()).collect();
        for d in deletions {
            if !ids.is_empty() {
                let e = ids.remove(d % ids.len());
                em.delete_entity(e);
            }
        }
        let first: Vec<EntityId> = em.all_entities().iter().map(|h| h.id()).collect();
        let second: Vec<EntityId> = em.all_entities().iter().map(|h| h.id()).collect();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, ids);
    }

    /// `set` followed by `get` returns the value that was set.
    #[test]
    fn set_get_round_trip(x in finite_f32(), y in finite_f32(), tag in any::<u32>()) {
        let mut em = EntityManager::new();
        let e = em.create_entity_with::<(Pos, Tag)>();
        em.set(e, Pos { x, y }).unwrap();
        em.set(e, Tag(tag)).unwrap();
        prop_assert_eq!(em.get::<Pos>(e).unwrap(), &Pos { x, y });
        prop_assert_eq!(em.get::<Tag>(e).unwrap(), &Tag(tag));
    }

    /// Ids are never reused, however many entities are created and deleted.
    #[test]
    fn ids_never_reused(rounds in prop::collection::vec(1..10usize, 1..20)) {
        let mut em = EntityManager::new();
        let mut seen = HashSet::new();
        for batch in rounds {
            let ids: Vec<_> = (0..batch).map(|_| em.create_entity()).collect();
            for &e in &ids {
                prop_assert!(seen.insert(e));
            }
            for e in ids.into_iter().step_by(2) {
                em.delete_entity(e);
            }
        }
    }
}
