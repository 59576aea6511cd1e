//! End-to-end scenarios exercising the entity manager and system manager
//! together, the way a game loop drives them.

use opfor_ecs::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Transform {
    position: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct PointLight {
    intensity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct ModelComponent {
    path: String,
}

#[derive(Default)]
struct PlaceAtOrigin;

impl System for PlaceAtOrigin {
    fn name(&self) -> &str {
        "place"
    }

    fn on_update(&mut self, entities: &mut EntityManager, _dt: f32) -> Result<(), EcsError> {
        for (_, (transform,)) in entities.query_mut::<(&mut Transform,)>() {
            transform.position = [1.0, 0.0, 0.0];
        }
        Ok(())
    }
}

#[test]
fn added_components_are_visible_through_has() {
    let mut em = EntityManager::new();
    let a = em.create_entity();
    em.add_components::<(Transform, PointLight)>(a).unwrap();

    assert!(em.has_components::<(Transform,)>(a));
    assert!(em.has_components::<(Transform, PointLight)>(a));
    assert!(!em.has_components::<(ModelComponent,)>(a));
    assert!(!em.has_components::<(Transform, ModelComponent)>(a));
}

#[test]
fn query_returns_only_matching_entities() {
    let mut em = EntityManager::new();
    let a = em.create_entity_with::<(Transform,)>();
    let _b = em.create_entity();

    assert_eq!(em.entities_with::<(Transform,)>(), vec![a]);
}

#[test]
fn deleted_entity_is_unreachable() {
    let mut em = EntityManager::new();
    let a = em.create_entity_with::<(Transform,)>();
    let b = em.create_entity_with::<(Transform,)>();
    assert!(em.delete_entity(a));

    assert!(matches!(
        em.get::<Transform>(a),
        Err(EcsError::UnknownEntity { .. })
    ));
    let listed: Vec<EntityId> = em.all_entities().iter().map(|e| e.id()).collect();
    assert_eq!(listed, vec![b]);
    assert_eq!(em.entities_with::<(Transform,)>(), vec![b]);
    assert!(!em.storage::<Transform>().unwrap().contains(a));
}

#[test]
fn later_system_observes_earlier_write() {
    let mut ecs = EcsEngine::new();
    let a = ecs.entities.create_entity_with::<(Transform,)>();
    let b = ecs.entities.create_entity_with::<(Transform, PointLight)>();

    ecs.systems.instantiate_system::<PlaceAtOrigin>().unwrap();
    let observed = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&observed);
    ecs.systems
        .add_fn_system("observe", move |entities, _| {
            for (id, (transform,)) in entities.query::<(&Transform,)>() {
                sink.borrow_mut().push((id, transform.position));
            }
            Ok(())
        })
        .unwrap();

    ecs.update(1.0 / 60.0).unwrap();

    assert_eq!(
        *observed.borrow(),
        vec![(a, [1.0, 0.0, 0.0]), (b, [1.0, 0.0, 0.0])]
    );
}

#[test]
fn add_components_on_deleted_id_changes_nothing() {
    let mut em = EntityManager::new();
    let a = em.create_entity();
    let survivor = em.create_entity_with::<(Transform,)>();
    em.delete_entity(a);

    let err = em.add_components::<(Transform, PointLight)>(a).unwrap_err();
    assert!(matches!(err, EcsError::UnknownEntity { entity } if entity == a));

    assert_eq!(em.storage::<Transform>().unwrap().len(), 1);
    assert!(em.storage::<PointLight>().map_or(true, |s| s.is_empty()));
    assert_eq!(em.entity_ids(), vec![survivor]);
}

#[test]
fn components_are_introspectable_by_name() {
    let mut em = EntityManager::new();
    em.register_component::<Transform>("Transform").unwrap();
    em.register_component::<PointLight>("PointLight").unwrap();

    let lamp = em.create_named("Lamp");
    em.add_component_by_name(lamp, "PointLight").unwrap();
    em.set_component_json(lamp, "PointLight", &serde_json::json!({ "intensity": 3.5 }))
        .unwrap();

    assert_eq!(em.get::<PointLight>(lamp).unwrap().intensity, 3.5);
    assert_eq!(em.entities_with_names(&["PointLight"]).unwrap(), vec![lamp]);
    assert!(matches!(
        em.entities_with_names(&["Missing"]),
        Err(EcsError::UnknownComponent { .. })
    ));

    let handle = em.get_entity(lamp).unwrap();
    assert_eq!(handle.name(), "Lamp");
    assert_eq!(handle.component_names(), vec!["PointLight"]);
}
