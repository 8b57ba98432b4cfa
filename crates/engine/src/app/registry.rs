use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use crate::geometry::{
    angle_from_points, convex_polygons_intersect, oriented_rect_corners, Vec2,
};

use super::error::{NotFoundError, ValidationError};
use super::input::MouseSnapshot;
use super::surface::DrawSurface;

/// Per-render-tick draw hook: receives the surface and a read-only snapshot
/// of the entity's public fields.
pub type DrawCallback = Box<dyn FnMut(&mut dyn DrawSurface, &EntitySnapshot)>;

/// Pointer hit hook: runs after hit collection completes, so it may freely
/// mutate the registry, including deleting its own entity.
pub type PointerCallback = Box<dyn FnMut(&mut EntityRegistry, MouseSnapshot)>;

/// Collision/hit-test rectangle in entity-local space, before rotation and
/// translation. A zero-area box makes the entity non-collidable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
}

/// Value copy of an entity's public fields, taken at a single point in time.
/// Collision and physics code reads these instead of live references so
/// in-place mutation within the same tick cannot be observed halfway.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: String,
    pub position: Vec2,
    pub angle: f32,
    pub layer: i32,
    pub bounding_box: Option<BoundingBox>,
}

/// Registration record for [`EntityRegistry::add`]. Unset optional fields
/// are defaulted once at add time: position (0, 0), angle 0, layer 0, no
/// bounding box.
#[derive(Default)]
pub struct EntityDef {
    id: String,
    position: Option<Vec2>,
    angle: Option<f32>,
    layer: Option<i32>,
    bounding_box: Option<BoundingBox>,
    on_draw: Option<DrawCallback>,
    on_pointer_down: Option<PointerCallback>,
    on_pointer_up: Option<PointerCallback>,
}

impl EntityDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Vec2::new(x, y));
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_bounding_box(mut self, width: f32, height: f32) -> Self {
        self.bounding_box = Some(BoundingBox { width, height });
        self
    }

    pub fn with_draw(
        mut self,
        on_draw: impl FnMut(&mut dyn DrawSurface, &EntitySnapshot) + 'static,
    ) -> Self {
        self.on_draw = Some(Box::new(on_draw));
        self
    }

    pub fn with_pointer_down(
        mut self,
        on_pointer_down: impl FnMut(&mut EntityRegistry, MouseSnapshot) + 'static,
    ) -> Self {
        self.on_pointer_down = Some(Box::new(on_pointer_down));
        self
    }

    pub fn with_pointer_up(
        mut self,
        on_pointer_up: impl FnMut(&mut EntityRegistry, MouseSnapshot) + 'static,
    ) -> Self {
        self.on_pointer_up = Some(Box::new(on_pointer_up));
        self
    }
}

pub struct Entity {
    id: String,
    position: Vec2,
    angle: f32,
    layer: i32,
    bounding_box: Option<BoundingBox>,
    on_draw: DrawCallback,
    on_pointer_down: Option<PointerCallback>,
    on_pointer_up: Option<PointerCallback>,
}

impl Entity {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id.clone(),
            position: self.position,
            angle: self.angle,
            layer: self.layer,
            bounding_box: self.bounding_box,
        }
    }

    /// Oriented collision rectangle, or `None` when the entity has no usable
    /// bounding box (missing or zero-area), which excludes it from every
    /// collision and hit-test query.
    fn collision_corners(&self) -> Option<[Vec2; 4]> {
        let bounds = self.bounding_box?;
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return None;
        }
        Some(oriented_rect_corners(
            self.position,
            self.angle,
            bounds.width,
            bounds.height,
        ))
    }
}

enum PointerPhase {
    Down,
    Up,
}

/// Owns every entity of one engine instance: an id-keyed map plus a
/// separately maintained draw-order index, stably re-sorted by layer on
/// each insertion (layer is fixed at creation, so insertions are the only
/// re-sort points; ties keep insertion order).
#[derive(Default)]
pub struct EntityRegistry {
    entities: HashMap<String, Entity>,
    draw_order: Vec<String>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity. All-or-nothing: a rejected definition leaves the
    /// registry untouched.
    pub fn add(&mut self, def: EntityDef) -> Result<(), ValidationError> {
        if def.id.is_empty() {
            return Err(ValidationError::EmptyEntityId);
        }
        if self.entities.contains_key(&def.id) {
            return Err(ValidationError::DuplicateEntityId { id: def.id });
        }
        let Some(on_draw) = def.on_draw else {
            return Err(ValidationError::MissingDrawCallback { id: def.id });
        };
        if let Some(bounds) = def.bounding_box {
            if bounds.width < 0.0 || bounds.height < 0.0 {
                return Err(ValidationError::NegativeBoundingBox {
                    id: def.id,
                    width: bounds.width,
                    height: bounds.height,
                });
            }
        }

        let entity = Entity {
            id: def.id.clone(),
            position: def.position.unwrap_or_default(),
            angle: def.angle.unwrap_or(0.0),
            layer: def.layer.unwrap_or(0),
            bounding_box: def.bounding_box,
            on_draw,
            on_pointer_down: def.on_pointer_down,
            on_pointer_up: def.on_pointer_up,
        };
        self.draw_order.push(def.id.clone());
        self.entities.insert(def.id, entity);
        let entities = &self.entities;
        // Stable sort: equal layers stay in insertion order.
        self.draw_order
            .sort_by_key(|id| entities.get(id).map(|entity| entity.layer).unwrap_or(0));
        Ok(())
    }

    /// Remove an entity immediately; no deferred reclamation.
    pub fn delete(&mut self, id: &str) -> Result<(), NotFoundError> {
        if self.entities.remove(id).is_none() {
            return Err(NotFoundError::Entity { id: id.to_string() });
        }
        self.draw_order.retain(|ordered| ordered != id);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entity reference, for read access beyond the snapshot fields.
    pub fn get(&self, id: &str) -> Result<&Entity, NotFoundError> {
        self.entities
            .get(id)
            .ok_or_else(|| NotFoundError::Entity { id: id.to_string() })
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Entity, NotFoundError> {
        self.entities
            .get_mut(id)
            .ok_or_else(|| NotFoundError::Entity { id: id.to_string() })
    }

    pub fn snapshot(&self, id: &str) -> Result<EntitySnapshot, NotFoundError> {
        self.get(id).map(Entity::snapshot)
    }

    pub fn translate(&mut self, id: &str, dx: f32, dy: f32) -> Result<(), NotFoundError> {
        let entity = self.get_mut(id)?;
        entity.position.x += dx;
        entity.position.y += dy;
        Ok(())
    }

    pub fn set_position(&mut self, id: &str, x: f32, y: f32) -> Result<(), NotFoundError> {
        self.get_mut(id)?.position = Vec2::new(x, y);
        Ok(())
    }

    pub fn set_rotation(&mut self, id: &str, angle: f32) -> Result<(), NotFoundError> {
        self.get_mut(id)?.angle = angle;
        Ok(())
    }

    pub fn rotate_by(&mut self, id: &str, delta_angle: f32) -> Result<(), NotFoundError> {
        self.get_mut(id)?.angle += delta_angle;
        Ok(())
    }

    /// Point the entity at the target using the engine's up-is-zero angle
    /// convention.
    pub fn look_at(&mut self, id: &str, target_x: f32, target_y: f32) -> Result<(), NotFoundError> {
        let entity = self.get_mut(id)?;
        entity.angle = angle_from_points(entity.position, Vec2::new(target_x, target_y));
        Ok(())
    }

    pub fn move_forward(&mut self, id: &str, distance: f32) -> Result<(), NotFoundError> {
        let entity = self.get_mut(id)?;
        entity.position.x += entity.angle.cos() * distance;
        entity.position.y += entity.angle.sin() * distance;
        Ok(())
    }

    pub fn strafe_right(&mut self, id: &str, distance: f32) -> Result<(), NotFoundError> {
        let entity = self.get_mut(id)?;
        let angle = entity.angle + FRAC_PI_2;
        entity.position.x += angle.cos() * distance;
        entity.position.y += angle.sin() * distance;
        Ok(())
    }

    /// Visit snapshots in ascending layer order (ties in insertion order).
    ///
    /// The callback receives value snapshots and no registry access; adding
    /// or deleting entities from inside the iteration does not compile,
    /// which is this registry's stance on iteration-during-mutation.
    pub fn for_each_in_draw_order(&self, mut visit: impl FnMut(&EntitySnapshot)) {
        for id in &self.draw_order {
            if let Some(entity) = self.entities.get(id) {
                visit(&entity.snapshot());
            }
        }
    }

    /// Run every entity's draw callback in draw order. Same mutation stance
    /// as [`Self::for_each_in_draw_order`].
    pub(crate) fn draw_all(&mut self, surface: &mut dyn DrawSurface) {
        let Self {
            entities,
            draw_order,
        } = self;
        for id in draw_order.iter() {
            if let Some(entity) = entities.get_mut(id) {
                let snapshot = EntitySnapshot {
                    id: entity.id.clone(),
                    position: entity.position,
                    angle: entity.angle,
                    layer: entity.layer,
                    bounding_box: entity.bounding_box,
                };
                (entity.on_draw)(surface, &snapshot);
            }
        }
    }

    /// SAT overlap between the two entities' oriented rectangles. An entity
    /// without a usable bounding box collides with nothing.
    pub fn test_collision(&self, id_a: &str, id_b: &str) -> Result<bool, NotFoundError> {
        let a = self.get(id_a)?;
        let b = self.get(id_b)?;
        match (a.collision_corners(), b.collision_corners()) {
            (Some(corners_a), Some(corners_b)) => {
                Ok(convex_polygons_intersect(&corners_a, &corners_b))
            }
            _ => Ok(false),
        }
    }

    /// Ids of every collidable entity whose oriented rectangle contains the
    /// point, in draw order. The point is fed to the SAT routine as a
    /// degenerate one-vertex polygon.
    pub fn hit_test(&self, x: f32, y: f32) -> Vec<String> {
        let point = [Vec2::new(x, y)];
        self.draw_order
            .iter()
            .filter_map(|id| self.entities.get(id))
            .filter(|entity| {
                entity
                    .collision_corners()
                    .is_some_and(|corners| convex_polygons_intersect(&corners, &point))
            })
            .map(|entity| entity.id.clone())
            .collect()
    }

    pub(crate) fn dispatch_pointer_down(&mut self, mouse: MouseSnapshot) {
        self.dispatch_pointer(mouse, PointerPhase::Down);
    }

    pub(crate) fn dispatch_pointer_up(&mut self, mouse: MouseSnapshot) {
        self.dispatch_pointer(mouse, PointerPhase::Up);
    }

    // Hits are collected before any callback runs, then each callback is
    // taken out of its entity for the duration of its call so it can borrow
    // the registry mutably (and even delete its own entity).
    fn dispatch_pointer(&mut self, mouse: MouseSnapshot, phase: PointerPhase) {
        let hits = self.hit_test(mouse.x, mouse.y);
        for id in hits {
            let callback = self.entities.get_mut(&id).and_then(|entity| match phase {
                PointerPhase::Down => entity.on_pointer_down.take(),
                PointerPhase::Up => entity.on_pointer_up.take(),
            });
            let Some(mut callback) = callback else {
                continue;
            };
            callback(self, mouse);
            if let Some(entity) = self.entities.get_mut(&id) {
                let slot = match phase {
                    PointerPhase::Down => &mut entity.on_pointer_down,
                    PointerPhase::Up => &mut entity.on_pointer_up,
                };
                // The callback may have replaced the entity under the same
                // id; only restore into an empty slot.
                if slot.is_none() {
                    *slot = Some(callback);
                }
            }
        }
    }
}
