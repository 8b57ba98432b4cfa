use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{NotFoundError, ValidationError};
use super::input::{InputDispatcher, KeyBindingDef, MouseHandlers, MouseSnapshot};
use super::registry::{EntityDef, EntityRegistry, EntitySnapshot};
use super::scheduler::{FramePlan, Scheduler, TimerConfig};
use super::surface::DrawSurface;

/// Engine-wide configuration. `width`/`height` define the drawing surface
/// region in surface coordinates; the timer block paces the fixed-rate
/// activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub timers: TimerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            timers: TimerConfig::default(),
        }
    }
}

/// Game hook invoked with registry access.
pub type TickCallback = Box<dyn FnMut(&mut EntityRegistry)>;

/// Per-tick hooks, replaced as a group. `before_draw` runs at the start of
/// every render tick (after the clear, before entity drawing); `on_physics`
/// runs once per simulation tick.
#[derive(Default)]
pub struct TickHooks {
    before_draw: Option<TickCallback>,
    on_physics: Option<TickCallback>,
}

impl TickHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_before_draw(
        mut self,
        before_draw: impl FnMut(&mut EntityRegistry) + 'static,
    ) -> Self {
        self.before_draw = Some(Box::new(before_draw));
        self
    }

    pub fn with_on_physics(
        mut self,
        on_physics: impl FnMut(&mut EntityRegistry) + 'static,
    ) -> Self {
        self.on_physics = Some(Box::new(on_physics));
        self
    }
}

/// The one surface game code talks to: owns the registry, the input
/// dispatcher and the scheduler of a single engine instance. Everything is
/// synchronous and single-threaded; each instance is fully independent, so
/// several engines can coexist in one process.
///
/// Game callback panics are not caught: they unwind through the running
/// tick and abort it. Registry invariants (id uniqueness, draw-order
/// consistency) are maintained eagerly on every mutation, so a tick that
/// unwinds leaves the registry usable for subsequent ticks.
pub struct Engine {
    config: EngineConfig,
    registry: EntityRegistry,
    input: InputDispatcher,
    scheduler: Scheduler,
    hooks: TickHooks,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: EntityRegistry::new(),
            input: InputDispatcher::new(),
            scheduler: Scheduler::new(&config.timers),
            hooks: TickHooks::default(),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn add_entity(&mut self, def: EntityDef) -> Result<(), ValidationError> {
        self.registry.add(def)
    }

    pub fn delete_entity(&mut self, id: &str) -> Result<(), NotFoundError> {
        self.registry.delete(id)
    }

    pub fn entity_snapshot(&self, id: &str) -> Result<EntitySnapshot, NotFoundError> {
        self.registry.snapshot(id)
    }

    pub fn set_position(&mut self, id: &str, x: f32, y: f32) -> Result<(), NotFoundError> {
        self.registry.set_position(id, x, y)
    }

    pub fn set_rotation(&mut self, id: &str, angle: f32) -> Result<(), NotFoundError> {
        self.registry.set_rotation(id, angle)
    }

    pub fn rotate_by(&mut self, id: &str, delta_angle: f32) -> Result<(), NotFoundError> {
        self.registry.rotate_by(id, delta_angle)
    }

    pub fn translate(&mut self, id: &str, dx: f32, dy: f32) -> Result<(), NotFoundError> {
        self.registry.translate(id, dx, dy)
    }

    pub fn look_at(&mut self, id: &str, target_x: f32, target_y: f32) -> Result<(), NotFoundError> {
        self.registry.look_at(id, target_x, target_y)
    }

    pub fn move_forward(&mut self, id: &str, distance: f32) -> Result<(), NotFoundError> {
        self.registry.move_forward(id, distance)
    }

    pub fn strafe_right(&mut self, id: &str, distance: f32) -> Result<(), NotFoundError> {
        self.registry.strafe_right(id, distance)
    }

    pub fn test_collision(&self, id_a: &str, id_b: &str) -> Result<bool, NotFoundError> {
        self.registry.test_collision(id_a, id_b)
    }

    pub fn add_key_binding(&mut self, def: KeyBindingDef) -> Result<(), ValidationError> {
        self.input.add_binding(def)
    }

    pub fn remove_key_binding(&mut self, key_code: u32) -> Result<(), NotFoundError> {
        self.input.remove_binding(key_code)
    }

    pub fn set_mouse_handlers(&mut self, handlers: MouseHandlers) {
        self.input.set_mouse_handlers(handlers);
    }

    pub fn set_tick_hooks(&mut self, hooks: TickHooks) {
        self.hooks = hooks;
    }

    pub fn mouse(&self) -> MouseSnapshot {
        self.input.mouse()
    }

    /// Native key-down event ingress (numeric key code).
    pub fn key_down(&mut self, key_code: u32) {
        self.input.key_down(key_code, &mut self.registry);
    }

    /// Native key-up event ingress.
    pub fn key_up(&mut self, key_code: u32) {
        self.input.key_up(key_code, &mut self.registry);
    }

    /// Native primary-button-down event ingress (surface coordinates).
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.input.pointer_down(x, y, &mut self.registry);
    }

    /// Native primary-button-up event ingress.
    pub fn pointer_up(&mut self, x: f32, y: f32) {
        self.input.pointer_up(x, y, &mut self.registry);
    }

    /// Native pointer-move event ingress.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.input.pointer_moved(x, y, &mut self.registry);
    }

    /// Run the fixed-rate activities owed since the previous call, in a
    /// deterministic order: simulation ticks, then key-poll ticks, then
    /// mouse-hold ticks. Each tick runs to completion before the next
    /// starts; no two ticks of one activity ever overlap.
    pub fn advance(&mut self, now: Instant) -> FramePlan {
        let plan = self.scheduler.advance(now, self.input.hold_active());
        let Self {
            registry,
            input,
            hooks,
            ..
        } = self;
        for _ in 0..plan.sim_ticks {
            if let Some(on_physics) = hooks.on_physics.as_mut() {
                on_physics(registry);
            }
        }
        for _ in 0..plan.key_poll_ticks {
            input.poll_repeatable(registry);
        }
        for _ in 0..plan.hold_ticks {
            input.fire_hold(registry);
        }
        if plan.dropped_backlog > std::time::Duration::ZERO {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                "tick_backlog_dropped"
            );
        }
        plan
    }

    /// One render tick: clear the surface, run the before-draw hook, draw
    /// every entity in ascending layer order, then the pointer overlay.
    pub fn render_frame(&mut self, surface: &mut dyn DrawSurface) {
        surface.clear_region(0.0, 0.0, self.config.width as f32, self.config.height as f32);
        let Self {
            registry,
            input,
            hooks,
            ..
        } = self;
        if let Some(before_draw) = hooks.before_draw.as_mut() {
            before_draw(registry);
        }
        registry.draw_all(surface);
        input.draw_pointer_overlay(surface);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use crate::app::input::key_codes;
    use crate::app::surface::{ImageData, Rgba};

    use super::*;

    type EventLog = Rc<RefCell<Vec<String>>>;

    struct RecordingSurface {
        log: EventLog,
    }

    impl DrawSurface for RecordingSurface {
        fn clear_region(&mut self, _: f32, _: f32, _: f32, _: f32) {
            self.log.borrow_mut().push("clear".to_string());
        }
        fn begin_path(&mut self) {}
        fn close_path(&mut self) {}
        fn move_to(&mut self, _: f32, _: f32) {}
        fn line_to(&mut self, _: f32, _: f32) {}
        fn arc(&mut self, _: f32, _: f32, _: f32, _: f32, _: f32) {}
        fn set_stroke_color(&mut self, _: Rgba) {}
        fn set_fill_color(&mut self, _: Rgba) {}
        fn stroke(&mut self) {}
        fn fill(&mut self) {}
        fn save(&mut self) {}
        fn restore(&mut self) {}
        fn translate(&mut self, _: f32, _: f32) {}
        fn rotate(&mut self, _: f32) {}
        fn draw_image(&mut self, _: &ImageData, _: f32, _: f32) {}
    }

    fn logging_entity(id: &str, layer: i32, log: &EventLog) -> EntityDef {
        let draw_log = Rc::clone(log);
        let label = format!("draw:{id}");
        EntityDef::new(id)
            .with_layer(layer)
            .with_draw(move |_, _| draw_log.borrow_mut().push(label.clone()))
    }

    #[test]
    fn facade_operations_delegate_to_the_registry() {
        let mut engine = Engine::new(EngineConfig::default());
        engine
            .add_entity(
                EntityDef::new("e")
                    .with_position(2.0, 3.0)
                    .with_bounding_box(10.0, 10.0)
                    .with_draw(|_, _| {}),
            )
            .expect("add");

        engine.translate("e", 1.0, 1.0).expect("translate");
        let snapshot = engine.entity_snapshot("e").expect("snapshot");
        assert_eq!(snapshot.position.x, 3.0);
        assert_eq!(snapshot.position.y, 4.0);

        engine.delete_entity("e").expect("delete");
        assert!(matches!(
            engine.entity_snapshot("e"),
            Err(NotFoundError::Entity { .. })
        ));
    }

    #[test]
    fn separate_engine_instances_share_nothing() {
        let mut first = Engine::new(EngineConfig::default());
        let mut second = Engine::new(EngineConfig::default());

        first
            .add_entity(EntityDef::new("only_in_first").with_draw(|_, _| {}))
            .expect("add");
        // The same id registers cleanly in the other instance.
        second
            .add_entity(EntityDef::new("only_in_first").with_draw(|_, _| {}))
            .expect("add");

        assert_eq!(first.entity_count(), 1);
        assert_eq!(second.entity_count(), 1);
        first.delete_entity("only_in_first").expect("delete");
        assert_eq!(second.entity_count(), 1);
    }

    #[test]
    fn advance_runs_one_physics_tick_per_sim_interval() {
        let mut engine = Engine::new(EngineConfig::default());
        let ticks = Rc::new(RefCell::new(0));
        let tick_log = Rc::clone(&ticks);
        engine.set_tick_hooks(
            TickHooks::new().with_on_physics(move |_| *tick_log.borrow_mut() += 1),
        );

        let base = Instant::now();
        engine.advance(base);
        let plan = engine.advance(base + Duration::from_millis(30));

        assert_eq!(plan.sim_ticks, 3);
        assert_eq!(*ticks.borrow(), 3);
    }

    #[test]
    fn held_repeatable_key_fires_once_per_poll_tick_and_releases_once() {
        let mut engine = Engine::new(EngineConfig::default());
        let presses = Rc::new(RefCell::new(0));
        let releases = Rc::new(RefCell::new(0));
        let press_log = Rc::clone(&presses);
        let release_log = Rc::clone(&releases);
        engine
            .add_key_binding(
                KeyBindingDef::new(key_codes::RIGHT)
                    .repeatable(true)
                    .on_press(move |_| *press_log.borrow_mut() += 1)
                    .on_release(move |_| *release_log.borrow_mut() += 1),
            )
            .expect("add");

        let base = Instant::now();
        engine.advance(base);
        engine.key_down(key_codes::RIGHT);
        // 40ms held: four poll ticks at the 10ms default.
        engine.advance(base + Duration::from_millis(40));
        engine.key_up(key_codes::RIGHT);
        engine.advance(base + Duration::from_millis(80));

        assert_eq!(*presses.borrow(), 4);
        assert_eq!(*releases.borrow(), 1);
    }

    #[test]
    fn hold_action_fires_on_press_and_then_per_hold_tick() {
        let mut engine = Engine::new(EngineConfig::default());
        let holds = Rc::new(RefCell::new(0));
        let hold_log = Rc::clone(&holds);
        engine.set_mouse_handlers(
            MouseHandlers::new().with_hold(move |_, _| *hold_log.borrow_mut() += 1),
        );

        let base = Instant::now();
        engine.advance(base);
        engine.pointer_down(10.0, 10.0);
        assert_eq!(*holds.borrow(), 1);

        engine.advance(base + Duration::from_millis(30));
        assert_eq!(*holds.borrow(), 4);

        engine.pointer_up(10.0, 10.0);
        engine.advance(base + Duration::from_millis(60));
        assert_eq!(*holds.borrow(), 4);
    }

    #[test]
    fn render_frame_sequences_clear_hook_draws_overlay() {
        let mut engine = Engine::new(EngineConfig::default());
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));

        engine
            .add_entity(logging_entity("front", 2, &log))
            .expect("add");
        engine
            .add_entity(logging_entity("back", 1, &log))
            .expect("add");

        let hook_log = Rc::clone(&log);
        engine.set_tick_hooks(
            TickHooks::new().with_before_draw(move |_| {
                hook_log.borrow_mut().push("before_draw".to_string())
            }),
        );
        let overlay_log = Rc::clone(&log);
        engine.set_mouse_handlers(MouseHandlers::new().with_draw(move |_, _| {
            overlay_log.borrow_mut().push("overlay".to_string())
        }));

        let mut surface = RecordingSurface {
            log: Rc::clone(&log),
        };
        engine.render_frame(&mut surface);

        assert_eq!(
            log.borrow().as_slice(),
            ["clear", "before_draw", "draw:back", "draw:front", "overlay"]
        );
    }

    #[test]
    fn before_draw_hook_may_add_and_delete_entities() {
        let mut engine = Engine::new(EngineConfig::default());
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        engine
            .add_entity(logging_entity("doomed", 0, &log))
            .expect("add");

        let spawn_log = Rc::clone(&log);
        engine.set_tick_hooks(TickHooks::new().with_before_draw(move |registry| {
            registry.delete("doomed").expect("delete");
            let draw_log = Rc::clone(&spawn_log);
            registry
                .add(
                    EntityDef::new("fresh")
                        .with_draw(move |_, _| draw_log.borrow_mut().push("draw:fresh".to_string())),
                )
                .expect("add");
        }));

        let mut surface = RecordingSurface {
            log: Rc::clone(&log),
        };
        engine.render_frame(&mut surface);

        assert_eq!(log.borrow().as_slice(), ["clear", "draw:fresh"]);
    }

    #[test]
    fn failed_add_keeps_registry_consistent_for_later_ticks() {
        let mut engine = Engine::new(EngineConfig::default());
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        engine.add_entity(logging_entity("a", 1, &log)).expect("add");

        assert!(engine.add_entity(logging_entity("a", 7, &log)).is_err());
        engine.add_entity(logging_entity("b", 0, &log)).expect("add");

        let mut surface = RecordingSurface {
            log: Rc::clone(&log),
        };
        engine.render_frame(&mut surface);
        assert_eq!(log.borrow().as_slice(), ["clear", "draw:b", "draw:a"]);
    }
}
