use std::collections::HashMap;

use super::error::{NotFoundError, ValidationError};
use super::registry::EntityRegistry;
use super::surface::DrawSurface;

/// Named constants for the numeric key codes carried by native keyboard
/// events. The values follow the classic browser scheme the engine's wire
/// format inherited; the platform layer translates physical keys to these.
pub mod key_codes {
    pub const BACKSPACE: u32 = 8;
    pub const TAB: u32 = 9;
    pub const ENTER: u32 = 13;
    pub const SHIFT: u32 = 16;
    pub const CTRL: u32 = 17;
    pub const ESCAPE: u32 = 27;
    pub const SPACE: u32 = 32;
    pub const LEFT: u32 = 37;
    pub const UP: u32 = 38;
    pub const RIGHT: u32 = 39;
    pub const DOWN: u32 = 40;
    pub const KEY_A: u32 = 65;
    pub const KEY_D: u32 = 68;
    pub const KEY_S: u32 = 83;
    pub const KEY_W: u32 = 87;
}

/// Keyboard callback; receives the registry so bindings can move entities.
pub type KeyCallback = Box<dyn FnMut(&mut EntityRegistry)>;

/// Global mouse callback (down/up/move/hold).
pub type MouseCallback = Box<dyn FnMut(&mut EntityRegistry, MouseSnapshot)>;

/// Pointer overlay painter, run at the end of every render tick.
pub type MouseDrawCallback = Box<dyn FnMut(&mut dyn DrawSurface, MouseSnapshot)>;

/// Last known pointer state: surface-relative position and primary button.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseSnapshot {
    pub x: f32,
    pub y: f32,
    pub is_primary_down: bool,
}

/// Registration record for one key code.
///
/// Non-repeatable bindings fire `on_press` once per press edge. Repeatable
/// bindings fire `on_press` once per key-poll tick for as long as the key is
/// held. `on_release` fires exactly once per press either way.
#[derive(Default)]
pub struct KeyBindingDef {
    key_code: u32,
    on_press: Option<KeyCallback>,
    on_release: Option<KeyCallback>,
    repeatable: bool,
}

impl KeyBindingDef {
    pub fn new(key_code: u32) -> Self {
        Self {
            key_code,
            ..Self::default()
        }
    }

    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    pub fn on_press(mut self, on_press: impl FnMut(&mut EntityRegistry) + 'static) -> Self {
        self.on_press = Some(Box::new(on_press));
        self
    }

    pub fn on_release(mut self, on_release: impl FnMut(&mut EntityRegistry) + 'static) -> Self {
        self.on_release = Some(Box::new(on_release));
        self
    }
}

struct KeyBinding {
    on_press: Option<KeyCallback>,
    on_release: Option<KeyCallback>,
    repeatable: bool,
    is_down: bool,
}

/// Global mouse handlers, replaced as a group. All fields optional.
#[derive(Default)]
pub struct MouseHandlers {
    on_left_down: Option<MouseCallback>,
    on_left_up: Option<MouseCallback>,
    on_move: Option<MouseCallback>,
    on_hold: Option<MouseCallback>,
    on_draw: Option<MouseDrawCallback>,
}

impl MouseHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_left_down(
        mut self,
        on_left_down: impl FnMut(&mut EntityRegistry, MouseSnapshot) + 'static,
    ) -> Self {
        self.on_left_down = Some(Box::new(on_left_down));
        self
    }

    pub fn with_left_up(
        mut self,
        on_left_up: impl FnMut(&mut EntityRegistry, MouseSnapshot) + 'static,
    ) -> Self {
        self.on_left_up = Some(Box::new(on_left_up));
        self
    }

    pub fn with_move(
        mut self,
        on_move: impl FnMut(&mut EntityRegistry, MouseSnapshot) + 'static,
    ) -> Self {
        self.on_move = Some(Box::new(on_move));
        self
    }

    /// Fired once on press, then once per hold-repeat tick while the primary
    /// button stays down.
    pub fn with_hold(
        mut self,
        on_hold: impl FnMut(&mut EntityRegistry, MouseSnapshot) + 'static,
    ) -> Self {
        self.on_hold = Some(Box::new(on_hold));
        self
    }

    pub fn with_draw(
        mut self,
        on_draw: impl FnMut(&mut dyn DrawSurface, MouseSnapshot) + 'static,
    ) -> Self {
        self.on_draw = Some(Box::new(on_draw));
        self
    }
}

/// Keyboard and mouse state for one engine instance, plus the registered
/// callbacks. One dispatcher per engine, never shared between engines.
#[derive(Default)]
pub struct InputDispatcher {
    bindings: HashMap<u32, KeyBinding>,
    mouse: MouseSnapshot,
    handlers: MouseHandlers,
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binding(&mut self, def: KeyBindingDef) -> Result<(), ValidationError> {
        if def.on_press.is_none() && def.on_release.is_none() {
            return Err(ValidationError::EmptyKeyBinding {
                key_code: def.key_code,
            });
        }
        if self.bindings.contains_key(&def.key_code) {
            return Err(ValidationError::DuplicateKeyBinding {
                key_code: def.key_code,
            });
        }
        self.bindings.insert(
            def.key_code,
            KeyBinding {
                on_press: def.on_press,
                on_release: def.on_release,
                repeatable: def.repeatable,
                is_down: false,
            },
        );
        Ok(())
    }

    pub fn remove_binding(&mut self, key_code: u32) -> Result<(), NotFoundError> {
        self.bindings
            .remove(&key_code)
            .map(|_| ())
            .ok_or(NotFoundError::KeyBinding { key_code })
    }

    pub fn set_mouse_handlers(&mut self, handlers: MouseHandlers) {
        self.handlers = handlers;
    }

    pub fn mouse(&self) -> MouseSnapshot {
        self.mouse
    }

    /// Native key-down. Events for unbound codes are ignored; repeated
    /// key-down while already pressed (OS auto-repeat) does not re-trigger
    /// the press edge.
    pub(crate) fn key_down(&mut self, key_code: u32, registry: &mut EntityRegistry) {
        let Some(binding) = self.bindings.get_mut(&key_code) else {
            return;
        };
        if binding.is_down {
            return;
        }
        binding.is_down = true;
        if !binding.repeatable {
            if let Some(on_press) = binding.on_press.as_mut() {
                on_press(registry);
            }
        }
    }

    /// Native key-up: releases the binding and fires `on_release` exactly
    /// once per observed press. A key-up without a matching press is a
    /// no-op.
    pub(crate) fn key_up(&mut self, key_code: u32, registry: &mut EntityRegistry) {
        let Some(binding) = self.bindings.get_mut(&key_code) else {
            return;
        };
        if !binding.is_down {
            return;
        }
        binding.is_down = false;
        if let Some(on_release) = binding.on_release.as_mut() {
            on_release(registry);
        }
    }

    /// One key-poll tick: fire `on_press` for every held repeatable binding.
    pub(crate) fn poll_repeatable(&mut self, registry: &mut EntityRegistry) {
        for binding in self.bindings.values_mut() {
            if binding.is_down && binding.repeatable {
                if let Some(on_press) = binding.on_press.as_mut() {
                    on_press(registry);
                }
            }
        }
    }

    pub(crate) fn pointer_down(&mut self, x: f32, y: f32, registry: &mut EntityRegistry) {
        self.mouse = MouseSnapshot {
            x,
            y,
            is_primary_down: true,
        };
        let snapshot = self.mouse;
        if let Some(on_left_down) = self.handlers.on_left_down.as_mut() {
            on_left_down(registry, snapshot);
        }
        registry.dispatch_pointer_down(snapshot);
        // The hold action fires immediately on press; the scheduler repeats
        // it while the button stays down.
        if let Some(on_hold) = self.handlers.on_hold.as_mut() {
            on_hold(registry, snapshot);
        }
    }

    pub(crate) fn pointer_up(&mut self, x: f32, y: f32, registry: &mut EntityRegistry) {
        self.mouse = MouseSnapshot {
            x,
            y,
            is_primary_down: false,
        };
        let snapshot = self.mouse;
        if let Some(on_left_up) = self.handlers.on_left_up.as_mut() {
            on_left_up(registry, snapshot);
        }
        registry.dispatch_pointer_up(snapshot);
    }

    pub(crate) fn pointer_moved(&mut self, x: f32, y: f32, registry: &mut EntityRegistry) {
        self.mouse.x = x;
        self.mouse.y = y;
        let snapshot = self.mouse;
        if let Some(on_move) = self.handlers.on_move.as_mut() {
            on_move(registry, snapshot);
        }
    }

    /// One hold-repeat tick. The scheduler only schedules these while
    /// [`Self::hold_active`] reports true.
    pub(crate) fn fire_hold(&mut self, registry: &mut EntityRegistry) {
        if !self.mouse.is_primary_down {
            return;
        }
        let snapshot = self.mouse;
        if let Some(on_hold) = self.handlers.on_hold.as_mut() {
            on_hold(registry, snapshot);
        }
    }

    pub(crate) fn hold_active(&self) -> bool {
        self.mouse.is_primary_down && self.handlers.on_hold.is_some()
    }

    pub(crate) fn draw_pointer_overlay(&mut self, surface: &mut dyn DrawSurface) {
        let snapshot = self.mouse;
        if let Some(on_draw) = self.handlers.on_draw.as_mut() {
            on_draw(surface, snapshot);
        }
    }
}
