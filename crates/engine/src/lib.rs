//! A minimal real-time 2D scene engine.
//!
//! The engine keeps a registry of positioned, rotatable, layer-ordered
//! entities, drives a render loop alongside an independent fixed-rate
//! simulation tick, routes keyboard and mouse input to per-entity and
//! global callbacks, and answers oriented-rectangle collision queries with
//! a separating-axis test. Everything runs on one cooperative execution
//! context; each [`Engine`] instance is fully self-contained.
//!
//! The `platform` module is the boundary with the outside world: a winit
//! window feeding native events in, and a software canvas over a `pixels`
//! frame buffer implementing the [`DrawSurface`] capability.

pub mod app;
pub mod geometry;
pub mod platform;

pub use app::{
    key_codes, BoundingBox, DrawCallback, DrawSurface, Engine, EngineConfig, Entity, EntityDef,
    EntityRegistry, EntitySnapshot, FramePlan, ImageData, ImageDataError, InputDispatcher,
    KeyBindingDef, KeyCallback, LoopMetricsSnapshot, MouseCallback, MouseDrawCallback,
    MouseHandlers, MouseSnapshot, NotFoundError, PointerCallback, Rgba, TickCallback, TickHooks,
    TimerConfig, ValidationError,
};
pub use geometry::{
    angle_from_points, convex_polygons_intersect, oriented_rect_corners, point_in_oriented_rect,
    Vec2,
};
pub use platform::{load_image, run_engine, ImageLoadError, PlatformError, RunConfig, SoftwareCanvas};
