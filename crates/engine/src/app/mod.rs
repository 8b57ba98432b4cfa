mod engine;
mod error;
mod input;
mod metrics;
mod registry;
pub(crate) mod scheduler;
mod surface;

pub use engine::{Engine, EngineConfig, TickCallback, TickHooks};
pub use error::{NotFoundError, ValidationError};
pub use input::{
    key_codes, InputDispatcher, KeyBindingDef, KeyCallback, MouseCallback, MouseDrawCallback,
    MouseHandlers, MouseSnapshot,
};
pub use metrics::LoopMetricsSnapshot;
pub(crate) use metrics::MetricsAccumulator;
pub use registry::{
    BoundingBox, DrawCallback, Entity, EntityDef, EntityRegistry, EntitySnapshot, PointerCallback,
};
pub use scheduler::{FramePlan, TimerConfig};
pub use surface::{DrawSurface, ImageData, ImageDataError, Rgba};
