mod loop_runner;
mod renderer;

pub use loop_runner::{run_engine, PlatformError, RunConfig};
pub use renderer::{load_image, ImageLoadError, SoftwareCanvas};
