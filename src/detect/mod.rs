mod backend;
mod backends;
mod detector;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::yolo;
pub use backends::{DecodeParams, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use detector::FrameDetector;
pub use registry::{ModelRegistry, SharedBackend};
pub use result::Detection;
