pub mod config;
pub mod detect;
pub mod display;
pub mod error;
pub mod overlay;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod voice;

pub use error::{Error, Result};

// 重新导出常用类型和函数
pub use detect::{BoundingBox, Detection, DetectionSet, FilteredDetections, filter};
pub use detect::{DetectionPolicy, DetectionProvider, Inference, YoloDetector};
pub use detect::{load_image, load_model};
pub use overlay::{OverlayStyle, render};
pub use registry::{COCO_CLASSES, Category, CategoryId, CategoryRegistry};
pub use resolve::{Resolution, resolve};
pub use session::{Feedback, LoopState, Session, SessionStats};
