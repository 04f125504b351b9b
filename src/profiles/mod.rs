//! Profiles: the inference-facing entry points that turn raw frame/model
//! output into sketch updates and, when a threshold trips, a saved sample.
//!
//! Per the error handling design, construction (`Config` loading, directory
//! creation, saver/uploader wiring) is fallible and returns
//! `Result<_, TelemetryError>`; the hot-path entry points (`profile`,
//! `log_*`) return `()` - a domain error there is logged and the update is
//! skipped, never propagated to the inference caller.

mod custom;
mod image;
mod model;
mod sampling;
mod tracker;

pub use custom::CustomProfile;
pub use image::ImageProfile;
pub use model::ModelProfile;
pub use sampling::SamplingProfile;
pub use tracker::TrackerProfile;
