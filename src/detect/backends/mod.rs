pub mod contour;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use contour::ContourBackend;
pub use stub::ScriptedBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
