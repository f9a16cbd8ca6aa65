pub mod reference;
pub mod treatment;

pub use reference::ReferenceLibrary;
pub use treatment::TreatmentGuide;
