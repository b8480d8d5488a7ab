pub mod relocate;
pub mod scan;

pub use relocate::{RelocateError, RelocationOutcome, Relocator};
pub use scan::{FiredRepeat, ScanController, ScanReport};
