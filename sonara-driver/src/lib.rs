pub mod error;
/// Aperture bit masks and their wire encoding.
pub mod mask;
/// Sequence validation and materialization.
pub mod normalize;
/// The OEM module command set.
pub mod oem;
/// Transmit aperture and delay planning.
pub mod plan;
/// Lowering of a plan into OEM register writes.
pub mod program;
/// Time-gain-compensation curve construction.
pub mod tgc;

pub use error::{OemError, ProgramError, SequenceError};
pub use mask::Mask;
pub use normalize::{normalize, NormalizedSequence};
pub use oem::Oem;
pub use plan::{plan, Plan};
pub use program::{program, FiringSchedule};
