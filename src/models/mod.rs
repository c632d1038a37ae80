pub mod field;
pub mod loaders;
pub mod record;
pub mod run_result;

pub use field::{FieldAssignment, FieldKind, FieldPlan, MappingWarning};
pub use loaders::{source_from_config, CsvSource, RecordSource, SheetSource};
pub use record::{Batch, Record, REQUIRED_COLUMNS};
pub use run_result::{RecordOutcome, RecordReport, RunAbort, RunResult};
