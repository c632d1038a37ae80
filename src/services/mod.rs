pub mod field_mapper;
pub mod observer;
pub mod operator_gate;
pub mod session_controller;

pub use field_mapper::FieldMapper;
pub use observer::{EventLevel, ObserverEvent, RunObserver, TracingObserver};
pub use operator_gate::{ConsoleGate, OperatorGate};
pub use session_controller::{PageContext, SessionController};
