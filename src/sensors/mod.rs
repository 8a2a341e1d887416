pub mod service;

pub use service::{simulated_reading, IngestError, ReadingInput, ReadingTarget, SensorService};
