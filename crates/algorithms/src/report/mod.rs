//! Result records and their persistence
//!
//! - **result**: `AnalysisResult`, `ErrorReport`, `SessionId` and the
//!   assembler that stamps and encodes a finished analysis
//! - **store**: the `ResultStore` seam with JSON-file and in-memory backends

pub mod result;
pub mod store;

pub use result::{AnalysisResult, ErrorReport, ResultAssembler, SessionId, Status};
pub use store::{JsonFileStore, MemoryStore, ResultStore};
