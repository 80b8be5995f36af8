pub mod plan;
pub mod session;

pub use plan::{ChunkRange, ChunkRanges, TransferPlan, TransferStrategy};
pub use session::{SessionState, UploadSession};
