pub mod ccusage;
pub mod context;
pub mod git;
pub mod hook;
pub mod message;
pub mod session;

pub use ccusage::CcusageData;
pub use context::ContextData;
pub use git::{ChangeCounts, GitStatus};
pub use hook::HookJson;
pub use message::{MessageUsage, TranscriptLine};
pub use session::{SessionRecord, SpendSummary};
