//! Process-lifetime caches: indexed videos and chat sessions.

mod policy;
mod session;
mod video_index;

pub use policy::{EvictionPolicy, MemoTable};
pub use session::{SessionHistoryStore, SharedHistory};
pub use video_index::{IndexLookup, IndexState, VideoIndexCache, VideoIndexEntry};

#[cfg(test)]
pub(crate) use video_index::testing;
