//! UI 组件模块
//!
//! 包含各个界面复用的 UI 组件。

pub mod peer_list;
pub mod text_input;
pub mod transcript;

pub use peer_list::{PeerItem, PeerList, PeerListState};
pub use text_input::{InputBox, TextInputState};
pub use transcript::{Transcript, TranscriptEntry, TranscriptState};
