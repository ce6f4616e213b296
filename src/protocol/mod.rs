//! Wire protocol shared by client and server
//!
//! This module provides:
//! - Encode functions for every frame format
//! - Tagged-variant classifiers for both traffic directions

pub mod frame;

// Re-export commonly used types
pub use frame::{ClientFrame, ServerFrame, MEMBER_LIST_MARKER, PM_PREFIX, READ_BUFFER_SIZE};
