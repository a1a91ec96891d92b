//! # Collection of Basic Data Structures
//!
//! - `storage`: Arena-based storage to deal with linked data structures.
//! - `linked_list`: Linked list implementation with arena-based storage.

pub mod linked_list;
pub mod storage;
