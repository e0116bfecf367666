/// State management module
///
/// This module handles all board state, including:
/// - Database connections and queries (library.rs)
/// - Shared data structures (data.rs)
/// - Collaborator traits the core reads through (source.rs)

pub mod data;
pub mod library;
pub mod source;
