/// State management module
///
/// This module handles all application state, including:
/// - The saved-image gallery and settings database (library.rs)
/// - Shared data structures (data.rs)
/// - Transform parameters (edit.rs)
/// - The transform session for the image being edited (session.rs)

pub mod data;
pub mod edit;
pub mod library;
pub mod session;
