//! Text-level format handling for DSL sources.
//!
//! - [`header`]: `#`-directives at the top of the file
//! - [`language`]: language name to numeric id resolution
//! - [`comments`]: `{{...}}` comment stripping

pub mod comments;
pub mod header;
pub mod language;
