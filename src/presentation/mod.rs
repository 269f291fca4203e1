//! Wire formats, response rendering and html views.

pub mod formats;
pub mod render;
pub mod views;
