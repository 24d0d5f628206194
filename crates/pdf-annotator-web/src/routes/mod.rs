//! HTTP route handlers for the PDF annotator web application.
//!
//! The form page is an Askama template; a successful submission returns the
//! stamped PDF as a download.

mod annotate;
mod pages;

pub use annotate::annotate;
pub use pages::{health, index};
