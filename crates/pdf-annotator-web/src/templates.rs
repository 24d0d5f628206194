//! Askama templates.
//!
//! - `base.html` - Common layout with the stylesheet
//! - `index.html` - The upload form, optionally with a rejection message

use askama::Template;
use askama_web::WebTemplate;
use pdf_annotator_core::{LayoutOption, PageLayout, layout_options};

/// Upload form.
///
/// Re-rendered with `message` set when a submission is rejected, keeping the
/// names and layout the user entered.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub message: Option<String>,
    pub names: String,
    pub layouts: Vec<LayoutOption>,
    /// Value of the checked layout radio
    pub selected: u8,
}

impl IndexTemplate {
    /// Empty form with `layout` preselected.
    pub fn new(layout: PageLayout) -> Self {
        Self {
            message: None,
            names: String::new(),
            layouts: layout_options(),
            selected: layout.id(),
        }
    }

    /// Form showing `message`, refilled with what the user submitted.
    pub fn rejected(message: String, names: String, selected: u8) -> Self {
        Self {
            message: Some(message),
            names,
            layouts: layout_options(),
            selected,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_default_layout() {
        let html = IndexTemplate::new(PageLayout::Grouped).render().unwrap();
        assert!(html.contains(r#"value="2" checked"#));
        assert!(!html.contains(r#"value="1" checked"#));
        assert!(!html.contains("role=\"alert\""));
    }

    #[test]
    fn test_rejected_keeps_input_and_escapes() {
        let html = IndexTemplate::rejected(
            "Must input names".to_string(),
            "<b>Kitty</b>".to_string(),
            1,
        )
        .render()
        .unwrap();
        assert!(html.contains("Must input names"));
        assert!(html.contains("&lt;b&gt;Kitty&lt;/b&gt;"));
        assert!(html.contains(r#"value="1" checked"#));
    }
}
