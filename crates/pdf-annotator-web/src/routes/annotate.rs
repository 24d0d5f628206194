//! Annotate route - form submission and PDF download.

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Multipart, multipart::MultipartError};
use bytes::Bytes;
use pdf_annotator_core::{NameList, PageLayout, SourceDocument};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::helpers::{CoreResultExt, ResultExt, RouteResult};
use crate::state::AppState;
use crate::templates::IndexTemplate;

/// Download name of every generated document.
const RESULT_FILENAME: &str = "result.pdf";

/// Form fields as submitted.
#[derive(Debug, Default)]
pub struct AnnotateForm {
    pub file_name: Option<String>,
    pub file: Bytes,
    pub names: String,
    pub layout: Option<String>,
}

/// A submission that passed validation.
#[derive(Debug)]
pub struct AnnotateRequest {
    pub pdf: Bytes,
    pub names: NameList,
    pub layout: PageLayout,
}

/// Why a submission was sent back to the form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormRejection {
    #[error("Must select PDF file first")]
    MissingFile,

    #[error("Uploaded file must be a PDF")]
    NotPdf,

    #[error("Must input names")]
    MissingNames,

    #[error("Invalid layout option")]
    InvalidLayout,
}

impl AnnotateForm {
    /// Collect the known fields; unknown ones are skipped.
    async fn read(multipart: &mut Multipart) -> RouteResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    form.file_name = field.file_name().map(str::to_string);
                    form.file = field.bytes().await.map_err(multipart_error)?;
                }
                "names" => form.names = field.text().await.map_err(multipart_error)?,
                "layout" => form.layout = Some(field.text().await.map_err(multipart_error)?),
                _ => debug!("Ignoring form field {:?}", name),
            }
        }

        Ok(form)
    }

    /// Check the fields in the order the form presents them.
    ///
    /// A missing or empty layout falls back to `default_layout`.
    pub fn validate(&self, default_layout: PageLayout) -> Result<AnnotateRequest, FormRejection> {
        if self.file.is_empty() {
            return Err(FormRejection::MissingFile);
        }

        let is_pdf = self
            .file_name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first())
            .is_some_and(|mime| mime == mime_guess::mime::APPLICATION_PDF);
        if !is_pdf {
            return Err(FormRejection::NotPdf);
        }

        let names = NameList::parse(&self.names);
        if names.is_empty() {
            return Err(FormRejection::MissingNames);
        }

        let layout = match self.layout.as_deref().map(str::trim) {
            None | Some("") => default_layout,
            Some(value) => value
                .parse::<PageLayout>()
                .map_err(|_| FormRejection::InvalidLayout)?,
        };

        Ok(AnnotateRequest {
            pdf: self.file.clone(),
            names,
            layout,
        })
    }

    /// Layout radio to check when the form is shown again.
    pub fn selected(&self, default_layout: PageLayout) -> u8 {
        self.layout
            .as_deref()
            .and_then(|value| value.parse::<PageLayout>().ok())
            .unwrap_or(default_layout)
            .id()
    }
}

fn multipart_error(e: MultipartError) -> (StatusCode, String) {
    (e.status(), e.body_text())
}

/// Stamp the submitted names onto the submitted PDF.
///
/// Invalid submissions re-render the form with a message (400). Valid ones
/// return `result.pdf` as an attachment.
pub async fn annotate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<Response> {
    let form = AnnotateForm::read(&mut multipart).await?;
    let default_layout = state.config.default_layout;

    let request = match form.validate(default_layout) {
        Ok(request) => request,
        Err(rejection) => {
            debug!("Rejected submission: {}", rejection);
            let selected = form.selected(default_layout);
            let template = IndexTemplate::rejected(rejection.to_string(), form.names, selected);
            return Ok((StatusCode::BAD_REQUEST, template).into_response());
        }
    };

    let file_name = form.file_name.unwrap_or_default();
    info!(
        "Annotating {} ({} bytes) for {} names",
        file_name,
        request.pdf.len(),
        request.names.len()
    );

    // Parsing and stamping are CPU-bound
    let worker_state = Arc::clone(&state);
    let output = tokio::task::spawn_blocking(move || {
        let source = SourceDocument::from_bytes(request.pdf.to_vec())?;
        worker_state
            .annotator
            .annotate(&source, &request.names, request.layout)
    })
    .await
    .map_err(|e| {
        error!("Annotation task panicked: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Annotation failed".to_string(),
        )
    })?
    .or_status()?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{RESULT_FILENAME}\""),
        )
        .body(Body::from(output))
        .or_internal_error()
}
