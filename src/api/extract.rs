//! Form bodies shared by the native and OpenAI-compatible endpoints

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// A file part of a multipart body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

/// Text and file fields of a multipart or urlencoded form.
///
/// Empty text values read as absent since HTML forms submit every field.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    text: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormFields {
    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.text.insert(name.into(), value.into());
    }

    pub fn insert_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.insert(name.into(), file);
    }

    /// Trimmed, non-empty text value
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// Parse a text value; absent or empty is `None`, unparsable is a 400
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.text(name)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| AppError::InvalidRequest(format!("Invalid value for '{}': {}", name, value)))
            })
            .transpose()
    }
}

/// `true` when the request declares a JSON body
pub fn is_json(request: &Request) -> bool {
    content_type(request).starts_with("application/json")
}

fn content_type(request: &Request) -> String {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        if content_type(&req).starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
            read_multipart(multipart).await
        } else {
            let Form(text) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
            Ok(Self {
                text,
                files: HashMap::new(),
            })
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormFields> {
    let mut fields = FormFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Invalid multipart data: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Error reading field '{}': {}", name, e)))?;

        if file_name.is_some() {
            fields.insert_file(
                name,
                UploadedFile {
                    file_name,
                    data: data.to_vec(),
                },
            );
        } else {
            let value = String::from_utf8(data.to_vec())
                .map_err(|_| AppError::InvalidRequest(format!("Field '{}' is not valid UTF-8", name)))?;
            fields.insert_text(name, value);
        }
    }

    Ok(fields)
}
