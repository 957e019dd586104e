//! Producer-side form input and validation.
//!
//! Size fields arrive as free text; they must parse as finite numbers before
//! a record is built. Nothing here touches the network.

use crate::config::Catalog;
use crate::product::{FolderData, ProductRecord, Size};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Length, Width, and Height must be numbers!")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("Unknown model '{0}'")]
    UnknownModel(String),
    #[error("Unknown brand '{0}'")]
    UnknownBrand(String),
}

/// Raw product input, as a form or command line supplies it
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub model: String,
    pub brand: String,
    pub length: String,
    pub width: String,
    pub height: String,
    /// Relative paths of uploaded files, if a folder was attached
    pub files: Vec<String>,
}

impl ProductForm {
    /// Check the input against the catalog and build the record to send.
    pub fn validate(&self, catalog: &Catalog) -> Result<ProductRecord, ValidationError> {
        if !catalog.has_model(&self.model) {
            return Err(ValidationError::UnknownModel(self.model.clone()));
        }
        if !catalog.has_brand(&self.brand) {
            return Err(ValidationError::UnknownBrand(self.brand.clone()));
        }

        let size = Size {
            length: parse_dimension("Length", &self.length)?,
            width: parse_dimension("Width", &self.width)?,
            height: parse_dimension("Height", &self.height)?,
        };

        Ok(ProductRecord {
            model: self.model.clone(),
            brand: self.brand.clone(),
            size,
            folder_data: FolderData::from_paths(&self.files),
        })
    }
}

fn parse_dimension(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    let number: f64 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber {
            field,
            value: value.to_string(),
        })?;

    if number.is_finite() {
        Ok(number)
    } else {
        Err(ValidationError::NonFinite { field })
    }
}
