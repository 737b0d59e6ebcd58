//! Operation catalogue and the registry that validates step descriptors.

use image::DynamicImage;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::codec::OutputFormat;
use crate::error::TransformError;
use crate::image::{
    ImageFilters, ImageOrientation, ImageResize, Watermark, WatermarkConfig, DEFAULT_BLUR_SIGMA,
};
use crate::params::Params;

/// Every transformation the pipeline knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Crop,
    Resize,
    Rotate,
    Watermark,
    Flip,
    Mirror,
    Grayscale,
    Sepia,
    Blur,
    ApplyFilter,
    /// Selects the output format; pixels are untouched.
    ChangeFormat,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::Crop,
        Operation::Resize,
        Operation::Rotate,
        Operation::Watermark,
        Operation::Flip,
        Operation::Mirror,
        Operation::Grayscale,
        Operation::Sepia,
        Operation::Blur,
        Operation::ApplyFilter,
        Operation::ChangeFormat,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Crop => "crop",
            Operation::Resize => "resize",
            Operation::Rotate => "rotate",
            Operation::Watermark => "watermark",
            Operation::Flip => "flip",
            Operation::Mirror => "mirror",
            Operation::Grayscale => "grayscale",
            Operation::Sepia => "sepia",
            Operation::Blur => "blur",
            Operation::ApplyFilter => "apply_filter",
            Operation::ChangeFormat => "change_format",
        }
    }

    /// Case-insensitive lookup of a built-in operation name
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|op| op.name() == normalized)
    }

    /// Run the operation. Each arm validates its own parameters.
    pub fn apply(self, img: DynamicImage, params: &Params<'_>) -> Result<DynamicImage, TransformError> {
        match self {
            Operation::Crop => ImageResize::crop(
                &img,
                params.require_u32("x")?,
                params.require_u32("y")?,
                params.require_u32("width")?,
                params.require_u32("height")?,
            ),
            Operation::Resize => ImageResize::resize(
                &img,
                params.require_u32("width")?,
                params.require_u32("height")?,
            ),
            Operation::Rotate => Ok(ImageOrientation::rotate(img, params.require_f64("degrees")?)),
            Operation::Watermark => {
                let text = params
                    .first_str(&["text", "watermark_text"])?
                    .ok_or_else(|| TransformError::invalid_param("watermark text must not be empty"))?;
                Watermark::apply(img, &WatermarkConfig::diagonal(text))
            }
            Operation::Flip => Ok(ImageOrientation::flip(img)),
            Operation::Mirror => Ok(ImageOrientation::mirror(img)),
            Operation::Grayscale => Ok(ImageFilters::grayscale(&img)),
            Operation::Sepia => Ok(ImageFilters::sepia(&img)),
            Operation::Blur => Ok(ImageFilters::blur(&img, DEFAULT_BLUR_SIGMA)),
            Operation::ApplyFilter => ImageFilters::apply_set(img, params),
            Operation::ChangeFormat => {
                Self::requested_format(params)?;
                Ok(img)
            }
        }
    }

    /// Target format named by a `change_format` step
    pub fn requested_format(params: &Params<'_>) -> Result<OutputFormat, TransformError> {
        let format = params
            .optional_str("format")?
            .ok_or_else(|| TransformError::invalid_param("change_format requires 'format'"))?;
        OutputFormat::parse(format)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// A descriptor that passed registry validation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    pub operation: Operation,
    pub params: Map<String, Value>,
}

impl ResolvedStep {
    pub fn params(&self) -> Params<'_> {
        Params::new(&self.params)
    }

    pub fn apply(&self, img: DynamicImage) -> Result<DynamicImage, TransformError> {
        self.operation.apply(img, &self.params())
    }
}

/// Set of operations this worker accepts.
///
/// Built once at start-up and handed to the orchestrator; individual
/// operations can be switched off by configuration.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    enabled: BTreeSet<Operation>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OperationRegistry {
    pub fn builtin() -> Self {
        Self {
            enabled: Operation::ALL.into_iter().collect(),
        }
    }

    /// Built-in registry minus the named operations.
    ///
    /// Unknown names are rejected so that a typo in configuration does not
    /// silently leave an operation enabled.
    pub fn without<S: AsRef<str>>(disabled: &[S]) -> Result<Self, TransformError> {
        let mut registry = Self::builtin();
        for name in disabled {
            let op = Operation::from_name(name.as_ref()).ok_or_else(|| {
                TransformError::InvalidTransformation(format!(
                    "cannot disable unknown operation '{}'",
                    name.as_ref()
                ))
            })?;
            registry.enabled.remove(&op);
        }
        Ok(registry)
    }

    pub fn is_enabled(&self, op: Operation) -> bool {
        self.enabled.contains(&op)
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.enabled.iter().map(|op| op.name()).collect()
    }

    /// Map an operation name to its implementation.
    pub fn validate(&self, name: &str) -> Result<Operation, TransformError> {
        Operation::from_name(name)
            .filter(|op| self.is_enabled(*op))
            .ok_or_else(|| {
                TransformError::InvalidTransformation(format!("unknown operation '{}'", name.trim()))
            })
    }

    /// Check the shape of one `{operation, params}` descriptor and resolve it.
    ///
    /// Parameter values are not inspected here; each operation validates its
    /// own when it runs.
    pub fn resolve(&self, descriptor: &Value) -> Result<ResolvedStep, TransformError> {
        let object = descriptor.as_object().ok_or_else(|| {
            TransformError::InvalidTransformation(
                "transformation descriptor must be an object".to_string(),
            )
        })?;

        let name = match object.get("operation") {
            Some(Value::String(name)) => name,
            Some(_) => {
                return Err(TransformError::InvalidTransformation(
                    "operation name must be a string".to_string(),
                ))
            }
            None => {
                return Err(TransformError::InvalidTransformation(
                    "transformation descriptor has no operation name".to_string(),
                ))
            }
        };
        let operation = self.validate(name)?;

        let params = match object.get("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(TransformError::invalid_param(format!(
                    "params of '{}' must be an object",
                    operation
                )))
            }
        };

        Ok(ResolvedStep { operation, params })
    }
}
