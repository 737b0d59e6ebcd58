//! Processing pipeline for chaining image operations
//!
//! A [`TransformChain`] is resolved from a task's raw descriptors before any
//! pixel work starts, so a chain containing an unknown operation is rejected
//! without running a single step. [`render`] then decodes the source, runs the
//! steps in order on a blocking thread, converts the pixel mode for the target
//! encoder and encodes the result.

use bytes::Bytes;
use image::DynamicImage;
use pictor_core::models::ImageMetadata;
use serde_json::Value;
use std::time::Instant;

use crate::codec::{self, OutputFormat};
use crate::error::TransformError;
use crate::operation::{Operation, OperationRegistry, ResolvedStep};

/// Ordered, validated list of steps
#[derive(Debug, Clone, Default)]
pub struct TransformChain {
    steps: Vec<ResolvedStep>,
}

impl TransformChain {
    /// Resolve every descriptor; the first invalid one aborts.
    pub fn resolve(registry: &OperationRegistry, descriptors: &[Value]) -> Result<Self, TransformError> {
        let steps = descriptors
            .iter()
            .map(|descriptor| registry.resolve(descriptor))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[ResolvedStep] {
        &self.steps
    }

    /// Format selected by the last `change_format` step, if any
    pub fn requested_format(&self) -> Result<Option<OutputFormat>, TransformError> {
        match self
            .steps
            .iter()
            .rev()
            .find(|step| step.operation == Operation::ChangeFormat)
        {
            Some(step) => Operation::requested_format(&step.params()).map(Some),
            None => Ok(None),
        }
    }

    /// Run every step in list order, moving the bitmap through each.
    pub fn apply(&self, img: DynamicImage) -> Result<DynamicImage, TransformError> {
        let mut img = img;
        for (index, step) in self.steps.iter().enumerate() {
            tracing::debug!(step = index, operation = %step.operation, "Applying transformation");
            img = step.apply(img)?;
        }
        Ok(img)
    }
}

/// Where the output format comes from, in precedence order
#[derive(Debug, Clone, Default)]
pub struct FormatPreference {
    /// Format set on the task itself
    pub explicit: Option<String>,
    /// Format declared when the source was uploaded
    pub declared: Option<String>,
}

impl FormatPreference {
    /// Task format, then the chain's `change_format`, then the source's declared
    /// format, then the format the source bytes were sniffed as.
    pub fn resolve(
        &self,
        chain: &TransformChain,
        detected: Option<image::ImageFormat>,
    ) -> Result<OutputFormat, TransformError> {
        if let Some(explicit) = self.explicit.as_deref().filter(|s| !s.trim().is_empty()) {
            return OutputFormat::parse(explicit);
        }
        if let Some(requested) = chain.requested_format()? {
            return Ok(requested);
        }
        if let Some(declared) = self.declared.as_deref().filter(|s| !s.trim().is_empty()) {
            return OutputFormat::parse(declared).map_err(|_| {
                TransformError::FormatUnresolved(format!(
                    "source format '{}' cannot be written",
                    declared
                ))
            });
        }
        detected
            .and_then(OutputFormat::from_image_format)
            .ok_or_else(|| {
                TransformError::FormatUnresolved(
                    "no format requested and the source format is unknown".to_string(),
                )
            })
    }
}

/// Encoded output of a chain
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub data: Bytes,
    pub format: OutputFormat,
    pub metadata: ImageMetadata,
}

/// Decode `source`, run `chain`, and encode in the resolved format.
///
/// CPU-bound work runs on the blocking pool.
pub async fn render(
    source: Bytes,
    chain: TransformChain,
    preference: FormatPreference,
    jpeg_quality: u8,
) -> Result<RenderedImage, TransformError> {
    tokio::task::spawn_blocking(move || render_blocking(&source, &chain, &preference, jpeg_quality))
        .await
        .map_err(|e| TransformError::failed(format!("processing thread failed: {}", e)))?
}

pub fn render_blocking(
    source: &[u8],
    chain: &TransformChain,
    preference: &FormatPreference,
    jpeg_quality: u8,
) -> Result<RenderedImage, TransformError> {
    let started = Instant::now();
    let decoded = codec::decode(source)?;
    let format = preference.resolve(chain, decoded.detected_format)?;

    let transformed = chain.apply(decoded.image)?;
    let prepared = codec::prepare_for_format(transformed, format);
    let encoded = codec::encode(&prepared, format, jpeg_quality)?;
    let metadata = codec::extract_metadata(&prepared, format, encoded.len());

    tracing::debug!(
        steps = chain.len(),
        format = %format,
        width = metadata.width,
        height = metadata.height,
        size = metadata.size,
        duration_ms = started.elapsed().as_millis() as u64,
        "Rendered transformation chain"
    );

    Ok(RenderedImage {
        data: Bytes::from(encoded),
        format,
        metadata,
    })
}
