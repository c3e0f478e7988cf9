//! Metadata assembly for a single logging decision.
//!
//! # Design
//! - The sampling configuration and deployment tags are owned by the logger and always
//!   injected; whatever the caller put in those fields is discarded.
//! - Tags are stored once behind an `Arc` and copied into each snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{LogMetadata, SamplingConfig};

/// Builds immutable metadata snapshots from caller-supplied partial metadata.
#[derive(Debug, Clone)]
pub struct MetadataAssembler {
    sampling_config: SamplingConfig,
    deployment_tags: Arc<[String]>,
}

impl MetadataAssembler {
    /// Create an assembler injecting `sampling_config` and `deployment_tags`.
    ///
    /// Duplicate tags are dropped; the first occurrence keeps its position.
    #[must_use]
    pub fn new<I, S>(sampling_config: SamplingConfig, deployment_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sampling_config,
            deployment_tags: dedup_tags(deployment_tags).into(),
        }
    }

    /// Sampling configuration injected into every snapshot.
    #[must_use]
    pub const fn sampling_config(&self) -> SamplingConfig {
        self.sampling_config
    }

    /// Deployment tags injected into every snapshot.
    #[must_use]
    pub fn deployment_tags(&self) -> &[String] {
        &self.deployment_tags
    }

    /// Complete `partial` with the configured sampling config and tags.
    #[must_use]
    pub fn assemble(&self, partial: &LogMetadata) -> LogMetadata {
        LogMetadata {
            model_spec: partial.model_spec.clone(),
            sampling_config: self.sampling_config,
            deployment_tags: self.deployment_tags.to_vec(),
        }
    }
}

fn dedup_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(Into::into)
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSpec;

    #[test]
    fn assemble_overrides_caller_sampling_and_tags() {
        let assembler = MetadataAssembler::new(SamplingConfig::new(0.5), ["serve", "tpu"]);
        let partial = LogMetadata {
            model_spec: ModelSpec::new("model").with_version(3),
            sampling_config: SamplingConfig::new(0.9),
            deployment_tags: vec!["forged".to_string()],
        };

        let metadata = assembler.assemble(&partial);
        assert_eq!(metadata.model_spec, ModelSpec::new("model").with_version(3));
        assert_eq!(metadata.sampling_config, SamplingConfig::new(0.5));
        assert_eq!(metadata.deployment_tags, vec!["serve", "tpu"]);
    }

    #[test]
    fn duplicate_tags_keep_first_position() {
        let assembler =
            MetadataAssembler::new(SamplingConfig::always(), ["tpu", "serve", "tpu", "gpu"]);
        assert_eq!(assembler.deployment_tags(), ["tpu", "serve", "gpu"]);
    }

    #[test]
    fn empty_tags_clear_caller_tags() {
        let assembler = MetadataAssembler::new(SamplingConfig::always(), Vec::<String>::new());
        let partial = LogMetadata {
            deployment_tags: vec!["serve".to_string()],
            ..LogMetadata::default()
        };
        assert!(assembler.assemble(&partial).deployment_tags.is_empty());
    }
}
