//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration of a multi-resolution registration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Number of pyramid levels; level `l` works on the full size divided by `2^l`.
    pub mg_levels: usize,
    /// Frame of a series this run belongs to. Selects the data pool keys.
    pub frame_index: Option<usize>,
    /// Jointly normalize the intensities of both images before `run_images`.
    pub normalize_intensities: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            mg_levels: 3,
            frame_index: None,
            normalize_intensities: true,
        }
    }
}

impl RegistrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of pyramid levels.
    pub fn with_mg_levels(mut self, levels: usize) -> Self {
        self.mg_levels = levels;
        self
    }

    /// Register frame `index` of a series.
    pub fn with_frame_index(mut self, index: usize) -> Self {
        self.frame_index = Some(index);
        self
    }

    /// Enable or disable joint intensity normalization.
    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalize_intensities = enabled;
        self
    }

    /// Pool key of the study image.
    pub fn source_key(&self) -> String {
        match self.frame_index {
            Some(idx) => format!("src{}.@", idx),
            None => "src.@".to_string(),
        }
    }

    /// Pool key of the reference image.
    pub fn reference_key(&self) -> String {
        match self.frame_index {
            Some(idx) => format!("ref{}.@", idx),
            None => "ref.@".to_string(),
        }
    }
}
