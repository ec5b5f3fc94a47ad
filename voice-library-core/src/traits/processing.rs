use std::path::Path;

use crate::models::record::ProcessSettings;

/// Opaque analysis returned by the processing service.
pub type AnalysisResult = serde_json::Value;

/// Upload-and-poll client for the transcription backend.
pub trait ProcessingClient: Send + Sync {
    fn process(&self, audio: &Path, settings: &ProcessSettings) -> Result<AnalysisResult, String>;
}

/// Stores finished analyses. The core does not own this storage.
pub trait AnalysisSink: Send + Sync {
    fn save_analysis(&self, result: &AnalysisResult, settings: &ProcessSettings) -> Result<(), String>;
}
