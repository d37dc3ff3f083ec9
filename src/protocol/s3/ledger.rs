//! Phase ledger: ordered record of each upload step's outcome

use super::error::S3Error;
use serde::Serialize;
use std::fmt;

/// Step of the multipart upload protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Init,
    PartUpload,
    Completion,
    Verification,
}

impl UploadStage {
    /// Human-readable name used in summaries
    pub fn description(&self) -> &'static str {
        match self {
            UploadStage::Init => "upload initialization",
            UploadStage::PartUpload => "part upload",
            UploadStage::Completion => "upload completion",
            UploadStage::Verification => "checksum verification",
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One recorded step
#[derive(Debug, Clone, Serialize)]
pub struct UploadPhase {
    pub stage: UploadStage,
    pub part_number: Option<i32>,
    pub success: bool,
    pub message: Option<String>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<S3Error>,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<S3Error>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl UploadPhase {
    fn started(stage: UploadStage, part_number: Option<i32>) -> Self {
        Self {
            stage,
            part_number,
            success: false,
            message: None,
            error: None,
        }
    }

    /// Stage description including the part number, if any
    pub fn description(&self) -> String {
        match self.part_number {
            Some(n) => format!("{} (Part {})", self.stage.description(), n),
            None => self.stage.description().to_string(),
        }
    }

    /// One-line summary: `{✓|✗} {description}[: message][ (error)]`
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} {}",
            if self.success { "✓" } else { "✗" },
            self.description()
        );
        if let Some(message) = &self.message {
            line.push_str(": ");
            line.push_str(message);
        }
        if !self.success {
            if let Some(error) = &self.error {
                line.push_str(&format!(" ({})", error));
            }
        }
        line
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Append-only log of phase outcomes with at most one phase in flight
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseLedger {
    phases: Vec<UploadPhase>,
    #[serde(skip)]
    current: Option<UploadPhase>,
}

impl PhaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin recording a phase. An unfinished previous phase is dropped unrecorded.
    pub fn start_phase(&mut self, stage: UploadStage, part_number: Option<i32>) {
        self.current = Some(UploadPhase::started(stage, part_number));
    }

    /// Close the in-flight phase and append it. No-op when nothing is in flight.
    pub fn end_phase(
        &mut self,
        success: bool,
        message: Option<String>,
        error: Option<S3Error>,
    ) -> Option<&UploadPhase> {
        let mut phase = self.current.take()?;
        phase.success = success;
        phase.message = message;
        phase.error = error;
        self.phases.push(phase);
        self.phases.last()
    }

    /// Close the in-flight phase as successful
    pub fn succeed(&mut self, message: impl Into<String>) -> Option<&UploadPhase> {
        self.end_phase(true, Some(message.into()), None)
    }

    /// Close the in-flight phase as failed and return a copy of it
    ///
    /// With nothing in flight a failed Init phase is recorded, so a failure is
    /// never reported without a phase to carry it.
    pub fn fail(&mut self, message: impl Into<String>, error: Option<S3Error>) -> UploadPhase {
        if self.current.is_none() {
            self.start_phase(UploadStage::Init, None);
        }
        let phase = self.end_phase(false, Some(message.into()), error).cloned();
        phase.unwrap_or_else(|| UploadPhase::started(UploadStage::Init, None))
    }

    /// Phase currently being recorded, if any
    pub fn current(&self) -> Option<&UploadPhase> {
        self.current.as_ref()
    }

    pub fn phases(&self) -> &[UploadPhase] {
        &self.phases
    }

    pub fn failed_phases(&self) -> impl Iterator<Item = &UploadPhase> {
        self.phases.iter().filter(|p| !p.success)
    }

    /// True when every recorded phase succeeded and nothing is in flight
    pub fn is_success(&self) -> bool {
        self.current.is_none() && self.phases.iter().all(|p| p.success)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.phases.iter().map(UploadPhase::summary).collect()
    }
}
