//! The fixed research workflow.
//!
//! This module provides:
//! - `ResearchPhase`, one static record per step of the workflow
//! - `OutputDocument`, the documents shown in the output viewer
//! - `dashboard_status()`, which derives progress from files on disk
//!
//! Phases carry no behaviour of their own. The UI reads them to decide which
//! prompt to show and which output to expect next.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::files;
use crate::paths::{CORPUS_DIR, OUTPUTS_DIR, SETTINGS_DIR, TEMPLATE_DIR};

/// Identifier of the corpus-management phase, whose completion depends on
/// uploaded PDFs rather than an output file.
pub const CORPUS_PHASE_ID: &str = "corpus";

/// A single step of the research workflow.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ResearchPhase {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    /// Prompt file relative to the project root, if the phase runs an agent
    pub prompt_file: Option<&'static str>,
    /// File name whose presence marks the phase complete
    pub output_file: &'static str,
}

impl ResearchPhase {
    /// True when this phase is driven by an agent prompt.
    pub fn runs_agent(&self) -> bool {
        self.prompt_file.is_some()
    }
}

pub const PHASES: &[ResearchPhase] = &[
    ResearchPhase {
        id: CORPUS_PHASE_ID,
        label: "Manage Corpus",
        description: "Upload and organize your research papers.",
        prompt_file: None,
        output_file: "corpus",
    },
    ResearchPhase {
        id: "0",
        label: "Project Settings",
        description: "Define screening criteria and project settings.",
        prompt_file: None,
        output_file: "screening-criteria-template.md",
    },
    ResearchPhase {
        id: "1",
        label: "Phase 1: Screening",
        description: "Identify relevant papers from your corpus.",
        prompt_file: Some("quick-start/phase1.md"),
        output_file: "literature-screening-matrix.md",
    },
    ResearchPhase {
        id: "2",
        label: "Phase 2: Extraction",
        description: "Extract standardized metadata and findings.",
        prompt_file: Some("quick-start/phase2.md"),
        output_file: "literature-extraction-matrix.md",
    },
    ResearchPhase {
        id: "3",
        label: "Phase 3: Structure",
        description: "Generate argument structure and outline.",
        prompt_file: Some("quick-start/phase3.md"),
        output_file: "literature-review-outline.md",
    },
    ResearchPhase {
        id: "4",
        label: "Phase 4: Drafting",
        description: "Write the literature review draft.",
        prompt_file: Some("quick-start/phase4.md"),
        output_file: "literature-review-draft.md",
    },
    ResearchPhase {
        id: "4.5",
        label: "Phase 4.5: Integrity",
        description: "Validate citations and prevent hallucinations.",
        prompt_file: Some("quick-start/phase4.5.md"),
        output_file: "citation-integrity-report.md",
    },
    ResearchPhase {
        id: "6",
        label: "Phase 6: Contributions",
        description: "Frame theoretical and practical implications.",
        prompt_file: Some("quick-start/phase6.md"),
        output_file: "research-contributions-implications.md",
    },
    ResearchPhase {
        id: "7",
        label: "Phase 7: Validation",
        description: "Cross-phase consistency check.",
        prompt_file: Some("quick-start/phase7.md"),
        output_file: "cross-phase-validation-report.md",
    },
];

/// Look up a phase by id.
pub fn get_phase(id: &str) -> Option<&'static ResearchPhase> {
    PHASES.iter().find(|p| p.id == id)
}

/// A generated document listed in the output viewer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct OutputDocument {
    pub id: &'static str,
    pub label: &'static str,
    /// Path relative to the project root
    pub path: &'static str,
}

pub const OUTPUT_DOCUMENTS: &[OutputDocument] = &[
    OutputDocument {
        id: "screening",
        label: "Screening Matrix",
        path: "outputs/literature-screening-matrix.md",
    },
    OutputDocument {
        id: "extraction",
        label: "Extraction Matrix",
        path: "outputs/literature-extraction-matrix.md",
    },
    OutputDocument {
        id: "synthesis",
        label: "Synthesis Matrix",
        path: "outputs/literature-synthesis-matrix.md",
    },
    OutputDocument {
        id: "outline",
        label: "Review Outline",
        path: "outputs/literature-review-outline.md",
    },
    OutputDocument {
        id: "draft",
        label: "Review Draft",
        path: "outputs/literature-review-draft.md",
    },
    OutputDocument {
        id: "citation",
        label: "Citation Report",
        path: "outputs/citation-integrity-report.md",
    },
    OutputDocument {
        id: "contributions",
        label: "Contributions",
        path: "outputs/research-contributions-implications.md",
    },
    OutputDocument {
        id: "validation",
        label: "Cross-Phase Validation",
        path: "outputs/cross-phase-validation-report.md",
    },
];

/// An output document together with whether it has been generated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutputStatus {
    #[serde(flatten)]
    pub document: OutputDocument,
    pub exists: bool,
}

pub fn output_statuses(root: &Path) -> Vec<OutputStatus> {
    OUTPUT_DOCUMENTS
        .iter()
        .map(|doc| OutputStatus {
            document: *doc,
            exists: root.join(doc.path).is_file(),
        })
        .collect()
}

/// Progress summary shown on the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardStatus {
    pub corpus_count: usize,
    pub completed_phases: Vec<&'static str>,
    /// First incomplete phase, or the last phase once everything is done
    pub current_phase: &'static str,
    pub all_complete: bool,
}

/// Directories searched for phase output files.
const OUTPUT_SEARCH_DIRS: &[&str] = &[OUTPUTS_DIR, SETTINGS_DIR, TEMPLATE_DIR];

/// Derive workflow progress from the project directories.
pub fn dashboard_status(root: &Path) -> DashboardStatus {
    let corpus_count = files::count_pdfs(&root.join(CORPUS_DIR));
    let present = present_files(root);

    let completed: Vec<&'static str> = PHASES
        .iter()
        .filter(|phase| {
            if phase.id == CORPUS_PHASE_ID {
                corpus_count > 0
            } else {
                present.contains(phase.output_file)
            }
        })
        .map(|phase| phase.id)
        .collect();

    let next = PHASES.iter().find(|phase| !completed.contains(&phase.id));
    let current_phase = next
        .or(PHASES.last())
        .map(|phase| phase.id)
        .unwrap_or(CORPUS_PHASE_ID);

    DashboardStatus {
        corpus_count,
        completed_phases: completed,
        current_phase,
        all_complete: next.is_none(),
    }
}

fn present_files(root: &Path) -> HashSet<String> {
    OUTPUT_SEARCH_DIRS
        .iter()
        .filter_map(|dir| std::fs::read_dir(root.join(dir)).ok())
        .flatten()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect()
}
