use serde::Serialize;
use sf_core::{DiagnosticCategory, DiagnosticSeverity};

/// Structural checks applied to a parsed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    NoNodes,
    MissingStart,
    MultipleStarts,
    StartFanOut,
    EndHasOutgoing,
    DuplicateRow,
    RowGap,
    DanglingEdge,
    MissingSwimlane,
    EmptySwimlane,
    DuplicateSwimlaneName,
    CrowdedReportRow,
    CrowdedSystemRow,
    DanglingRelation,
    DecisionBranches,
    Unreachable,
}

impl Rule {
    pub const ALL: [Self; 16] = [
        Self::NoNodes,
        Self::MissingStart,
        Self::MultipleStarts,
        Self::StartFanOut,
        Self::EndHasOutgoing,
        Self::DuplicateRow,
        Self::RowGap,
        Self::DanglingEdge,
        Self::MissingSwimlane,
        Self::EmptySwimlane,
        Self::DuplicateSwimlaneName,
        Self::CrowdedReportRow,
        Self::CrowdedSystemRow,
        Self::DanglingRelation,
        Self::DecisionBranches,
        Self::Unreachable,
    ];

    /// Stable identifier carried in [`sf_core::Diagnostic::rule_id`].
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::NoNodes => "V001",
            Self::MissingStart => "V002",
            Self::MultipleStarts => "V003",
            Self::StartFanOut => "V004",
            Self::EndHasOutgoing => "V005",
            Self::DuplicateRow => "V006",
            Self::RowGap => "V007",
            Self::DanglingEdge => "V008",
            Self::MissingSwimlane => "V009",
            Self::EmptySwimlane => "V010",
            Self::DuplicateSwimlaneName => "V011",
            Self::CrowdedReportRow => "V012",
            Self::CrowdedSystemRow => "V013",
            Self::DanglingRelation => "V014",
            Self::DecisionBranches => "V015",
            Self::Unreachable => "V016",
        }
    }

    #[must_use]
    pub const fn severity(self) -> DiagnosticSeverity {
        match self {
            Self::NoNodes
            | Self::MissingStart
            | Self::EndHasOutgoing
            | Self::DuplicateRow
            | Self::DanglingEdge
            | Self::CrowdedReportRow
            | Self::CrowdedSystemRow
            | Self::DanglingRelation => DiagnosticSeverity::Error,
            Self::MultipleStarts
            | Self::StartFanOut
            | Self::RowGap
            | Self::MissingSwimlane
            | Self::EmptySwimlane
            | Self::DuplicateSwimlaneName
            | Self::DecisionBranches
            | Self::Unreachable => DiagnosticSeverity::Warning,
        }
    }

    #[must_use]
    pub const fn category(self) -> DiagnosticCategory {
        match self {
            Self::DanglingEdge | Self::MissingSwimlane => DiagnosticCategory::Reference,
            Self::CrowdedReportRow | Self::CrowdedSystemRow | Self::DanglingRelation => {
                DiagnosticCategory::Relation
            }
            _ => DiagnosticCategory::Structure,
        }
    }
}
