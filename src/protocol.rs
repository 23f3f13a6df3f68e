//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{self, PeriodOption};
use crate::domain::{GeneratedContent, Grade, Level, Mode, Specialization, Subject};
use crate::navigation::{SelectionState, Session, ViewState};

/// User intents that drive a session. Same shape over HTTP and WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    SelectLevel { level: Level },
    SelectGrade { grade: u8 },
    SelectMode { mode: Mode },
    SelectSpecialization { id: String },
    SelectSubject { id: String },
    SelectPeriod { period: String },
    SubmitTopic { topic: String },
    ToggleSolution,
    Back,
    Reset,
}

impl Intent {
    /// Intents that end in a generation call.
    pub fn generates(&self) -> bool {
        matches!(self, Intent::SelectPeriod { .. } | Intent::SubmitTopic { .. })
    }
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Intent { intent: Intent },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    /// A generation request was accepted; a `session` message follows when it resolves.
    Loading,
    Session { session: SessionOut },
    Error { message: String },
}

#[derive(Debug, Serialize)]
pub struct LevelOption {
    pub id: Level,
    pub label: &'static str,
}

const MODES: &[Mode] = &[Mode::Lesson, Mode::Review];

/// Entries of the picker the current view shows.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Options {
    None,
    Levels(Vec<LevelOption>),
    Grades(&'static [Grade]),
    Modes(&'static [Mode]),
    Specializations(&'static [Specialization]),
    Subjects(&'static [Subject]),
    Periods(&'static [PeriodOption]),
}

/// Snapshot of a session for the presentation layer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub id: Uuid,
    pub view: ViewState,
    pub selection: SelectionState,
    pub level_label: Option<&'static str>,
    pub options: Options,
    pub loading: bool,
    pub show_solution: bool,
    pub notice: Option<String>,
    pub content: Option<GeneratedContent>,
}

/// Convert a `Session` (internal) to the public snapshot.
pub fn to_out(s: &Session) -> SessionOut {
    let level = s.selection().level;
    let options = match s.view() {
        ViewState::Home => Options::Levels(
            Level::ALL
                .into_iter()
                .map(|l| LevelOption { id: l, label: catalog::level_label(l) })
                .collect(),
        ),
        ViewState::GradeSelection => level.map_or(Options::None, |l| Options::Grades(catalog::grades(l))),
        ViewState::ModeSelection => Options::Modes(MODES),
        ViewState::SpecializationSelection => Options::Specializations(catalog::specializations()),
        ViewState::SubjectSelection => Options::Subjects(s.subjects()),
        ViewState::PeriodSelection => Options::Periods(catalog::period_options()),
        ViewState::LessonSearch | ViewState::ResultView => Options::None,
    };

    SessionOut {
        id: s.id(),
        view: s.view(),
        selection: s.selection().clone(),
        level_label: level.map(catalog::level_label),
        options,
        loading: s.is_loading(),
        show_solution: s.show_solution(),
        notice: s.notice().map(str::to_string),
        content: s.content().cloned(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generation: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
