//! Per-session navigation state machine.
//!
//! Flow:
//!   home → grade_selection → mode_selection → [specialization_selection] → subject_selection
//!        → period_selection (review) | lesson_search (lesson) → result_view
//!
//! Selections only change through the named transitions below, each of which checks the
//! current view and its prerequisites. Generation is split in two: `begin_*` validates,
//! marks the session as loading and returns the request to send; `finish` applies the
//! outcome. While loading, every other transition is refused with `NavError::Busy`.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::domain::{GeneratedContent, Grade, Level, Mode, ReviewPeriod, Specialization, Subject};
use crate::generation::{GenerationError, LessonRequest, ReviewRequest};

const LESSON_FAILURE_NOTICE: &str = "عذراً، حدث خطأ أثناء جلب الدروس.";
const REVIEW_FAILURE_NOTICE: &str = "خطأ أثناء جلب المراجعة";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
  Home,
  GradeSelection,
  ModeSelection,
  SpecializationSelection,
  SubjectSelection,
  PeriodSelection,
  LessonSearch,
  ResultView,
}

/// Rejected transition. None of these change the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
  #[error("expected view {expected:?}, session is in {actual:?}")]
  WrongView { expected: ViewState, actual: ViewState },
  #[error("unknown grade {0} for the selected level")]
  UnknownGrade(u8),
  #[error("unknown specialization '{0}'")]
  UnknownSpecialization(String),
  #[error("subject '{0}' is not offered for the current selection")]
  UnknownSubject(String),
  #[error("unknown review period '{0}'")]
  UnknownPeriod(String),
  #[error("lesson topic must not be empty")]
  EmptyTopic,
  #[error("missing required selection: {0}")]
  MissingSelection(&'static str),
  #[error("a generation request is already in flight")]
  Busy,
  #[error("no lesson solution to toggle")]
  NothingToToggle,
}

/// The user's position in the selection funnel.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelectionState {
  pub level: Option<Level>,
  pub grade: Option<Grade>,
  pub mode: Option<Mode>,
  pub specialization: Option<Specialization>,
  pub subject: Option<Subject>,
  pub period: Option<ReviewPeriod>,
  pub topic: Option<String>,
}

/// Committed to the selection only when the request succeeds.
#[derive(Clone, Debug, PartialEq)]
enum Pending {
  Lesson { topic: String },
  Review { period: ReviewPeriod },
}

#[derive(Debug)]
pub struct Session {
  id: Uuid,
  view: ViewState,
  selection: SelectionState,
  content: Option<GeneratedContent>,
  show_solution: bool,
  notice: Option<String>,
  pending: Option<Pending>,
}

impl Default for Session {
  fn default() -> Self {
    Self::new()
  }
}

impl Session {
  pub fn new() -> Self {
    Self {
      id: Uuid::new_v4(),
      view: ViewState::Home,
      selection: SelectionState::default(),
      content: None,
      show_solution: false,
      notice: None,
      pending: None,
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn view(&self) -> ViewState {
    self.view
  }

  pub fn selection(&self) -> &SelectionState {
    &self.selection
  }

  pub fn content(&self) -> Option<&GeneratedContent> {
    self.content.as_ref()
  }

  pub fn show_solution(&self) -> bool {
    self.show_solution
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.as_deref()
  }

  pub fn is_loading(&self) -> bool {
    self.pending.is_some()
  }

  /// Subjects offered by the subject picker. Empty (never an error) when the
  /// (level, specialization) key has no subject set.
  pub fn subjects(&self) -> &'static [Subject] {
    match self.selection.level {
      Some(level) => catalog::subjects(level, self.selection.specialization.map(|s| s.id)),
      None => &[],
    }
  }

  // --- forward transitions ---

  pub fn select_level(&mut self, level: Level) -> Result<(), NavError> {
    self.guard(ViewState::Home)?;
    self.selection.level = Some(level);
    self.go(ViewState::GradeSelection);
    Ok(())
  }

  pub fn select_grade(&mut self, grade_id: u8) -> Result<(), NavError> {
    self.guard(ViewState::GradeSelection)?;
    let level = self.selection.level.ok_or(NavError::MissingSelection("level"))?;
    let grade = catalog::grade(level, grade_id).ok_or(NavError::UnknownGrade(grade_id))?;
    self.selection.grade = Some(grade);
    self.go(ViewState::ModeSelection);
    Ok(())
  }

  pub fn select_mode(&mut self, mode: Mode) -> Result<(), NavError> {
    self.guard(ViewState::ModeSelection)?;
    let level = self.selection.level.ok_or(NavError::MissingSelection("level"))?;
    self.selection.grade.ok_or(NavError::MissingSelection("grade"))?;
    self.selection.mode = Some(mode);
    if level.has_specializations() {
      self.go(ViewState::SpecializationSelection);
    } else {
      self.go(ViewState::SubjectSelection);
    }
    Ok(())
  }

  pub fn select_specialization(&mut self, id: &str) -> Result<(), NavError> {
    self.guard(ViewState::SpecializationSelection)?;
    if !self.selection.level.is_some_and(Level::has_specializations) {
      return Err(NavError::MissingSelection("secondary level"));
    }
    let spec = catalog::specialization(id).ok_or_else(|| NavError::UnknownSpecialization(id.to_string()))?;
    self.selection.specialization = Some(spec);
    self.go(ViewState::SubjectSelection);
    Ok(())
  }

  pub fn select_subject(&mut self, id: &str) -> Result<(), NavError> {
    self.guard(ViewState::SubjectSelection)?;
    let mode = self.selection.mode.ok_or(NavError::MissingSelection("mode"))?;
    let subject = self
      .subjects()
      .iter()
      .copied()
      .find(|s| s.id == id)
      .ok_or_else(|| NavError::UnknownSubject(id.to_string()))?;
    self.selection.subject = Some(subject);
    match mode {
      Mode::Review => self.go(ViewState::PeriodSelection),
      Mode::Lesson => self.go(ViewState::LessonSearch),
    }
    Ok(())
  }

  // --- generation ---

  /// Validate a lesson search and mark the session as loading.
  pub fn begin_lesson(&mut self, topic: &str) -> Result<LessonRequest, NavError> {
    self.guard(ViewState::LessonSearch)?;
    let topic = topic.trim();
    if topic.is_empty() {
      return Err(NavError::EmptyTopic);
    }
    let (level, grade, subject) = self.required_labels()?;
    let subject = match self.selection.specialization {
      Some(spec) => format!("{} شعبة {}", subject.name, spec.name),
      None => subject.name.to_string(),
    };

    let req = LessonRequest {
      level: catalog::level_label(level).to_string(),
      grade: grade.label.to_string(),
      subject,
      topic: topic.to_string(),
    };
    self.pending = Some(Pending::Lesson { topic: req.topic.clone() });
    self.notice = None;
    info!(target: "navigation", session = %self.id, subject = %req.subject, "Lesson request started");
    Ok(req)
  }

  /// Validate a review period pick and mark the session as loading.
  pub fn begin_review(&mut self, period_id: &str) -> Result<ReviewRequest, NavError> {
    self.guard(ViewState::PeriodSelection)?;
    let period = ReviewPeriod::parse(period_id).ok_or_else(|| NavError::UnknownPeriod(period_id.to_string()))?;
    if self.selection.mode != Some(Mode::Review) {
      return Err(NavError::MissingSelection("review mode"));
    }
    let (level, grade, subject) = self.required_labels()?;

    let req = ReviewRequest {
      level: catalog::level_label(level).to_string(),
      grade: grade.label.to_string(),
      subject: subject.name.to_string(),
      specialization: self.selection.specialization.map(|s| s.name.to_string()).unwrap_or_default(),
      period: period.id().to_string(),
    };
    self.pending = Some(Pending::Review { period });
    self.notice = None;
    info!(target: "navigation", session = %self.id, subject = %req.subject, period = %req.period, "Review request started");
    Ok(req)
  }

  /// Apply the outcome of the in-flight request.
  /// Success replaces the content and opens the result view; failure only sets a notice.
  pub fn finish(&mut self, outcome: Result<GeneratedContent, GenerationError>) {
    let Some(pending) = self.pending.take() else {
      warn!(target: "navigation", session = %self.id, "Generation outcome without a pending request; ignored");
      return;
    };

    match outcome {
      Ok(content) => {
        match pending {
          Pending::Lesson { topic } => self.selection.topic = Some(topic),
          Pending::Review { period } => self.selection.period = Some(period),
        }
        self.content = Some(content);
        self.show_solution = false;
        self.go(ViewState::ResultView);
      }
      Err(e) => {
        let notice = match pending {
          Pending::Lesson { .. } => LESSON_FAILURE_NOTICE,
          Pending::Review { .. } => REVIEW_FAILURE_NOTICE,
        };
        warn!(target: "navigation", session = %self.id, error = %e, "Generation failed; staying in {:?}", self.view);
        self.notice = Some(notice.to_string());
      }
    }
  }

  // --- result view and navigation back ---

  pub fn toggle_solution(&mut self) -> Result<bool, NavError> {
    self.ensure_idle()?;
    match (&self.view, &self.content) {
      (ViewState::ResultView, Some(GeneratedContent::Lesson(_))) => {
        self.show_solution = !self.show_solution;
        Ok(self.show_solution)
      }
      _ => Err(NavError::NothingToToggle),
    }
  }

  /// Back to home; clears every selection and the current content.
  pub fn reset(&mut self) -> Result<(), NavError> {
    self.ensure_idle()?;
    self.selection = SelectionState::default();
    self.content = None;
    self.show_solution = false;
    self.notice = None;
    self.go(ViewState::Home);
    Ok(())
  }

  /// One step back. From the result view only the content is dropped; from a picker,
  /// the selection that led into it is cleared.
  pub fn back(&mut self) -> Result<(), NavError> {
    self.ensure_idle()?;
    self.notice = None;
    let sel = &mut self.selection;
    let target = match self.view {
      ViewState::Home => ViewState::Home,
      ViewState::GradeSelection => {
        sel.level = None;
        ViewState::Home
      }
      ViewState::ModeSelection => {
        sel.grade = None;
        ViewState::GradeSelection
      }
      ViewState::SpecializationSelection => {
        sel.mode = None;
        ViewState::ModeSelection
      }
      ViewState::SubjectSelection => {
        if sel.specialization.take().is_some() {
          ViewState::SpecializationSelection
        } else {
          sel.mode = None;
          ViewState::ModeSelection
        }
      }
      ViewState::PeriodSelection | ViewState::LessonSearch => {
        sel.subject = None;
        sel.period = None;
        sel.topic = None;
        ViewState::SubjectSelection
      }
      ViewState::ResultView => {
        self.content = None;
        self.show_solution = false;
        match sel.mode {
          Some(Mode::Review) => ViewState::PeriodSelection,
          _ => ViewState::LessonSearch,
        }
      }
    };
    self.go(target);
    Ok(())
  }

  // --- helpers ---

  fn guard(&self, expected: ViewState) -> Result<(), NavError> {
    self.ensure_idle()?;
    if self.view != expected {
      return Err(NavError::WrongView { expected, actual: self.view });
    }
    Ok(())
  }

  fn ensure_idle(&self) -> Result<(), NavError> {
    if self.pending.is_some() {
      Err(NavError::Busy)
    } else {
      Ok(())
    }
  }

  fn required_labels(&self) -> Result<(Level, Grade, Subject), NavError> {
    let level = self.selection.level.ok_or(NavError::MissingSelection("level"))?;
    let grade = self.selection.grade.ok_or(NavError::MissingSelection("grade"))?;
    let subject = self.selection.subject.ok_or(NavError::MissingSelection("subject"))?;
    Ok((level, grade, subject))
  }

  fn go(&mut self, to: ViewState) {
    debug!(target: "navigation", session = %self.id, from = ?self.view, to = ?to, "Transition");
    self.view = to;
  }

  #[cfg(test)]
  fn invariants_hold(&self) -> bool {
    let sel = &self.selection;
    let spec_ok = sel.specialization.is_none() || sel.level == Some(Level::Secondary);
    let subject_ok = sel.subject.map_or(true, |s| self.subjects().contains(&s));
    let period_ok = sel.period.is_none() || sel.mode == Some(Mode::Review);
    spec_ok && subject_ok && period_ok
  }
}
