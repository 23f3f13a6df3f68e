//! Intent handling shared by both HTTP and WebSocket handlers.
//!
//! An intent is applied in up to three steps:
//!   1. transition under the session lock (`apply_transition`);
//!   2. if it started a generation, the call runs with the lock released;
//!   3. the outcome is applied under the lock again (`Session::finish`).
//! The session's own in-flight guard rejects anything that arrives during step 2.
//! If the caller is dropped during step 2 (client gone, request timed out), the
//! session is still finished, with `GenerationError::Cancelled`, so it never stays busy.

use tracing::{info, instrument, warn};

use crate::domain::GeneratedContent;
use crate::generation::{GenerationClient, GenerationError, LessonRequest, ReviewRequest};
use crate::navigation::{NavError, Session};
use crate::protocol::Intent;
use crate::state::SharedSession;

/// A generation the session has been marked loading for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationCall {
  Lesson(LessonRequest),
  Review(ReviewRequest),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Step {
  Done,
  Generate(GenerationCall),
}

/// Apply the synchronous part of an intent.
pub fn apply_transition(session: &mut Session, intent: Intent) -> Result<Step, NavError> {
  match intent {
    Intent::SelectLevel { level } => session.select_level(level).map(|_| Step::Done),
    Intent::SelectGrade { grade } => session.select_grade(grade).map(|_| Step::Done),
    Intent::SelectMode { mode } => session.select_mode(mode).map(|_| Step::Done),
    Intent::SelectSpecialization { id } => session.select_specialization(&id).map(|_| Step::Done),
    Intent::SelectSubject { id } => session.select_subject(&id).map(|_| Step::Done),
    Intent::SelectPeriod { period } => session.begin_review(&period).map(|r| Step::Generate(GenerationCall::Review(r))),
    Intent::SubmitTopic { topic } => session.begin_lesson(&topic).map(|r| Step::Generate(GenerationCall::Lesson(r))),
    Intent::ToggleSolution => session.toggle_solution().map(|_| Step::Done),
    Intent::Back => session.back().map(|_| Step::Done),
    Intent::Reset => session.reset().map(|_| Step::Done),
  }
}

/// Finishes the session as cancelled unless disarmed.
struct FinishOnDrop {
  session: SharedSession,
  armed: bool,
}

impl Drop for FinishOnDrop {
  fn drop(&mut self) {
    if !self.armed {
      return;
    }
    warn!(target: "generation", "Generation dropped before completion; releasing session");
    if let Ok(mut s) = self.session.try_lock() {
      s.finish(Err(GenerationError::Cancelled));
      return;
    }
    // Contended: finish as soon as the lock is free.
    let session = self.session.clone();
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
      handle.spawn(async move {
        session.lock().await.finish(Err(GenerationError::Cancelled));
      });
    }
  }
}

/// Run a started generation and apply its outcome to the session.
#[instrument(level = "info", skip(generator, session, call))]
pub async fn run_generation(generator: &GenerationClient, session: &SharedSession, call: GenerationCall) {
  let mut guard = FinishOnDrop { session: session.clone(), armed: true };
  let outcome = match &call {
    GenerationCall::Lesson(req) => generator.generate_lesson(req).await.map(GeneratedContent::Lesson),
    GenerationCall::Review(req) => generator.generate_review(req).await.map(GeneratedContent::Review),
  };

  if let Ok(content) = &outcome {
    let videos = content.videos();
    info!(
      target: "generation",
      videos = videos.len(),
      embeddable = videos.iter().filter(|v| v.embed_url.is_some()).count(),
      "Content ready"
    );
  }
  let mut s = session.lock().await;
  s.finish(outcome);
  guard.armed = false;
}

/// Full intent handling: transition, then generation when the transition asks for it.
#[instrument(level = "info", skip(generator, session, intent), fields(generates = intent.generates()))]
pub async fn handle_intent(generator: &GenerationClient, session: &SharedSession, intent: Intent) -> Result<(), NavError> {
  let step = {
    let mut guard = session.lock().await;
    apply_transition(&mut guard, intent)?
  };
  if let Step::Generate(call) = step {
    run_generation(generator, session, call).await;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use tokio::sync::Mutex;

  use super::*;
  use crate::domain::{Level, Mode};
  use crate::generation::mock::{client_with, MockModel};
  use crate::navigation::ViewState;

  const LESSON_OK: &str = r#"{"title":"جملة بيثاغورس","explanation":"...","fullExplanation":"...",
    "keyPoints":["..."],"exercise":"...","solution":"...",
    "videos":[{"title":"t","url":"https://youtu.be/dQw4w9WgXcQ"}]}"#;

  fn new_session() -> SharedSession {
    Arc::new(Mutex::new(Session::new()))
  }

  async fn drive(generator: &GenerationClient, session: &SharedSession, intents: Vec<Intent>) {
    for i in intents {
      handle_intent(generator, session, i).await.unwrap();
    }
  }

  fn primary_math_lesson() -> Vec<Intent> {
    vec![
      Intent::SelectLevel { level: Level::Primary },
      Intent::SelectGrade { grade: 5 },
      Intent::SelectMode { mode: Mode::Lesson },
      Intent::SelectSubject { id: "math".into() },
    ]
  }

  #[tokio::test]
  async fn lesson_scenario_end_to_end() {
    let model = MockModel::replying(LESSON_OK);
    let generator = client_with(model.clone());
    let session = new_session();

    drive(&generator, &session, primary_math_lesson()).await;
    handle_intent(&generator, &session, Intent::SubmitTopic { topic: "جملة بيثاغورس".into() }).await.unwrap();

    let seen = model.requests();
    let prompt = &seen[0].user;
    for label in ["الطور الابتدائي", "الخامسة ابتدائي", "الرياضيات", "جملة بيثاغورس"] {
      assert!(prompt.contains(label));
    }

    let s = session.lock().await;
    assert_eq!(s.view(), ViewState::ResultView);
    assert!(!s.is_loading());
    match s.content() {
      Some(GeneratedContent::Lesson(l)) => assert_eq!(l.videos[0].id.as_deref(), Some("dQw4w9WgXcQ")),
      other => panic!("expected lesson content, got {other:?}"),
    }
    assert_eq!(s.selection().topic.as_deref(), Some("جملة بيثاغورس"));
  }

  #[tokio::test]
  async fn review_scenario_uses_period_label() {
    let model = MockModel::replying("not json at all");
    let generator = client_with(model.clone());
    let session = new_session();

    drive(
      &generator,
      &session,
      vec![
        Intent::SelectLevel { level: Level::Middle },
        Intent::SelectGrade { grade: 4 },
        Intent::SelectMode { mode: Mode::Review },
        Intent::SelectSubject { id: "phys".into() },
        Intent::SelectPeriod { period: "certificate_prep".into() },
      ],
    )
    .await;

    assert!(model.requests()[0].user.contains("التحضير للشهادة النهائية (BAC/BEM)"));
    let s = session.lock().await;
    match s.content() {
      Some(GeneratedContent::Review(r)) => {
        assert_eq!(r.title.as_deref(), Some("خطأ في التحميل"));
        assert!(r.videos.is_empty());
      }
      other => panic!("expected review placeholder, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn transport_failure_only_sets_notice() {
    let generator = client_with(MockModel::failing());
    let session = new_session();
    drive(&generator, &session, primary_math_lesson()).await;
    let before = session.lock().await.selection().clone();

    handle_intent(&generator, &session, Intent::SubmitTopic { topic: "الكسور".into() }).await.unwrap();

    let s = session.lock().await;
    assert_eq!(s.selection(), &before);
    assert!(!s.is_loading());
    assert!(s.content().is_none());
    assert_eq!(s.view(), ViewState::LessonSearch);
    assert!(s.notice().is_some());
  }

  #[tokio::test]
  async fn second_request_while_loading_is_busy() {
    let generator = client_with(MockModel::replying(LESSON_OK));
    let session = new_session();
    drive(&generator, &session, primary_math_lesson()).await;

    // Start a lesson but hold the outcome back.
    let call = {
      let mut s = session.lock().await;
      apply_transition(&mut s, Intent::SubmitTopic { topic: "الكسور".into() }).unwrap()
    };
    let err = handle_intent(&generator, &session, Intent::SubmitTopic { topic: "الأعداد".into() }).await;
    assert_eq!(err, Err(NavError::Busy));

    let Step::Generate(call) = call else { panic!("expected a generation step") };
    run_generation(&generator, &session, call).await;
    assert_eq!(session.lock().await.view(), ViewState::ResultView);
  }

  #[tokio::test]
  async fn rejected_intent_surfaces_nav_error() {
    let generator = client_with(MockModel::replying("{}"));
    let session = new_session();
    let err = handle_intent(&generator, &session, Intent::SelectSubject { id: "math".into() }).await;
    assert!(matches!(err, Err(NavError::WrongView { .. })));
  }

  #[tokio::test]
  async fn dropped_request_releases_the_session() {
    let generator = client_with(MockModel::hanging());
    let session = new_session();
    drive(&generator, &session, primary_math_lesson()).await;

    let submit = handle_intent(&generator, &session, Intent::SubmitTopic { topic: "الكسور".into() });
    assert!(tokio::time::timeout(Duration::from_millis(50), submit).await.is_err());

    let mut s = session.lock().await;
    assert!(!s.is_loading());
    assert_eq!(s.view(), ViewState::LessonSearch);
    assert!(s.selection().topic.is_none());
    assert!(s.notice().is_some());
    s.back().unwrap();
    s.reset().unwrap();
    assert_eq!(s.view(), ViewState::Home);
  }
}
