//! Content generation: prompts, response schema, and reply normalization.
//!
//! The model itself sits behind `ContentModel` (Gemini in production, a mock in tests).
//! Normalization never fails: a reply that is not a JSON object is replaced by a fixed
//! Arabic placeholder, and every video gets its embeddable id resolved.

use std::{future::Future, pin::Pin, sync::Arc, sync::OnceLock};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{period_label, LessonContent, ReviewContent, Source, Video};
use crate::util::{fill_template, strip_code_fence, trunc_for_log};
use crate::video::{embed_url, extract_video_id};

/// Failure of the call itself. A malformed reply body is not an error (see `parse_*`).
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation service is not configured (missing API key)")]
  NotConfigured,
  #[error("transport error: {0}")]
  Transport(String),
  #[error("generation service returned HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("unreadable response envelope: {0}")]
  Decode(String),
  #[error("request was dropped before the reply arrived")]
  Cancelled,
}

/// What is sent to the model. Web-search grounding is always requested.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
  pub system: &'a str,
  pub user: &'a str,
  pub response_schema: Option<&'a Value>,
}

/// Raw reply text (expected to be JSON) plus grounding citations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
  pub text: String,
  pub sources: Vec<Source>,
}

pub type ModelFuture<'a> = Pin<Box<dyn Future<Output = Result<ModelReply, GenerationError>> + Send + 'a>>;

pub trait ContentModel: Send + Sync {
  fn name(&self) -> &str;
  fn generate<'a>(&'a self, req: ModelRequest<'a>) -> ModelFuture<'a>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRequest {
  pub level: String,
  pub grade: String,
  pub subject: String,
  pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
  pub level: String,
  pub grade: String,
  pub subject: String,
  /// Empty when the level has no specializations.
  pub specialization: String,
  /// Raw period id; unknown ids are passed to the prompt verbatim.
  pub period: String,
}

#[derive(Clone)]
pub struct GenerationClient {
  model: Option<Arc<dyn ContentModel>>,
  prompts: Prompts,
}

impl GenerationClient {
  pub fn new(model: Option<Arc<dyn ContentModel>>, prompts: Prompts) -> Self {
    Self { model, prompts }
  }

  pub fn model_name(&self) -> Option<&str> {
    self.model.as_deref().map(|m| m.name())
  }

  pub fn lesson_prompt(&self, req: &LessonRequest) -> String {
    fill_template(
      &self.prompts.lesson_user_template,
      &[
        ("level", req.level.as_str()),
        ("grade", req.grade.as_str()),
        ("subject", req.subject.as_str()),
        ("topic", req.topic.as_str()),
      ],
    )
  }

  pub fn review_prompt(&self, req: &ReviewRequest) -> String {
    let specialization_clause = if req.specialization.trim().is_empty() {
      String::new()
    } else {
      format!(" شعبة {}", req.specialization)
    };
    let period = period_label(&req.period);
    fill_template(
      &self.prompts.review_user_template,
      &[
        ("level", req.level.as_str()),
        ("grade", req.grade.as_str()),
        ("subject", req.subject.as_str()),
        ("specialization_clause", specialization_clause.as_str()),
        ("period", period.as_str()),
      ],
    )
  }

  /// One grounded, schema-constrained call. Transport failures propagate; a bad body does not.
  #[instrument(level = "info", skip(self, req), fields(subject = %req.subject, topic_len = req.topic.len()))]
  pub async fn generate_lesson(&self, req: &LessonRequest) -> Result<LessonContent, GenerationError> {
    let model = self.model.as_deref().ok_or(GenerationError::NotConfigured)?;
    let user = self.lesson_prompt(req);
    let reply = model
      .generate(ModelRequest {
        system: &self.prompts.lesson_system,
        user: &user,
        response_schema: Some(lesson_schema()),
      })
      .await?;

    let mut lesson = parse_lesson_response(&reply.text);
    lesson.sources = reply.sources;
    info!(
      target: "generation",
      title = %lesson.title.as_deref().unwrap_or_default(),
      videos = lesson.videos.len(),
      embeddable = lesson.videos.iter().filter(|v| v.id.is_some()).count(),
      sources = lesson.sources.len(),
      "Lesson generated"
    );
    Ok(lesson)
  }

  /// Same flow as `generate_lesson`, but the JSON shape is only described in prose.
  #[instrument(level = "info", skip(self, req), fields(subject = %req.subject, period = %req.period))]
  pub async fn generate_review(&self, req: &ReviewRequest) -> Result<ReviewContent, GenerationError> {
    let model = self.model.as_deref().ok_or(GenerationError::NotConfigured)?;
    let user = self.review_prompt(req);
    let reply = model
      .generate(ModelRequest { system: &self.prompts.review_system, user: &user, response_schema: None })
      .await?;

    let mut review = parse_review_response(&reply.text);
    review.sources = reply.sources;
    info!(
      target: "generation",
      title = %review.title.as_deref().unwrap_or_default(),
      videos = review.videos.len(),
      sources = review.sources.len(),
      "Review generated"
    );
    Ok(review)
  }
}

/// Structured response schema for lessons (Gemini OpenAPI subset).
pub fn lesson_schema() -> &'static Value {
  static SCHEMA: OnceLock<Value> = OnceLock::new();
  SCHEMA.get_or_init(|| {
    let string = json!({ "type": "STRING" });
    let strings = json!({ "type": "ARRAY", "items": string });
    json!({
      "type": "OBJECT",
      "properties": {
        "title": string,
        "explanation": string,
        "fullExplanation": string,
        "keyPoints": strings,
        "tables": {
          "type": "ARRAY",
          "items": {
            "type": "OBJECT",
            "properties": {
              "title": string,
              "headers": strings,
              "rows": { "type": "ARRAY", "items": strings }
            },
            "required": ["title", "headers", "rows"]
          }
        },
        "diagram": {
          "type": "ARRAY",
          "items": {
            "type": "OBJECT",
            "properties": { "label": string, "description": string },
            "required": ["label"]
          }
        },
        "exercise": string,
        "solution": string,
        "videos": {
          "type": "ARRAY",
          "items": {
            "type": "OBJECT",
            "properties": { "title": string, "url": string },
            "required": ["title", "url"]
          }
        }
      },
      "required": ["title", "explanation", "fullExplanation", "keyPoints", "exercise", "solution", "videos"]
    })
  })
}

pub fn lesson_placeholder() -> LessonContent {
  LessonContent {
    title: Some("خطأ في معالجة البيانات".into()),
    explanation: Some("عذراً، حدث خطأ أثناء قراءة الرد من الخادم.".into()),
    ..Default::default()
  }
}

pub fn review_placeholder() -> ReviewContent {
  ReviewContent {
    title: Some("خطأ في التحميل".into()),
    summary: Some("حدث خطأ أثناء تحميل المراجعة.".into()),
    ..Default::default()
  }
}

/// Parse a lesson reply. Never fails; required fields are not re-checked here.
pub fn parse_lesson_response(raw: &str) -> LessonContent {
  let mut lesson = parse_object::<LessonContent>(raw).unwrap_or_else(lesson_placeholder);
  resolve_video_ids(&mut lesson.videos);
  lesson
}

/// Parse a review reply. Never fails; every field may be absent.
pub fn parse_review_response(raw: &str) -> ReviewContent {
  let mut review = parse_object::<ReviewContent>(raw).unwrap_or_else(review_placeholder);
  resolve_video_ids(&mut review.videos);
  review
}

fn parse_object<T: DeserializeOwned>(raw: &str) -> Option<T> {
  let body = strip_code_fence(raw);
  let value = match serde_json::from_str::<Value>(body) {
    Ok(v) => v,
    Err(e) => {
      error!(target: "generation", error = %e, raw = %trunc_for_log(body, 300), "Reply is not JSON; using placeholder");
      return None;
    }
  };
  if !value.is_object() {
    error!(target: "generation", raw = %trunc_for_log(body, 300), "Reply JSON is not an object; using placeholder");
    return None;
  }
  match serde_json::from_value::<T>(value) {
    Ok(t) => Some(t),
    Err(e) => {
      error!(target: "generation", error = %e, "Reply JSON has unusable field types; using placeholder");
      None
    }
  }
}

fn resolve_video_ids(videos: &mut [Video]) {
  for v in videos.iter_mut() {
    v.id = extract_video_id(&v.url);
    v.embed_url = v.id.as_deref().map(embed_url);
    if v.id.is_none() && !v.url.is_empty() {
      warn!(target: "generation", url = %v.url, "Video url is not embeddable; will render as link");
    }
  }
}

#[cfg(test)]
pub(crate) mod mock {
  //! Scripted `ContentModel` that records every request it sees.

  use std::sync::Mutex;

  use super::*;

  #[derive(Debug, Clone, PartialEq)]
  pub struct SeenRequest {
    pub system: String,
    pub user: String,
    pub with_schema: bool,
  }

  pub struct MockModel {
    reply: Mutex<Box<dyn FnMut() -> Result<ModelReply, GenerationError> + Send>>,
    hang: bool,
    pub seen: Mutex<Vec<SeenRequest>>,
  }

  impl MockModel {
    pub fn replying(text: &str) -> Arc<Self> {
      let reply = ModelReply { text: text.to_string(), sources: vec![] };
      Self::with(move || Ok(reply.clone()))
    }

    pub fn replying_with_sources(text: &str, sources: Vec<Source>) -> Arc<Self> {
      let reply = ModelReply { text: text.to_string(), sources };
      Self::with(move || Ok(reply.clone()))
    }

    pub fn failing() -> Arc<Self> {
      Self::with(|| Err(GenerationError::Transport("connection refused".into())))
    }

    /// Never answers; the request only ends when its caller is dropped.
    pub fn hanging() -> Arc<Self> {
      Arc::new(Self { reply: Mutex::new(Box::new(|| Ok(ModelReply::default()))), hang: true, seen: Mutex::new(vec![]) })
    }

    pub fn with(f: impl FnMut() -> Result<ModelReply, GenerationError> + Send + 'static) -> Arc<Self> {
      Arc::new(Self { reply: Mutex::new(Box::new(f)), hang: false, seen: Mutex::new(vec![]) })
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
      self.seen.lock().unwrap().clone()
    }
  }

  impl ContentModel for MockModel {
    fn name(&self) -> &str {
      "mock"
    }

    fn generate<'a>(&'a self, req: ModelRequest<'a>) -> ModelFuture<'a> {
      self.seen.lock().unwrap().push(SeenRequest {
        system: req.system.to_string(),
        user: req.user.to_string(),
        with_schema: req.response_schema.is_some(),
      });
      if self.hang {
        return Box::pin(std::future::pending());
      }
      let result = {
        let mut next = self.reply.lock().unwrap();
        (*next)()
      };
      Box::pin(async move { result })
    }
  }

  pub fn client_with(model: Arc<MockModel>) -> GenerationClient {
    GenerationClient::new(Some(model as Arc<dyn ContentModel>), Prompts::default())
  }
}

#[cfg(test)]
mod tests {
  use super::mock::*;
  use super::*;

  const LESSON_OK: &str = r#"{"title":"جملة بيثاغورس","explanation":"...","fullExplanation":"...",
    "keyPoints":["..."],"exercise":"...","solution":"...",
    "videos":[{"title":"t","url":"https://youtu.be/dQw4w9WgXcQ"},{"title":"u","url":"https://example.com/v"}]}"#;

  fn lesson_req() -> LessonRequest {
    LessonRequest {
      level: "الطور الابتدائي".into(),
      grade: "الخامسة ابتدائي".into(),
      subject: "الرياضيات".into(),
      topic: "جملة بيثاغورس".into(),
    }
  }

  #[test]
  fn malformed_replies_become_placeholders() {
    for raw in ["", "   ", "{\"title\": \"x\"", "هذا ليس JSON", "```json\n{oops}\n```", "[1,2]", "null", "\"str\""] {
      let lesson = parse_lesson_response(raw);
      assert_eq!(lesson, lesson_placeholder(), "raw: {raw:?}");
      assert!(lesson.key_points.is_empty() && lesson.videos.is_empty());

      let review = parse_review_response(raw);
      assert_eq!(review, review_placeholder(), "raw: {raw:?}");
      assert!(review.key_concepts.is_empty() && review.tips.is_empty() && review.videos.is_empty());
    }
  }

  #[test]
  fn fenced_reply_is_unwrapped() {
    let lesson = parse_lesson_response("```json\n{\"title\":\"درس\",\"keyPoints\":[\"a\"]}\n```");
    assert_eq!(lesson.title.as_deref(), Some("درس"));
    assert_eq!(lesson.key_points, vec!["a"]);
  }

  #[test]
  fn mistyped_fields_keep_the_rest_of_the_lesson() {
    let lesson = parse_lesson_response(
      r#"{"title":"الكسور","keyPoints":"نقطة واحدة","exercise":12,
        "diagram":[{"label":"a","description":5},{"label":"b"}],
        "tables":{"title":"جدول","headers":["x"],"rows":[[1]]},
        "videos":[{"title":"t","url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ"},"bad"]}"#,
    );
    assert_ne!(lesson, lesson_placeholder());
    assert_eq!(lesson.title.as_deref(), Some("الكسور"));
    assert_eq!(lesson.key_points, vec!["نقطة واحدة"]);
    assert_eq!(lesson.exercise.as_deref(), Some("12"));
    assert_eq!(lesson.diagram[0].description.as_deref(), Some("5"));
    assert_eq!(lesson.diagram[1].description, None);
    assert_eq!(lesson.tables[0].rows, vec![vec!["1".to_string()]]);
    assert_eq!(lesson.videos.len(), 1);
    assert_eq!(lesson.videos[0].id.as_deref(), Some("dQw4w9WgXcQ"));

    let review = parse_review_response(r#"{"title":7,"tips":"نم جيداً","videos":{"title":"v","url":"https://youtu.be/dQw4w9WgXcQ"}}"#);
    assert_eq!(review.title.as_deref(), Some("7"));
    assert_eq!(review.tips, vec!["نم جيداً"]);
    assert_eq!(review.videos[0].embed_url.as_deref(), Some("https://www.youtube.com/embed/dQw4w9WgXcQ"));
  }

  #[test]
  fn lesson_missing_required_fields_still_parses() {
    let lesson = parse_lesson_response(r#"{"explanation":"only this"}"#);
    assert_eq!(lesson.title, None);
    assert_eq!(lesson.explanation.as_deref(), Some("only this"));
    assert!(lesson.exercise.is_none() && lesson.solution.is_none());
  }

  #[test]
  fn review_accepts_any_subset() {
    let review = parse_review_response(r#"{"tips":["نم جيداً"],"examPredictions":null}"#);
    assert_eq!(review.tips, vec!["نم جيداً"]);
    assert!(review.exam_predictions.is_empty());
    assert!(review.title.is_none());
  }

  #[test]
  fn schema_requires_the_core_lesson_fields() {
    let required = lesson_schema()["required"].as_array().unwrap();
    let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
    assert_eq!(names, ["title", "explanation", "fullExplanation", "keyPoints", "exercise", "solution", "videos"]);
  }

  #[test]
  fn review_prompt_maps_periods_and_specialization() {
    let client = GenerationClient::new(None, Prompts::default());
    let mut req = ReviewRequest {
      level: "الطور الثانوي".into(),
      grade: "الثالثة ثانوي (BAC)".into(),
      subject: "الفلسفة".into(),
      specialization: "آداب وفلسفة".into(),
      period: "certificate_prep".into(),
    };
    let prompt = client.review_prompt(&req);
    assert!(prompt.contains("التحضير للشهادة النهائية (BAC/BEM)"));
    assert!(prompt.contains("شعبة آداب وفلسفة"));

    req.period = "unknown_value".into();
    req.specialization = String::new();
    let prompt = client.review_prompt(&req);
    assert!(prompt.contains("\"unknown_value\""));
    assert!(!prompt.contains("شعبة"));
  }

  #[tokio::test]
  async fn lesson_flow_resolves_video_ids_and_sources() {
    let sources = vec![Source { title: "ONEFD".into(), uri: "https://onefd.edu.dz".into() }];
    let model = MockModel::replying_with_sources(LESSON_OK, sources.clone());
    let client = client_with(model.clone());

    let lesson = client.generate_lesson(&lesson_req()).await.unwrap();
    assert_eq!(lesson.videos[0].id.as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(lesson.videos[0].embed_url.as_deref(), Some("https://www.youtube.com/embed/dQw4w9WgXcQ"));
    assert_eq!(lesson.videos[1].id, None);
    assert_eq!(lesson.videos[1].embed_url, None);
    assert_eq!(lesson.sources, sources);

    let seen = model.requests();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].with_schema);
    for label in ["الطور الابتدائي", "الخامسة ابتدائي", "الرياضيات", "جملة بيثاغورس"] {
      assert!(seen[0].user.contains(label), "prompt lacks {label}");
    }
  }

  #[tokio::test]
  async fn review_is_sent_without_schema() {
    let model = MockModel::replying(r#"{"title":"مراجعة"}"#);
    let client = client_with(model.clone());
    let req = ReviewRequest {
      level: "الطور المتوسط".into(),
      grade: "الرابعة متوسط (BEM)".into(),
      subject: "الرياضيات".into(),
      specialization: String::new(),
      period: "semester1".into(),
    };
    let review = client.generate_review(&req).await.unwrap();
    assert_eq!(review.title.as_deref(), Some("مراجعة"));
    assert!(review.sources.is_empty());
    assert!(!model.requests()[0].with_schema);
  }

  #[tokio::test]
  async fn transport_failure_propagates() {
    let client = client_with(MockModel::failing());
    let err = client.generate_lesson(&lesson_req()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)));
  }

  #[tokio::test]
  async fn unconfigured_client_refuses() {
    let client = GenerationClient::new(None, Prompts::default());
    let err = client.generate_lesson(&lesson_req()).await.unwrap_err();
    assert!(matches!(err, GenerationError::NotConfigured));
  }
}
