//! Domain models: curriculum entities, review periods, and generated content.
//!
//! Catalog entities are `Copy` views over `'static` tables (see `catalog`). Generated
//! content mirrors the JSON the model is asked for; every field the service does not
//! guarantee is optional or defaults to empty, so a partial reply still deserializes.

use serde::{Deserialize, Serialize};

use crate::util::{display_list, display_opt, display_rows, display_string, lenient_list};

/// Education stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
  Primary,
  Middle,
  Secondary,
}

impl Level {
  pub const ALL: [Level; 3] = [Level::Primary, Level::Middle, Level::Secondary];

  /// Only the secondary stage is split into specializations.
  pub fn has_specializations(self) -> bool {
    matches!(self, Level::Secondary)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Grade {
  pub id: u8,
  pub label: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Subject {
  pub id: &'static str,
  pub name: &'static str,
  pub icon: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Specialization {
  pub id: &'static str,
  pub name: &'static str,
  pub icon: &'static str,
}

/// What the user wants generated once the subject is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
  Lesson,
  Review,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPeriod {
  Semester1,
  Semester2,
  Semester3,
  FullYear,
  CertificatePrep,
}

impl ReviewPeriod {
  pub const ALL: [ReviewPeriod; 5] = [
    ReviewPeriod::Semester1,
    ReviewPeriod::Semester2,
    ReviewPeriod::Semester3,
    ReviewPeriod::FullYear,
    ReviewPeriod::CertificatePrep,
  ];

  /// Wire id, as accepted from clients and placed in review requests.
  pub fn id(self) -> &'static str {
    match self {
      ReviewPeriod::Semester1 => "semester1",
      ReviewPeriod::Semester2 => "semester2",
      ReviewPeriod::Semester3 => "semester3",
      ReviewPeriod::FullYear => "full_year",
      ReviewPeriod::CertificatePrep => "certificate_prep",
    }
  }

  pub fn parse(id: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|p| p.id() == id)
  }

  /// Label used inside the review prompt.
  pub fn prompt_label(self) -> &'static str {
    match self {
      ReviewPeriod::Semester1 => "الفصل الأول",
      ReviewPeriod::Semester2 => "الفصل الثاني",
      ReviewPeriod::Semester3 => "الفصل الثالث",
      ReviewPeriod::FullYear => "المراجعة السنوية الكاملة",
      ReviewPeriod::CertificatePrep => "التحضير للشهادة النهائية (BAC/BEM)",
    }
  }
}

/// Prompt label for a raw period id; unknown ids are used verbatim.
pub fn period_label(raw: &str) -> String {
  ReviewPeriod::parse(raw)
    .map(|p| p.prompt_label().to_string())
    .unwrap_or_else(|| raw.to_string())
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
  #[serde(default, deserialize_with = "display_string")]
  pub title: String,
  #[serde(default, deserialize_with = "display_list")]
  pub headers: Vec<String>,
  #[serde(default, deserialize_with = "display_rows")]
  pub rows: Vec<Vec<String>>,
}

/// A video reference. `id` and `embed_url` are filled from the url after parsing;
/// without them the video is shown as an outbound link to `url`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
  #[serde(default, deserialize_with = "display_string")]
  pub title: String,
  #[serde(default, deserialize_with = "display_string")]
  pub url: String,
  #[serde(default, skip_deserializing)]
  pub id: Option<String>,
  #[serde(default, skip_deserializing)]
  pub embed_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  #[serde(default, deserialize_with = "display_string")]
  pub title: String,
  #[serde(default, deserialize_with = "display_string")]
  pub uri: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramStep {
  #[serde(default, deserialize_with = "display_string")]
  pub label: String,
  #[serde(default, deserialize_with = "display_opt")]
  pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContent {
  #[serde(default, deserialize_with = "display_opt")]
  pub title: Option<String>,
  #[serde(default, deserialize_with = "display_opt")]
  pub explanation: Option<String>,
  #[serde(default, deserialize_with = "display_opt")]
  pub full_explanation: Option<String>,
  #[serde(default, deserialize_with = "display_list")]
  pub key_points: Vec<String>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub tables: Vec<Table>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub diagram: Vec<DiagramStep>,
  #[serde(default, deserialize_with = "display_opt")]
  pub exercise: Option<String>,
  #[serde(default, deserialize_with = "display_opt")]
  pub solution: Option<String>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub videos: Vec<Video>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub sources: Vec<Source>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewContent {
  #[serde(default, deserialize_with = "display_opt")]
  pub title: Option<String>,
  #[serde(default, deserialize_with = "display_opt")]
  pub summary: Option<String>,
  #[serde(default, deserialize_with = "display_list")]
  pub key_concepts: Vec<String>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub tables: Vec<Table>,
  #[serde(default, deserialize_with = "display_list")]
  pub exam_predictions: Vec<String>,
  #[serde(default, deserialize_with = "display_list")]
  pub tips: Vec<String>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub videos: Vec<Video>,
  #[serde(default, deserialize_with = "lenient_list")]
  pub sources: Vec<Source>,
}

/// The active result of a session. Replaced wholesale by the next generation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratedContent {
  Lesson(LessonContent),
  Review(ReviewContent),
}

impl GeneratedContent {
  pub fn videos(&self) -> &[Video] {
    match self {
      GeneratedContent::Lesson(l) => &l.videos,
      GeneratedContent::Review(r) => &r.videos,
    }
  }
}
