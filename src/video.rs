//! YouTube video-id extraction.
//!
//! Recognized shapes:
//!   youtube.com/watch?v=ID (also `&v=` later in the query)
//!   youtu.be/ID
//!   youtube.com/embed/ID, youtube.com/v/ID, youtube.com/e/ID
//!   youtube.com/<segment>/<anything>/ID
//!
//! No match is a normal outcome: the caller renders an outbound link instead.

use std::sync::OnceLock;

use regex::Regex;

const VIDEO_ID_PATTERN: &str =
  r#"(?i)(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#;

fn video_id_regex() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(VIDEO_ID_PATTERN).expect("video id pattern is a valid regex"))
}

/// Returns the 11-character video id embedded in `url`, if any.
pub fn extract_video_id(url: &str) -> Option<String> {
  if url.is_empty() {
    return None;
  }
  video_id_regex()
    .captures(url)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().to_string())
}

pub fn embed_url(id: &str) -> String {
  format!("https://www.youtube.com/embed/{id}")
}

#[cfg(test)]
mod tests {
  use super::*;

  const IDS: &[&str] = &["dQw4w9WgXcQ", "a_b-C1d2E3f", "00000000000"];

  #[test]
  fn recognizes_all_url_shapes() {
    for id in IDS {
      let shapes = [
        format!("https://www.youtube.com/watch?v={id}"),
        format!("https://youtu.be/{id}"),
        format!("https://www.youtube.com/embed/{id}"),
        format!("https://www.youtube.com/v/{id}"),
      ];
      for url in shapes {
        assert_eq!(extract_video_id(&url).as_deref(), Some(*id), "url: {url}");
      }
    }
  }

  #[test]
  fn handles_extra_query_and_case() {
    assert_eq!(
      extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42").as_deref(),
      Some("dQw4w9WgXcQ")
    );
    assert_eq!(extract_video_id("HTTPS://YOUTU.BE/dQw4w9WgXcQ?si=abc").as_deref(), Some("dQw4w9WgXcQ"));
    assert_eq!(extract_video_id("https://m.youtube.com/e/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
  }

  #[test]
  fn non_matching_input_yields_none() {
    assert_eq!(extract_video_id(""), None);
    assert_eq!(extract_video_id("https://example.com/not-a-video"), None);
    assert_eq!(extract_video_id("https://youtu.be/short"), None);
    assert_eq!(extract_video_id("just some words"), None);
    // A missing url arrives as the empty default.
    let missing: crate::domain::Video = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
    assert_eq!(extract_video_id(&missing.url), None);
  }
}
