//! Loading prompt configuration from TOML.
//!
//! See `AgentConfig` and `Prompts` for expected schema. Every field is optional in
//! the file; anything missing keeps the built-in Arabic default.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// System instructions and user templates sent to the generation service.
///
/// Lesson placeholders: `{level}`, `{grade}`, `{subject}`, `{topic}`.
/// Review placeholders: `{level}`, `{grade}`, `{subject}`, `{specialization_clause}`, `{period}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub lesson_system: String,
  pub lesson_user_template: String,
  pub review_system: String,
  pub review_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      lesson_system: "أنت أستاذ جزائري خبير. هدفك تقديم محتوى تعليمي غني ودقيق يوافق المنهاج الوزاري الجزائري. يجب أن تكون الجداول والمخططات دقيقة ومفيدة جداً للطلبة. تأكد من إخراج JSON نظيف وصالح.".into(),
      lesson_user_template: r#"أريد درساً تعليمياً متكاملاً وفيديوهات يوتيوب حقيقية تشرح درس "{topic}" لمادة "{subject}" للسنة "{grade}" ({level}) في الجزائر.

قم بالبحث واستخدام معلومات دقيقة لتقديم:
1. شرح مفصل وشامل للدرس.
2. جداول تعليمية (للمقارنات أو تصنيفات أو تلخيص قوانين).
3. مخطط تدفقي (Flowchart) أو مخطط مفاهيمي يشرح تسلسل الأفكار.
4. تمرين تطبيقي لاختبار الفهم مع الحل النموذجي.
5. روابط فيديوهات يوتيوب شغالة من قنوات جزائرية موثوقة.

أعطني النتيجة بتنسيق JSON حصراً تحتوي على:
- title: عنوان الدرس.
- explanation: ملخص سريع (فقرة واحدة).
- fullExplanation: شرح مفصل وعميق مقسم إلى فقرات.
- keyPoints: قائمة بأهم النقاط المستخلصة.
- tables: مصفوفة من الجداول، كل جدول يحتوي على title و headers و rows (مصفوفة من المصفوفات).
- diagram: مصفوفة من الخطوات للمخطط، كل خطوة لها label و description.
- exercise: نص تمرين تطبيقي حول الدرس.
- solution: الحل المفصل لهذا التمرين.
- videos: مصفوفة فيديوهات (كل فيديو له title و url)."#.into(),
      review_system: "أنت أستاذ خبير متخصص في المراجعات النهائية والتحضير لشهادات الباكالوريا والتعليم المتوسط في الجزائر. ركز على التلخيص المركز والمفيد جداً للتلميذ ليلة الامتحان. تأكد من الرد بتنسيق JSON صالح.".into(),
      review_user_template: r#"أريد مراجعة شاملة ومنظمة لمادة "{subject}"، للسنة "{grade}" ({level}){specialization_clause} في الجزائر، للفترة: "{period}".

يجب أن تتضمن المراجعة:
1. ملخصاً ذكياً للمفاهيم الأساسية التي تم تناولها في هذه الفترة.
2. جدولاً شاملاً لأهم القوانين أو القواعد أو التواريخ (حسب المادة).
3. توقعات لأهم المواضيع التي قد ترد في الاختبارات أو الشهادة.
4. نصائح ذهبية للمراجعة والتعامل مع ورقة الامتحان.
5. فيديو مراجعة شاملة (Marathon review) شغال من يوتيوب لأساتذة جزائريين.

أعطني النتيجة بتنسيق JSON يحتوي على:
- title: عنوان المراجعة.
- summary: ملخص شامل مقسم لفقرات.
- keyConcepts: قائمة بالمفاهيم الأساسية.
- tables: مصفوفة جداول (title, headers, rows).
- examPredictions: قائمة بالتوقعات الهامة للاختبار.
- tips: نصائح للمراجعة.
- videos: مصفوفة فيديوهات (title, url)."#.into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "madrasati_backend", %path, "Loaded prompt config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "madrasati_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "madrasati_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: AgentConfig = toml::from_str(
      r#"
      [prompts]
      review_system = "custom"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.prompts.review_system, "custom");
    assert_eq!(cfg.prompts.lesson_system, Prompts::default().lesson_system);
  }

  #[test]
  fn default_templates_name_their_placeholders() {
    let p = Prompts::default();
    for key in ["{topic}", "{subject}", "{grade}", "{level}"] {
      assert!(p.lesson_user_template.contains(key), "lesson template lacks {key}");
    }
    for key in ["{subject}", "{grade}", "{period}", "{specialization_clause}"] {
      assert!(p.review_user_template.contains(key), "review template lacks {key}");
    }
  }
}
