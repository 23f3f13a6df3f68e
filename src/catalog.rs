//! Curriculum catalog: fixed lookup tables for the Algerian school system.
//!
//! Nothing here is mutable or loaded at runtime. Lookups never fail: an unknown key
//! yields `None` or an empty slice, and the caller decides what that means.

use serde::Serialize;

use crate::domain::{Grade, Level, ReviewPeriod, Specialization, Subject};

const fn g(id: u8, label: &'static str) -> Grade {
  Grade { id, label }
}

const fn s(id: &'static str, name: &'static str, icon: &'static str) -> Subject {
  Subject { id, name, icon }
}

const PRIMARY_GRADES: &[Grade] = &[
  g(1, "الأولى ابتدائي"),
  g(2, "الثانية ابتدائي"),
  g(3, "الثالثة ابتدائي"),
  g(4, "الرابعة ابتدائي"),
  g(5, "الخامسة ابتدائي"),
];

const MIDDLE_GRADES: &[Grade] = &[
  g(1, "الأولى متوسط"),
  g(2, "الثانية متوسط"),
  g(3, "الثالثة متوسط"),
  g(4, "الرابعة متوسط (BEM)"),
];

const SECONDARY_GRADES: &[Grade] = &[
  g(1, "الأولى ثانوي"),
  g(2, "الثانية ثانوي"),
  g(3, "الثالثة ثانوي (BAC)"),
];

const PRIMARY_SUBJECTS: &[Subject] = &[
  s("ar", "اللغة العربية", "📖"),
  s("math", "الرياضيات", "➕"),
  s("islamic", "التربية الإسلامية", "🕌"),
  s("sci", "التربية العلمية والتكنولوجية", "🧪"),
  s("hist-geo", "التاريخ والجغرافيا", "🌍"),
  s("civic", "التربية المدنية", "🏢"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
];

const MIDDLE_SUBJECTS: &[Subject] = &[
  s("ar", "اللغة العربية", "📖"),
  s("math", "الرياضيات", "📐"),
  s("phys", "العلوم الفيزيائية والتكنولوجيا", "⚡"),
  s("sci", "علوم الطبيعة والحياة", "🌱"),
  s("hist-geo", "التاريخ والجغرافيا", "🗺️"),
  s("islamic", "التربية الإسلامية", "🌙"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
  s("civic", "التربية المدنية", "⚖️"),
  s("it", "المعلوماتية", "💻"),
];

const SPECIALIZATIONS: &[Specialization] = &[
  Specialization { id: "sci", name: "علوم تجريبية", icon: "🧬" },
  Specialization { id: "math", name: "رياضيات", icon: "📐" },
  Specialization { id: "tech-math", name: "تقني رياضي", icon: "⚙️" },
  Specialization { id: "mgt-econ", name: "تسيير واقتصاد", icon: "📈" },
  Specialization { id: "lit-philo", name: "آداب وفلسفة", icon: "💭" },
  Specialization { id: "lang", name: "لغات أجنبية", icon: "🗣️" },
];

const SCI_SUBJECTS: &[Subject] = &[
  s("sci", "علوم الطبيعة والحياة", "🌱"),
  s("phys", "العلوم الفيزيائية", "⚛️"),
  s("math", "الرياضيات", "📊"),
  s("ar", "اللغة العربية وآدابها", "🖋️"),
  s("philo", "الفلسفة", "💭"),
  s("hist-geo", "التاريخ والجغرافيا", "🌍"),
  s("islamic", "العلوم الإسلامية", "📜"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
];

const MATH_SUBJECTS: &[Subject] = &[
  s("math", "الرياضيات", "📐"),
  s("phys", "العلوم الفيزيائية", "⚛️"),
  s("sci", "علوم الطبيعة والحياة", "🧬"),
  s("ar", "اللغة العربية وآدابها", "🖋️"),
  s("philo", "الفلسفة", "💭"),
  s("hist-geo", "التاريخ والجغرافيا", "🌍"),
  s("islamic", "العلوم الإسلامية", "📜"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
];

const TECH_MATH_SUBJECTS: &[Subject] = &[
  s("eng", "التكنولوجيا (الهندسة)", "🛠️"),
  s("math", "الرياضيات", "📐"),
  s("phys", "العلوم الفيزيائية", "⚛️"),
  s("ar", "اللغة العربية وآدابها", "🖋️"),
  s("philo", "الفلسفة", "💭"),
  s("hist-geo", "التاريخ والجغرافيا", "🌍"),
  s("islamic", "العلوم الإسلامية", "📜"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
];

const MGT_ECON_SUBJECTS: &[Subject] = &[
  s("acc", "المحاسبة والمالية", "💰"),
  s("econ", "الاقتصاد والمناجمنت", "📈"),
  s("law", "القانون", "⚖️"),
  s("math", "الرياضيات", "📊"),
  s("ar", "اللغة العربية وآدابها", "🖋️"),
  s("philo", "الفلسفة", "💭"),
  s("hist-geo", "التاريخ والجغرافيا", "🌍"),
  s("islamic", "العلوم الإسلامية", "📜"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
];

const LIT_PHILO_SUBJECTS: &[Subject] = &[
  s("philo", "الفلسفة", "💭"),
  s("ar-lit", "الأدب العربي", "📖"),
  s("hist-geo", "التاريخ والجغرافيا", "🌍"),
  s("islamic", "العلوم الإسلامية", "📜"),
  s("math", "الرياضيات (أدبي)", "📊"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
];

const LANG_SUBJECTS: &[Subject] = &[
  s("ar", "اللغة العربية", "📖"),
  s("fr", "اللغة الفرنسية", "🇫🇷"),
  s("en", "اللغة الإنجليزية", "🇬🇧"),
  s("lang3", "اللغة الثالثة (إسباني/ألماني/إيطالي)", "🌐"),
  s("philo", "الفلسفة", "💭"),
  s("hist-geo", "التاريخ والجغرافيا", "🌍"),
  s("islamic", "العلوم الإسلامية", "📜"),
  s("math", "الرياضيات (أدبي)", "📊"),
];

/// Entry of the review-period picker.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PeriodOption {
  pub id: ReviewPeriod,
  pub label: &'static str,
  pub icon: &'static str,
  pub highlight: bool,
}

const PERIOD_OPTIONS: &[PeriodOption] = &[
  PeriodOption { id: ReviewPeriod::Semester1, label: "مراجعة الفصل الأول", icon: "❄️", highlight: false },
  PeriodOption { id: ReviewPeriod::Semester2, label: "مراجعة الفصل الثاني", icon: "🌱", highlight: false },
  PeriodOption { id: ReviewPeriod::Semester3, label: "مراجعة الفصل الثالث", icon: "☀️", highlight: false },
  PeriodOption { id: ReviewPeriod::FullYear, label: "المراجعة السنوية الشاملة", icon: "📚", highlight: false },
  PeriodOption { id: ReviewPeriod::CertificatePrep, label: "التحضير للشهادة النهائية", icon: "🏆", highlight: true },
];

pub fn level_label(level: Level) -> &'static str {
  match level {
    Level::Primary => "الطور الابتدائي",
    Level::Middle => "الطور المتوسط",
    Level::Secondary => "الطور الثانوي",
  }
}

pub fn grades(level: Level) -> &'static [Grade] {
  match level {
    Level::Primary => PRIMARY_GRADES,
    Level::Middle => MIDDLE_GRADES,
    Level::Secondary => SECONDARY_GRADES,
  }
}

pub fn grade(level: Level, id: u8) -> Option<Grade> {
  grades(level).iter().copied().find(|g| g.id == id)
}

/// Fixed subjects of a level. Secondary has none of its own (see `specialization_subjects`).
pub fn level_subjects(level: Level) -> &'static [Subject] {
  match level {
    Level::Primary => PRIMARY_SUBJECTS,
    Level::Middle => MIDDLE_SUBJECTS,
    Level::Secondary => &[],
  }
}

pub fn specializations() -> &'static [Specialization] {
  SPECIALIZATIONS
}

pub fn specialization(id: &str) -> Option<Specialization> {
  SPECIALIZATIONS.iter().copied().find(|sp| sp.id == id)
}

/// Subjects of a secondary specialization; empty for an unknown id.
pub fn specialization_subjects(id: &str) -> &'static [Subject] {
  match id {
    "sci" => SCI_SUBJECTS,
    "math" => MATH_SUBJECTS,
    "tech-math" => TECH_MATH_SUBJECTS,
    "mgt-econ" => MGT_ECON_SUBJECTS,
    "lit-philo" => LIT_PHILO_SUBJECTS,
    "lang" => LANG_SUBJECTS,
    _ => &[],
  }
}

/// The subject set implied by (level, specialization).
pub fn subjects(level: Level, specialization: Option<&str>) -> &'static [Subject] {
  match (level, specialization) {
    (Level::Secondary, Some(id)) => specialization_subjects(id),
    (Level::Secondary, None) => &[],
    (other, _) => level_subjects(other),
  }
}

pub fn period_options() -> &'static [PeriodOption] {
  PERIOD_OPTIONS
}

// --- Public snapshot of the whole catalog (served once to the presentation layer) ---

#[derive(Debug, Serialize)]
pub struct CatalogOut {
  pub levels: Vec<LevelOut>,
  pub specializations: Vec<SpecializationOut>,
  pub periods: &'static [PeriodOption],
}

#[derive(Debug, Serialize)]
pub struct LevelOut {
  pub id: Level,
  pub label: &'static str,
  pub grades: &'static [Grade],
  pub subjects: &'static [Subject],
}

#[derive(Debug, Serialize)]
pub struct SpecializationOut {
  #[serde(flatten)]
  pub specialization: Specialization,
  pub subjects: &'static [Subject],
}

pub fn snapshot() -> CatalogOut {
  CatalogOut {
    levels: Level::ALL
      .into_iter()
      .map(|l| LevelOut { id: l, label: level_label(l), grades: grades(l), subjects: level_subjects(l) })
      .collect(),
    specializations: SPECIALIZATIONS
      .iter()
      .map(|sp| SpecializationOut { specialization: *sp, subjects: specialization_subjects(sp.id) })
      .collect(),
    periods: PERIOD_OPTIONS,
  }
}
