//! Model profiles, preference resolution, and task-category routing.

use crate::error::GenerationError;

/// A selectable upstream model with its user-facing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelProfile {
    /// Short key used in `/model <key>`.
    pub key: &'static str,
    /// Identifier passed to the generation API.
    pub upstream_name: &'static str,
    pub display_label: &'static str,
    pub description: &'static str,
}

/// The static profile set. Configured at process start, never mutated.
pub const PROFILES: &[ModelProfile] = &[
    ModelProfile {
        key: "flash",
        upstream_name: "gemini-2.5-flash",
        display_label: "Gemini 2.5 Flash",
        description: "nhanh, đa năng, hiểu được ảnh (mặc định)",
    },
    ModelProfile {
        key: "pro",
        upstream_name: "gemini-2.5-pro",
        display_label: "Gemini 2.5 Pro",
        description: "suy luận sâu cho câu hỏi khó",
    },
    ModelProfile {
        key: "lite",
        upstream_name: "gemini-2.5-flash-lite",
        display_label: "Gemini 2.5 Flash Lite",
        description: "ổn định, độ trễ thấp, hợp với code và toán",
    },
];

/// Fallback ordering used by the retry controller, independent of the
/// user's selection. Most likely to succeed under load first.
pub const FALLBACK_ORDER: &[&str] = &["flash", "lite", "pro"];

/// A user's stored model preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelPreference {
    /// Choose by inferred task category.
    Auto,
    /// Always use the profile with this key.
    Model(String),
}

/// Inferred category of the current input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    Image,
    CodeMath,
    General,
}

/// Look up a profile by key.
pub fn profile(key: &str) -> Option<&'static ModelProfile> {
    PROFILES.iter().find(|p| p.key == key)
}

/// The baseline profile used when no preference is stored.
pub fn default_profile() -> &'static ModelProfile {
    profile("flash").expect("default profile is configured")
}

/// Profiles tried by the retry controller after the first attempt fails.
pub fn fallback_profiles() -> Vec<&'static ModelProfile> {
    FALLBACK_ORDER
        .iter()
        .filter_map(|key| profile(key))
        .collect()
}

/// Resolve a preference and inferred category to a concrete profile.
///
/// An explicit valid key wins regardless of category. Auto (or no stored
/// preference) routes by category. An unknown explicit key is an error so
/// the caller can report the valid keys.
pub fn select(
    preference: Option<&ModelPreference>,
    category: TaskCategory,
) -> Result<&'static ModelProfile, GenerationError> {
    match preference {
        Some(ModelPreference::Model(key)) => {
            profile(key).ok_or_else(|| GenerationError::UnknownModel(key.clone()))
        }
        Some(ModelPreference::Auto) | None => Ok(match category {
            TaskCategory::Image => default_profile(),
            TaskCategory::CodeMath => profile("lite").expect("lite profile is configured"),
            TaskCategory::General => default_profile(),
        }),
    }
}

/// Infer the task category from the input text and attachment kind.
///
/// Keyword matching is deliberately crude; the trigger words are policy
/// data on `CategoryConfig`, not logic baked in here.
pub fn infer_category(text: &str, has_image: bool, code_math_keywords: &[String]) -> TaskCategory {
    if has_image {
        return TaskCategory::Image;
    }
    let lower = text.to_lowercase();
    if code_math_keywords
        .iter()
        .any(|keyword| lower.contains(keyword.as_str()))
    {
        return TaskCategory::CodeMath;
    }
    TaskCategory::General
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryConfig;

    #[test]
    fn test_explicit_key_wins_over_category() {
        let preference = ModelPreference::Model("pro".into());
        let selected = select(Some(&preference), TaskCategory::CodeMath).unwrap();
        assert_eq!(selected.key, "pro");
    }

    #[test]
    fn test_auto_routes_by_category() {
        let auto = ModelPreference::Auto;
        assert_eq!(
            select(Some(&auto), TaskCategory::Image).unwrap().key,
            "flash"
        );
        assert_eq!(
            select(Some(&auto), TaskCategory::CodeMath).unwrap().key,
            "lite"
        );
        assert_eq!(
            select(Some(&auto), TaskCategory::General).unwrap().key,
            "flash"
        );
    }

    #[test]
    fn test_absent_preference_uses_default() {
        assert_eq!(select(None, TaskCategory::General).unwrap().key, "flash");
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let preference = ModelPreference::Model("ultra".into());
        let error = select(Some(&preference), TaskCategory::General).unwrap_err();
        assert!(matches!(error, GenerationError::UnknownModel(key) if key == "ultra"));
    }

    #[test]
    fn test_fallback_order_resolves_to_configured_profiles() {
        let fallbacks = fallback_profiles();
        assert_eq!(fallbacks.len(), FALLBACK_ORDER.len());
        assert_eq!(fallbacks[0].key, "flash");
    }

    #[test]
    fn test_infer_category() {
        let config = CategoryConfig::default();
        let keywords = &config.code_math_keywords;

        assert_eq!(
            infer_category("mô tả ảnh này", true, keywords),
            TaskCategory::Image
        );
        assert_eq!(
            infer_category("Giải phương trình x^2 = 4", false, keywords),
            TaskCategory::CodeMath
        );
        assert_eq!(
            infer_category("Viết CODE Python tính giai thừa", false, keywords),
            TaskCategory::CodeMath
        );
        assert_eq!(
            infer_category("Hôm nay trời đẹp quá", false, keywords),
            TaskCategory::General
        );
    }
}
