//! Chat prompt construction for LLM-backed providers.

/// Display names understood by the model for the language labels used by clients.
fn language_name(tag: &str) -> &str {
    match tag {
        "繁體中文" | "zh-TW" => "Traditional Chinese",
        "简体中文" | "zh-CN" => "Simplified Chinese",
        "日本語" | "ja" => "Japanese",
        "한국어" | "ko" => "Korean",
        "English" | "en" | "en-US" => "English",
        other => other,
    }
}

pub const SYSTEM_PROMPT: &str =
    "You are a professional translator. Output only the translation, nothing else.";

pub fn build_user_prompt(text: &str, source_language: &str, target_language: &str) -> String {
    let target = language_name(target_language);
    let source = if source_language.eq_ignore_ascii_case("auto") {
        "automatically detected language"
    } else {
        language_name(source_language)
    };
    format!(
        "Please translate the following text from {source} to {target}. \
         Keep the translation natural and contextually appropriate. \
         Only return the translated text without explanations or additional formatting.\n\n\
         Text to translate: \"{text}\""
    )
}
