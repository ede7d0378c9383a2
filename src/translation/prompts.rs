/*!
 * Translation styles and their prompts.
 *
 * Every style has a system prompt and a user template containing a `{text}` placeholder.
 * Defaults are built in; the configuration file may replace them per style.
 */

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the chunk text in user templates
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Register of the source book, used to pick a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStyle {
    /// Novels and literary prose
    Fiction,
    /// Popular science and academic writing
    Science,
    #[default]
    General,
}

impl TranslationStyle {
    pub fn all() -> [TranslationStyle; 3] {
        [Self::Fiction, Self::Science, Self::General]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fiction => "fiction",
            Self::Science => "science",
            Self::General => "general",
        }
    }
}

impl fmt::Display for TranslationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fiction" => Ok(Self::Fiction),
            "science" => Ok(Self::Science),
            "general" => Ok(Self::General),
            _ => Err(format!("Unknown translation style: {}", s)),
        }
    }
}

/// Prompt pair for one style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePrompt {
    pub style: TranslationStyle,
    pub system_prompt: String,
    /// User message; `{text}` is replaced by the chunk
    pub user_template: String,
}

impl StylePrompt {
    /// Built-in prompt for a style
    pub fn default_for(style: TranslationStyle) -> Self {
        let (system_prompt, user_template) = match style {
            TranslationStyle::Fiction => (
                "你是一位资深的文学翻译家，专精于英文小说的中文翻译。保持原作的文学风格和语言韵味。",
                "直接翻译下面的英文小说内容为中文，保持原文的语气和氛围。不要添加任何解释或说明，段落之间保留空行，只输出翻译结果：\n\n{text}",
            ),
            TranslationStyle::Science => (
                "你是一位专业的科技翻译专家，擅长翻译科普和学术内容。确保专业术语准确，逻辑清晰。",
                "直接翻译下面的科技内容为中文，保持专业术语准确。段落之间保留空行，只输出翻译结果：\n\n{text}",
            ),
            TranslationStyle::General => (
                "你是一位专业的翻译工作者，能够准确、流畅地进行英中翻译。",
                "直接翻译下面的英文为中文。段落之间保留空行，只输出翻译结果：\n\n{text}",
            ),
        };
        Self {
            style,
            system_prompt: system_prompt.to_string(),
            user_template: user_template.to_string(),
        }
    }

    /// User message for a chunk
    pub fn render_user(&self, text: &str) -> String {
        if self.user_template.contains(TEXT_PLACEHOLDER) {
            self.user_template.replace(TEXT_PLACEHOLDER, text)
        } else {
            format!("{}\n\n{}", self.user_template, text)
        }
    }
}

/// The built-in prompts for every style
pub fn default_prompts() -> Vec<StylePrompt> {
    TranslationStyle::all().into_iter().map(StylePrompt::default_for).collect()
}

/// Prompt configured for `style`, or the built-in one
pub fn prompt_for(prompts: &[StylePrompt], style: TranslationStyle) -> StylePrompt {
    prompts
        .iter()
        .find(|prompt| prompt.style == style)
        .cloned()
        .unwrap_or_else(|| StylePrompt::default_for(style))
}
