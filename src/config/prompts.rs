//! Prompt templates for Spor.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub chat: ChatPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt used to answer a question about a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    /// Single user-message template with `{{history}}`, `{{context}}` and
    /// `{{question}}` placeholders.
    pub template: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are a helpful and intelligent AI assistant with both memory and access to retrieved knowledge.
You are provided with the content of the video, so you already know what is said in it.
Your goal is to provide accurate, thoughtful, and context-aware responses to the user.
You can answer questions, summarize, explain concepts, give recommendations, and more.
If the request is to summarize or explain a song or poem, explain it in depth.

### Available Information
- **Conversation History:**
{{history}}

- **Retrieved Context from the Video:**
{{context}}

### Instructions
1. Use the history and retrieved context when relevant.
2. If the user asks beyond this information, rely on your reasoning and general knowledge.
3. Provide structured, clear, and user-friendly answers.

### User Request
{{question}}

### Your Response
"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let chat_path = custom_path.join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
