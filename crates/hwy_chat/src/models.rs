//! Display helpers for the model catalogue.

use crate::types::ModelInfo;

/// Human-friendly model name: `library/code-llama:7b` becomes `Code Llama`.
pub fn format_model_name(name: &str) -> String {
    let base = name.split(':').next().unwrap_or(name);
    let last = base.rsplit('/').next().unwrap_or(base);
    if last.is_empty() {
        return name.to_string();
    }

    last.split(|c| c == '-' || c == '_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Short description of a model based on its family.
pub fn model_description(name: &str) -> &'static str {
    let name = name.to_lowercase();

    if name.contains("llama2") || name.contains("llama-2") {
        if name.contains("13b") {
            return "Large language model with 13B parameters, excellent reasoning";
        }
        if name.contains("70b") {
            return "Powerful 70B parameter model for complex tasks";
        }
        return "Fast and efficient general-purpose language model";
    }

    if name.contains("codellama") || name.contains("code-llama") {
        "Specialized for coding tasks and programming assistance"
    } else if name.contains("mistral") {
        "High performance instruction-following model"
    } else if name.contains("qwen") {
        "Excellent for multilingual tasks and reasoning"
    } else if name.contains("dolphin") {
        "Uncensored model fine-tuned for helpful responses"
    } else if name.contains("neural-chat") {
        "Optimized for conversational AI applications"
    } else if name.contains("openchat") {
        "High-quality open-source conversational model"
    } else if name.contains("zephyr") {
        "Helpful assistant model for various tasks"
    } else {
        "AI language model for text generation and conversation"
    }
}

/// A catalogue entry ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOption {
    pub id: String,
    pub display_name: String,
    pub description: &'static str,
}

impl From<&ModelInfo> for ModelOption {
    fn from(model: &ModelInfo) -> Self {
        Self {
            id: model.name.clone(),
            display_name: format_model_name(&model.name),
            description: model_description(&model.name),
        }
    }
}
