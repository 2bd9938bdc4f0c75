//! Chat templates for local inference
//!
//! Qwen2.5 instruct models use ChatML:
//! ```text
//! <|im_start|>system
//! You are a helpful assistant.<|im_end|>
//! <|im_start|>user
//! ...<|im_end|>
//! <|im_start|>assistant
//! ```

use super::{ChatMessage, Role};

const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";

/// System prompt the Qwen2.5 template inserts when the conversation has none
pub const QWEN_DEFAULT_SYSTEM: &str =
    "You are Qwen, created by Alibaba Cloud. You are a helpful assistant.";

/// Stop sequence for ChatML generations
pub const CHATML_STOP: &str = IM_END;

/// Render messages as a ChatML prompt.
///
/// With `add_generation_prompt` the prompt ends with an open assistant turn
/// so the model continues as the assistant.
pub fn render_chatml(messages: &[ChatMessage], add_generation_prompt: bool) -> String {
    let mut prompt = String::new();

    if messages.first().map(|m| m.role) != Some(Role::System) {
        push_turn(&mut prompt, Role::System, QWEN_DEFAULT_SYSTEM);
    }

    for message in messages {
        push_turn(&mut prompt, message.role, &message.content);
    }

    if add_generation_prompt {
        prompt.push_str(IM_START);
        prompt.push_str(Role::Assistant.as_str());
        prompt.push('\n');
    }

    prompt
}

fn push_turn(prompt: &mut String, role: Role, content: &str) {
    prompt.push_str(IM_START);
    prompt.push_str(role.as_str());
    prompt.push('\n');
    prompt.push_str(content);
    prompt.push_str(IM_END);
    prompt.push('\n');
}
