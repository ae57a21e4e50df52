//! Context window sizing for generate calls
//!
//! Prompts are code-heavy, so tokens are estimated at ~3 characters
//! each. The window is the smallest power of two in [2^14, 2^17] that
//! fits the prompt plus a response reserve; anything larger overflows.

use crate::error::{ParanoidError, Result};

/// Minimum context window (16k tokens)
pub const CONTEXT_MIN: u32 = 1 << 14;
/// Maximum context window (128k tokens)
pub const CONTEXT_MAX: u32 = 1 << 17;

/// Conservative chars-per-token estimate for code-heavy prompts
pub const CHARS_PER_TOKEN: usize = 3;

const RESPONSE_TOKENS_SMALL: u32 = 2048;
const RESPONSE_TOKENS_LARGE: u32 = 4096;
const RESPONSE_TOKENS_SMALL_THRESHOLD: u32 = 16384;

/// Compute the context window (num_ctx) for a prompt, or fail with
/// `ContextOverflow` when the estimate exceeds [`CONTEXT_MAX`].
pub fn context_size_for_prompt(prompt: &str) -> Result<u32> {
    let estimated_tokens = (prompt.len() / CHARS_PER_TOKEN) as u32;
    let response_tokens = if estimated_tokens < RESPONSE_TOKENS_SMALL_THRESHOLD {
        RESPONSE_TOKENS_SMALL
    } else {
        RESPONSE_TOKENS_LARGE
    };
    let total = estimated_tokens + response_tokens;

    for shift in 14..=17u32 {
        let size = 1u32 << shift;
        if total <= size {
            return Ok(size);
        }
    }

    Err(ParanoidError::ContextOverflow {
        message: format!(
            "estimated {} tokens exceeds maximum context {}",
            total, CONTEXT_MAX
        ),
    })
}

/// Truncate content so the surrounding prompt fits the maximum window.
/// `reserved_chars` covers the template and any extra context blocks.
pub fn truncate_for_context(content: &str, reserved_chars: usize) -> &str {
    let budget =
        (CONTEXT_MAX as usize).saturating_sub(RESPONSE_TOKENS_LARGE as usize) * CHARS_PER_TOKEN;
    let available = budget.saturating_sub(reserved_chars);
    if content.len() <= available {
        return content;
    }
    // Cut on a char boundary at or below the budget
    let mut end = available;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
