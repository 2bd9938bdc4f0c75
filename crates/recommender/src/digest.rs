//! One-sentence TL;DR for the top recommendations

use crate::candidate::CandidatePaper;
use paperrank_common::config::RerankConfig;
use paperrank_common::llm::{ChatMessage, Llm};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are an assistant who perfectly summarizes scientific paper, \
and gives the core idea of the paper to the user.";

/// How many papers to summarize and how much of each summary to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOptions {
    pub top_k: usize,
    pub max_chars: usize,
}

impl From<&RerankConfig> for DigestOptions {
    fn from(config: &RerankConfig) -> Self {
        Self {
            top_k: config.tldr_top_k,
            max_chars: config.tldr_max_chars,
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Prompt asking for a one-sentence TL;DR of `paper` in `lang`
pub fn tldr_messages(paper: &CandidatePaper, lang: &str, max_chars: usize) -> Vec<ChatMessage> {
    let user = format!(
        "Given the title and abstract of a paper, generate a one-sentence TLDR summary in {lang}:\n\n\
         \\title{{{title}}}\n\n\
         \\begin{{abstract}}{summary}\\end{{abstract}}",
        title = paper.title,
        summary = truncate_chars(&paper.summary, max_chars),
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Fill `tldr` on the first `top_k` papers.
///
/// Papers should already be ranked. A failed generation is logged and leaves
/// that paper's `tldr` unset. Returns the number of summaries written.
pub async fn summarize_top(llm: &Llm, papers: &mut [CandidatePaper], options: DigestOptions) -> usize {
    let mut written = 0;

    for paper in papers.iter_mut().take(options.top_k) {
        let messages = tldr_messages(paper, llm.lang(), options.max_chars);
        match llm.generate(&messages).await {
            Ok(tldr) => {
                paper.tldr = Some(tldr);
                written += 1;
            }
            Err(e) => {
                warn!(arxiv_id = %paper.arxiv_id, error = %e, "TL;DR generation failed");
            }
        }
    }

    info!(written, requested = options.top_k.min(papers.len()), "TL;DR digest finished");
    written
}
