//! Prompt construction per pipeline mode

use draftgate_core::{GenerationMode, GenerationRequest, ModelCall, PipelineMode};

const DRAFT_SYSTEM: &str = "You are a newsroom drafting assistant. Answer with one JSON object only: \
{\"title\", \"content\", \"sections\": [{\"heading\", \"body\"}], \
\"compliance\": {\"riskLevel\": \"low|medium|high\", \"flags\": []}, \
\"sourceCitation\": {\"url\", \"source\"}, \"mediaSlots\": [{\"id\", \"kind\", \"caption\", \"anchor\"}]}. \
Cite only the offered reference URLs, and only in sourceCitation. Never put citation markers in the body. \
Do not copy the reference title or sentences. Avoid guarantees, absolute claims and personal data.";

const PARAGRAPH_SYSTEM: &str = "You rewrite a single paragraph of a news draft. \
Answer with {\"paragraph\": \"...\"} only. Keep facts, tone and length; add no citation markers.";

const CHAT_SYSTEM: &str = "You are an editorial assistant for reporters. Answer briefly in plain text. \
Separate verified facts from claims and prefer neutral wording.";

pub fn draft_call(request: &GenerationRequest, citation_pool: &[String]) -> ModelCall {
    let shape = match request.mode {
        GenerationMode::Draft => "a short draft: at least 1 section and at most 1 media slot",
        GenerationMode::InteractiveLongform => {
            "an interactive long-form article: at least 3 sections and at least 3 media slots"
        }
    };

    let mut prompt = format!("Keyword: {}\nWrite {}.\n", request.keyword.trim(), shape);
    if let Some(reference) = &request.reference_article {
        prompt.push_str(&format!(
            "Reference article:\n- title: {}\n- summary: {}\n- url: {}\n- source: {}\n",
            reference.title, reference.summary, reference.url, reference.source
        ));
    }
    if !citation_pool.is_empty() {
        prompt.push_str(&format!("Allowed citation URLs: {}\n", citation_pool.join(", ")));
    }

    ModelCall {
        mode: request.mode.pipeline(),
        system: DRAFT_SYSTEM.to_string(),
        prompt,
        keyword: request.keyword.trim().to_string(),
        reference: request.reference_article.clone(),
        citation_pool: citation_pool.to_vec(),
    }
}

pub fn paragraph_call(request: &GenerationRequest, paragraphs: &[String], index: usize) -> ModelCall {
    let before = index.checked_sub(1).and_then(|i| paragraphs.get(i));
    let after = paragraphs.get(index + 1);

    let mut prompt = format!("Keyword: {}\n", request.keyword.trim());
    if let Some(before) = before {
        prompt.push_str(&format!("Previous paragraph: {}\n", before));
    }
    prompt.push_str(&format!(
        "Paragraph to rewrite: {}\n",
        paragraphs.get(index).map(String::as_str).unwrap_or_default()
    ));
    if let Some(after) = after {
        prompt.push_str(&format!("Next paragraph: {}\n", after));
    }

    ModelCall {
        mode: PipelineMode::ParagraphRegeneration,
        system: PARAGRAPH_SYSTEM.to_string(),
        prompt,
        keyword: request.keyword.trim().to_string(),
        reference: request.reference_article.clone(),
        citation_pool: Vec::new(),
    }
}

pub fn chat_call(message: &str) -> ModelCall {
    let message = message.trim();
    ModelCall {
        mode: PipelineMode::Chat,
        system: CHAT_SYSTEM.to_string(),
        prompt: message.to_string(),
        keyword: message.chars().take(40).collect(),
        reference: None,
        citation_pool: Vec::new(),
    }
}
