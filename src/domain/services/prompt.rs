/// Instructions for the shopping assistant persona.
const ASSISTANT_INSTRUCTIONS: &str = "\
You are a shopping assistant answering spoken questions about a product catalog.

Rules:
1. Use ONLY the product information below to answer.
2. Be direct and efficient: short, clear sentences suitable for being read aloud.
3. Do not repeat yourself and skip unnecessary detail; the answer must take less \
   than 30 seconds to say.
4. If the information is not enough to answer, say so clearly instead of guessing.";

pub const CONTEXT_HEADER: &str = "Relevant product information:";

const NO_CONTEXT_NOTICE: &str = "\
No product information is available for this question. Tell the user you do not \
have enough information to answer it.";

/// Answer used when the model returns no candidates.
pub const FALLBACK_ANSWER: &str = "Sorry, I could not generate a response.";

/// Build the system prompt grounding the model in `context`.
pub fn compose_system_prompt(context: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        format!("{ASSISTANT_INSTRUCTIONS}\n\n{NO_CONTEXT_NOTICE}")
    } else {
        format!("{ASSISTANT_INSTRUCTIONS}\n\n{CONTEXT_HEADER}\n{context}")
    }
}
