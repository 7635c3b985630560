use crate::models::RetrievedChunk;

pub const SYSTEM_INSTRUCTION: &str =
    "Tu es un assistant utile qui aide avec l'application DigiTickets. Réponds en français.";

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// `[Extrait i] (score=…)` blocks, numbered from 1 in ranking order.
pub fn render_context(hits: &[RetrievedChunk]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[Extrait {}] (score={:.3})\n{}", i + 1, hit.score + 0.0, hit.text))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "\nQuestion utilisateur:\n{question}\n\n\
         Contexte pertinent:\n{context}\n\n\
         Consignes:\n\
         - Réponds directement et clairement à la question.\n\
         - Si une étape est nécessaire dans l'app, explique-la pas à pas.\n\
         - Ne mentionne pas les sources ou la documentation.\n\
         - Sois concis et utile.\n\
         - Si l'info n'est pas dans le contexte, dis-le simplement.\n"
    )
}
