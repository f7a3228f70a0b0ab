//! Prompt construction for the commentary generator.

/// Prompt sent by the startup and on-demand connectivity probe.
pub const PROBE_PROMPT: &str = "Hello";

/// Builds the commentary prompt for one position.
///
/// `context` describes how the position was reached, e.g.
/// `"Move 12 (Black): e7e5 g1f3"` or `"Initial position"`. An empty context
/// is omitted.
pub fn position_prompt(fen: &str, context: &str) -> String {
    let mut prompt = format!(
        "You are a lively chess coach commenting on a game as it unfolds.\n\
         Position (FEN): {fen}\n"
    );
    if !context.trim().is_empty() {
        prompt.push_str(&format!("Context: {}\n", context.trim()));
    }
    prompt.push_str(
        "\nIn a short paragraph, explain what is happening on the board: \
         the key threats, plans for both sides, and whether the last move \
         was strong or weak. Keep it concrete and entertaining.",
    );
    prompt
}

/// Builds the prompt for a free-form question about a position.
pub fn question_prompt(fen: &str, question: &str, previous_moves: &str) -> String {
    let mut prompt = format!(
        "You are a chess coach answering a student's question.\n\
         Position (FEN): {fen}\n"
    );
    if !previous_moves.trim().is_empty() {
        prompt.push_str(&format!("Previous moves: {}\n", previous_moves.trim()));
    }
    prompt.push_str(&format!(
        "\nQuestion: {}\n\nAnswer clearly and refer to concrete moves where you can.",
        question.trim()
    ));
    prompt
}
