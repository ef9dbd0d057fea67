//! Static, best-effort model metadata. Nothing here is authoritative — these
//! tables exist so the orchestrator can make soft decisions (warn on a long
//! history, skip sending tool schemas to a model that can't use them); no
//! caller should treat a `None` as "this model doesn't exist".

/// Rough context window, in tokens, for models seen in the wild for each
/// wire protocol. Matches by prefix so dated snapshots (`gpt-4o-2024-08-06`)
/// resolve the same as the bare name.
pub fn max_context_tokens(model: &str) -> Option<u32> {
    let table: &[(&str, u32)] = &[
        ("gpt-4o", 128_000),
        ("gpt-4.1", 1_047_576),
        ("gpt-4-turbo", 128_000),
        ("gpt-4", 8_192),
        ("gpt-3.5-turbo", 16_385),
        ("o1", 200_000),
        ("o3", 200_000),
        ("gemini-1.5-pro", 2_097_152),
        ("gemini-1.5-flash", 1_048_576),
        ("gemini-2.0", 1_048_576),
        ("gemini-2.5", 1_048_576),
    ];
    table
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, tokens)| *tokens)
}

/// Whether a model is known to support tool/function calling. Defaults to
/// `true` for unrecognized models — refusing to attach tool schemas is a
/// worse failure mode than the provider ignoring schemas it doesn't use.
pub fn supports_tools(model: &str) -> bool {
    const NO_TOOLS: &[&str] = &["gpt-3.5-turbo-instruct"];
    !NO_TOOLS.iter().any(|m| model.starts_with(m))
}

/// Whether a model is known to accept inline image content blocks.
pub fn supports_vision(model: &str) -> bool {
    const VISION: &[&str] = &[
        "gpt-4o", "gpt-4.1", "gpt-4-turbo", "o1", "o3", "gemini-1.5", "gemini-2.0", "gemini-2.5",
    ];
    VISION.iter().any(|m| model.starts_with(m))
}
