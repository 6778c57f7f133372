use crate::patterns::FATAL_MARKER;

/// True when the log carries no `fatal: [host]` marker and is not worth
/// sending down the pipeline.
pub fn should_ignore(log: &str) -> bool {
    !FATAL_MARKER.is_match(log)
}
