/// Ambient execution context, attached to events that don't set their own
/// `stack`/`agent`/`run_id` (§4.5, §6).
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub stack: Option<String>,
    pub agent: Option<String>,
    pub run_id: Option<String>,
}
