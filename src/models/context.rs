/// Estimated context-window usage for the current session
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextData {
    pub tokens: u64,
    pub percentage: u32,
}
