//! Per-query offset modifiers (§3): group anchor and delta rewind.

#[derive(Debug, Clone, Default)]
pub struct KqlRestrictions {
    pub group_id: Option<String>,
    pub delta: Option<i64>,
}

impl KqlRestrictions {
    pub fn none() -> Self {
        KqlRestrictions::default()
    }
}
