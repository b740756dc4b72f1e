use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum VisualState {
    Solid,
    Transparent,
}

impl VisualState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualState::Solid => "solid",
            VisualState::Transparent => "transparent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LoopState {
    #[default]
    Uninitialized,
    Converged(VisualState),
    Correcting,
}

/// Which side of the scroll threshold the viewport was on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScrollBucket {
    AtTop,
    Scrolled,
}

/// What the loop last wrote and the inputs it wrote for.
///
/// The record is a hint for logging and for skipping work; it never decides
/// what is correct. Every check re-reads the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObservedRecord {
    pub applied: Option<VisualState>,
    pub scroll_bucket: Option<ScrollBucket>,
    pub eligible: Option<bool>,
}

impl ObservedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the inputs differ from those seen at the previous check.
    pub fn inputs_changed(&self, bucket: ScrollBucket, eligible: bool) -> bool {
        self.scroll_bucket != Some(bucket) || self.eligible != Some(eligible)
    }

    pub fn note_inputs(&mut self, bucket: ScrollBucket, eligible: bool) {
        self.scroll_bucket = Some(bucket);
        self.eligible = Some(eligible);
    }

    pub fn note_applied(&mut self, state: VisualState) {
        self.applied = Some(state);
    }
}
