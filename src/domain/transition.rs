//! Status transition detection between two consecutive check cycles

use serde::{Deserialize, Serialize};

use crate::domain::product::StockStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDecision {
    /// New status differs from the persisted one and must be written
    pub changed: bool,
    /// Change is an entry into stock; the owner gets an email
    pub should_notify: bool,
}

impl TransitionDecision {
    /// Decide whether `new_status` is a change worth persisting and announcing.
    ///
    /// An unset previous status differs from every status. There is no
    /// suppression window, so each re-entry into stock notifies again.
    pub fn detect(previous_status: Option<StockStatus>, new_status: StockStatus) -> Self {
        let changed = previous_status != Some(new_status);
        Self {
            changed,
            should_notify: changed && new_status == StockStatus::InStock,
        }
    }
}
