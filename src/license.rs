// src/license.rs

use crate::model::{LicenseChoice, Timestamp};

/// The two license identifiers a run chooses between
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicensePair {
    pub before: String,
    pub after: String,
}

impl LicensePair {
    pub fn id(&self, choice: LicenseChoice) -> &str {
        match choice {
            LicenseChoice::Before => &self.before,
            LicenseChoice::After => &self.after,
        }
    }
}

/// Files last changed strictly after the cutoff get the "after" license.
/// Missing data on either side also resolves to "after".
pub fn classify(last_change: Option<Timestamp>, cutoff: Option<Timestamp>) -> LicenseChoice {
    match (last_change, cutoff) {
        (Some(changed), Some(cutoff)) if changed <= cutoff => LicenseChoice::Before,
        _ => LicenseChoice::After,
    }
}
