/// Named difficulty preset controlling combo length.
///
/// `label` is the identity used for persistence keys; `time_ms` is a nominal
/// per-round budget carried for display purposes and not enforced anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub length: usize,
    pub time_ms: u64,
    pub label: &'static str,
}

pub const EASY: Policy = Policy {
    length: 4,
    time_ms: 6000,
    label: "Easy",
};

pub const MEDIUM: Policy = Policy {
    length: 8,
    time_ms: 6000,
    label: "Medium",
};

pub const HARD: Policy = Policy {
    length: 10,
    time_ms: 6000,
    label: "Hard",
};

/// Fixed, ordered catalog. No custom policies.
pub const DIFFICULTIES: [Policy; 3] = [EASY, MEDIUM, HARD];

pub fn by_label(label: &str) -> Option<Policy> {
    DIFFICULTIES.iter().copied().find(|p| p.label == label)
}
