use serde::{Deserialize, Serialize};

/// Header carrying the authenticated profile id, set by the fronting
/// session layer.
pub const VIEWER_HEADER: &str = "x-profile-id";

/// The profile on whose behalf a request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub profile_id: i64,
}

impl Viewer {
    pub fn new(profile_id: i64) -> Self {
        Self { profile_id }
    }
}
