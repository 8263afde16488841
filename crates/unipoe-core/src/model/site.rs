use serde::{Deserialize, Serialize};

/// A controller site. Devices are listed per site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Short internal name used in API paths (`default`, `ab12cd34`, ...).
    pub name: String,
    pub description: Option<String>,
}
