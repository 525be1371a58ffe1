use serde::Deserialize;

/// Contact fields of an account row, for cells that only need to reach
/// the person behind it.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountContact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl AccountContact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
