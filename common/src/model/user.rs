use serde::{Deserialize, Serialize};

/// Access level of a user, as stored by the identity collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Registered but not yet granted anything.
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "view")]
    View,
    #[serde(rename = "edit")]
    Edit,
    #[serde(rename = "superadmin")]
    Superadmin,
}

impl Role {
    /// Parses the stored role string. Unknown values grant no access.
    pub fn parse(value: &str) -> Role {
        match value.trim() {
            "view" => Role::View,
            "edit" => Role::Edit,
            "superadmin" => Role::Superadmin,
            _ => Role::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::None => "",
            Role::View => "view",
            Role::Edit => "edit",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn can_view(self) -> bool {
        self != Role::None
    }

    pub fn can_edit(self) -> bool {
        matches!(self, Role::Edit | Role::Superadmin)
    }

    /// Import and user management are reserved to the highest role.
    pub fn is_superadmin(self) -> bool {
        self == Role::Superadmin
    }
}

/// A user known to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

/// The user on whose behalf a request runs. An empty `id` means nobody is logged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: String,
    pub role: Role,
}

impl ActingUser {
    pub fn anonymous() -> Self {
        ActingUser::default()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.id.trim().is_empty()
    }
}
