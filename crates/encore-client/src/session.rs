use encore_types::api::LoginResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub id: String,
    pub name: String,
}

/// A signed-in admin. Created by `RestStore::login`, dropped by `logout`.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: AdminUser,
}

impl From<LoginResponse> for Session {
    fn from(res: LoginResponse) -> Self {
        Self {
            token: res.token,
            user: AdminUser {
                id: res.user_id,
                name: res.name,
            },
        }
    }
}
