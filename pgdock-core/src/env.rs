use std::collections::BTreeMap;

/// Default `PGDATA` inside the official image.
pub const DEFAULT_PGDATA: &str = "/var/lib/postgresql/data";

/// Default `POSTGRES_HOST_AUTH_METHOD`.
pub const DEFAULT_HOST_AUTH_METHOD: &str = "password";

/// Environment for the official `postgres` image.
///
/// A `None` field is omitted from the container environment so the image
/// entrypoint applies its own default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresEnv {
    pub password: Option<String>,
    pub user: Option<String>,
    pub db: Option<String>,
    pub initdb_args: Option<String>,
    pub initdb_waldir: Option<String>,
    pub host_auth_method: Option<String>,
    pub pgdata: Option<String>,
}

impl Default for PostgresEnv {
    fn default() -> Self {
        Self {
            password: None,
            user: None,
            db: None,
            initdb_args: None,
            initdb_waldir: None,
            host_auth_method: Some(DEFAULT_HOST_AUTH_METHOD.to_string()),
            pgdata: Some(DEFAULT_PGDATA.to_string()),
        }
    }
}

impl PostgresEnv {
    /// Variables to pass to the container, keyed by name.
    pub fn to_vars(&self) -> BTreeMap<String, String> {
        [
            ("POSTGRES_PASSWORD", &self.password),
            ("POSTGRES_USER", &self.user),
            ("POSTGRES_DB", &self.db),
            ("POSTGRES_INITDB_ARGS", &self.initdb_args),
            ("POSTGRES_INITDB_WALDIR", &self.initdb_waldir),
            ("POSTGRES_HOST_AUTH_METHOD", &self.host_auth_method),
            ("PGDATA", &self.pgdata),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
        .collect()
    }
}
