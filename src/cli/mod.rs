pub mod csv_import;
pub mod reset_db;
pub mod run_script;
pub mod suppliers;

use crate::util::env::ConnectionParams;

/// Environment parameters with the command-line overrides applied on top.
pub fn connection_params(database_url: Option<String>, schema: Option<String>) -> ConnectionParams {
    let mut params = ConnectionParams::from_env();
    if let Some(url) = database_url {
        // An explicit URL replaces every environment-derived part.
        params = ConnectionParams::with_url(url);
    }
    if schema.is_some() {
        params.schema = schema;
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_flag_replaces_environment_parts() {
        let params = connection_params(
            Some("postgres://localhost/north".into()),
            Some("staging".into()),
        );
        assert_eq!(params.url.as_deref(), Some("postgres://localhost/north"));
        assert_eq!(params.host, None);
        assert_eq!(params.schema.as_deref(), Some("staging"));
    }
}
