use log::{debug, error, info, warn};

/// Initialize the logger
pub fn init_logger() {
    env_logger::init();
}

/// Log an informational message
pub fn log_info(message: &str) {
    info!("{}", message);
}

/// Log a debug message
pub fn log_debug(message: &str) {
    debug!("{}", message);
}

/// Log a warning message
pub fn log_warning(message: &str) {
    warn!("{}", message);
}

/// Log an error message
pub fn log_error(message: &str) {
    error!("{}", message);
}

/// Log the ledger RPC endpoint in use for a network
pub fn log_ledger_connection_details(rpc_url: &str, network: &str) {
    info!("Ledger RPC for {}: {}", network, rpc_url);
}

/// Log database connection details with credentials masked
pub fn log_database_connection_details(url: &str) {
    info!("Database connection details: {}", mask_credentials(url));
}

fn mask_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_user_and_password() {
        assert_eq!(
            mask_credentials("postgres://admin:hunter2@db:5432/registry"),
            "postgres://***@db:5432/registry"
        );
        assert_eq!(mask_credentials("sqlite::memory:"), "sqlite::memory:");
    }
}
