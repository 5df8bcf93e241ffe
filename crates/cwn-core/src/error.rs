#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No beneficiaries eligible for the configured age tier")]
    NoEligibleBeneficiaries,

    #[error("Operator declined to continue")]
    Declined,

    #[error("Unexpected response from '{endpoint}' (status {status}): {body}")]
    UnexpectedResponse {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
}
