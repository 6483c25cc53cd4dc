use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Matchday(#[from] matchday::MatchdayError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} environment variable is required")]
    MissingEnv(&'static str),

    #[error("sign-in did not complete: {0}")]
    SignIn(String),
}
