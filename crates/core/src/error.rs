/// Errors for checks that run before any remote call.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity (job, model, shop) is unknown.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller input was rejected.
    #[error("Invalid input: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = CoreError::NotFound {
            entity: "job",
            id: "42".into(),
        };
        assert_eq!(err.to_string(), "job not found: 42");
        assert_eq!(
            CoreError::Validation("prompt must not be empty".into()).to_string(),
            "Invalid input: prompt must not be empty"
        );
    }
}
