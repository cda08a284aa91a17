use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required source column is absent. The pipeline never proceeds with
    /// a partial column set.
    #[error("missing required column `{field}` (accepted headers: {})", .aliases.join(", "))]
    MissingColumn { field: String, aliases: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn missing_column(field: &str, aliases: &[String]) -> Self {
        PipelineError::MissingColumn {
            field: field.to_string(),
            aliases: aliases.to_vec(),
        }
    }

    /// True for errors that stem from the shape of the data rather than I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::MissingColumn { .. })
    }
}
