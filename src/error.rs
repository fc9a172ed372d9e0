#[derive(Debug, thiserror::Error)]
pub enum PowerError {
    #[error("{stage} did not converge within {iterations} iterations")]
    NoConvergence {
        stage: &'static str,
        iterations: usize,
    },
    #[error("eigenvector matrix is singular (condition number {condition:e}); input is not diagonalizable")]
    SingularEigenvectors { condition: f64 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
