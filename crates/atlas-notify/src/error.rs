#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification sink failed: {message}")]
    SinkFailed { message: String },
}

#[cfg(test)]
mod tests {
    use super::NotifyError;

    #[test]
    fn sink_failed_formats_failure_message() {
        let err = NotifyError::SinkFailed {
            message: "broken pipe".to_string(),
        };
        assert_eq!(err.to_string(), "notification sink failed: broken pipe");
        assert!(matches!(err, NotifyError::SinkFailed { ref message } if message == "broken pipe"));
    }
}
