use super::*;
use std::error::Error as StdError;

#[test]
fn test_access_denied_message() {
    let error = Error::AccessDenied {
        repository: "octo/tool".to_string(),
        reason: "GitHub returned HTTP 401: Bad credentials".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Repository octo/tool is not accessible: GitHub returned HTTP 401: Bad credentials"
    );
}

#[test]
fn test_precondition_unmet_message() {
    let error = Error::PreconditionUnmet {
        branch: "staging".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Branch 'staging' does not exist or could not be verified"
    );
}

#[test]
fn test_remote_rejected_from_client_error_keeps_status() {
    let client_error = github_client::Error::RemoteStatus {
        status: 422,
        message: "Validation Failed".to_string(),
    };

    let error = Error::from(client_error);

    match error {
        Error::RemoteRejected { status, detail } => {
            assert_eq!(status, Some(422));
            assert_eq!(detail, "GitHub returned HTTP 422: Validation Failed");
        }
        other => panic!("Expected RemoteRejected, got {other:?}"),
    }
}

#[test]
fn test_remote_rejected_from_timeout_has_no_status() {
    let client_error = github_client::Error::Timeout(std::time::Duration::from_secs(30));

    let error = Error::from(client_error);

    assert!(matches!(error, Error::RemoteRejected { status: None, .. }));
}

#[test]
fn test_key_fetch_failed_message() {
    let error = Error::KeyFetchFailed("response is missing key_id".to_string());

    assert_eq!(
        error.to_string(),
        "Failed to fetch the Actions secrets public key: response is missing key_id"
    );
}

#[test]
fn test_validation_error_is_transparent() {
    let error = Error::from(ValidationError::empty_field("repository_name"));

    assert_eq!(error.to_string(), "Invalid repository_name: must not be empty");
    assert!(error.source().is_none());
}

#[test]
fn test_validation_error_constructors() {
    let too_long = ValidationError::too_long("owner_name", 40, 39);
    assert_eq!(too_long.field, "owner_name");
    assert_eq!(too_long.reason, "length 40 exceeds the maximum of 39");

    let format = ValidationError::invalid_format("owner_name", "must not contain '--'");
    assert_eq!(format.to_string(), "Invalid owner_name: must not contain '--'");
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
