use std::time::Duration;

use error_stack::Report;

use crate::account::authorization::{AuthorizationDocument, SignedAuthorization};
use crate::codec::crypto::SIGNATURE_LENGTH;
use crate::errors::{AccountError, AccountResult};
use crate::signers::{CustodyError, KeyCustody};

/// Asks the key custody service to sign `document`.
///
/// Rejections, custody failures and an elapsed `timeout` all surface as
/// `AuthorizationDeclined`.
pub async fn request_signature(
    custody: &dyn KeyCustody,
    document: AuthorizationDocument,
    timeout: Option<Duration>,
) -> AccountResult<SignedAuthorization> {
    let typed_data = document.typed_data();
    let signing = custody.sign_typed_data(&typed_data, &document.prompt);

    let result = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, signing).await.map_err(|_| {
            crate::account_error!(
                AccountError::AuthorizationDeclined("signature prompt timed out".to_string()),
                "No answer from key custody within {:?}",
                timeout
            )
        })?,
        None => signing.await,
    };

    let signature = result.map_err(|e| {
        let reason = match &e {
            CustodyError::Rejected(reason) => reason.clone(),
            CustodyError::Unavailable(_) => e.to_string(),
        };
        Report::new(AccountError::AuthorizationDeclined(reason))
            .attach_printable(format!("Signing '{}'", document.prompt.title))
    })?;

    if signature.len() != SIGNATURE_LENGTH {
        return Err(Report::new(AccountError::AuthorizationDeclined(format!(
            "custody returned a {} byte signature",
            signature.len()
        ))));
    }

    Ok(SignedAuthorization { document, signature })
}
