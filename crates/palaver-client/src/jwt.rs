use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use palaver_types::api::Claims;

use crate::error::ApiError;

/// Read the claims out of a bearer token without verifying the signature.
/// The client holds no signing key; the remote API is the sole authority
/// on token validity, and a bad token simply fails the next call.
pub fn decode_claims(token: &str) -> Result<Claims, ApiError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_header), Some(payload), Some(_signature), None) => payload,
        _ => return Err(ApiError::MalformedToken),
    };
    // some issuers pad the segment, base64url proper does not
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| ApiError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| ApiError::MalformedToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(json: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(json);
        format!("{header}.{payload}.not-a-real-signature")
    }

    #[test]
    fn decodes_subject_and_username() {
        let token = token_with_payload(r#"{"sub":"u-9","username":"alice","exp":4102444800}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.resolved_user_id(), Some("u-9"));
        assert_eq!(claims.username.as_deref(), Some("alice"));
    }

    #[test]
    fn decodes_user_id_claim_layout() {
        let token = token_with_payload(r#"{"userId":"42","username":"bob"}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.resolved_user_id(), Some("42"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_claims("garbage"), Err(ApiError::MalformedToken)));
        assert!(matches!(decode_claims("a.b"), Err(ApiError::MalformedToken)));
        assert!(matches!(
            decode_claims("a.!!!not-base64!!!.c"),
            Err(ApiError::MalformedToken)
        ));
        let unknown = format!("{}.{}.{}", "h", URL_SAFE_NO_PAD.encode("[1,2]"), "s");
        assert!(matches!(decode_claims(&unknown), Err(ApiError::MalformedToken)));
    }
}
