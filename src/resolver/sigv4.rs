//! Request signing for the control plane (AWS Signature Version 4).
//!
//! Only what a JSON `POST` with no query string needs: canonical request,
//! string to sign, derived signing key and the `Authorization` header.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Headers to attach to a signed request, in addition to `content-type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignedHeaders {
    pub amz_date: String,
    pub content_sha256: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

/// A `POST` request to be signed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PostRequest<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub content_type: &'a str,
    pub body: &'a [u8],
}

/// Signs `req` for `service` in `region` at time `now`.
pub(crate) fn sign_post(
    credentials: &Credentials,
    region: &str,
    service: &str,
    req: PostRequest<'_>,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let PostRequest {
        host,
        path,
        content_type,
        body,
    } = req;
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let content_sha256 = hex::encode(Sha256::digest(body));

    let mut headers: Vec<(&str, &str)> = vec![
        ("content-type", content_type),
        ("host", host),
        ("x-amz-content-sha256", content_sha256.as_str()),
        ("x-amz-date", amz_date.as_str()),
    ];
    if let Some(token) = credentials.session_token.as_deref() {
        headers.push(("x-amz-security-token", token));
    }
    headers.sort_by(|a, b| a.0.cmp(b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{}\n", v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "POST\n{path}\n\n{canonical_headers}\n{signed_headers}\n{content_sha256}"
    );
    let scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, &date, region, service);
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
        amz_date,
        content_sha256,
        security_token: credentials.session_token.clone(),
    }
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds(token: Option<&str>) -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            session_token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_signing_key_matches_published_vector() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap();
        let signed = sign_post(
            &creds(None),
            "eu-west-1",
            "kinesisvideo",
            PostRequest {
                host: "kinesisvideo.eu-west-1.amazonaws.com",
                path: "/getDataEndpoint",
                content_type: "application/json",
                body: b"",
            },
            now,
        );
        assert_eq!(signed.amz_date, "20240309T123005Z");
        assert_eq!(
            signed.content_sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240309/eu-west-1/kinesisvideo/aws4_request, \
             SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date, Signature="
        ));
        let sig = signed.authorization.rsplit('=').next().unwrap();
        assert_eq!(sig.len(), 64);
        assert!(!signed.authorization.contains("wJalrXUtnFEMI"));
    }

    #[test]
    fn test_session_token_is_signed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap();
        let signed = sign_post(
            &creds(Some("TOKEN")),
            "eu-west-1",
            "kinesisvideo",
            PostRequest {
                host: "host",
                path: "/getDataEndpoint",
                content_type: "application/json",
                body: b"{}",
            },
            now,
        );
        assert!(signed.authorization.contains("x-amz-date;x-amz-security-token"));
        assert_eq!(signed.security_token.as_deref(), Some("TOKEN"));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap();
        let sign = |body: &[u8]| {
            let req = PostRequest {
                host: "h",
                path: "/p",
                content_type: "application/json",
                body,
            };
            sign_post(&creds(None), "r", "s", req, now)
        };
        assert_eq!(sign(&b"{}"[..]), sign(&b"{}"[..]));
        assert_ne!(sign(&b"{}"[..]).authorization, sign(&b"[]"[..]).authorization);
    }
}
