use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const CSRF_COOKIE: &str = "skyshift.csrf-token";

fn digest(token: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Fresh token plus the cookie value binding it to the server secret
pub fn issue(secret: &str) -> (String, String) {
    let token = Uuid::new_v4().simple().to_string();
    let cookie = format!("{}|{}", token, digest(&token, secret));
    (token, cookie)
}

/// Token carried by a cookie, if the cookie was signed with `secret`
pub fn token_from_cookie<'a>(cookie: &'a str, secret: &str) -> Option<&'a str> {
    let (token, hash) = cookie.split_once('|')?;
    (digest(token, secret) == hash).then_some(token)
}

/// The submitted token must equal the one carried by a valid cookie
pub fn verify(submitted: &str, cookie: Option<&str>, secret: &str) -> bool {
    match cookie.and_then(|c| token_from_cookie(c, secret)) {
        Some(expected) => !submitted.is_empty() && expected == submitted,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify() {
        let (token, cookie) = issue("secret");
        assert!(verify(&token, Some(&cookie), "secret"));
        assert_eq!(token_from_cookie(&cookie, "secret"), Some(token.as_str()));
    }

    #[test]
    fn mismatches_are_rejected() {
        let (token, cookie) = issue("secret");
        let (other, _) = issue("secret");
        assert!(!verify(&other, Some(&cookie), "secret"));
        assert!(!verify(&token, Some(&cookie), "different"));
        assert!(!verify(&token, None, "secret"));
        assert!(!verify("", Some(&cookie), "secret"));

        let forged = format!("{}|{}", other, cookie.split_once('|').unwrap().1);
        assert!(!verify(&other, Some(&forged), "secret"));
    }
}
