use actix_web::error::ErrorUnauthorized;
use actix_web::{Error, FromRequest, HttpRequest, dev::Payload};
use base64::Engine;
use futures::future::{Ready, ready};
use uuid::Uuid;

/// Caller identity taken from the bearer token. Token issuance and
/// signature verification belong to the backend auth service; this service
/// only needs the subject id out of the payload.
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<AuthenticatedUser, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth_header = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
        {
            Some(h) => h,
            None => return ready(Err(ErrorUnauthorized("Missing Authorization header"))),
        };

        if !auth_header.starts_with("Bearer ") {
            return ready(Err(ErrorUnauthorized("Invalid auth header format")));
        }
        let token = auth_header.trim_start_matches("Bearer ").trim();

        match subject_from_jwt(token) {
            Ok(user_id) => ready(Ok(AuthenticatedUser { user_id })),
            Err(_) => ready(Err(ErrorUnauthorized("Invalid token"))),
        }
    }
}

/// Pull the `sub` claim out of a JWT payload. JWT uses base64url without
/// padding.
fn subject_from_jwt(token: &str) -> Result<Uuid, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("invalid JWT format".to_string());
    }

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| format!("base64: {}", e))?;
    let payload: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|e| format!("json: {}", e))?;
    let sub = payload["sub"].as_str().ok_or("missing 'sub' claim")?;
    Uuid::parse_str(sub).map_err(|e| format!("uuid: {}", e))
}

#[cfg(test)]
pub(crate) fn bearer_token_for(user_id: Uuid) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}"}}"#, user_id));
    format!("Bearer {}.{}.unsigned", header, payload)
}
