//! Access tokens, refresh tokens and the authorization code
//!
//! Tokens are only ever appended; several access tokens can be valid at the
//! same time. Validity is always judged against the instant passed in, so the
//! registry itself never reads a clock.

use crate::error::{Result, SimError};
use crate::format::guid;
use crate::logging::{StructuredLogger, get_logger};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifetime of every refresh token (90 days)
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7_776_000;

/// Bearer value used when the Authorization header is absent or malformed
pub const BEARER_NOT_PROVIDED: &str = "AUTH-BEARER-NOT-PROVIDED";

const ID_TOKEN: &str = "eyJAAA==";
const PROFILE_INFO: &str = "ejyAAA==";
const RESOURCE: &str = "c1e4c1a0-2878-4e6f-a308-836b34474ea9";
const SCOPE: &str =
    "https://simulated-environment.onmicrosoft.com/fordconnect/access openid offline_access";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn key_prefix(self) -> &'static str {
        match self {
            TokenKind::Access => "ACCESS",
            TokenKind::Refresh => "REFRESH",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub key: String,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Access/refresh pair handed out by a successful exchange
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access: Token,
    pub refresh: Token,
}

impl TokenGrant {
    /// Body of the token endpoint's success response
    pub fn to_response(&self) -> TokenResponse {
        let lifetime = (self.access.expires_at - self.access.issued_at).num_seconds();
        TokenResponse {
            access_token: self.access.key.clone(),
            id_token: ID_TOKEN.to_string(),
            token_type: "Bearer".to_string(),
            not_before: self.access.issued_at.timestamp(),
            expires_in: lifetime,
            expires_on: self.access.expires_at.timestamp(),
            resource: RESOURCE.to_string(),
            id_token_expires_in: lifetime,
            profile_info: PROFILE_INFO.to_string(),
            scope: SCOPE.to_string(),
            refresh_token: self.refresh.key.clone(),
            refresh_token_expires_in: REFRESH_TOKEN_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
    pub token_type: String,
    pub not_before: i64,
    pub expires_in: i64,
    pub expires_on: i64,
    pub resource: String,
    pub id_token_expires_in: i64,
    pub profile_info: String,
    pub scope: String,
    pub refresh_token: String,
    pub refresh_token_expires_in: i64,
}

/// Form fields accepted by the token endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub grant_type: Option<String>,
    pub redirect_uri: Option<String>,
    pub code: Option<String>,
    pub refresh_token: Option<String>,
}

/// Prefixes the token endpoint checks client credentials against
#[derive(Debug, Clone)]
pub struct ClientPolicy {
    pub client_id_prefix: String,
    pub client_secret_prefix: String,
}

#[derive(Debug)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
    code: String,
    code_expires_at: DateTime<Utc>,
    access_ttl: Duration,
    logger: StructuredLogger,
}

impl TokenRegistry {
    pub fn new(code: String, code_expires_at: DateTime<Utc>, access_ttl: Duration) -> Self {
        let logger = get_logger("token");
        logger.info(&format!("Authorization code is: {}", code));
        Self {
            tokens: Vec::new(),
            code,
            code_expires_at,
            access_ttl,
            logger,
        }
    }

    /// The one authorization code this registry accepts
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn code_expires_at(&self) -> DateTime<Utc> {
        self.code_expires_at
    }

    /// Issue a token; an empty or absent key gets a generated one
    pub fn issue(&mut self, kind: TokenKind, key: Option<&str>, now: DateTime<Utc>) -> Token {
        let key = match key {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => format!("{}-{}", kind.key_prefix(), guid()),
        };
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        };
        let token = Token {
            key,
            kind,
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.logger.info(&format!("Issued token: {}", token.key));
        self.tokens.push(token.clone());
        token
    }

    /// An access token with this key was issued at some point
    pub fn is_known(&self, key: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| t.kind == TokenKind::Access && t.key == key)
    }

    pub fn is_valid(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.tokens
            .iter()
            .any(|t| t.kind == TokenKind::Access && t.key == key && t.is_live(now))
    }

    pub fn is_valid_refresh(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.tokens
            .iter()
            .any(|t| t.kind == TokenKind::Refresh && t.key == key && t.is_live(now))
    }

    /// Gate for every vehicle API call
    pub fn authenticate(&self, bearer: &str, now: DateTime<Utc>) -> Result<()> {
        if self.is_valid(bearer, now) {
            return Ok(());
        }
        if self.is_known(bearer) {
            self.logger.warn(
                "The token has expired. Clients should honor expires_in or expires_on.",
            );
            return Err(SimError::token_expired(bearer));
        }
        self.logger
            .error("The token does not match any issued access token.");
        Err(SimError::token_unknown(bearer))
    }

    /// Trade the authorization code for a new token pair
    ///
    /// The code is never consumed, so replaying it before expiry succeeds.
    pub fn exchange_code(&mut self, code: &str, now: DateTime<Utc>) -> Result<TokenGrant> {
        if code != self.code || now >= self.code_expires_at {
            return Err(SimError::AuthorizationCodeInvalidOrExpired);
        }
        Ok(self.issue_pair(now))
    }

    /// Trade a live refresh token for a new token pair
    pub fn exchange_refresh(&mut self, refresh: &str, now: DateTime<Utc>) -> Result<TokenGrant> {
        if !self.is_valid_refresh(refresh, now) {
            return Err(SimError::invalid_grant("Refresh token not expected value."));
        }
        Ok(self.issue_pair(now))
    }

    /// Full token-endpoint handling: credentials, then the grant itself
    pub fn grant(
        &mut self,
        request: &TokenRequest,
        policy: &ClientPolicy,
        now: DateTime<Utc>,
    ) -> Result<TokenGrant> {
        let result = self.try_grant(request, policy, now);
        if let Err(ref e) = result {
            self.logger.error(&format!("Token request rejected: {}", e));
        }
        result
    }

    fn try_grant(
        &mut self,
        request: &TokenRequest,
        policy: &ClientPolicy,
        now: DateTime<Utc>,
    ) -> Result<TokenGrant> {
        if !has_prefix(&request.client_id, &policy.client_id_prefix) {
            return Err(SimError::invalid_grant("client_id not expected value."));
        }
        if !has_prefix(&request.client_secret, &policy.client_secret_prefix) {
            return Err(SimError::invalid_grant("client_secret not expected value."));
        }

        match request.grant_type.as_deref() {
            Some("refresh_token") => {
                self.exchange_refresh(request.refresh_token.as_deref().unwrap_or_default(), now)
            }
            Some("authorization_code") => {
                let redirect_ok = request
                    .redirect_uri
                    .as_deref()
                    .is_some_and(|uri| uri.to_lowercase().starts_with("http"));
                if !redirect_ok {
                    return Err(SimError::invalid_grant("invalid redirect_uri."));
                }
                self.exchange_code(request.code.as_deref().unwrap_or_default(), now)
            }
            _ => Err(SimError::invalid_grant("grant_type not expected value.")),
        }
    }

    fn issue_pair(&mut self, now: DateTime<Utc>) -> TokenGrant {
        let access = self.issue(TokenKind::Access, None, now);
        let refresh = self.issue(TokenKind::Refresh, None, now);
        TokenGrant { access, refresh }
    }
}

fn has_prefix(value: &Option<String>, prefix: &str) -> bool {
    value
        .as_deref()
        .is_some_and(|v| !v.is_empty() && v.starts_with(prefix))
}

/// Bearer value carried by an Authorization header
pub fn bearer_from_header(header: Option<&str>) -> &str {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or(BEARER_NOT_PROVIDED)
}
