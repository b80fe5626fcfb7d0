//! Scriptable mock token fetcher.
//!
//! Each call pops the next step from the script; once the script is
//! exhausted the last step repeats, so a one-step script behaves like a
//! constant response.

use call_session::backend::TokenFetcher;
use call_session::errors::CallError;
use secrecy::SecretString;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted response from the token endpoint.
#[derive(Debug, Clone)]
pub enum TokenScript {
    /// Return this token.
    Token(String),
    /// Fail with a retryable `AuthToken` error.
    AuthFailure(String),
    /// Fail with the non-retryable `ServerConfig` defect error.
    ServerDefect,
    /// Never complete (for exercising the fetch timeout).
    Hang,
}

/// Mock token fetcher with a scripted response sequence and a call
/// counter.
#[derive(Debug)]
pub struct MockTokenFetcher {
    script: Mutex<VecDeque<TokenScript>>,
    fallback: TokenScript,
    call_count: AtomicUsize,
}

impl MockTokenFetcher {
    /// Create a fetcher that plays `steps` in order, then repeats the
    /// last step forever.
    ///
    /// # Panics
    ///
    /// Panics if `steps` is empty.
    #[must_use]
    pub fn script(mut steps: Vec<TokenScript>) -> Self {
        let fallback = steps.pop().expect("script must have at least one step");
        Self {
            script: Mutex::new(steps.into()),
            fallback,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Always return `token`.
    #[must_use]
    pub fn fixed(token: &str) -> Self {
        Self::script(vec![TokenScript::Token(token.to_string())])
    }

    /// Always fail with a retryable auth error.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::script(vec![TokenScript::AuthFailure(message.to_string())])
    }

    /// Always fail with the non-retryable server defect error.
    #[must_use]
    pub fn server_defect() -> Self {
        Self::script(vec![TokenScript::ServerDefect])
    }

    /// Never complete a fetch.
    #[must_use]
    pub fn hanging() -> Self {
        Self::script(vec![TokenScript::Hang])
    }

    /// Number of fetches issued so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> TokenScript {
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait::async_trait]
impl TokenFetcher for MockTokenFetcher {
    async fn fetch_token(
        &self,
        _meeting_id: &str,
        _identity: &str,
    ) -> Result<SecretString, CallError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match self.next_step() {
            TokenScript::Token(token) => Ok(SecretString::from(token)),
            TokenScript::AuthFailure(message) => Err(CallError::AuthToken(message)),
            TokenScript::ServerDefect => Err(CallError::ServerConfig(
                "Token service returned the known decode defect".to_string(),
            )),
            TokenScript::Hang => std::future::pending().await,
        }
    }
}
