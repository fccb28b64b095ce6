//! Session acquisition
//!
//! Logs into the portal through an explicit state machine:
//!
//! ```text
//! Navigating -> AwaitingRender -> ResolvingCredentialFields -> Submitting
//!            -> VerifyingOutcome -> { Authenticated | Failed }
//! ```
//!
//! The portal exposes no structured success signal, so the outcome is judged
//! from the landing URL under a [`LoginVerification`] policy.

use crate::browser::{NodeRef, Query, RemoteDom, wait_until};
use crate::config::{LoginVerification, PortalConfig, Timings};
use crate::error::{MonitorError, Result};
use crate::locate::{FieldSpec, SemanticField, resolve};
use std::fmt;

/// Why a login attempt ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    /// A credential input could not be located
    CredentialFieldMissing(SemanticField),

    /// Strict verification only: the landing URL carried no post-login marker
    MarkerMissing { url: String },

    /// The session failed underneath us
    Transport(String),
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginFailure::CredentialFieldMissing(field) => write!(f, "{} not found", field),
            LoginFailure::MarkerMissing { url } => write!(f, "no post-login marker in {}", url),
            LoginFailure::Transport(reason) => write!(f, "{}", reason),
        }
    }
}

impl From<LoginFailure> for MonitorError {
    fn from(failure: LoginFailure) -> Self {
        match failure {
            LoginFailure::CredentialFieldMissing(field) => MonitorError::Resolution { field: field.to_string() },
            LoginFailure::MarkerMissing { url } => {
                MonitorError::Resolution { field: format!("post-login marker (landed on {})", url) }
            }
            LoginFailure::Transport(reason) => MonitorError::Transport(reason),
        }
    }
}

/// States of the login machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Navigating,
    AwaitingRender,
    ResolvingCredentialFields,
    Submitting { username: NodeRef, password: NodeRef },
    VerifyingOutcome,
    Authenticated { marker_seen: bool, landing_url: String },
    Failed(LoginFailure),
}

impl LoginState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoginState::Authenticated { .. } | LoginState::Failed(_))
    }
}

/// Final result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated {
        /// Whether the landing URL confirmed the login
        marker_seen: bool,
        landing_url: String,
    },
    Failed(LoginFailure),
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated { .. })
    }

    /// Convert into a `Result`, for callers that abort on failure
    pub fn into_result(self) -> Result<()> {
        match self {
            LoginOutcome::Authenticated { .. } => Ok(()),
            LoginOutcome::Failed(failure) => Err(failure.into()),
        }
    }
}

/// Locator sets used on the login form
#[derive(Debug, Clone)]
pub struct LoginFields {
    pub username: FieldSpec,
    pub password: FieldSpec,
    pub submit: FieldSpec,
}

impl Default for LoginFields {
    fn default() -> Self {
        Self { username: FieldSpec::username(), password: FieldSpec::password(), submit: FieldSpec::submit() }
    }
}

/// Drives one login attempt over a borrowed session
pub struct SessionAcquirer<'a, D: RemoteDom + ?Sized> {
    dom: &'a D,
    portal: &'a PortalConfig,
    timings: &'a Timings,
    fields: LoginFields,
}

impl<'a, D: RemoteDom + ?Sized> SessionAcquirer<'a, D> {
    pub fn new(dom: &'a D, portal: &'a PortalConfig, timings: &'a Timings) -> Self {
        Self { dom, portal, timings, fields: LoginFields::default() }
    }

    /// Builder method: override the login form locators
    pub fn with_fields(mut self, fields: LoginFields) -> Self {
        self.fields = fields;
        self
    }

    /// Run the machine to a terminal state
    pub fn run(&self) -> LoginOutcome {
        let mut state = LoginState::Navigating;

        while !state.is_terminal() {
            let next = self
                .step(&state)
                .unwrap_or_else(|e| LoginState::Failed(LoginFailure::Transport(e.to_string())));
            log::debug!("Login: {:?} -> {:?}", state, next);
            state = next;
        }

        match state {
            LoginState::Authenticated { marker_seen, landing_url } => {
                if marker_seen {
                    log::info!("Login successful");
                } else {
                    log::warn!("Login may have failed, continuing anyway. Current URL: {}", landing_url);
                }
                LoginOutcome::Authenticated { marker_seen, landing_url }
            }
            LoginState::Failed(failure) => {
                log::error!("Login failed: {}", failure);
                LoginOutcome::Failed(failure)
            }
            _ => unreachable!("loop exits only on terminal states"),
        }
    }

    /// Perform the work of `state` and return the next state
    pub fn step(&self, state: &LoginState) -> Result<LoginState> {
        match state {
            LoginState::Navigating => {
                self.dom.navigate(&self.portal.login_url)?;
                Ok(LoginState::AwaitingRender)
            }
            LoginState::AwaitingRender => {
                std::thread::sleep(self.timings.initial_settle);
                let rendered = wait_until(self.dom, self.timings.render_timeout, |dom| {
                    Ok(!dom.find(&Query::css("input"))?.is_empty())
                })?;
                if !rendered {
                    log::warn!(
                        "No input rendered within {:?}, trying the page as it is",
                        self.timings.render_timeout
                    );
                }
                Ok(LoginState::ResolvingCredentialFields)
            }
            LoginState::ResolvingCredentialFields => {
                let Some(username) = resolve(self.dom, &self.fields.username)? else {
                    return Ok(LoginState::Failed(LoginFailure::CredentialFieldMissing(SemanticField::Username)));
                };
                let Some(password) = resolve(self.dom, &self.fields.password)? else {
                    return Ok(LoginState::Failed(LoginFailure::CredentialFieldMissing(SemanticField::Password)));
                };
                Ok(LoginState::Submitting { username: username.node, password: password.node })
            }
            LoginState::Submitting { username, password } => {
                self.fill(*username, &self.portal.username)?;
                self.fill(*password, &self.portal.password)?;

                match resolve(self.dom, &self.fields.submit)? {
                    Some(submit) => self.dom.click(submit.node)?,
                    None => {
                        log::debug!("No submit control found, pressing Enter in the password field");
                        self.dom.press_enter(*password)?;
                    }
                }

                std::thread::sleep(self.timings.submit_settle);
                Ok(LoginState::VerifyingOutcome)
            }
            LoginState::VerifyingOutcome => {
                let landing_url = self.dom.current_url()?;
                let marker_seen = self.has_post_login_marker(&landing_url);

                if !marker_seen && self.portal.login_verification == LoginVerification::Strict {
                    return Ok(LoginState::Failed(LoginFailure::MarkerMissing { url: landing_url }));
                }
                Ok(LoginState::Authenticated { marker_seen, landing_url })
            }
            LoginState::Authenticated { .. } | LoginState::Failed(_) => Ok(state.clone()),
        }
    }

    fn fill(&self, node: NodeRef, value: &str) -> Result<()> {
        self.dom.clear(node)?;
        self.dom.type_into(node, value)
    }

    fn has_post_login_marker(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.portal
            .post_login_markers
            .iter()
            .any(|marker| url.contains(&marker.to_lowercase()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::browser::fake::{Action, FakeDom};

    const LOGIN_URL: &str = "https://portal.example/";

    pub(crate) fn portal() -> PortalConfig {
        PortalConfig::new(LOGIN_URL, "https://portal.example/company-dashboard", "student@example.edu", "s3cret")
    }

    /// Login form with an email input (1), a password input (2) and a submit button (3)
    pub(crate) fn login_page() -> FakeDom {
        FakeDom::new()
            .with(Query::css("input"), &[1, 2])
            .with(Query::css("[name=\"email\"]"), &[1])
            .with(Query::css("input[type=\"password\"]"), &[2])
            .with(Query::css("button[type=\"submit\"]"), &[3])
            .redirect_on_click(3, "https://portal.example/Dashboard")
    }

    fn run(dom: &FakeDom, portal: &PortalConfig) -> LoginOutcome {
        SessionAcquirer::new(dom, portal, &Timings::immediate()).run()
    }

    #[test]
    fn test_successful_login() {
        let dom = login_page();
        let outcome = run(&dom, &portal());

        assert_eq!(
            outcome,
            LoginOutcome::Authenticated {
                marker_seen: true,
                landing_url: "https://portal.example/Dashboard".to_string()
            }
        );
        assert_eq!(
            dom.actions(),
            vec![
                Action::Navigate(LOGIN_URL.to_string()),
                Action::Clear(NodeRef(1)),
                Action::Type(NodeRef(1), "student@example.edu".to_string()),
                Action::Clear(NodeRef(2)),
                Action::Type(NodeRef(2), "s3cret".to_string()),
                Action::Click(NodeRef(3)),
            ]
        );
    }

    #[test]
    fn test_enter_fallback_without_submit_control() {
        let dom = FakeDom::new()
            .with(Query::css("input[type=\"text\"]"), &[1])
            .with(Query::css("input[type=\"password\"]"), &[2]);

        let outcome = run(&dom, &portal());

        assert!(outcome.is_authenticated());
        assert_eq!(dom.actions().last(), Some(&Action::Enter(NodeRef(2))));
    }

    #[test]
    fn test_missing_password_field_fails() {
        let dom = FakeDom::new().with(Query::css("[name=\"email\"]"), &[1]);
        let outcome = run(&dom, &portal());

        assert_eq!(outcome, LoginOutcome::Failed(LoginFailure::CredentialFieldMissing(SemanticField::Password)));
        assert!(!dom.actions().iter().any(|a| matches!(a, Action::Type(..))));
    }

    #[test]
    fn test_missing_username_field_fails() {
        let dom = FakeDom::new();
        let outcome = run(&dom, &portal());

        assert_eq!(outcome, LoginOutcome::Failed(LoginFailure::CredentialFieldMissing(SemanticField::Username)));
    }

    #[test]
    fn test_optimistic_verification_accepts_unmarked_url() {
        let dom = login_page().redirect_on_click(3, "https://portal.example/");
        let outcome = run(&dom, &portal());

        assert_eq!(
            outcome,
            LoginOutcome::Authenticated { marker_seen: false, landing_url: "https://portal.example/".to_string() }
        );
    }

    #[test]
    fn test_strict_verification_rejects_unmarked_url() {
        let dom = login_page().redirect_on_click(3, "https://portal.example/");
        let strict = portal().login_verification(LoginVerification::Strict);

        let outcome = run(&dom, &strict);

        assert_eq!(
            outcome,
            LoginOutcome::Failed(LoginFailure::MarkerMissing { url: "https://portal.example/".to_string() })
        );
    }

    #[test]
    fn test_transport_error_fails_login() {
        let dom = login_page().navigation_budget(0);
        let outcome = run(&dom, &portal());

        match outcome {
            LoginOutcome::Failed(LoginFailure::Transport(reason)) => assert!(reason.contains("refused")),
            other => panic!("Expected transport failure, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_converts_to_monitor_error() {
        let err: MonitorError = LoginFailure::CredentialFieldMissing(SemanticField::Username).into();
        assert!(matches!(err, MonitorError::Resolution { ref field } if field == "username field"));

        let outcome = LoginOutcome::Failed(LoginFailure::Transport("gone".into()));
        assert!(matches!(outcome.into_result(), Err(MonitorError::Transport(_))));
    }
}
