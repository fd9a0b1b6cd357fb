//! Pre-write notification hooks.
//!
//! Listeners are told about a preference write before it happens and may
//! veto it. A veto surfaces as a client error; any other listener failure is
//! a server error.

use livery_core::{LiveryError, NotificationError, Preference};
use thiserror::Error;

/// A preference write about to happen.
#[derive(Debug, Clone, Copy)]
pub enum PreferenceEvent<'a> {
    PreAdd {
        preference: &'a Preference,
    },
    PreUpdate {
        old: &'a Preference,
        new: &'a Preference,
    },
    PreDelete {
        preference: &'a Preference,
    },
}

impl PreferenceEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PreferenceEvent::PreAdd { .. } => "pre_add",
            PreferenceEvent::PreUpdate { .. } => "pre_update",
            PreferenceEvent::PreDelete { .. } => "pre_delete",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListenerError {
    /// The write must not happen.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error("{0}")]
    Failed(String),
}

pub trait PreferenceListener: Send + Sync {
    fn name(&self) -> &str;

    fn on_event(
        &self,
        tenant_domain: &str,
        event: &PreferenceEvent<'_>,
    ) -> Result<(), ListenerError>;
}

/// Deliver `event` to every listener in order, stopping at the first error.
pub(crate) fn notify(
    listeners: &[std::sync::Arc<dyn PreferenceListener>],
    tenant_domain: &str,
    event: &PreferenceEvent<'_>,
) -> Result<(), LiveryError> {
    for listener in listeners {
        match listener.on_event(tenant_domain, event) {
            Ok(()) => {}
            Err(ListenerError::NotAllowed(reason)) => {
                tracing::warn!(
                    tenant_domain,
                    listener = listener.name(),
                    event = event.name(),
                    %reason,
                    "Preference write vetoed"
                );
                return Err(NotificationError::NotAllowed {
                    tenant_domain: tenant_domain.to_string(),
                    reason,
                }
                .into());
            }
            Err(ListenerError::Failed(reason)) => {
                return Err(NotificationError::ListenerFailed {
                    listener: listener.name().to_string(),
                    reason,
                }
                .into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use livery_core::{ErrorCode, OwnerKind};
    use serde_json::json;
    use std::sync::Arc;

    struct Veto;

    impl PreferenceListener for Veto {
        fn name(&self) -> &str {
            "veto"
        }

        fn on_event(&self, _: &str, event: &PreferenceEvent<'_>) -> Result<(), ListenerError> {
            match event {
                PreferenceEvent::PreDelete { .. } => Err(ListenerError::NotAllowed(
                    "branding is locked".to_string(),
                )),
                _ => Ok(()),
            }
        }
    }

    struct Broken;

    impl PreferenceListener for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn on_event(&self, _: &str, _: &PreferenceEvent<'_>) -> Result<(), ListenerError> {
            Err(ListenerError::Failed("queue full".to_string()))
        }
    }

    fn preference() -> Preference {
        Preference::new(OwnerKind::Organization, "acme.com", "en-US", json!({"theme": {}}))
    }

    #[test]
    fn test_veto_is_client_error() {
        let listeners: Vec<Arc<dyn PreferenceListener>> = vec![Arc::new(Veto)];
        let pref = preference();

        assert!(notify(&listeners, "acme.com", &PreferenceEvent::PreAdd { preference: &pref }).is_ok());

        let err = notify(&listeners, "acme.com", &PreferenceEvent::PreDelete { preference: &pref })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationNotAllowed);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_listener_failure_is_server_error() {
        let listeners: Vec<Arc<dyn PreferenceListener>> = vec![Arc::new(Broken)];
        let pref = preference();
        let err = notify(
            &listeners,
            "acme.com",
            &PreferenceEvent::PreUpdate { old: &pref, new: &pref },
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ListenerFailure);
        assert!(err.is_server_error());
    }
}
