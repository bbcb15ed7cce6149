//! Gateway error classification
//!
//! An authentication failure becomes a prompt only while the user has not
//! supplied a credential in the current attempt. A second failure after a
//! submitted credential is terminal, so a wrong password never loops.

use crate::gateway::GatewayError;
use crate::profile::AuthKind;

use super::state::SecretKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    PromptPassword,
    PromptPassphrase,
    Terminal,
}

impl Classification {
    pub(crate) fn secret_kind(self) -> Option<SecretKind> {
        match self {
            Classification::PromptPassword => Some(SecretKind::Password),
            Classification::PromptPassphrase => Some(SecretKind::Passphrase),
            Classification::Terminal => None,
        }
    }
}

pub fn classify(error: &GatewayError, credential_supplied: bool, auth: AuthKind) -> Classification {
    if !error.is_auth_failure() || credential_supplied {
        return Classification::Terminal;
    }

    match auth {
        AuthKind::Password => Classification::PromptPassword,
        AuthKind::Key => Classification::PromptPassphrase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_prompt_by_auth_kind() {
        let err = GatewayError::AuthRequired("password".into());
        assert_eq!(
            classify(&err, false, AuthKind::Password),
            Classification::PromptPassword
        );
        assert_eq!(
            classify(&err, false, AuthKind::Key),
            Classification::PromptPassphrase
        );

        let err = GatewayError::AuthFailed("denied".into());
        assert_eq!(
            classify(&err, false, AuthKind::Password),
            Classification::PromptPassword
        );
    }

    #[test]
    fn test_auth_error_after_credential_is_terminal() {
        let err = GatewayError::AuthFailed("denied".into());
        assert_eq!(classify(&err, true, AuthKind::Password), Classification::Terminal);
        let err = GatewayError::AuthRequired("again".into());
        assert_eq!(classify(&err, true, AuthKind::Key), Classification::Terminal);
    }

    #[test]
    fn test_other_errors_are_terminal() {
        for err in [
            GatewayError::NetworkError("refused".into()),
            GatewayError::Timeout("30s".into()),
            GatewayError::Io("broken pipe".into()),
            GatewayError::Other("boom".into()),
        ] {
            assert_eq!(classify(&err, false, AuthKind::Password), Classification::Terminal);
        }
    }
}
